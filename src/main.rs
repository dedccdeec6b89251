use std::path::PathBuf;

use clap::Parser;
use flatdb::{
    config::{Backend, Config},
    error::{Error, Result},
    repl::{Prompt, Repl},
    sql::engine::{Session, TableSource, csv::CsvTableSource, kv::KvTableSource},
    storage::memory::MemoryEngine,
};
use rustyline::{DefaultEditor, error::ReadlineError};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Run SQL against a directory of CSV files
#[derive(Parser, Debug)]
#[command(name = "flatdb", version, about, long_about = None, after_help = "Examples:
  # Interactive session over ./data
  flatdb --data-dir data

  # Execute single command
  flatdb -d data -c \"SELECT name FROM student WHERE age > 25\"")]
struct Args {
    /// Directory holding the <table>.csv files
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to ./flatdb.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keep tables in memory instead of CSV files
    #[arg(long)]
    memory: bool,

    /// Execute SQL command directly and exit
    #[arg(short, long, value_name = "SQL")]
    command: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.storage.data_dir = dir;
    }
    if args.memory {
        config.storage.backend = Backend::Memory;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase())),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    debug!(?config, "loaded configuration");

    match config.storage.backend {
        Backend::Csv => {
            info!(dir = %config.storage.data_dir.display(), "using csv tables");
            run(args.command, &config, CsvTableSource::new(&config.storage.data_dir))
        }
        Backend::Memory => {
            info!("using in-memory tables");
            run(args.command, &config, KvTableSource::new(MemoryEngine::new()))
        }
    }
}

fn run<S: TableSource + 'static>(
    command: Option<String>,
    config: &Config,
    tables: S,
) -> anyhow::Result<()> {
    let mut session = Session::new(tables);

    if let Some(sql) = command {
        println!("{}", session.execute(&sql)?);
        return Ok(());
    }

    let mut repl = Repl::new(LinePrompt::new(config)?, session);
    repl.run()?;
    let (prompt, _) = repl.into_parts();
    prompt.save_history();
    Ok(())
}

/// Terminal prompt with line editing
struct LinePrompt {
    editor: DefaultEditor,
    prompt: String,
    history_file: Option<PathBuf>,
}

impl LinePrompt {
    fn new(config: &Config) -> anyhow::Result<Self> {
        let mut editor = DefaultEditor::new()?;
        if let Some(path) = &config.repl.history_file {
            // a missing history file is normal on first run
            let _ = editor.load_history(path);
        }
        Ok(Self {
            editor,
            prompt: config.repl.prompt.clone(),
            history_file: config.repl.history_file.clone(),
        })
    }

    fn save_history(mut self) {
        if let Some(path) = &self.history_file {
            if let Err(err) = self.editor.save_history(path) {
                eprintln!("Warning: could not save history to {}: {}", path.display(), err);
            }
        }
    }
}

impl Prompt for LinePrompt {
    fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            match self.editor.readline(&self.prompt) {
                Ok(line) => {
                    if let Err(err) = self.editor.add_history_entry(line.as_str()) {
                        debug!(%err, "could not add history entry");
                    }
                    return Ok(Some(line));
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => return Ok(None),
                Err(err) => return Err(Error::Internal(err.to_string())),
            }
        }
    }

    fn write(&mut self, text: &str) -> Result<()> {
        println!("{}", text);
        Ok(())
    }
}
