use tracing::warn;

use crate::{
    error::Result,
    sql::engine::{Session, TableSource},
};

pub const BANNER: &str =
    "SQL Query Engine CLI. Enter your SQL commands, or type \"exit\" to quit.";

/// Line-oriented terminal the REPL talks to
pub trait Prompt {
    /// Next input line, `None` once input is exhausted
    fn read_line(&mut self) -> Result<Option<String>>;

    fn write(&mut self, text: &str) -> Result<()>;
}

/// Read-eval-print loop over a session
pub struct Repl<P: Prompt, S: TableSource> {
    prompt: P,
    session: Session<S>,
}

impl<P: Prompt, S: TableSource + 'static> Repl<P, S> {
    pub fn new(prompt: P, session: Session<S>) -> Self {
        Self { prompt, session }
    }

    /// Runs statements until `exit` or end of input. A failing statement is
    /// reported and the loop goes on.
    pub fn run(&mut self) -> Result<()> {
        self.prompt.write(BANNER)?;
        while let Some(line) = self.prompt.read_line()? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case("exit") {
                break;
            }
            match self.session.execute(line) {
                Ok(result) => self.prompt.write(&result.to_string())?,
                Err(err) => {
                    warn!(error = %err, "statement failed");
                    self.prompt.write(&format!("Error: {}", err))?;
                }
            }
        }
        Ok(())
    }

    pub fn into_parts(self) -> (P, Session<S>) {
        (self.prompt, self.session)
    }
}
