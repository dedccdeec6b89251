use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        schema::Table,
        types::{Row, Value},
    },
};

use super::TableSource;

/// Table source over a directory of CSV files, one `<table>.csv` per table.
///
/// The first line of a file is its header. Every cell loads as a string;
/// cells missing from short lines are absent from the row.
pub struct CsvTableSource {
    dir: PathBuf,
    /// Header of each table as last read or written, kept so that saving an
    /// emptied table still writes its columns
    headers: HashMap<String, Vec<String>>,
}

impl CsvTableSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            headers: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, table_name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", table_name))
    }
}

impl TableSource for CsvTableSource {
    fn load(&mut self, table_name: &str) -> Result<Vec<Row>> {
        let path = self.path(table_name);
        if !path.is_file() {
            return Err(Error::NotFound(table_name.to_string()));
        }

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(&path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                headers
                    .iter()
                    .zip(record.iter())
                    .map(|(header, cell)| (header.clone(), Value::String(cell.to_string())))
                    .collect(),
            );
        }

        debug!(path = %path.display(), rows = rows.len(), "loaded csv table");
        self.headers.insert(table_name.to_string(), headers);
        Ok(rows)
    }

    fn save(&mut self, table_name: &str, rows: Vec<Row>) -> Result<()> {
        let path = self.path(table_name);
        let mut table = Table::new(
            table_name,
            self.headers.get(table_name).cloned().unwrap_or_default(),
        );
        table.extend_from_rows(&rows);

        let mut writer = csv::Writer::from_path(&path)?;
        if !table.columns.is_empty() {
            writer.write_record(&table.columns)?;
            for row in &rows {
                writer.write_record(table.row_values(row))?;
            }
        }
        writer.flush()?;

        debug!(path = %path.display(), rows = rows.len(), "saved csv table");
        self.headers.insert(table.name, table.columns);
        Ok(())
    }
}
