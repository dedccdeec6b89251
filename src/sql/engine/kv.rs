use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::types::Row,
    storage::engine::Engine as StorageEngine,
};

use super::TableSource;

/// Table source over a byte-level storage engine; every table is one
/// bincode-encoded row vector under its own key.
///
/// Clones share the same engine.
pub struct KvTableSource<E: StorageEngine> {
    engine: Arc<Mutex<E>>,
}

impl<E: StorageEngine> Clone for KvTableSource<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<E: StorageEngine> KvTableSource<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }
}

impl<E: StorageEngine> TableSource for KvTableSource<E> {
    fn load(&mut self, table_name: &str) -> Result<Vec<Row>> {
        let key = bincode::serialize(&Key::Table(table_name.to_string()))?;
        let value = self.engine.lock()?.get(key)?;
        match value {
            Some(value) => {
                let rows: Vec<Row> = bincode::deserialize(&value)?;
                debug!(table = table_name, rows = rows.len(), "loaded table");
                Ok(rows)
            }
            None => Err(Error::NotFound(table_name.to_string())),
        }
    }

    fn save(&mut self, table_name: &str, rows: Vec<Row>) -> Result<()> {
        let key = bincode::serialize(&Key::Table(table_name.to_string()))?;
        let value = bincode::serialize(&rows)?;
        self.engine.lock()?.set(key, value)?;
        debug!(table = table_name, rows = rows.len(), "saved table");
        Ok(())
    }
}

/// Storage key types
#[derive(Debug, Serialize, Deserialize)]
enum Key {
    Table(String),
}

#[cfg(test)]
mod tests {
    use super::KvTableSource;
    use crate::{
        error::{Error, Result},
        sql::{
            engine::TableSource,
            types::{Row, Value},
        },
        storage::memory::MemoryEngine,
    };

    #[test]
    fn test_load_save() -> Result<()> {
        let mut tables = KvTableSource::new(MemoryEngine::new());
        assert_eq!(tables.load("t"), Err(Error::NotFound("t".into())));

        let mut row = Row::new();
        row.insert("b".into(), Value::from("1"));
        row.insert("a".into(), Value::Null);
        tables.save("t", vec![row.clone()])?;

        // column order survives the round trip through storage
        let loaded = tables.load("t")?;
        assert_eq!(loaded, vec![row.clone()]);
        assert_eq!(loaded[0].keys().collect::<Vec<_>>(), vec!["b", "a"]);

        // clones see the same tables
        let mut other = tables.clone();
        other.append("t", row)?;
        assert_eq!(tables.load("t")?.len(), 2);

        tables.save("t", vec![])?;
        assert!(tables.load("t")?.is_empty());
        Ok(())
    }
}
