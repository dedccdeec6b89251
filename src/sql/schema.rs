use indexmap::IndexSet;

use crate::sql::types::{Row, Value};

/// Column layout of a table.
///
/// Tables declare nothing up front, so the columns are whatever names the
/// rows carry, in order of first appearance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Infers the columns of a set of rows
    pub fn infer(name: impl Into<String>, rows: &[Row]) -> Self {
        let mut table = Self::new(name, Vec::new());
        table.extend_from_rows(rows);
        table
    }

    /// Appends every column name not seen yet
    pub fn extend_from_rows(&mut self, rows: &[Row]) {
        let mut columns: IndexSet<String> = self.columns.drain(..).collect();
        for row in rows {
            for key in row.keys() {
                if !columns.contains(key) {
                    columns.insert(key.clone());
                }
            }
        }
        self.columns = columns.into_iter().collect();
    }

    /// Cell text of a row in column order, empty for Null or missing cells
    pub fn row_values(&self, row: &Row) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| match row.get(column) {
                None | Some(Value::Null) => String::new(),
                Some(value) => value.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Table;
    use crate::sql::types::{Row, Value};

    #[test]
    fn test_infer_columns() {
        let rows: Vec<Row> = vec![
            [("id", "1"), ("name", "a")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::from(v)))
                .collect(),
            [("id", "2"), ("age", "30")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::from(v)))
                .collect(),
        ];
        let table = Table::infer("t", &rows);
        assert_eq!(table.columns, vec!["id", "name", "age"]);
        assert_eq!(table.row_values(&rows[1]), vec!["2", "", "30"]);

        let mut with_header = Table::new("t", vec!["age".into(), "zip".into()]);
        with_header.extend_from_rows(&rows);
        assert_eq!(with_header.columns, vec!["age", "zip", "id", "name"]);
    }
}
