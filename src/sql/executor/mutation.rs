use tracing::info;

use crate::{
    error::{Error, Result},
    sql::{
        engine::TableSource,
        executor::{
            ResultSet,
            condition::{compile_all, matches_all},
        },
        parser::ast::Condition,
        types::{Row, Value},
    },
};

use super::Executor;

/// INSERT executor
pub struct Insert {
    table_name: String,
    columns: Vec<String>,
    values: Vec<String>,
}

impl Insert {
    pub fn new(table_name: String, columns: Vec<String>, values: Vec<String>) -> Box<Self> {
        Box::new(Self {
            table_name,
            columns,
            values,
        })
    }
}

// Pairs column names with values positionally:
// INSERT INTO student (id, name) VALUES (4, 'Alice')  =>  {id: "4", name: "Alice"}
fn make_row(columns: &[String], values: &[String]) -> Result<Row> {
    if columns.len() != values.len() {
        return Err(Error::ColumnValueMismatch {
            columns: columns.len(),
            values: values.len(),
        });
    }
    Ok(columns
        .iter()
        .zip(values)
        .map(|(column, value)| (column.clone(), Value::String(value.clone())))
        .collect())
}

impl<S: TableSource> Executor<S> for Insert {
    fn execute(self: Box<Self>, tables: &mut S) -> Result<ResultSet> {
        let row = make_row(&self.columns, &self.values)?;
        tables.append(&self.table_name, row)?;
        info!(table = %self.table_name, "inserted 1 row");
        Ok(ResultSet::Insert { count: 1 })
    }
}

/// DELETE executor
pub struct Delete<S: TableSource> {
    table_name: String,
    source: Box<dyn Executor<S>>,
    predicates: Vec<Condition>,
}

impl<S: TableSource> Delete<S> {
    pub fn new(
        table_name: String,
        source: Box<dyn Executor<S>>,
        predicates: Vec<Condition>,
    ) -> Box<Self> {
        Box::new(Self {
            table_name,
            source,
            predicates,
        })
    }
}

impl<S: TableSource> Executor<S> for Delete<S> {
    fn execute(self: Box<Self>, tables: &mut S) -> Result<ResultSet> {
        match self.source.execute(tables)? {
            ResultSet::Scan { mut rows, .. } => {
                let before = rows.len();
                if self.predicates.is_empty() {
                    // no WHERE empties the table
                    rows.clear();
                } else {
                    let predicates = compile_all(&self.predicates)?;
                    rows.retain(|row| !matches_all(row, &predicates));
                }
                let count = before - rows.len();

                tables.save(&self.table_name, rows)?;
                info!(table = %self.table_name, count, "deleted rows");
                Ok(ResultSet::Delete { count })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}
