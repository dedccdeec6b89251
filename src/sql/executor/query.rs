use std::{cmp::Ordering, collections::HashSet};

use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        engine::TableSource,
        executor::ResultSet,
        parser::ast::{Field, OrderDirection},
        schema::Table,
        types::{Row, Value, get_value},
    },
};

use super::Executor;

/// Table scan executor - loads every row of a table
pub struct Scan {
    table_name: String,
}

impl Scan {
    pub fn new(table_name: String) -> Box<Self> {
        Box::new(Self { table_name })
    }
}

impl<S: TableSource> Executor<S> for Scan {
    fn execute(self: Box<Self>, tables: &mut S) -> Result<ResultSet> {
        let rows = tables.load(&self.table_name)?;
        debug!(table = %self.table_name, rows = rows.len(), "scanned table");
        Ok(ResultSet::Scan {
            columns: Table::infer(self.table_name, &rows).columns,
            rows,
        })
    }
}

/// ORDER BY executor - stable sort by the listed columns
pub struct Order<S: TableSource> {
    source: Box<dyn Executor<S>>,
    order_by: Vec<(String, OrderDirection)>,
}

impl<S: TableSource> Order<S> {
    pub fn new(source: Box<dyn Executor<S>>, order_by: Vec<(String, OrderDirection)>) -> Box<Self> {
        Box::new(Self { source, order_by })
    }
}

impl<S: TableSource> Executor<S> for Order<S> {
    fn execute(self: Box<Self>, tables: &mut S) -> Result<ResultSet> {
        match self.source.execute(tables)? {
            ResultSet::Scan { columns, rows } => {
                // Normalize sort keys once, numbers then compare as numbers
                let mut keyed: Vec<(Vec<Value>, Row)> = rows
                    .into_iter()
                    .map(|row| {
                        let keys: Vec<Value> = self
                            .order_by
                            .iter()
                            .map(|(column, _)| get_value(&row, column).normalize())
                            .collect();
                        (keys, row)
                    })
                    .collect();

                // Multi-column sort: the first non-equal key decides, with its
                // direction applied
                keyed.sort_by(|(x, _), (y, _)| {
                    for ((a, b), (_, direction)) in x.iter().zip(y).zip(&self.order_by) {
                        match a.sort_cmp(b) {
                            Ordering::Equal => {}
                            o => {
                                return if *direction == OrderDirection::Asc {
                                    o
                                } else {
                                    o.reverse()
                                };
                            }
                        }
                    }
                    Ordering::Equal
                });

                Ok(ResultSet::Scan {
                    columns,
                    rows: keyed.into_iter().map(|(_, row)| row).collect(),
                })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

/// DISTINCT executor - keeps the first row of each distinct combination of
/// the selected field values
pub struct Distinct<S: TableSource> {
    source: Box<dyn Executor<S>>,
    fields: Vec<Field>,
}

impl<S: TableSource> Distinct<S> {
    pub fn new(source: Box<dyn Executor<S>>, fields: Vec<Field>) -> Box<Self> {
        Box::new(Self { source, fields })
    }
}

fn distinct_key(row: &Row, fields: &[Field]) -> Vec<Option<String>> {
    let cell = |value: &Value| match value {
        Value::Null => None,
        value => Some(value.to_string()),
    };
    fields
        .iter()
        .flat_map(|field| match field {
            Field::Wildcard => row.values().map(cell).collect::<Vec<_>>(),
            field => vec![cell(get_value(row, &field.name()))],
        })
        .collect()
}

impl<S: TableSource> Executor<S> for Distinct<S> {
    fn execute(self: Box<Self>, tables: &mut S) -> Result<ResultSet> {
        match self.source.execute(tables)? {
            ResultSet::Scan { columns, mut rows } => {
                let mut seen = HashSet::new();
                rows.retain(|row| seen.insert(distinct_key(row, &self.fields)));
                Ok(ResultSet::Scan { columns, rows })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

/// LIMIT executor - restricts the number of rows returned
pub struct Limit<S: TableSource> {
    source: Box<dyn Executor<S>>,
    limit: usize,
}

impl<S: TableSource> Limit<S> {
    pub fn new(source: Box<dyn Executor<S>>, limit: usize) -> Box<Self> {
        Box::new(Self { source, limit })
    }
}

impl<S: TableSource> Executor<S> for Limit<S> {
    fn execute(self: Box<Self>, tables: &mut S) -> Result<ResultSet> {
        match self.source.execute(tables)? {
            ResultSet::Scan { columns, rows } => Ok(ResultSet::Scan {
                columns,
                rows: rows.into_iter().take(self.limit).collect(),
            }),
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

/// Projection executor - keeps only the selected fields of each row
pub struct Projection<S: TableSource> {
    source: Box<dyn Executor<S>>,
    fields: Vec<Field>,
}

impl<S: TableSource> Projection<S> {
    pub fn new(source: Box<dyn Executor<S>>, fields: Vec<Field>) -> Box<Self> {
        Box::new(Self { source, fields })
    }
}

impl<S: TableSource> Executor<S> for Projection<S> {
    fn execute(self: Box<Self>, tables: &mut S) -> Result<ResultSet> {
        match self.source.execute(tables)? {
            ResultSet::Scan { columns, rows } => {
                let rows = rows.iter().map(|row| project(row, &self.fields)).collect();
                let columns = self
                    .fields
                    .iter()
                    .flat_map(|field| match field {
                        Field::Wildcard => columns.clone(),
                        field => vec![field.name()],
                    })
                    .collect();
                Ok(ResultSet::Scan { columns, rows })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}

/// Builds the output row of the selected fields, missing columns become Null
pub fn project(row: &Row, fields: &[Field]) -> Row {
    let mut projected = Row::new();
    for field in fields {
        match field {
            Field::Wildcard => projected.extend(row.iter().map(|(k, v)| (k.clone(), v.clone()))),
            field => {
                let name = field.name();
                let value = get_value(row, &name).clone();
                projected.insert(name, value);
            }
        }
    }
    projected
}
