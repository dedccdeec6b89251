use std::fmt::Display;

use prettytable::{Cell, Row as TableRow, Table, format};

use crate::sql::{
    engine::TableSource,
    executor::{
        agg::Aggregate,
        condition::Filter,
        join::{InnerJoin, LeftJoin, RightJoin},
        mutation::{Delete, Insert},
        query::{Distinct, Limit, Order, Projection, Scan},
    },
    parser::ast::JoinType,
    plan::Node,
    types::{Row, get_value},
};
use crate::error::Result;

pub mod agg;
pub mod condition;
pub mod join;
mod mutation;
mod query;

/// SQL executor trait
pub trait Executor<S: TableSource> {
    fn execute(self: Box<Self>, tables: &mut S) -> Result<ResultSet>;
}

/// Builds an executor from a plan node
///
/// The `'static` bound is required for trait object usage in recursive executor building.
impl<S: TableSource + 'static> dyn Executor<S> {
    pub fn build(node: Node) -> Box<dyn Executor<S>> {
        match node {
            Node::Scan { table_name } => Scan::new(table_name),
            Node::Join {
                left,
                right,
                base_table,
                join,
                fields,
            } => {
                let left = Self::build(*left);
                let right = Self::build(*right);
                match join.join_type {
                    JoinType::Inner => InnerJoin::new(left, right, base_table, join, fields),
                    JoinType::Left => LeftJoin::new(left, right, base_table, join, fields),
                    JoinType::Right => RightJoin::new(left, right, base_table, join, fields),
                }
            }
            Node::Filter { source, predicates } => Filter::new(Self::build(*source), predicates),
            Node::Aggregate {
                source,
                group_by,
                fields,
                without_group_by,
            } => Aggregate::new(Self::build(*source), group_by, fields, without_group_by),
            Node::Order { source, order_by } => Order::new(Self::build(*source), order_by),
            Node::Distinct { source, fields } => Distinct::new(Self::build(*source), fields),
            Node::Limit { source, limit } => Limit::new(Self::build(*source), limit),
            Node::Projection { source, fields } => Projection::new(Self::build(*source), fields),
            Node::Insert {
                table_name,
                columns,
                values,
            } => Insert::new(table_name, columns, values),
            Node::Delete {
                table_name,
                source,
                predicates,
            } => Delete::new(table_name, Self::build(*source), predicates),
        }
    }
}

/// Execution result set
#[derive(Debug, PartialEq)]
pub enum ResultSet {
    Scan { columns: Vec<String>, rows: Vec<Row> },
    Insert { count: usize },
    Delete { count: usize },
}

impl Display for ResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultSet::Insert { count } => write!(f, "INSERT {} rows", count),
            ResultSet::Delete { count } => write!(f, "DELETE {} rows", count),
            ResultSet::Scan { columns, rows } => {
                if !columns.is_empty() {
                    let mut table = Table::new();
                    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
                    table.set_titles(TableRow::new(columns.iter().map(|c| Cell::new(c)).collect()));
                    for row in rows {
                        let cells = columns
                            .iter()
                            .map(|c| Cell::new(&get_value(row, c).to_string()))
                            .collect();
                        table.add_row(TableRow::new(cells));
                    }
                    // the rendered table ends with a newline
                    write!(f, "{}", table)?;
                }
                write!(f, "({} rows)", rows.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ResultSet;
    use crate::sql::types::{Row, Value};

    #[test]
    fn test_display() {
        let row: Row = [("name", "Alice"), ("age", "30")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::from(v)))
            .collect();
        let result = ResultSet::Scan {
            columns: vec!["name".into(), "age".into(), "city".into()],
            rows: vec![row],
        };
        assert_eq!(
            result.to_string(),
            "+-------+-----+------+\n\
             | name  | age | city |\n\
             +-------+-----+------+\n\
             | Alice | 30  | NULL |\n\
             +-------+-----+------+\n\
             (1 rows)"
        );
        assert_eq!(ResultSet::Insert { count: 1 }.to_string(), "INSERT 1 rows");

        let empty = ResultSet::Scan { columns: vec![], rows: vec![] };
        assert_eq!(empty.to_string(), "(0 rows)");
    }
}
