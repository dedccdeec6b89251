use crate::{
    error::Result,
    sql::{
        engine::TableSource,
        executor::{Executor, ResultSet},
        parser::ast::{Condition, Field, JoinSpec, OrderDirection, Statement},
    },
};

mod planner;

use planner::Planner;

/// Execution plan node, a tree evaluated bottom-up
#[derive(Debug, PartialEq)]
pub enum Node {
    Scan {
        table_name: String,
    },
    Join {
        left: Box<Node>,
        right: Box<Node>,
        base_table: String,
        join: JoinSpec,
        fields: Vec<Field>,
    },
    Filter {
        source: Box<Node>,
        predicates: Vec<Condition>,
    },
    Aggregate {
        source: Box<Node>,
        group_by: Option<Vec<String>>,
        fields: Vec<Field>,
        without_group_by: bool,
    },
    Order {
        source: Box<Node>,
        order_by: Vec<(String, OrderDirection)>,
    },
    Distinct {
        source: Box<Node>,
        fields: Vec<Field>,
    },
    Limit {
        source: Box<Node>,
        limit: usize,
    },
    Projection {
        source: Box<Node>,
        fields: Vec<Field>,
    },
    Insert {
        table_name: String,
        columns: Vec<String>,
        values: Vec<String>,
    },
    Delete {
        table_name: String,
        source: Box<Node>,
        predicates: Vec<Condition>,
    },
}

/// Execution plan
#[derive(Debug, PartialEq)]
pub struct Plan(pub Node);

impl Plan {
    pub fn build(stmt: Statement) -> Result<Self> {
        Planner::new().build(stmt)
    }

    pub fn execute<S: TableSource + 'static>(self, tables: &mut S) -> Result<ResultSet> {
        <dyn Executor<S>>::build(self.0).execute(tables)
    }
}
