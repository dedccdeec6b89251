use std::fmt::Display;

use crate::error::{Error, Result};

/// Abstract Syntax Tree (AST) node definitions for SQL statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SELECT statement
    Select {
        fields: Vec<Field>,
        table: String,
        join: Option<JoinSpec>,
        /// Conjunctive WHERE clauses, empty when absent
        where_clauses: Vec<Condition>,
        group_by: Option<Vec<String>>,
        order_by: Option<Vec<(String, OrderDirection)>>,
        limit: Option<usize>,
        distinct: bool,
    },
    /// INSERT statement, values are raw text with quotes removed
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<String>,
    },
    /// DELETE statement
    Delete {
        table: String,
        where_clauses: Vec<Condition>,
    },
}

impl Statement {
    /// True when the select list holds an aggregate and there is no GROUP BY,
    /// which collapses every filtered row into one summary row
    pub fn has_aggregate_without_group_by(&self) -> bool {
        match self {
            Statement::Select { fields, group_by, .. } => {
                group_by.is_none() && fields.iter().any(Field::is_aggregate)
            }
            _ => false,
        }
    }
}

/// One entry of the select list
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// `*`
    Wildcard,
    /// Column reference, bare (`name`) or qualified (`student.name`)
    Column(String),
    /// Aggregate function over a column or `*`
    Aggregate(AggregateFunc, AggregateArg),
}

impl Field {
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Field::Aggregate(..))
    }

    /// Output column name of the field, e.g. `COUNT(*)`
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Wildcard => write!(f, "*"),
            Field::Column(name) => write!(f, "{}", name),
            Field::Aggregate(func, arg) => write!(f, "{}({})", func, arg),
        }
    }
}

/// Supported aggregate functions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    /// Case-insensitive lookup of a function name
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_uppercase().as_ref() {
            "COUNT" => AggregateFunc::Count,
            "SUM" => AggregateFunc::Sum,
            "AVG" => AggregateFunc::Avg,
            "MIN" => AggregateFunc::Min,
            "MAX" => AggregateFunc::Max,
            _ => return None,
        })
    }
}

impl Display for AggregateFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
        })
    }
}

/// Argument of an aggregate function
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateArg {
    /// `*`, every row
    All,
    Column(String),
}

impl Display for AggregateArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateArg::All => write!(f, "*"),
            AggregateArg::Column(name) => write!(f, "{}", name),
        }
    }
}

/// `<type> JOIN <table> ON <left> = <right>`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub join_type: JoinType,
    pub table: String,
    pub condition: JoinCondition,
}

/// Join ON condition, both sides written as `table.column`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinCondition {
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

/// Sort direction (ascending or descending)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// A single `field operator value` clause
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    /// Literal as written in the statement, possibly still quoted. LIKE
    /// patterns already have their quotes removed.
    pub value: String,
}

/// Comparison operators allowed in WHERE clauses
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
}

impl Operator {
    /// Maps operator text to an operator, rejecting anything outside
    /// `=, >, <, >=, <=, !=, LIKE`
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        Ok(match symbol.to_uppercase().as_ref() {
            "=" => Operator::Equal,
            "!=" => Operator::NotEqual,
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterThanOrEqual,
            "<" => Operator::LessThan,
            "<=" => Operator::LessThanOrEqual,
            "LIKE" => Operator::Like,
            _ => return Err(Error::UnsupportedOperator(symbol.to_string())),
        })
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::Like => "LIKE",
        })
    }
}
