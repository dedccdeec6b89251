use std::cmp::Ordering;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        engine::TableSource,
        parser::ast::{Condition, Operator},
        types::{Row, Value, get_value},
    },
};

use super::{Executor, ResultSet};

/// A WHERE clause prepared for repeated evaluation against rows
pub struct Predicate {
    field: String,
    operator: Operator,
    matcher: Matcher,
}

enum Matcher {
    /// LIKE pattern, matched against the raw cell text
    Like(Regex),
    /// Normalized right-hand side of a comparison
    Compare(Value),
}

impl Predicate {
    pub fn compile(condition: &Condition) -> Result<Self> {
        let matcher = match condition.operator {
            Operator::Like => Matcher::Like(like_to_regex(&condition.value)?),
            _ => Matcher::Compare(Value::parse(&condition.value)),
        };
        Ok(Self {
            field: condition.field.clone(),
            operator: condition.operator,
            matcher,
        })
    }

    /// Decides whether the row satisfies the clause
    pub fn matches(&self, row: &Row) -> bool {
        let cell = get_value(row, &self.field);
        match &self.matcher {
            // LIKE sees the value exactly as stored, without normalization
            Matcher::Like(regex) => match cell {
                Value::Null => false,
                Value::String(s) => regex.is_match(s),
                Value::Number(_) => regex.is_match(&cell.to_string()),
            },
            Matcher::Compare(value) => compare(self.operator, &cell.normalize(), value),
        }
    }
}

/// Compares a normalized cell with a normalized literal. Values of different
/// kinds, and Null, are never equal to each other and never ordered.
fn compare(operator: Operator, cell: &Value, value: &Value) -> bool {
    let ordering = cell.compare(value);
    match operator {
        Operator::Equal => cell == value,
        Operator::NotEqual => cell != value,
        Operator::GreaterThan => ordering == Some(Ordering::Greater),
        Operator::GreaterThanOrEqual => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        Operator::LessThan => ordering == Some(Ordering::Less),
        Operator::LessThanOrEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        Operator::Like => false,
    }
}

/// Translates a LIKE pattern into an anchored, case-insensitive regex.
/// `%` matches any sequence, `_` any single character, everything else is literal.
pub fn like_to_regex(pattern: &str) -> Result<Regex> {
    let mut regex = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            _ => regex.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4]))),
        }
    }
    regex.push('$');

    Ok(RegexBuilder::new(&regex)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()?)
}

/// Decides whether a row satisfies a single clause
pub fn evaluate(row: &Row, condition: &Condition) -> Result<bool> {
    Ok(Predicate::compile(condition)?.matches(row))
}

/// Compiles every clause of a conjunctive WHERE
pub fn compile_all(conditions: &[Condition]) -> Result<Vec<Predicate>> {
    conditions.iter().map(Predicate::compile).collect()
}

/// True when the row satisfies every predicate
pub fn matches_all(row: &Row, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|p| p.matches(row))
}

/// WHERE executor - keeps rows satisfying every clause
pub struct Filter<S: TableSource> {
    source: Box<dyn Executor<S>>,
    predicates: Vec<Condition>,
}

impl<S: TableSource> Filter<S> {
    pub fn new(source: Box<dyn Executor<S>>, predicates: Vec<Condition>) -> Box<Self> {
        Box::new(Self { source, predicates })
    }
}

impl<S: TableSource> Executor<S> for Filter<S> {
    fn execute(self: Box<Self>, tables: &mut S) -> Result<ResultSet> {
        match self.source.execute(tables)? {
            ResultSet::Scan { columns, mut rows } => {
                let predicates = compile_all(&self.predicates)?;
                let before = rows.len();
                rows.retain(|row| matches_all(row, &predicates));
                debug!(before, after = rows.len(), "applied WHERE");
                Ok(ResultSet::Scan { columns, rows })
            }
            _ => Err(Error::Internal("Unexpected result set".into())),
        }
    }
}
