use indexmap::IndexMap;
use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        engine::TableSource,
        parser::ast::{AggregateArg, AggregateFunc, Field},
        types::{Row, Value, get_value},
    },
};

use super::{Executor, ResultSet};

/// Group key shared by every row when aggregating without GROUP BY
const AGGREGATE_KEY: &str = "AGGREGATE";

/// Aggregate executor - groups rows and computes COUNT, SUM, AVG, MIN, MAX
pub struct Aggregate<S: TableSource> {
    source: Box<dyn Executor<S>>,
    group_by: Option<Vec<String>>,
    fields: Vec<Field>,
    without_group_by: bool,
}

impl<S: TableSource> Aggregate<S> {
    pub fn new(
        source: Box<dyn Executor<S>>,
        group_by: Option<Vec<String>>,
        fields: Vec<Field>,
        without_group_by: bool,
    ) -> Box<Self> {
        Box::new(Self {
            source,
            group_by,
            fields,
            without_group_by,
        })
    }
}

impl<S: TableSource> Executor<S> for Aggregate<S> {
    fn execute(self: Box<Self>, tables: &mut S) -> Result<ResultSet> {
        if let ResultSet::Scan { columns, rows } = self.source.execute(tables)? {
            let rows = aggregate(&rows, self.group_by.as_deref(), &self.fields, self.without_group_by);
            let columns = self
                .fields
                .iter()
                .flat_map(|field| match field {
                    Field::Wildcard => columns.clone(),
                    field => vec![field.name()],
                })
                .collect();
            debug!(groups = rows.len(), "applied aggregation");
            return Ok(ResultSet::Scan { columns, rows });
        }
        Err(Error::Internal("Unexpected result set".into()))
    }
}

/// Partitions rows into groups and emits one summary row per group, in the
/// order the groups first appear.
///
/// Without GROUP BY every row lands in a single group, which exists even
/// when there are no rows at all, so `COUNT(*)` over nothing yields `0`.
pub fn aggregate(
    rows: &[Row],
    group_by: Option<&[String]>,
    fields: &[Field],
    without_group_by: bool,
) -> Vec<Row> {
    let mut groups: IndexMap<String, Vec<&Row>> = IndexMap::new();
    if group_by.is_none() {
        groups.insert(implicit_key(without_group_by), Vec::new());
    }
    for row in rows {
        let key = match group_by {
            Some(columns) => group_key(row, columns),
            None => implicit_key(without_group_by),
        };
        groups.entry(key).or_default().push(row);
    }

    groups
        .values()
        .map(|group| summarize(group, fields))
        .collect()
}

fn implicit_key(without_group_by: bool) -> String {
    if without_group_by {
        AGGREGATE_KEY.to_string()
    } else {
        String::new()
    }
}

/// Joins the grouping column values with `|`, Null counting as empty
fn group_key(row: &Row, columns: &[String]) -> String {
    columns
        .iter()
        .map(|column| match get_value(row, column) {
            Value::Null => String::new(),
            value => value.to_string(),
        })
        .collect::<Vec<_>>()
        .join("|")
}

fn summarize(group: &[&Row], fields: &[Field]) -> Row {
    let mut summary = Row::new();
    for field in fields {
        match field {
            Field::Aggregate(func, arg) => {
                let value = <dyn Calculator>::build(*func).calc(arg, group);
                summary.insert(field.name(), value);
            }
            Field::Column(name) => {
                let value = group.first().map_or(Value::Null, |row| get_value(row, name).clone());
                summary.insert(name.clone(), value);
            }
            Field::Wildcard => {
                if let Some(first) = group.first() {
                    summary.extend(first.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }
    }
    summary
}

/// Trait for aggregate function calculations
pub trait Calculator {
    fn calc(&self, arg: &AggregateArg, rows: &[&Row]) -> Value;
}

impl dyn Calculator {
    /// Runtime dispatch to the calculator of a function
    pub fn build(func: AggregateFunc) -> Box<dyn Calculator> {
        match func {
            AggregateFunc::Count => Count::new(),
            AggregateFunc::Sum => Sum::new(),
            AggregateFunc::Min => Min::new(),
            AggregateFunc::Max => Max::new(),
            AggregateFunc::Avg => Avg::new(),
        }
    }
}

/// Values of the column that read as numbers, other cells are skipped
fn numbers<'a>(arg: &'a AggregateArg, rows: &'a [&'a Row]) -> impl Iterator<Item = f64> + 'a {
    let column = match arg {
        AggregateArg::All => "*",
        AggregateArg::Column(column) => column.as_str(),
    };
    rows.iter().filter_map(move |row| get_value(row, column).as_f64())
}

/// COUNT - `*` counts rows, a column counts its non-null cells
pub struct Count;

impl Count {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Count {
    fn calc(&self, arg: &AggregateArg, rows: &[&Row]) -> Value {
        let count = match arg {
            AggregateArg::All => rows.len(),
            AggregateArg::Column(column) => rows
                .iter()
                .filter(|row| !get_value(row, column).is_null())
                .count(),
        };
        Value::Number(count as f64)
    }
}

/// MIN - smallest numeric value, Null when there is none
pub struct Min;

impl Min {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Min {
    fn calc(&self, arg: &AggregateArg, rows: &[&Row]) -> Value {
        numbers(arg, rows)
            .reduce(f64::min)
            .map_or(Value::Null, Value::Number)
    }
}

/// MAX - largest numeric value, Null when there is none
pub struct Max;

impl Max {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Max {
    fn calc(&self, arg: &AggregateArg, rows: &[&Row]) -> Value {
        numbers(arg, rows)
            .reduce(f64::max)
            .map_or(Value::Null, Value::Number)
    }
}

/// SUM - sum of numeric values, 0 when there are none
pub struct Sum;

impl Sum {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Sum {
    fn calc(&self, arg: &AggregateArg, rows: &[&Row]) -> Value {
        Value::Number(numbers(arg, rows).sum())
    }
}

/// AVG - numeric sum over the count of non-null cells, so text cells lower
/// the mean. 0 when the column has no non-null cell.
pub struct Avg;

impl Avg {
    fn new() -> Box<Self> {
        Box::new(Self {})
    }
}

impl Calculator for Avg {
    fn calc(&self, arg: &AggregateArg, rows: &[&Row]) -> Value {
        let count = match Count.calc(arg, rows) {
            Value::Number(n) => n,
            _ => 0.0,
        };
        if count == 0.0 {
            return Value::Number(0.0);
        }
        Value::Number(numbers(arg, rows).sum::<f64>() / count)
    }
}

#[cfg(test)]
mod tests {
    use super::aggregate;
    use crate::sql::{
        parser::ast::{AggregateArg, AggregateFunc, Field},
        types::{Row, Value},
    };

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), Value::from(*v))).collect()
    }

    fn agg(func: AggregateFunc, column: &str) -> Field {
        Field::Aggregate(func, AggregateArg::Column(column.into()))
    }

    fn count_all() -> Field {
        Field::Aggregate(AggregateFunc::Count, AggregateArg::All)
    }

    fn people() -> Vec<Row> {
        vec![
            row(&[("age", "30"), ("name", "John")]),
            row(&[("age", "25"), ("name", "Jane")]),
            row(&[("age", "30"), ("name", "Bob")]),
        ]
    }

    #[test]
    fn test_group_by_count() {
        let fields = vec![Field::Column("age".into()), count_all()];
        let rows = aggregate(&people(), Some(&["age".to_string()][..]), &fields, false);
        assert_eq!(
            rows,
            vec![
                [("age".to_string(), Value::from("30")), ("COUNT(*)".into(), Value::Number(2.0))]
                    .into_iter()
                    .collect::<Row>(),
                [("age".to_string(), Value::from("25")), ("COUNT(*)".into(), Value::Number(1.0))]
                    .into_iter()
                    .collect::<Row>(),
            ]
        );
    }

    #[test]
    fn test_without_group_by() {
        let fields = vec![
            count_all(),
            agg(AggregateFunc::Sum, "age"),
            agg(AggregateFunc::Avg, "age"),
            agg(AggregateFunc::Min, "age"),
            agg(AggregateFunc::Max, "age"),
        ];
        let rows = aggregate(&people(), None, &fields, true);
        assert_eq!(rows.len(), 1);
        let summary = &rows[0];
        assert_eq!(summary["COUNT(*)"], Value::Number(3.0));
        assert_eq!(summary["SUM(age)"], Value::Number(85.0));
        assert_eq!(summary["AVG(age)"], Value::Number(85.0 / 3.0));
        assert_eq!(summary["MIN(age)"], Value::Number(25.0));
        assert_eq!(summary["MAX(age)"], Value::Number(30.0));
    }

    #[test]
    fn test_empty_input() {
        let fields = vec![
            count_all(),
            agg(AggregateFunc::Avg, "age"),
            agg(AggregateFunc::Sum, "age"),
            agg(AggregateFunc::Min, "age"),
        ];
        let rows = aggregate(&[], None, &fields, true);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["COUNT(*)"], Value::Number(0.0));
        assert_eq!(rows[0]["AVG(age)"], Value::Number(0.0));
        assert_eq!(rows[0]["SUM(age)"], Value::Number(0.0));
        assert_eq!(rows[0]["MIN(age)"], Value::Null);

        // grouped aggregation over nothing has no groups
        let rows = aggregate(&[], Some(&["age".to_string()][..]), &fields, false);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_non_numeric_and_missing() {
        let rows = vec![
            row(&[("score", "10"), ("name", "a")]),
            row(&[("score", "n/a"), ("name", "b")]),
            row(&[("name", "c")]),
            row(&[("score", "7.5kg"), ("name", "d")]),
        ];
        let fields = vec![
            agg(AggregateFunc::Count, "score"),
            agg(AggregateFunc::Sum, "score"),
            agg(AggregateFunc::Avg, "score"),
            agg(AggregateFunc::Max, "score"),
            agg(AggregateFunc::Min, "name"),
        ];
        let summary = &aggregate(&rows, None, &fields, true)[0];
        // text cells are counted, missing ones are not
        assert_eq!(summary["COUNT(score)"], Value::Number(3.0));
        // numeric prefixes count, other text is skipped
        assert_eq!(summary["SUM(score)"], Value::Number(17.5));
        // the mean divides by every non-null cell, numeric or not
        assert_eq!(summary["AVG(score)"], Value::Number(17.5 / 3.0));
        assert_eq!(summary["MAX(score)"], Value::Number(10.0));
        assert_eq!(summary["MIN(name)"], Value::Null);
    }

    #[test]
    fn test_avg_counts_text_cells() {
        let rows = vec![row(&[("score", "10")]), row(&[("score", "n/a")])];
        let fields = vec![agg(AggregateFunc::Avg, "score")];
        let summary = &aggregate(&rows, None, &fields, true)[0];
        assert_eq!(summary["AVG(score)"], Value::Number(5.0));

        // only text cells: nothing numeric to sum
        let rows = vec![row(&[("score", "n/a")])];
        let summary = &aggregate(&rows, None, &fields, true)[0];
        assert_eq!(summary["AVG(score)"], Value::Number(0.0));
    }

    #[test]
    fn test_group_by_count_and_sum() {
        let rows = vec![
            row(&[("g", "a"), ("x", "1")]),
            row(&[("g", "a"), ("x", "2")]),
            row(&[("g", "b"), ("x", "5")]),
        ];
        let fields = vec![Field::Column("g".into()), count_all(), agg(AggregateFunc::Sum, "x")];
        let result = aggregate(&rows, Some(&["g".to_string()][..]), &fields, false);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0]["g"], Value::from("a"));
        assert_eq!(result[0]["COUNT(*)"], Value::Number(2.0));
        assert_eq!(result[0]["SUM(x)"], Value::Number(3.0));
        assert_eq!(result[1]["g"], Value::from("b"));
        assert_eq!(result[1]["COUNT(*)"], Value::Number(1.0));
        assert_eq!(result[1]["SUM(x)"], Value::Number(5.0));
    }

    #[test]
    fn test_multi_column_groups() {
        let rows = vec![
            row(&[("dept", "eng"), ("level", "1"), ("pay", "10")]),
            row(&[("dept", "eng"), ("level", "2"), ("pay", "20")]),
            row(&[("dept", "ops"), ("level", "1"), ("pay", "5")]),
            row(&[("dept", "eng"), ("level", "1"), ("pay", "30")]),
        ];
        let fields = vec![
            Field::Column("dept".into()),
            Field::Column("level".into()),
            agg(AggregateFunc::Sum, "pay"),
        ];
        let result = aggregate(
            &rows,
            Some(&["dept".to_string(), "level".to_string()][..]),
            &fields,
            false,
        );
        let sums: Vec<&Value> = result.iter().map(|r| &r["SUM(pay)"]).collect();
        assert_eq!(
            sums,
            vec![&Value::Number(40.0), &Value::Number(20.0), &Value::Number(5.0)]
        );
    }
}
