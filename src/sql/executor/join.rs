use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        engine::TableSource,
        parser::ast::{Field, JoinSpec},
        schema::Table,
        types::{Row, Value, get_value},
    },
};

use super::{Executor, ResultSet};

/// Bare column of a `table.column` reference
fn column_of(reference: &str) -> &str {
    reference.split_once('.').map_or(reference, |(_, column)| column)
}

/// Splits a select-list name into table and column; unqualified names belong
/// to the base table
fn split_field<'a>(field: &'a str, base_table: &'a str) -> (&'a str, &'a str) {
    field.split_once('.').unwrap_or((base_table, field))
}

/// Outer-join lookup: the qualified key when it holds a truthy value,
/// otherwise the bare column
fn lookup<'a>(row: &'a Row, reference: &str) -> Option<&'a Value> {
    row.get(reference)
        .filter(|v| v.is_truthy())
        .or_else(|| row.get(column_of(reference)))
}

/// Pairs every base row with every joined row whose ON columns are equal.
/// Only the plain column fields of the select list are emitted, `*` emits
/// every column of both sides qualified by table.
pub fn inner_join(
    base: &[Row],
    joined: &[Row],
    spec: &JoinSpec,
    base_table: &str,
    fields: &[Field],
) -> Vec<Row> {
    let left = column_of(&spec.condition.left);
    let right = column_of(&spec.condition.right);

    let mut rows = Vec::new();
    for lrow in base {
        for rrow in joined {
            if lrow.get(left) != rrow.get(right) {
                continue;
            }
            let mut row = Row::new();
            for field in fields {
                match field {
                    Field::Column(name) => {
                        let (table, column) = split_field(name, base_table);
                        let side = if table == base_table { lrow } else { rrow };
                        row.insert(name.clone(), get_value(side, column).clone());
                    }
                    Field::Wildcard => {
                        qualify_into(&mut row, lrow, base_table);
                        qualify_into(&mut row, rrow, &spec.table);
                    }
                    Field::Aggregate(..) => {}
                }
            }
            rows.push(row);
        }
    }
    rows
}

/// Every base row survives: one output row per matching joined row, or a
/// single row with the joined side Null when nothing matches.
pub fn left_join(
    base: &[Row],
    joined: &[Row],
    spec: &JoinSpec,
    base_table: &str,
    fields: &[Field],
) -> Vec<Row> {
    let mut rows = Vec::new();
    for lrow in base {
        let key = lookup(lrow, &spec.condition.left);
        let matches: Vec<&Row> = joined
            .iter()
            .filter(|r| lookup(r, &spec.condition.right) == key)
            .collect();
        if matches.is_empty() {
            rows.push(create_result_row(lrow, None, spec, base_table, fields));
            continue;
        }
        for rrow in matches {
            rows.push(create_result_row(lrow, Some(rrow), spec, base_table, fields));
        }
    }
    rows
}

/// Every joined row survives; an unmatched one is paired with a base row of
/// the first base row's shape holding only Nulls.
pub fn right_join(
    base: &[Row],
    joined: &[Row],
    spec: &JoinSpec,
    base_table: &str,
    fields: &[Field],
) -> Vec<Row> {
    let null_row: Row = base
        .first()
        .map(|row| row.keys().map(|k| (k.clone(), Value::Null)).collect())
        .unwrap_or_default();

    joined
        .iter()
        .map(|rrow| {
            let key = lookup(rrow, &spec.condition.right);
            let lrow = base
                .iter()
                .find(|l| lookup(l, &spec.condition.left) == key)
                .unwrap_or(&null_row);
            create_result_row(lrow, Some(rrow), spec, base_table, fields)
        })
        .collect()
}

/// Builds an outer-join output row: every base column prefixed with the base
/// table, overlaid by the select-list fields.
pub fn create_result_row(
    base_row: &Row,
    joined_row: Option<&Row>,
    spec: &JoinSpec,
    base_table: &str,
    fields: &[Field],
) -> Row {
    let mut row = Row::new();
    qualify_into(&mut row, base_row, base_table);

    for field in fields {
        match field {
            Field::Column(name) => {
                let (table, column) = split_field(name, base_table);
                let value = if table == base_table {
                    get_value(base_row, column).clone()
                } else {
                    joined_row.map_or(Value::Null, |r| get_value(r, column).clone())
                };
                row.insert(name.clone(), value);
            }
            Field::Wildcard => {
                if let Some(joined_row) = joined_row {
                    qualify_into(&mut row, joined_row, &spec.table);
                }
            }
            Field::Aggregate(..) => {}
        }
    }
    row
}

fn qualify_into(target: &mut Row, source: &Row, table: &str) {
    for (key, value) in source {
        target.insert(format!("{}.{}", table, key), value.clone());
    }
}

/// Runs both inputs and hands their rows to one of the join functions
fn join_inputs<S: TableSource>(
    left: Box<dyn Executor<S>>,
    right: Box<dyn Executor<S>>,
    tables: &mut S,
) -> Result<(Vec<Row>, Vec<Row>)> {
    if let ResultSet::Scan { rows: lrows, .. } = left.execute(tables)? {
        if let ResultSet::Scan { rows: rrows, .. } = right.execute(tables)? {
            return Ok((lrows, rrows));
        }
    }
    Err(Error::Internal("Unexpected result set".into()))
}

macro_rules! join_executor {
    ($(#[$doc:meta])* $name:ident, $func:ident) => {
        $(#[$doc])*
        pub struct $name<S: TableSource> {
            left: Box<dyn Executor<S>>,
            right: Box<dyn Executor<S>>,
            base_table: String,
            spec: JoinSpec,
            fields: Vec<Field>,
        }

        impl<S: TableSource> $name<S> {
            pub fn new(
                left: Box<dyn Executor<S>>,
                right: Box<dyn Executor<S>>,
                base_table: String,
                spec: JoinSpec,
                fields: Vec<Field>,
            ) -> Box<Self> {
                Box::new(Self {
                    left,
                    right,
                    base_table,
                    spec,
                    fields,
                })
            }
        }

        impl<S: TableSource> Executor<S> for $name<S> {
            fn execute(self: Box<Self>, tables: &mut S) -> Result<ResultSet> {
                let (lrows, rrows) = join_inputs(self.left, self.right, tables)?;
                let rows = $func(&lrows, &rrows, &self.spec, &self.base_table, &self.fields);
                debug!(
                    kind = stringify!($func),
                    table = %self.spec.table,
                    base = lrows.len(),
                    joined = rrows.len(),
                    output = rows.len(),
                    "applied join"
                );
                Ok(ResultSet::Scan {
                    columns: Table::infer(&self.base_table, &rows).columns,
                    rows,
                })
            }
        }
    };
}

join_executor!(
    /// INNER JOIN executor
    InnerJoin,
    inner_join
);
join_executor!(
    /// LEFT JOIN executor
    LeftJoin,
    left_join
);
join_executor!(
    /// RIGHT JOIN executor
    RightJoin,
    right_join
);

#[cfg(test)]
mod tests {
    use super::{create_result_row, inner_join, left_join, right_join};
    use crate::sql::{
        parser::ast::{Field, JoinCondition, JoinSpec, JoinType},
        types::{Row, Value},
    };

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), Value::from(*v))).collect()
    }

    fn students() -> Vec<Row> {
        vec![
            row(&[("id", "1"), ("name", "John")]),
            row(&[("id", "2"), ("name", "Jane")]),
            row(&[("id", "3"), ("name", "Bob")]),
        ]
    }

    fn enrollments() -> Vec<Row> {
        vec![
            row(&[("student_id", "1"), ("course", "Mathematics")]),
            row(&[("student_id", "1"), ("course", "Physics")]),
            row(&[("student_id", "2"), ("course", "Chemistry")]),
            row(&[("student_id", "5"), ("course", "Biology")]),
        ]
    }

    fn spec(join_type: JoinType) -> JoinSpec {
        JoinSpec {
            join_type,
            table: "enrollment".into(),
            condition: JoinCondition {
                left: "student.id".into(),
                right: "enrollment.student_id".into(),
            },
        }
    }

    fn fields() -> Vec<Field> {
        vec![
            Field::Column("student.name".into()),
            Field::Column("enrollment.course".into()),
        ]
    }

    fn column(rows: &[Row], name: &str) -> Vec<Value> {
        rows.iter().map(|r| r.get(name).cloned().unwrap_or(Value::Null)).collect()
    }

    #[test]
    fn test_inner_join() {
        let rows = inner_join(
            &students(),
            &enrollments(),
            &spec(JoinType::Inner),
            "student",
            &fields(),
        );
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            row(&[("student.name", "John"), ("enrollment.course", "Mathematics")])
        );
        assert_eq!(
            column(&rows, "student.name"),
            vec![Value::from("John"), Value::from("John"), Value::from("Jane")]
        );
    }

    #[test]
    fn test_inner_join_unqualified_reads_base() {
        let fields = vec![Field::Column("name".into()), Field::Column("enrollment.course".into())];
        let rows = inner_join(
            &students(),
            &enrollments(),
            &spec(JoinType::Inner),
            "student",
            &fields,
        );
        assert_eq!(rows[2], row(&[("name", "Jane"), ("enrollment.course", "Chemistry")]));
    }

    #[test]
    fn test_left_join() {
        let rows = left_join(
            &students(),
            &enrollments(),
            &spec(JoinType::Left),
            "student",
            &fields(),
        );
        // one row per match, unmatched base rows once with Null
        assert_eq!(rows.len(), 4);
        assert_eq!(
            column(&rows, "student.name"),
            vec![
                Value::from("John"),
                Value::from("John"),
                Value::from("Jane"),
                Value::from("Bob")
            ]
        );
        assert_eq!(
            column(&rows, "enrollment.course"),
            vec![
                Value::from("Mathematics"),
                Value::from("Physics"),
                Value::from("Chemistry"),
                Value::Null
            ]
        );
        // base columns are carried with the table prefix
        assert_eq!(rows[3].get("student.id"), Some(&Value::from("3")));
        assert_eq!(rows[3].get("student.name"), Some(&Value::from("Bob")));
    }

    #[test]
    fn test_left_join_every_match() {
        let base = vec![row(&[("id", "1"), ("name", "John")])];
        let joined = vec![
            row(&[("student_id", "1"), ("course", "Mathematics")]),
            row(&[("student_id", "1"), ("course", "Physics")]),
        ];
        let rows = left_join(&base, &joined, &spec(JoinType::Left), "student", &fields());
        assert_eq!(rows.len(), 2);
        assert_eq!(
            column(&rows, "enrollment.course"),
            vec![Value::from("Mathematics"), Value::from("Physics")]
        );
    }

    #[test]
    fn test_right_join() {
        let rows = right_join(
            &students(),
            &enrollments(),
            &spec(JoinType::Right),
            "student",
            &fields(),
        );
        assert_eq!(rows.len(), 4);
        assert_eq!(
            column(&rows, "student.name"),
            vec![
                Value::from("John"),
                Value::from("John"),
                Value::from("Jane"),
                Value::Null
            ]
        );
        assert_eq!(rows[3].get("student.id"), Some(&Value::Null));
        assert_eq!(rows[3].get("enrollment.course"), Some(&Value::from("Biology")));

        // an empty base side still yields every joined row
        let rows = right_join(&[], &enrollments(), &spec(JoinType::Right), "student", &fields());
        assert_eq!(column(&rows, "student.name"), vec![Value::Null; 4]);
    }

    #[test]
    fn test_create_result_row_wildcard() {
        let base = row(&[("id", "1")]);
        let joined = row(&[("student_id", "1"), ("course", "Physics")]);
        let result = create_result_row(
            &base,
            Some(&joined),
            &spec(JoinType::Left),
            "student",
            &[Field::Wildcard],
        );
        assert_eq!(
            result,
            row(&[
                ("student.id", "1"),
                ("enrollment.student_id", "1"),
                ("enrollment.course", "Physics")
            ])
        );
    }
}
