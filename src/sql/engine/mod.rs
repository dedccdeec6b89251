use tracing::debug;

use crate::error::{Error, Result};

use super::{executor::ResultSet, parser::Parser, plan::Plan, types::Row};

pub mod csv;
pub mod kv;

/// Where tables live: whole-table reads and writes of rows.
///
/// DELETE and INSERT are read-then-rewrite cycles on top of `load` and
/// `save` with no locking, so two writers interleaving on the same table can
/// lose an update.
pub trait TableSource {
    /// Reads every row of a table, `Error::NotFound` when it does not exist
    fn load(&mut self, table_name: &str) -> Result<Vec<Row>>;

    /// Replaces the full contents of a table, creating it if needed
    fn save(&mut self, table_name: &str, rows: Vec<Row>) -> Result<()>;

    /// Adds one row at the end of a table. A missing table counts as empty.
    fn append(&mut self, table_name: &str, row: Row) -> Result<()> {
        let mut rows = match self.load(table_name) {
            Ok(rows) => rows,
            Err(Error::NotFound(_)) => Vec::new(),
            Err(err) => return Err(err),
        };
        rows.push(row);
        self.save(table_name, rows)
    }
}

/// SQL session for executing statements against a table source
pub struct Session<S: TableSource> {
    tables: S,
}

impl<S: TableSource + 'static> Session<S> {
    pub fn new(tables: S) -> Self {
        Self { tables }
    }

    /// Parses, plans and runs one statement. Every failure comes back tagged
    /// with the kind of statement that was being executed.
    pub fn execute(&mut self, sql: &str) -> Result<ResultSet> {
        self.run(sql).map_err(|err| err.in_stage(stage_of(sql)))
    }

    fn run(&mut self, sql: &str) -> Result<ResultSet> {
        let stmt = Parser::new(sql).parse()?;
        debug!(?stmt, "parsed statement");
        Plan::build(stmt)?.execute(&mut self.tables)
    }

    pub fn tables(&mut self) -> &mut S {
        &mut self.tables
    }
}

/// Stage named in error messages, taken from the leading keyword
fn stage_of(sql: &str) -> &'static str {
    match sql.split_whitespace().next().map(str::to_uppercase).as_deref() {
        Some("INSERT") => "INSERT query",
        Some("DELETE") => "DELETE query",
        _ => "query",
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, TableSource, kv::KvTableSource};
    use crate::{
        error::{Error, Result},
        sql::{
            executor::ResultSet,
            types::{Row, Value},
        },
        storage::memory::MemoryEngine,
    };

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), Value::from(*v))).collect()
    }

    fn setup() -> Result<Session<KvTableSource<MemoryEngine>>> {
        let mut tables = KvTableSource::new(MemoryEngine::new());
        tables.save(
            "student",
            vec![
                row(&[("id", "1"), ("name", "John"), ("age", "30")]),
                row(&[("id", "2"), ("name", "Jane"), ("age", "25")]),
                row(&[("id", "3"), ("name", "Bob"), ("age", "30")]),
            ],
        )?;
        tables.save(
            "enrollment",
            vec![
                row(&[("student_id", "1"), ("course", "Mathematics")]),
                row(&[("student_id", "2"), ("course", "Physics")]),
                row(&[("student_id", "5"), ("course", "Biology")]),
            ],
        )?;
        Ok(Session::new(tables))
    }

    fn rows(result: ResultSet) -> Vec<Row> {
        match result {
            ResultSet::Scan { rows, .. } => rows,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_select_where() -> Result<()> {
        let mut s = setup()?;
        let result = s.execute("SELECT id, name FROM student WHERE age = 25")?;
        assert_eq!(
            result,
            ResultSet::Scan {
                columns: vec!["id".into(), "name".into()],
                rows: vec![row(&[("id", "2"), ("name", "Jane")])],
            }
        );

        let result = s.execute("SELECT name FROM student WHERE age >= 30 AND name != 'Bob';")?;
        assert_eq!(rows(result), vec![row(&[("name", "John")])]);
        Ok(())
    }

    #[test]
    fn test_group_by() -> Result<()> {
        let mut s = setup()?;
        let result = s.execute("SELECT age, COUNT(*) FROM student GROUP BY age")?;
        assert_eq!(
            result,
            ResultSet::Scan {
                columns: vec!["age".into(), "COUNT(*)".into()],
                rows: vec![
                    [("age".to_string(), Value::from("30")), ("COUNT(*)".into(), Value::Number(2.0))]
                        .into_iter()
                        .collect(),
                    [("age".to_string(), Value::from("25")), ("COUNT(*)".into(), Value::Number(1.0))]
                        .into_iter()
                        .collect(),
                ],
            }
        );

        let result = s.execute("SELECT COUNT(*) FROM student WHERE age > 100")?;
        assert_eq!(rows(result)[0]["COUNT(*)"], Value::Number(0.0));

        let result = s.execute("SELECT AVG(age) FROM student WHERE name LIKE 'J%'")?;
        assert_eq!(rows(result)[0]["AVG(age)"], Value::Number(27.5));
        Ok(())
    }

    #[test]
    fn test_joins() -> Result<()> {
        let mut s = setup()?;

        let result = s.execute(
            "SELECT student.name, enrollment.course FROM student \
             INNER JOIN enrollment ON student.id = enrollment.student_id",
        )?;
        assert_eq!(
            rows(result),
            vec![
                row(&[("student.name", "John"), ("enrollment.course", "Mathematics")]),
                row(&[("student.name", "Jane"), ("enrollment.course", "Physics")]),
            ]
        );

        let result = s.execute(
            "SELECT student.name, enrollment.course FROM student \
             LEFT JOIN enrollment ON student.id = enrollment.student_id \
             WHERE student.name = 'Bob'",
        )?;
        let mut expected = row(&[("student.name", "Bob")]);
        expected.insert("enrollment.course".into(), Value::Null);
        assert_eq!(rows(result), vec![expected]);

        let result = s.execute(
            "SELECT student.name, enrollment.course FROM student \
             RIGHT JOIN enrollment ON student.id = enrollment.student_id \
             ORDER BY enrollment.course",
        )?;
        let mut unmatched = row(&[]);
        unmatched.insert("student.name".into(), Value::Null);
        unmatched.insert("enrollment.course".into(), Value::from("Biology"));
        assert_eq!(
            rows(result),
            vec![
                unmatched,
                row(&[("student.name", "John"), ("enrollment.course", "Mathematics")]),
                row(&[("student.name", "Jane"), ("enrollment.course", "Physics")]),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_errors_are_staged() -> Result<()> {
        let mut s = setup()?;

        let err = s.execute("SELECT name FROM missing").unwrap_err();
        assert_eq!(err.root(), &Error::NotFound("missing".into()));
        assert!(err.to_string().starts_with("Error executing query:"));

        let err = s.execute("UPDATE student SET age = 1").unwrap_err();
        assert_eq!(err.root(), &Error::UnsupportedQueryType("UPDATE".into()));

        let err = s.execute("DELETE student").unwrap_err();
        assert!(err.to_string().starts_with("Error executing DELETE query:"));

        let err = s
            .execute("SELECT name FROM student WHERE age ~ 3")
            .unwrap_err();
        assert!(matches!(err.root(), Error::Syntax { .. } | Error::UnsupportedOperator(_)));

        let err = s
            .execute("SELECT a FROM student FULL JOIN enrollment ON student.id = enrollment.student_id")
            .unwrap_err();
        assert_eq!(err.root(), &Error::UnsupportedJoinType("FULL".into()));

        // a failed statement leaves the session usable
        assert_eq!(rows(s.execute("SELECT id FROM student LIMIT 1")?).len(), 1);
        Ok(())
    }
}
