use tracing::debug;

use crate::{
    error::Result,
    sql::{
        parser::ast::Statement,
        plan::{Node, Plan},
    },
};

/// Query planner - converts AST into execution plan nodes
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self {}
    }

    /// Builds an execution plan from an AST statement
    pub fn build(&mut self, stmt: Statement) -> Result<Plan> {
        let node = self.build_statement(stmt)?;
        debug!(plan = ?node, "built plan");
        Ok(Plan(node))
    }

    pub fn build_statement(&self, stmt: Statement) -> Result<Node> {
        let without_group_by = stmt.has_aggregate_without_group_by();
        Ok(match stmt {
            Statement::Select {
                fields,
                table,
                join,
                where_clauses,
                group_by,
                order_by,
                limit,
                distinct,
            } => {
                let mut node = Node::Scan {
                    table_name: table.clone(),
                };

                // JOIN replaces the base rows with the joined rows
                if let Some(join) = join {
                    node = Node::Join {
                        left: Box::new(node),
                        right: Box::new(Node::Scan {
                            table_name: join.table.clone(),
                        }),
                        base_table: table,
                        join,
                        fields: fields.clone(),
                    }
                }

                if !where_clauses.is_empty() {
                    node = Node::Filter {
                        source: Box::new(node),
                        predicates: where_clauses,
                    }
                }

                // Aggregates without GROUP BY collapse everything into one
                // summary row; nothing after this applies
                if without_group_by {
                    return Ok(Node::Aggregate {
                        source: Box::new(node),
                        group_by: None,
                        fields,
                        without_group_by: true,
                    });
                }

                // Grouped rows already have the selected shape, so they skip
                // the final projection
                let grouped = group_by.is_some();
                if let Some(group_by) = group_by {
                    node = Node::Aggregate {
                        source: Box::new(node),
                        group_by: Some(group_by),
                        fields: fields.clone(),
                        without_group_by: false,
                    }
                }

                if let Some(order_by) = order_by {
                    node = Node::Order {
                        source: Box::new(node),
                        order_by,
                    }
                }

                if distinct {
                    node = Node::Distinct {
                        source: Box::new(node),
                        fields: fields.clone(),
                    }
                }

                if let Some(limit) = limit {
                    node = Node::Limit {
                        source: Box::new(node),
                        limit,
                    }
                }

                if !grouped {
                    node = Node::Projection {
                        source: Box::new(node),
                        fields,
                    }
                }

                node
            }
            Statement::Insert {
                table,
                columns,
                values,
            } => Node::Insert {
                table_name: table,
                columns,
                values,
            },
            Statement::Delete {
                table,
                where_clauses,
            } => Node::Delete {
                table_name: table.clone(),
                source: Box::new(Node::Scan { table_name: table }),
                predicates: where_clauses,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::Result,
        sql::{
            parser::{
                Parser,
                ast::{AggregateArg, AggregateFunc, Field, OrderDirection},
            },
            plan::{Node, Plan},
        },
    };

    fn plan(sql: &str) -> Result<Node> {
        Ok(Plan::build(Parser::new(sql).parse()?)?.0)
    }

    #[test]
    fn test_select_stage_order() -> Result<()> {
        let node = plan("SELECT DISTINCT name FROM t WHERE age > 1 ORDER BY name DESC LIMIT 3")?;
        let fields = vec![Field::Column("name".into())];
        let Node::Projection { source, fields: f } = node else {
            panic!("expected projection");
        };
        assert_eq!(f, fields);
        let Node::Limit { source, limit: 3 } = *source else {
            panic!("expected limit");
        };
        let Node::Distinct { source, .. } = *source else {
            panic!("expected distinct");
        };
        let Node::Order { source, order_by } = *source else {
            panic!("expected order");
        };
        assert_eq!(order_by, vec![("name".to_string(), OrderDirection::Desc)]);
        let Node::Filter { source, .. } = *source else {
            panic!("expected filter");
        };
        assert_eq!(*source, Node::Scan { table_name: "t".into() });
        Ok(())
    }

    #[test]
    fn test_aggregate_branches() -> Result<()> {
        // aggregate without GROUP BY ignores ORDER BY and LIMIT
        let node = plan("SELECT COUNT(*) FROM t ORDER BY a LIMIT 1")?;
        assert_eq!(
            node,
            Node::Aggregate {
                source: Box::new(Node::Scan { table_name: "t".into() }),
                group_by: None,
                fields: vec![Field::Aggregate(AggregateFunc::Count, AggregateArg::All)],
                without_group_by: true,
            }
        );

        // grouped queries are not projected afterwards
        let node = plan("SELECT a, COUNT(*) FROM t GROUP BY a LIMIT 1")?;
        let Node::Limit { source, .. } = node else {
            panic!("expected limit");
        };
        assert!(matches!(*source, Node::Aggregate { without_group_by: false, .. }));
        Ok(())
    }

    #[test]
    fn test_delete_plan() -> Result<()> {
        let node = plan("DELETE FROM t")?;
        assert_eq!(
            node,
            Node::Delete {
                table_name: "t".into(),
                source: Box::new(Node::Scan { table_name: "t".into() }),
                predicates: vec![],
            }
        );
        Ok(())
    }
}
