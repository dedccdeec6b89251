use std::iter::Peekable;

use crate::error::{Error, Result};
use crate::sql::parser::ast::{
    AggregateArg, AggregateFunc, Condition, Field, JoinCondition, JoinSpec, JoinType, Operator,
    OrderDirection, Statement,
};
use crate::sql::parser::lexer::{Keyword, Lexer, Token};
use crate::sql::types::strip_quotes;

pub mod ast;
mod lexer;

/// SQL Parser - Converts tokens into Abstract Syntax Tree (AST)
///
/// The grammar is deliberately narrow: one optional join, conjunctive WHERE
/// clauses only (no OR, no parentheses), and clauses in a fixed order.
pub struct Parser<'a> {
    lexer: Peekable<Lexer<'a>>,
    /// Clause currently being parsed, reported in syntax errors
    clause: &'static str,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given SQL input
    pub fn new(input: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(input).peekable(),
            clause: "statement",
        }
    }

    /// Parses the input SQL statement into an AST
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = self.parse_statement()?;
        self.next_if_token(Token::Semicolon);
        // No tokens allowed after the statement
        if let Some(token) = self.peek()? {
            return Err(self.error(format!("Unexpected token {}", token)));
        }
        Ok(stmt)
    }

    /// Parses a statement based on the first token
    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek()? {
            Some(Token::Keyword(Keyword::Select)) => self.parse_select(),
            Some(Token::Keyword(Keyword::Insert)) => self.parse_insert(),
            Some(Token::Keyword(Keyword::Delete)) => self.parse_delete(),
            Some(t) => Err(Error::UnsupportedQueryType(t.to_string().to_uppercase())),
            None => Err(self.error("Unexpected end of input")),
        }
    }

    /// Parses SELECT statement
    fn parse_select(&mut self) -> Result<Statement> {
        self.clause = "SELECT";
        self.next_expect(Token::Keyword(Keyword::Select))?;
        let distinct = self.next_if_token(Token::Keyword(Keyword::Distinct)).is_some();

        let mut fields = Vec::new();
        loop {
            fields.push(self.parse_field()?);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }

        self.clause = "FROM";
        self.next_expect(Token::Keyword(Keyword::From))?;
        let table = self.next_ident()?;

        Ok(Statement::Select {
            fields,
            table,
            join: self.parse_join_clause()?,
            where_clauses: self.parse_where_clause()?,
            group_by: self.parse_group_by_clause()?,
            order_by: self.parse_order_by_clause()?,
            limit: self.parse_limit_clause()?,
            distinct,
        })
    }

    /// Parses a select-list entry: `*`, a column, or `FUNC(arg)`
    fn parse_field(&mut self) -> Result<Field> {
        match self.next()? {
            Token::Asterisk => Ok(Field::Wildcard),
            Token::Ident(name) => {
                if self.next_if_token(Token::OpenParen).is_none() {
                    return Ok(Field::Column(name));
                }
                let func = AggregateFunc::from_name(&name)
                    .ok_or_else(|| self.error(format!("Unknown function {}", name)))?;
                let arg = match self.next()? {
                    Token::Asterisk => AggregateArg::All,
                    Token::Ident(col) => AggregateArg::Column(col),
                    token => {
                        return Err(self.error(format!("Unexpected function argument {}", token)));
                    }
                };
                self.next_expect(Token::CloseParen)?;
                Ok(Field::Aggregate(func, arg))
            }
            token => Err(self.error(format!("Expected field, got token {}", token))),
        }
    }

    /// Parses `<INNER|LEFT|RIGHT> JOIN <table> ON <left> = <right>`
    fn parse_join_clause(&mut self) -> Result<Option<JoinSpec>> {
        let join_type = match self.peek()? {
            Some(Token::Keyword(Keyword::Inner)) => JoinType::Inner,
            Some(Token::Keyword(Keyword::Left)) => JoinType::Left,
            Some(Token::Keyword(Keyword::Right)) => JoinType::Right,
            // FULL JOIN, CROSS JOIN, ...
            Some(Token::Ident(ident)) => {
                self.next()?;
                return match self.peek()? {
                    Some(Token::Keyword(Keyword::Join)) => {
                        Err(Error::UnsupportedJoinType(ident.to_uppercase()))
                    }
                    _ => Err(self.error(format!("Unexpected token {}", ident))),
                };
            }
            _ => return Ok(None),
        };
        self.clause = "JOIN";
        self.next()?;
        self.next_expect(Token::Keyword(Keyword::Join))?;
        let table = self.next_ident()?;
        self.next_expect(Token::Keyword(Keyword::On))?;
        let left = self.next_ident()?;
        self.next_expect(Token::Operator("=".into()))?;
        let right = self.next_ident()?;

        Ok(Some(JoinSpec {
            join_type,
            table,
            condition: JoinCondition { left, right },
        }))
    }

    /// Parses `WHERE <cond> (AND <cond>)*`, empty when there is no WHERE
    fn parse_where_clause(&mut self) -> Result<Vec<Condition>> {
        if self.next_if_token(Token::Keyword(Keyword::Where)).is_none() {
            return Ok(Vec::new());
        }
        self.clause = "WHERE";

        let mut conditions = Vec::new();
        loop {
            conditions.push(self.parse_condition()?);
            match self.peek()? {
                Some(Token::Keyword(Keyword::And)) => {
                    self.next()?;
                }
                Some(Token::Keyword(Keyword::Or)) => {
                    return Err(self.error("OR is not supported, conditions can only be joined with AND"));
                }
                _ => break,
            }
        }
        Ok(conditions)
    }

    /// Parses `field operator value` or `field LIKE pattern`
    fn parse_condition(&mut self) -> Result<Condition> {
        let field = match self.next()? {
            Token::Ident(field) => field,
            Token::OpenParen => return Err(self.error("parentheses are not supported")),
            token => return Err(self.error(format!("Expected field, got token {}", token))),
        };
        let operator = match self.next()? {
            Token::Operator(op) => Operator::from_symbol(&op)?,
            Token::Keyword(Keyword::Like) => Operator::Like,
            // IS, IN, BETWEEN, ...
            token @ (Token::Ident(_) | Token::Keyword(_)) => {
                return Err(Error::UnsupportedOperator(token.to_string().to_uppercase()));
            }
            token => return Err(self.error(format!("Expected operator, got token {}", token))),
        };
        let value = self.parse_literal()?;
        let value = match operator {
            Operator::Like => strip_quotes(&value).to_string(),
            _ => value,
        };
        Ok(Condition {
            field,
            operator,
            value,
        })
    }

    /// Parses `GROUP BY <col> (, <col>)*`
    fn parse_group_by_clause(&mut self) -> Result<Option<Vec<String>>> {
        if self.next_if_token(Token::Keyword(Keyword::Group)).is_none() {
            return Ok(None);
        }
        self.clause = "GROUP BY";
        self.next_expect(Token::Keyword(Keyword::By))?;

        let mut columns = Vec::new();
        loop {
            columns.push(self.next_ident()?);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        Ok(Some(columns))
    }

    /// Parses `ORDER BY <field> [ASC|DESC] (, ...)*`
    fn parse_order_by_clause(&mut self) -> Result<Option<Vec<(String, OrderDirection)>>> {
        if self.next_if_token(Token::Keyword(Keyword::Order)).is_none() {
            return Ok(None);
        }
        self.clause = "ORDER BY";
        self.next_expect(Token::Keyword(Keyword::By))?;

        let mut order_by = Vec::new();
        loop {
            let field = match self.parse_field()? {
                Field::Wildcard => return Err(self.error("Cannot order by *")),
                field => field.name(),
            };
            let direction = if self.next_if_token(Token::Keyword(Keyword::Desc)).is_some() {
                OrderDirection::Desc
            } else {
                self.next_if_token(Token::Keyword(Keyword::Asc));
                OrderDirection::Asc
            };
            order_by.push((field, direction));
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        Ok(Some(order_by))
    }

    /// Parses `LIMIT <n>`
    fn parse_limit_clause(&mut self) -> Result<Option<usize>> {
        if self.next_if_token(Token::Keyword(Keyword::Limit)).is_none() {
            return Ok(None);
        }
        self.clause = "LIMIT";
        match self.next()? {
            Token::Number(n) => n
                .parse::<usize>()
                .map(Some)
                .map_err(|_| self.error(format!("Invalid limit {}", n))),
            token => Err(self.error(format!("Expected number, got token {}", token))),
        }
    }

    /// Parses `INSERT INTO <table> (<col, ...>) VALUES (<val, ...>)`
    fn parse_insert(&mut self) -> Result<Statement> {
        self.clause = "INSERT";
        self.next_expect(Token::Keyword(Keyword::Insert))?;
        self.next_expect(Token::Keyword(Keyword::Into))?;

        let table = self.next_ident()?;
        self.next_expect(Token::OpenParen)?;
        let columns = self.parse_literal_list()?;

        self.clause = "VALUES";
        self.next_expect(Token::Keyword(Keyword::Values))?;
        self.next_expect(Token::OpenParen)?;
        let values = self.parse_literal_list()?;

        Ok(Statement::Insert {
            table,
            columns,
            values,
        })
    }

    /// Parses `DELETE FROM <table> [WHERE ...]`
    fn parse_delete(&mut self) -> Result<Statement> {
        self.clause = "DELETE";
        self.next_expect(Token::Keyword(Keyword::Delete))?;
        self.next_expect(Token::Keyword(Keyword::From))?;
        let table = self.next_ident()?;

        Ok(Statement::Delete {
            table,
            where_clauses: self.parse_where_clause()?,
        })
    }

    /// Parses a comma separated list closed by `)`, quotes stripped
    fn parse_literal_list(&mut self) -> Result<Vec<String>> {
        let mut items = Vec::new();
        loop {
            items.push(strip_quotes(&self.parse_literal()?).to_string());
            match self.next()? {
                Token::CloseParen => break,
                Token::Comma => {}
                token => return Err(self.error(format!("Unexpected token {}", token))),
            }
        }
        Ok(items)
    }

    /// Parses a literal and returns it as written in the source
    fn parse_literal(&mut self) -> Result<String> {
        Ok(match self.next()? {
            Token::String(s) | Token::Number(s) | Token::Ident(s) => s,
            Token::Minus => match self.next()? {
                Token::Number(n) => format!("-{}", n),
                token => return Err(self.error(format!("Unexpected token {} after -", token))),
            },
            token => return Err(self.error(format!("Unexpected value token {}", token))),
        })
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Syntax {
            clause: self.clause.to_string(),
            message: message.into(),
        }
    }

    /// Lexer failures are reported against the current clause
    fn lexer_error(&self, err: Error) -> Error {
        match err {
            Error::Parse(message) => self.error(message),
            err => err,
        }
    }

    /// Peeks at the next token
    fn peek(&mut self) -> Result<Option<Token>> {
        match self.lexer.peek().cloned().transpose() {
            Err(err) => Err(self.lexer_error(err)),
            token => token,
        }
    }

    /// Consumes and returns the next token
    fn next(&mut self) -> Result<Token> {
        match self.lexer.next() {
            Some(Ok(token)) => Ok(token),
            Some(Err(err)) => Err(self.lexer_error(err)),
            None => Err(self.error("Unexpected end of input")),
        }
    }

    /// Expects and consumes an identifier
    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            token => Err(self.error(format!("Expected ident, got token {}", token))),
        }
    }

    /// Expects a specific token, returns error if different
    fn next_expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            return Err(self.error(format!("Expected token {}, got {}", expect, token)));
        }
        Ok(())
    }

    /// Consumes next token if it satisfies the predicate
    fn next_if<F: Fn(&Token) -> bool>(&mut self, predicate: F) -> Option<Token> {
        self.peek().unwrap_or(None).filter(|t| predicate(t))?;
        self.next().ok()
    }

    /// Consumes next token if it matches the given token
    fn next_if_token(&mut self, token: Token) -> Option<Token> {
        self.next_if(|t| t == &token)
    }
}
