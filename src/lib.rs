//! flatdb - SQL queries over flat files
//!
//! This crate provides a small query engine where every table is a CSV file:
//! - SQL parsing (lexer, parser, AST) for a restricted dialect
//! - Query planning and execution: joins, filters, grouping, ordering
//! - INSERT and DELETE by rewriting whole tables
//! - Pluggable table sources (CSV directory, in-memory key-value store)

pub mod config;
pub mod error;
pub mod repl;
pub mod sql;
pub mod storage;
