//! SQL processing module
//!
//! This module provides:
//! - `parser`: SQL lexer and parser
//! - `types`: cell values and rows
//! - `schema`: column layout inferred from rows
//! - `plan`: Execution plan generation
//! - `executor`: Query and mutation execution
//! - `engine`: Table sources and the statement session

pub mod parser;
pub mod types;
pub mod schema;
pub mod plan;
pub mod executor;
pub mod engine;
