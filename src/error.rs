use std::{fmt::Display, sync::PoisonError};

use bincode::ErrorKind;
use thiserror::Error;

/// Custom Result type for flatdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for flatdb
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Statement text does not fit the grammar of the clause being parsed
    #[error("syntax error in {clause} clause: {message}")]
    Syntax { clause: String, message: String },

    /// Tokenizer failure, turned into `Syntax` by the parser
    #[error("parse error {0}")]
    Parse(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Unsupported JOIN type: {0}")]
    UnsupportedJoinType(String),

    #[error("Unsupported query type: {0}")]
    UnsupportedQueryType(String),

    #[error("Number of columns ({columns}) does not match the number of values ({values}).")]
    ColumnValueMismatch { columns: usize, values: usize },

    /// No backing store exists for the table
    #[error("table {0} does not exist")]
    NotFound(String),

    #[error("config error {0}")]
    Config(String),

    /// Internal error (storage, serialization, etc.)
    #[error("internal error {0}")]
    Internal(String),

    /// Any failure surfaced by a top-level executor, tagged with its stage
    #[error("Error executing {stage}: {source}")]
    Execute { stage: String, source: Box<Error> },
}

impl Error {
    /// Wraps the error with a stage-identifying prefix.
    pub fn in_stage(self, stage: impl Display) -> Self {
        Error::Execute {
            stage: stage.to_string(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, looking through any stage wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Execute { source, .. } => source.root(),
            err => err,
        }
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(value: PoisonError<T>) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<Box<ErrorKind>> for Error {
    fn from(value: Box<ErrorKind>) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(value: regex::Error) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Error::Config(value.to_string())
    }
}
