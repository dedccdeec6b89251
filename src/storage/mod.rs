//! Byte-level key-value storage backing the in-memory table source

pub mod engine;
pub mod memory;
