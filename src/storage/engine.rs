use crate::error::Result;

/// Abstract storage engine interface (byte-level operations)
///
/// Different from sql::engine::TableSource which operates on tables.
pub trait Engine {
    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()>;
    fn get(&mut self, key: Vec<u8>) -> Result<Option<Vec<u8>>>;
}
