//! Utility modules

pub mod memory_api;
pub mod validation;

pub use memory_api::{BreakdownShape, MemoryApi};
pub use validation::*;
