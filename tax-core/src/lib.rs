pub mod cache;
pub mod calculations;
pub mod calculator;
pub mod models;
pub mod source;

pub use cache::{BracketCache, CacheConfig};
pub use calculator::{CalculationError, TaxCalculator};
pub use models::*;
pub use source::{BracketSource, SourceError};
