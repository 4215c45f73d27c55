//! Tax calculation modules.
//!
//! This module provides the pure calculation logic that turns a salary and
//! a year's bracket schedule into the tax owed.

pub mod progressive;

pub use progressive::{TaxEngine, TaxEngineError};
