//! Shared application state handed to every request handler.

use std::time::Instant;

use tax_core::TaxCalculator;

/// Cloned into each handler; the calculator's cache is shared between clones.
#[derive(Clone)]
pub struct AppState {
    pub calculator: TaxCalculator,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(calculator: TaxCalculator) -> Self {
        Self {
            calculator,
            started_at: Instant::now(),
        }
    }
}
