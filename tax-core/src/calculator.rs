use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::cache::BracketCache;
use crate::calculations::{TaxEngine, TaxEngineError};
use crate::models::{BracketError, TaxResult};
use crate::source::SourceError;

/// Failure classes of a tax calculation.
///
/// The HTTP layer maps each class to its own status code, so the variants
/// must stay distinguishable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalculationError {
    /// Bad salary or year. Reported as-is, never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The provider could not be reached or answered unsuccessfully.
    #[error("Tax data unavailable: {0}")]
    UpstreamUnavailable(SourceError),

    /// The provider's schedule is malformed; no number is produced.
    #[error("Tax bracket data is malformed: {0}")]
    BracketInvariantViolation(BracketError),
}

impl From<SourceError> for CalculationError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::InvalidBrackets(bracket_error) => {
                CalculationError::BracketInvariantViolation(bracket_error)
            }
            other => CalculationError::UpstreamUnavailable(other),
        }
    }
}

impl From<TaxEngineError> for CalculationError {
    fn from(err: TaxEngineError) -> Self {
        match err {
            TaxEngineError::InvalidBrackets(bracket_error) => {
                CalculationError::BracketInvariantViolation(bracket_error)
            }
            negative_salary => CalculationError::InvalidInput(negative_salary.to_string()),
        }
    }
}

/// Entry point for tax calculations: salary and year in, [`TaxResult`] out.
#[derive(Clone)]
pub struct TaxCalculator {
    cache: BracketCache,
}

impl TaxCalculator {
    pub fn new(cache: BracketCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &BracketCache {
        &self.cache
    }

    /// Computes tax owed on `salary` under the brackets for `year`.
    ///
    /// Input is checked before any fetch, so invalid requests never reach
    /// the provider.
    ///
    /// # Errors
    ///
    /// - [`CalculationError::InvalidInput`] for a negative salary or a year
    ///   that is zero or negative
    /// - [`CalculationError::UpstreamUnavailable`] when the brackets cannot
    ///   be fetched
    /// - [`CalculationError::BracketInvariantViolation`] when the fetched
    ///   brackets are malformed
    pub async fn calculate_tax(
        &self,
        salary: Decimal,
        year: i32,
    ) -> Result<TaxResult, CalculationError> {
        if year <= 0 {
            return Err(CalculationError::InvalidInput(format!(
                "tax year must be positive, got {year}"
            )));
        }
        if salary < Decimal::ZERO {
            return Err(TaxEngineError::NegativeSalary(salary).into());
        }

        let brackets = self.cache.get(year).await?;
        let result = TaxEngine::new(brackets.brackets()).compute(salary)?;

        debug!(year, %salary, total_tax = %result.total_tax, "tax computed");
        Ok(result)
    }

    /// Forgets every cached schedule.
    pub async fn clear_cache(&self) {
        self.cache.clear_cache().await;
    }
}
