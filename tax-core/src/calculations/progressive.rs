//! Progressive (marginal) income tax over an ordered bracket schedule.
//!
//! The salary is consumed bracket by bracket, lowest first. Each bracket
//! taxes only the slice of income that falls inside its range:
//!
//! | Bracket kind | Taxable slice |
//! |--------------|---------------|
//! | Bounded      | `min(remaining, upper - lower)` |
//! | Unbounded    | all of `remaining` |
//!
//! The tax for a slice is `slice × rate`. Iteration stops as soon as the
//! whole salary is allocated, so brackets above the salary never appear in
//! the breakdown.
//!
//! Amounts are exact decimals. Sums and products carry no rounding error;
//! only the effective rate division rounds, at 28 significant digits.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::TaxBracket;
//! use tax_core::calculations::TaxEngine;
//!
//! let brackets = vec![
//!     TaxBracket::bounded(dec!(0), dec!(50197), dec!(0.15)),
//!     TaxBracket::bounded(dec!(50197), dec!(100392), dec!(0.205)),
//!     TaxBracket::unbounded(dec!(100392), dec!(0.26)),
//! ];
//!
//! let result = TaxEngine::new(&brackets).compute(dec!(100000)).unwrap();
//!
//! assert_eq!(result.total_tax, dec!(17739.165));
//! assert_eq!(result.breakdown.len(), 2);
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{
    BracketError, BracketTaxDetail, TaxBracket, TaxResult, UpperBound, validate_brackets,
};

/// Errors that can occur while computing tax.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxEngineError {
    /// Salaries are never clamped; a negative value is a caller error.
    #[error("salary must be non-negative, got {0}")]
    NegativeSalary(Decimal),

    #[error("malformed tax brackets: {0}")]
    InvalidBrackets(#[from] BracketError),
}

/// Calculator for progressive income tax.
///
/// Holds a borrowed bracket schedule and computes tax for any number of
/// salaries against it. It has no state of its own, so one schedule can be
/// shared freely between threads.
#[derive(Debug, Clone)]
pub struct TaxEngine<'a> {
    tax_brackets: &'a [TaxBracket],
}

impl<'a> TaxEngine<'a> {
    /// Creates an engine over `tax_brackets`.
    ///
    /// Brackets should be sorted by lower bound, contiguous, and end with a
    /// single unbounded bracket. This is checked again by
    /// [`TaxEngine::compute`].
    pub fn new(tax_brackets: &'a [TaxBracket]) -> Self {
        Self { tax_brackets }
    }

    /// Computes total tax, effective rate and per-bracket breakdown.
    ///
    /// # Errors
    ///
    /// Returns [`TaxEngineError`] if:
    /// - `salary` is negative
    /// - the bracket schedule is empty, out of order, has gaps or overlaps,
    ///   or does not end in exactly one unbounded bracket
    pub fn compute(
        &self,
        salary: Decimal,
    ) -> Result<TaxResult, TaxEngineError> {
        if salary < Decimal::ZERO {
            return Err(TaxEngineError::NegativeSalary(salary));
        }

        validate_brackets(self.tax_brackets)?;

        let mut total_tax = Decimal::ZERO;
        let mut breakdown = Vec::new();
        let mut remaining = salary;

        for bracket in self.tax_brackets {
            if remaining <= Decimal::ZERO {
                break;
            }

            let slice = self.taxable_slice(bracket, remaining);
            if slice > Decimal::ZERO {
                let tax_owed = slice * bracket.rate;
                total_tax += tax_owed;
                breakdown.push(BracketTaxDetail {
                    bracket: bracket.clone(),
                    tax_owed,
                });
                remaining -= slice;
            }
        }

        Ok(TaxResult {
            total_tax,
            effective_rate: self.effective_rate(total_tax, salary),
            breakdown,
        })
    }

    /// Portion of `remaining` income that falls inside `bracket`.
    fn taxable_slice(
        &self,
        bracket: &TaxBracket,
        remaining: Decimal,
    ) -> Decimal {
        match bracket.upper_bound {
            UpperBound::Bounded(upper) => remaining.min(upper - bracket.lower_bound),
            UpperBound::Unbounded => remaining,
        }
    }

    fn effective_rate(
        &self,
        total_tax: Decimal,
        salary: Decimal,
    ) -> Decimal {
        if salary > Decimal::ZERO {
            total_tax / salary
        } else {
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn test_brackets() -> Vec<TaxBracket> {
        vec![
            TaxBracket::bounded(dec!(0), dec!(50197), dec!(0.15)),
            TaxBracket::bounded(dec!(50197), dec!(100392), dec!(0.205)),
            TaxBracket::unbounded(dec!(100392), dec!(0.26)),
        ]
    }

    fn compute(salary: Decimal) -> TaxResult {
        let brackets = test_brackets();
        TaxEngine::new(&brackets).compute(salary).unwrap()
    }

    // =========================================================================
    // scenario tests
    // =========================================================================

    #[test]
    fn zero_salary_owes_nothing() {
        let result = compute(dec!(0));

        assert_eq!(result.total_tax, Decimal::ZERO);
        assert_eq!(result.effective_rate, Decimal::ZERO);
        assert!(result.breakdown.is_empty());
    }

    #[test]
    fn salary_within_first_bracket() {
        let result = compute(dec!(50000));

        assert_eq!(result.total_tax, dec!(7500.00));
        assert_eq!(result.effective_rate, dec!(0.15));
        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.breakdown[0].tax_owed, dec!(7500.00));
    }

    #[test]
    fn salary_spanning_two_brackets() {
        let result = compute(dec!(100000));

        // 50197 × 0.15 + 49803 × 0.205
        assert_eq!(result.total_tax, dec!(17739.165));
        assert_eq!(result.breakdown.len(), 2);
        assert_eq!(result.breakdown[0].tax_owed, dec!(7529.55));
        assert_eq!(result.breakdown[1].tax_owed, dec!(10209.615));
    }

    #[test]
    fn salary_reaching_unbounded_bracket() {
        let result = compute(dec!(150000));

        assert_eq!(result.breakdown.len(), 3);
        // 49608 × 0.26
        assert_eq!(result.breakdown[2].tax_owed, dec!(12898.08));
        assert_eq!(result.breakdown[2].bracket.upper_bound, UpperBound::Unbounded);
        assert_eq!(result.total_tax, dec!(7529.55) + dec!(10289.975) + dec!(12898.08));
    }

    #[test]
    fn salary_exactly_at_bracket_boundary_skips_next_bracket() {
        let result = compute(dec!(50197));

        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.total_tax, dec!(7529.55));
    }

    #[test]
    fn huge_salary_is_absorbed_by_top_bracket() {
        let result = compute(dec!(10000000));

        let top = &result.breakdown[2];
        assert_eq!(top.tax_owed, (dec!(10000000) - dec!(100392)) * dec!(0.26));
    }

    #[test]
    fn fractional_salary_is_taxed_exactly() {
        let result = compute(dec!(1234.56));

        assert_eq!(result.total_tax, dec!(185.184));
    }

    #[test]
    fn zero_rate_bracket_still_appears_in_breakdown() {
        let brackets = vec![
            TaxBracket::bounded(dec!(0), dec!(15000), dec!(0)),
            TaxBracket::unbounded(dec!(15000), dec!(0.10)),
        ];

        let result = TaxEngine::new(&brackets).compute(dec!(20000)).unwrap();

        assert_eq!(result.breakdown.len(), 2);
        assert_eq!(result.breakdown[0].tax_owed, Decimal::ZERO);
        assert_eq!(result.total_tax, dec!(500));
    }

    // =========================================================================
    // property tests
    // =========================================================================

    fn sample_salaries() -> Vec<Decimal> {
        (0..=40).map(|step| Decimal::from(step * 5_000)).collect()
    }

    #[test]
    fn total_tax_equals_sum_of_slices_times_rates() {
        let brackets = test_brackets();

        for salary in sample_salaries() {
            let result = compute(salary);

            let mut remaining = salary;
            let mut expected = Decimal::ZERO;
            for bracket in &brackets {
                let slice = match bracket.width() {
                    Some(width) => remaining.min(width),
                    None => remaining,
                };
                expected += slice * bracket.rate;
                remaining -= slice;
            }

            assert_eq!(result.total_tax, expected, "salary {salary}");
        }
    }

    #[test]
    fn breakdown_sums_to_total_tax() {
        for salary in sample_salaries() {
            let result = compute(salary);

            let sum: Decimal = result.breakdown.iter().map(|d| d.tax_owed).sum();

            assert_eq!(sum, result.total_tax, "salary {salary}");
        }
    }

    #[test]
    fn effective_rate_is_total_over_salary() {
        for salary in sample_salaries().into_iter().filter(|s| *s > Decimal::ZERO) {
            let result = compute(salary);

            assert_eq!(result.effective_rate, result.total_tax / salary);
            assert!(result.effective_rate >= Decimal::ZERO);
            assert!(result.effective_rate <= Decimal::ONE);
        }
    }

    #[test]
    fn tax_and_effective_rate_never_decrease_with_salary() {
        let results: Vec<TaxResult> = sample_salaries().into_iter().map(compute).collect();

        for pair in results.windows(2) {
            assert!(pair[1].total_tax >= pair[0].total_tax);
            assert!(pair[1].effective_rate >= pair[0].effective_rate);
        }
    }

    #[test]
    fn compute_is_deterministic() {
        let brackets = test_brackets();
        let engine = TaxEngine::new(&brackets);

        let first = engine.compute(dec!(123456.78)).unwrap();
        let second = engine.compute(dec!(123456.78)).unwrap();

        assert_eq!(first, second);
    }

    // =========================================================================
    // error tests
    // =========================================================================

    #[test]
    fn negative_salary_is_rejected() {
        let brackets = test_brackets();

        let result = TaxEngine::new(&brackets).compute(dec!(-1));

        assert_eq!(result, Err(TaxEngineError::NegativeSalary(dec!(-1))));
    }

    #[test]
    fn unbounded_bracket_in_the_middle_is_rejected() {
        let brackets = vec![
            TaxBracket::bounded(dec!(0), dec!(50197), dec!(0.15)),
            TaxBracket::unbounded(dec!(50197), dec!(0.205)),
            TaxBracket::bounded(dec!(100392), dec!(200000), dec!(0.26)),
        ];

        let result = TaxEngine::new(&brackets).compute(dec!(1000));

        assert_eq!(
            result,
            Err(TaxEngineError::InvalidBrackets(
                BracketError::UnboundedNotLast { index: 1, count: 3 }
            ))
        );
    }

    #[test]
    fn empty_schedule_is_rejected_even_for_zero_salary() {
        let result = TaxEngine::new(&[]).compute(Decimal::ZERO);

        assert_eq!(
            result,
            Err(TaxEngineError::InvalidBrackets(BracketError::Empty))
        );
    }
}
