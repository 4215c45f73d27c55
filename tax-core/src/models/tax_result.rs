use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TaxBracket;

/// Tax owed within a single bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTaxDetail {
    pub bracket: TaxBracket,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_owed: Decimal,
}

/// Outcome of a progressive tax calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxResult {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_tax: Decimal,

    /// Total tax divided by salary; zero when the salary is zero.
    #[serde(with = "rust_decimal::serde::float")]
    pub effective_rate: Decimal,

    /// Brackets that received part of the salary, lowest first.
    #[serde(rename = "bracket_breakdown")]
    pub breakdown: Vec<BracketTaxDetail>,
}
