mod tax_bracket;
mod tax_result;

pub use tax_bracket::{BracketError, BracketSet, TaxBracket, UpperBound, validate_brackets};
pub use tax_result::{BracketTaxDetail, TaxResult};
