use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper edge of a bracket's income range.
///
/// Exactly one bracket per year is [`UpperBound::Unbounded`]: the top bracket,
/// which absorbs all income above the last bounded range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpperBound {
    Bounded(Decimal),
    #[default]
    Unbounded,
}

impl UpperBound {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }

    pub fn as_option(&self) -> Option<Decimal> {
        match self {
            Self::Bounded(max) => Some(*max),
            Self::Unbounded => None,
        }
    }
}

impl From<Option<Decimal>> for UpperBound {
    fn from(max: Option<Decimal>) -> Self {
        max.map_or(Self::Unbounded, Self::Bounded)
    }
}

/// A contiguous income range taxed at a fixed marginal rate.
///
/// Serialized as `{"min": 0, "max": 50197, "rate": 0.15}`; a missing or
/// `null` `max` marks the unbounded top bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    #[serde(rename = "min", with = "rust_decimal::serde::float")]
    pub lower_bound: Decimal,
    #[serde(
        rename = "max",
        default,
        with = "upper_bound_serde",
        skip_serializing_if = "UpperBound::is_unbounded"
    )]
    pub upper_bound: UpperBound,
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
}

impl TaxBracket {
    pub fn bounded(
        lower_bound: Decimal,
        upper_bound: Decimal,
        rate: Decimal,
    ) -> Self {
        Self {
            lower_bound,
            upper_bound: UpperBound::Bounded(upper_bound),
            rate,
        }
    }

    pub fn unbounded(
        lower_bound: Decimal,
        rate: Decimal,
    ) -> Self {
        Self {
            lower_bound,
            upper_bound: UpperBound::Unbounded,
            rate,
        }
    }

    /// Width of the income range, or `None` for the top bracket.
    pub fn width(&self) -> Option<Decimal> {
        self.upper_bound
            .as_option()
            .map(|upper| upper - self.lower_bound)
    }
}

mod upper_bound_serde {
    use serde::{Deserializer, Serializer};

    use super::UpperBound;

    pub fn serialize<S>(
        bound: &UpperBound,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        rust_decimal::serde::float_option::serialize(&bound.as_option(), serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<UpperBound, D::Error>
    where
        D: Deserializer<'de>,
    {
        rust_decimal::serde::float_option::deserialize(deserializer).map(UpperBound::from)
    }
}

/// Ways an ordered bracket list can fail to describe a progressive schedule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BracketError {
    #[error("no tax brackets provided")]
    Empty,

    #[error("bracket {index} has negative lower bound {lower}")]
    NegativeLowerBound { index: usize, lower: Decimal },

    #[error("bracket {index} has rate {rate} outside [0, 1]")]
    RateOutOfRange { index: usize, rate: Decimal },

    #[error("bracket {index} upper bound {upper} is not above its lower bound {lower}")]
    EmptyRange {
        index: usize,
        lower: Decimal,
        upper: Decimal,
    },

    #[error("bracket {index} starts at {lower} but the previous bracket ends at {expected}")]
    NotContiguous {
        index: usize,
        expected: Decimal,
        lower: Decimal,
    },

    #[error("unbounded bracket at position {index} is not the last of {count}")]
    UnboundedNotLast { index: usize, count: usize },

    #[error("top bracket has an upper bound; the last bracket must be unbounded")]
    MissingUnbounded,
}

/// Checks that `brackets` are ascending, contiguous and capped by a single
/// unbounded bracket.
pub fn validate_brackets(brackets: &[TaxBracket]) -> Result<(), BracketError> {
    let Some(last_index) = brackets.len().checked_sub(1) else {
        return Err(BracketError::Empty);
    };

    let mut previous_end: Option<Decimal> = None;

    for (index, bracket) in brackets.iter().enumerate() {
        let lower = bracket.lower_bound;

        if lower < Decimal::ZERO {
            return Err(BracketError::NegativeLowerBound { index, lower });
        }

        if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE {
            return Err(BracketError::RateOutOfRange {
                index,
                rate: bracket.rate,
            });
        }

        if let Some(expected) = previous_end {
            if lower != expected {
                return Err(BracketError::NotContiguous {
                    index,
                    expected,
                    lower,
                });
            }
        }

        match bracket.upper_bound {
            UpperBound::Bounded(upper) if upper <= lower => {
                return Err(BracketError::EmptyRange {
                    index,
                    lower,
                    upper,
                });
            }
            UpperBound::Bounded(upper) => previous_end = Some(upper),
            UpperBound::Unbounded if index != last_index => {
                return Err(BracketError::UnboundedNotLast {
                    index,
                    count: brackets.len(),
                });
            }
            UpperBound::Unbounded => {}
        }
    }

    if brackets[last_index].upper_bound.is_unbounded() {
        Ok(())
    } else {
        Err(BracketError::MissingUnbounded)
    }
}

/// The validated, immutable bracket schedule for one tax year.
///
/// Only constructible through [`BracketSet::new`], so holding one means the
/// schedule passed [`validate_brackets`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BracketSet {
    brackets: Vec<TaxBracket>,
}

impl BracketSet {
    pub fn new(brackets: Vec<TaxBracket>) -> Result<Self, BracketError> {
        validate_brackets(&brackets)?;
        Ok(Self { brackets })
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }
}

impl TryFrom<Vec<TaxBracket>> for BracketSet {
    type Error = BracketError;

    fn try_from(brackets: Vec<TaxBracket>) -> Result<Self, Self::Error> {
        Self::new(brackets)
    }
}
