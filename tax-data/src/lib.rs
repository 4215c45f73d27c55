pub mod client;

pub use client::{FetchConfig, HttpBracketSource, TaxBracketsResponse};
