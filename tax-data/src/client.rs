use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tax_core::{BracketSet, BracketSource, SourceError, TaxBracket};
use tracing::{debug, warn};

/// Connection and retry settings for the tax data provider.
///
/// | field          | default                 |
/// |----------------|-------------------------|
/// | `base_url`     | `http://localhost:5001` |
/// | `timeout`      | 10 s per attempt        |
/// | `max_attempts` | 3 (first try included)  |
/// | `backoff`      | 1 s between attempts    |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Provider root; the year path is appended to it.
    pub base_url: String,
    pub timeout: Duration,
    /// Total attempts per fetch. Zero is treated as one.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".to_string(),
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Provider response body: `{"tax_brackets": [{"min": 0, "max": 50197, "rate": 0.15}, ...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaxBracketsResponse {
    #[serde(default)]
    pub tax_brackets: Vec<TaxBracket>,
}

impl TaxBracketsResponse {
    /// Validates the decoded list into a [`BracketSet`].
    ///
    /// An empty list means the provider has nothing for `year` and is
    /// reported as [`SourceError::NoBrackets`].
    pub fn into_bracket_set(
        self,
        year: i32,
    ) -> Result<BracketSet, SourceError> {
        if self.tax_brackets.is_empty() {
            return Err(SourceError::NoBrackets(year));
        }
        Ok(BracketSet::new(self.tax_brackets)?)
    }
}

/// [`BracketSource`] backed by the remote tax data HTTP API.
///
/// Fetches `GET {base_url}/tax-calculator/tax-year/{year}`. Transport
/// failures, timeouts, 5xx and 429 answers are retried up to
/// [`FetchConfig::max_attempts`]; anything else fails immediately.
pub struct HttpBracketSource {
    config: FetchConfig,
    http: reqwest::Client,
}

impl HttpBracketSource {
    pub fn new(config: FetchConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("tax-calculator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn year_url(
        &self,
        year: i32,
    ) -> String {
        format!(
            "{}/tax-calculator/tax-year/{year}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// One attempt, no retries.
    async fn request(
        &self,
        url: &str,
    ) -> Result<TaxBracketsResponse, SourceError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        response.json::<TaxBracketsResponse>().await.map_err(|e| {
            if e.is_decode() {
                SourceError::Decode(e.to_string())
            } else {
                SourceError::Transport(e.to_string())
            }
        })
    }
}

#[async_trait]
impl BracketSource for HttpBracketSource {
    async fn fetch_brackets(
        &self,
        year: i32,
    ) -> Result<BracketSet, SourceError> {
        let url = self.year_url(year);
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(%url, attempt, "requesting tax brackets");
            match self.request(&url).await {
                Ok(response) => return response.into_bracket_set(year),
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    warn!(
                        year,
                        attempt,
                        max_attempts,
                        %error,
                        "tax bracket request failed, retrying"
                    );
                    tokio::time::sleep(self.config.backoff).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use tax_core::BracketError;

    use super::*;

    fn source_for(base_url: &str) -> HttpBracketSource {
        HttpBracketSource::new(FetchConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn year_url_embeds_year_in_path() {
        let source = source_for("http://tax.example:5001");

        assert_eq!(
            source.year_url(2022),
            "http://tax.example:5001/tax-calculator/tax-year/2022"
        );
    }

    #[test]
    fn year_url_ignores_trailing_slash() {
        let source = source_for("http://tax.example:5001/");

        assert_eq!(
            source.year_url(2019),
            "http://tax.example:5001/tax-calculator/tax-year/2019"
        );
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = FetchConfig::default();

        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff, Duration::from_secs(1));
    }

    #[test]
    fn response_decodes_provider_payload() {
        let body = r#"{"tax_brackets": [
            {"max": 50197, "min": 0, "rate": 0.15},
            {"max": 100392, "min": 50197, "rate": 0.205},
            {"min": 100392, "rate": 0.26}
        ]}"#;

        let response: TaxBracketsResponse = serde_json::from_str(body).unwrap();
        let set = response.into_bracket_set(2022).unwrap();

        assert_eq!(
            set.brackets(),
            &[
                TaxBracket::bounded(dec!(0), dec!(50197), dec!(0.15)),
                TaxBracket::bounded(dec!(50197), dec!(100392), dec!(0.205)),
                TaxBracket::unbounded(dec!(100392), dec!(0.26)),
            ]
        );
    }

    #[test]
    fn empty_response_is_no_brackets() {
        let response: TaxBracketsResponse = serde_json::from_str("{}").unwrap();

        assert_eq!(
            response.into_bracket_set(2022),
            Err(SourceError::NoBrackets(2022))
        );
    }

    #[test]
    fn malformed_response_is_invalid_brackets() {
        let body = r#"{"tax_brackets": [{"min": 0, "max": 50197, "rate": 0.15}]}"#;

        let response: TaxBracketsResponse = serde_json::from_str(body).unwrap();

        assert_eq!(
            response.into_bracket_set(2022),
            Err(SourceError::InvalidBrackets(BracketError::MissingUnbounded))
        );
    }
}
