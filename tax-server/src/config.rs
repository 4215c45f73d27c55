use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tax_core::CacheConfig;
use tax_data::FetchConfig;

// --- CLI definition ---

/// Income tax calculator HTTP service.
///
/// Fetches bracket schedules from the tax data provider, caches them per
/// year, and answers calculation requests on `/api/v1/calculate-tax`.
/// Every flag can also be set through the environment variable shown.
#[derive(Debug, Clone, Parser)]
#[command(name = "tax-server", version, about)]
pub struct Config {
    /// Base URL of the tax data provider.
    #[arg(long, env = "TAX_API_URL", default_value = "http://localhost:5001")]
    pub tax_api_url: String,

    /// Interface to listen on.
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory holding the web front-end (`index.html` and assets).
    #[arg(long, env = "STATIC_DIR", default_value = "./frontend")]
    pub static_dir: PathBuf,

    /// How long fetched brackets stay fresh (e.g. `24h`, `90m`).
    #[arg(long, env = "CACHE_TTL", default_value = "24h", value_parser = parse_duration)]
    pub cache_ttl: Duration,

    /// Timeout for each request to the provider.
    #[arg(long, env = "FETCH_TIMEOUT", default_value = "10s", value_parser = parse_duration)]
    pub fetch_timeout: Duration,

    /// Total attempts per bracket fetch, first try included.
    #[arg(long, env = "FETCH_ATTEMPTS", default_value_t = 3)]
    pub fetch_attempts: u32,

    /// Pause between fetch attempts.
    #[arg(long, env = "FETCH_BACKOFF", default_value = "1s", value_parser = parse_duration)]
    pub fetch_backoff: Duration,

    /// Also append log records to this file.
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: self.cache_ttl,
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            base_url: self.tax_api_url.clone(),
            timeout: self.fetch_timeout,
            max_attempts: self.fetch_attempts,
            backoff: self.fetch_backoff,
        }
    }
}

/// Accepts humantime strings (`30s`, `1h30m`) or a bare number of seconds.
fn parse_duration(s: &str) -> Result<Duration, String> {
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    Err(format!(
        "Invalid duration '{s}'. Examples: 500ms, 10s, 24h, 1h30m, 90"
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(args: &[&str]) -> Config {
        let argv = std::iter::once("tax-server").chain(args.iter().copied());
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn parse_duration_accepts_humantime() {
        assert_eq!(parse_duration("24h"), Ok(Duration::from_secs(86_400)));
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
    }

    #[test]
    fn parse_duration_accepts_bare_seconds() {
        assert_eq!(parse_duration("90"), Ok(Duration::from_secs(90)));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn flags_flow_into_library_configs() {
        let config = parse(&[
            "--tax-api-url",
            "http://provider:5001",
            "--host",
            "127.0.0.1",
            "--port",
            "9090",
            "--cache-ttl",
            "2h",
            "--fetch-timeout",
            "3s",
            "--fetch-attempts",
            "5",
            "--fetch-backoff",
            "250ms",
        ]);

        assert_eq!(config.bind_address(), "127.0.0.1:9090");
        assert_eq!(config.cache_config().ttl, Duration::from_secs(2 * 60 * 60));
        assert_eq!(
            config.fetch_config(),
            FetchConfig {
                base_url: "http://provider:5001".to_string(),
                timeout: Duration::from_secs(3),
                max_attempts: 5,
                backoff: Duration::from_millis(250),
            }
        );
    }

    #[test]
    fn invalid_duration_flag_is_rejected() {
        let result = Config::try_parse_from(["tax-server", "--cache-ttl", "forever"]);

        assert!(result.is_err());
    }
}
