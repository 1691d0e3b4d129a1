//! `PRODSPEC_*` configuration: where the catalog lives, where the cache database and
//! staged images go, and how chatty the logs are. A `.env` next to the binary is
//! honoured; real environment variables win over it.
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Once;
use std::time::Duration;
use tracing::info;

static INIT: Once = Once::new();

pub const DEFAULT_API_BASE_URL: &str = "https://app.getswipe.in/api/";
pub const DEFAULT_DB_PATH: &str = "product_database.sqlite3";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Read `.env` on first use; every getter below calls this.
pub fn init_env() {
    INIT.call_once(|| {
        let _ = dotenv::dotenv();
    });
}

/// Unset and blank are both treated as absent.
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Unparseable values fall back to `default` rather than aborting start-up.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    init_env();
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Boolean flag; accepts 1/true/on/yes (case-insensitive) as true.
pub fn env_flag(key: &str, default: bool) -> bool {
    init_env();
    match std::env::var(key) {
        Ok(raw) => parse_flag(&raw),
        Err(_) => default,
    }
}

fn parse_flag(raw: &str) -> bool {
    let v = raw.trim().to_ascii_lowercase();
    matches!(v.as_str(), "1" | "true" | "on" | "yes")
}

/// Runtime configuration for the catalog client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the remote catalog; always ends with `/`.
    pub api_base_url: String,
    pub db_path: PathBuf,
    pub http_timeout: Duration,
    /// Where staged image uploads are written before submission.
    pub cache_dir: PathBuf,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            cache_dir: default_cache_dir(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from `PRODSPEC_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        init_env();
        let defaults = Self::default();
        Self {
            api_base_url: normalize_base_url(
                &env_opt("PRODSPEC_API_BASE_URL").unwrap_or(defaults.api_base_url),
            ),
            db_path: env_opt("PRODSPEC_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            http_timeout: Duration::from_secs(env_parse(
                "PRODSPEC_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
            cache_dir: env_opt("PRODSPEC_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            log_filter: env_opt("PRODSPEC_LOG").unwrap_or(defaults.log_filter),
        }
    }

    /// Log a one-line snapshot of the resolved configuration.
    pub fn log_snapshot(&self, bin_name: &str) {
        info!(
            target = "bootstrap",
            bin = bin_name,
            api_base_url = %self.api_base_url,
            db_path = %self.db_path.display(),
            http_timeout_secs = self.http_timeout.as_secs(),
            cache_dir = %self.cache_dir.display(),
            "configuration snapshot"
        );
    }
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("prodspec")
}

/// Relative endpoint joins need a trailing slash on the base.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_parsing_accepts_common_truthy_values() {
        for raw in ["1", "true", "TRUE", " on ", "Yes"] {
            assert!(parse_flag(raw), "{raw} should be truthy");
        }
        for raw in ["0", "false", "off", "", "maybe"] {
            assert!(!parse_flag(raw), "{raw} should be falsy");
        }
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://example.test/api"),
            "https://example.test/api/"
        );
        assert_eq!(
            normalize_base_url(" https://example.test/api/ "),
            "https://example.test/api/"
        );
    }

    #[test]
    fn defaults_point_at_public_catalog() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(cfg.http_timeout, Duration::from_secs(15));
        assert!(cfg.cache_dir.ends_with("prodspec"));
    }
}
