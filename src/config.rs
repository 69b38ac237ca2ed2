use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PipelineError, Result};

pub const DEFAULT_TARGET_COUNT: usize = 50;
pub const DEFAULT_MAX_PAGES: u32 = 20;
pub const DEFAULT_CONNECTION_PROFILE: &str = "books_connection";
pub const DEFAULT_TABLE: &str = "books";
pub const DEFAULT_HANDOFF_FILE: &str = "book_data.json";

/// Prefix of the environment variable holding a connection profile's URL.
pub const CONNECTION_ENV_PREFIX: &str = "CONN_";

/// Browser-impersonating headers sent with every page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderProfile {
    pub referer: String,
    pub user_agent: String,
    pub sec_ch_ua: String,
    pub sec_ch_ua_mobile: String,
    pub sec_ch_ua_platform: String,
}

impl Default for HeaderProfile {
    fn default() -> Self {
        HeaderProfile {
            referer: "https://www.amazon.com/".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/".to_string(),
            sec_ch_ua: "Not_A Brand".to_string(),
            sec_ch_ua_mobile: "?0".to_string(),
            sec_ch_ua_platform: "Windows".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Search results endpoint, without query string.
    pub endpoint: String,
    pub search_term: String,
    pub headers: HeaderProfile,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            endpoint: "https://www.amazon.com/s".to_string(),
            search_term: "data engineering books".to_string(),
            headers: HeaderProfile::default(),
            timeout_secs: 30,
        }
    }
}

/// CSS selectors locating a result item and its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub container: String,
    pub title: String,
    pub author: String,
    pub price: String,
    pub rating: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        SelectorConfig {
            container: "div.s-result-item".to_string(),
            title: "span.a-text-normal".to_string(),
            author: "a.a-size-base".to_string(),
            price: "span.a-price-whole".to_string(),
            rating: "span.a-icon-alt".to_string(),
        }
    }
}

/// Scheduling and retry policy the external orchestrator applies to each step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub dag_id: String,
    pub description: String,
    pub owner: String,
    pub start_date: NaiveDate,
    pub interval_days: u32,
    pub retries: u32,
    pub retry_delay_minutes: u64,
    pub depends_on_past: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            dag_id: "fetch_and_store_amazon_books".to_string(),
            description: "A simple dag to fetch book data from amazon and store data in Postgres"
                .to_string(),
            owner: "airflow".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 9, 15).unwrap_or_default(),
            interval_days: 1,
            retries: 1,
            retry_delay_minutes: 5,
            depends_on_past: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    pub selectors: SelectorConfig,
    pub target_count: usize,
    /// Upper bound on pages requested in one run.
    pub max_pages: u32,
    pub connection_profile: String,
    pub table: String,
    pub handoff_path: PathBuf,
    pub schedule: ScheduleConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            fetch: FetchConfig::default(),
            selectors: SelectorConfig::default(),
            target_count: DEFAULT_TARGET_COUNT,
            max_pages: DEFAULT_MAX_PAGES,
            connection_profile: DEFAULT_CONNECTION_PROFILE.to_string(),
            table: DEFAULT_TABLE.to_string(),
            handoff_path: PathBuf::from(DEFAULT_HANDOFF_FILE),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reads a JSON config file. Fields absent from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: PipelineConfig = serde_json::from_str(&content).map_err(|e| {
            PipelineError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        info!("Loaded pipeline config from {}", path.display());
        Ok(config)
    }

    /// Uses `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let config = PipelineConfig::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.fetch.endpoint).map_err(|e| {
            PipelineError::Config(format!("invalid endpoint {:?}: {}", self.fetch.endpoint, e))
        })?;
        if !is_plain_identifier(&self.table) {
            return Err(PipelineError::Config(format!(
                "table name {:?} is not a plain SQL identifier",
                self.table
            )));
        }
        if self.connection_profile.trim().is_empty() {
            return Err(PipelineError::Config("connection profile name is empty".to_string()));
        }
        if self.max_pages == 0 {
            return Err(PipelineError::Config("max_pages must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Resolves the named connection profile to a Postgres connection string.
    pub fn resolve_connection(&self) -> Result<String> {
        let var = connection_env_var(&self.connection_profile);
        match std::env::var(&var) {
            Ok(url) if !url.trim().is_empty() => Ok(url),
            _ => Err(PipelineError::Config(format!(
                "connection profile {:?} is not defined (set {})",
                self.connection_profile, var
            ))),
        }
    }
}

/// `books_connection` -> `CONN_BOOKS_CONNECTION`
pub fn connection_env_var(profile: &str) -> String {
    let name: String = profile
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("{}{}", CONNECTION_ENV_PREFIX, name)
}

pub(crate) fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_job_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_count, 50);
        assert_eq!(config.connection_profile, "books_connection");
        assert_eq!(config.table, "books");
        assert_eq!(config.schedule.retries, 1);
        assert_eq!(config.schedule.retry_delay_minutes, 5);
        assert_eq!(
            config.schedule.start_date,
            NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"target_count": 5, "fetch": {{"search_term": "rust books"}}}}"#
        )
        .unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.target_count, 5);
        assert_eq!(config.fetch.search_term, "rust books");
        assert_eq!(config.fetch.endpoint, "https://www.amazon.com/s");
        assert_eq!(config.fetch.headers, HeaderProfile::default());
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        let config = PipelineConfig {
            table: "books; DROP TABLE books".to_string(),
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_connection_env_var_name() {
        assert_eq!(connection_env_var("books_connection"), "CONN_BOOKS_CONNECTION");
        assert_eq!(connection_env_var("my-db"), "CONN_MY_DB");
    }

    #[test]
    fn test_missing_profile_is_config_error() {
        let config = PipelineConfig {
            connection_profile: "profile_that_is_never_set_4711".to_string(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.resolve_connection(),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_identifier_check() {
        assert!(is_plain_identifier("books"));
        assert!(is_plain_identifier("_staging_books2"));
        assert!(!is_plain_identifier("2books"));
        assert!(!is_plain_identifier(""));
        assert!(!is_plain_identifier("public.books"));
    }
}
