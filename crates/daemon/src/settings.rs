//! Daemon configuration
//!
//! Layering: built-in defaults, then an optional TOML file, then
//! `PROPSCORE_*` environment variables (`__` separates nested keys, e.g.
//! `PROPSCORE_RETRY__MAX_ATTEMPTS=5`).

use anyhow::{bail, Context, Result};
use propscore_core::application::queue::DEFAULT_QUEUE;
use propscore_core::application::worker::constants::{
    DEFAULT_LEASE_MS, DEFAULT_RECOVERY_INTERVAL, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_WORKER_COUNT,
};
use propscore_core::domain::job::{DEFAULT_BACKOFF_FACTOR, DEFAULT_MAX_ATTEMPTS};
use propscore_infra_openai::OpenAiConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "PROPSCORE";
pub const CONFIG_PATH_ENV: &str = "PROPSCORE_CONFIG";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_CONFIG_FILE: &str = "propscore.toml";
const DEFAULT_DB_PATH: &str = "~/.propscore/propscore.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: i32,
    pub base_delay_ms: i64,
    pub backoff_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub db_path: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub workers: usize,
    pub queue: String,
    pub cache_ttl_minutes: u64,
    pub lease_ms: i64,
    pub recovery_interval_secs: u64,
    pub log_format: LogFormat,
    pub log_dir: Option<String>,
    pub retry: RetrySettings,
    pub openai: OpenAiConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            rpc_host: propscore_api_rpc::server::DEFAULT_RPC_HOST.to_string(),
            rpc_port: propscore_api_rpc::server::DEFAULT_RPC_PORT,
            workers: DEFAULT_WORKER_COUNT,
            queue: DEFAULT_QUEUE.to_string(),
            cache_ttl_minutes: 60,
            lease_ms: DEFAULT_LEASE_MS,
            recovery_interval_secs: DEFAULT_RECOVERY_INTERVAL.as_secs(),
            log_format: LogFormat::Pretty,
            log_dir: None,
            retry: RetrySettings::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Load from `PROPSCORE_CONFIG` (required if set) or `./propscore.toml`
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::build(Some(Path::new(&path)), true),
            Err(_) => Self::build(Some(Path::new(DEFAULT_CONFIG_FILE)), false),
        }
    }

    pub fn build(file: Option<&Path>, required: bool) -> Result<Self> {
        Self::build_with_env(file, required, None)
    }

    /// `env` replaces the process environment as the override layer when set
    fn build_with_env(
        file: Option<&Path>,
        required: bool,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path.to_path_buf())
                    .format(config::FileFormat::Toml)
                    .required(required),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let mut cfg: DaemonConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        cfg.db_path = shellexpand::tilde(&cfg.db_path).into_owned();
        cfg.log_dir = cfg
            .log_dir
            .map(|dir| shellexpand::tilde(&dir).into_owned());
        cfg.openai.api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        if self.retry.max_attempts < 1 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.retry.base_delay_ms < 0 {
            bail!("retry.base_delay_ms must not be negative");
        }
        if self.retry.backoff_factor.is_nan() || self.retry.backoff_factor < 1.0 {
            bail!("retry.backoff_factor must be >= 1.0");
        }
        if self.lease_ms <= 0 {
            bail!("lease_ms must be positive");
        }
        let call_budget_ms =
            (self.openai.timeout_secs + self.openai.connect_timeout_secs).saturating_mul(1000);
        if (self.lease_ms as u64) <= call_budget_ms {
            bail!(
                "lease_ms ({}) must exceed the text generation timeouts ({} ms)",
                self.lease_ms,
                call_budget_ms
            );
        }
        Ok(())
    }

    /// sqlx URL for `db_path`; URLs pass through untouched
    pub fn database_url(&self) -> String {
        if self.db_path.starts_with("sqlite:") {
            self.db_path.clone()
        } else {
            format!("sqlite://{}", self.db_path)
        }
    }

    /// Directory holding the database file, if it is a file
    pub fn db_dir(&self) -> Option<PathBuf> {
        if self.db_path.starts_with("sqlite:") {
            return None;
        }
        Path::new(&self.db_path).parent().map(Path::to_path_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("propscore-{}-{}.toml", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let cfg = DaemonConfig::default();
        assert_eq!(cfg.queue, "property-scoring");
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.cache_ttl_minutes, 60);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.base_delay_ms, 1000);
        assert_eq!(cfg.openai.model, "gpt-4o-mini");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = write_config(
            "overrides",
            r#"
            db_path = "sqlite::memory:"
            workers = 2
            cache_ttl_minutes = 15

            [retry]
            max_attempts = 5

            [openai]
            model = "gpt-4o"
            "#,
        );

        let cfg = DaemonConfig::build(Some(&path), true).unwrap();
        assert_eq!(cfg.workers, 2);
        assert_eq!(cfg.cache_ttl_minutes, 15);
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry.backoff_factor, 2.0);
        assert_eq!(cfg.openai.model, "gpt-4o");
        assert_eq!(cfg.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(cfg.database_url(), "sqlite::memory:");
        assert_eq!(cfg.db_dir(), None);

        std::fs::remove_file(path).ok();
    }

    fn env(vars: &[(&str, &str)]) -> config::Map<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_overrides_defaults_and_file() {
        let path = write_config("env-layer", "workers = 2\nqueue = \"from-file\"\n");
        let vars = env(&[
            ("PROPSCORE_WORKERS", "7"),
            ("PROPSCORE_LOG_FORMAT", "json"),
            ("PROPSCORE_CACHE_TTL_MINUTES", "15"),
            ("PROPSCORE_RETRY__MAX_ATTEMPTS", "5"),
            ("PROPSCORE_OPENAI__MODEL", "gpt-4o"),
            ("OTHER_WORKERS", "9"),
        ]);

        let cfg = DaemonConfig::build_with_env(Some(&path), true, Some(vars)).unwrap();
        assert_eq!(cfg.workers, 7);
        assert_eq!(cfg.queue, "from-file");
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.cache_ttl_minutes, 15);
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry.base_delay_ms, 1000);
        assert_eq!(cfg.openai.model, "gpt-4o");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_lease_shorter_than_call_timeouts_rejected() {
        let vars = env(&[
            ("PROPSCORE_LEASE_MS", "60000"),
            ("PROPSCORE_OPENAI__TIMEOUT_SECS", "60"),
        ]);
        let err = DaemonConfig::build_with_env(None, false, Some(vars)).unwrap_err();
        assert!(err.to_string().contains("lease_ms"));

        let vars = env(&[("PROPSCORE_LEASE_MS", "90000")]);
        assert!(DaemonConfig::build_with_env(None, false, Some(vars)).is_ok());
    }

    #[test]
    fn test_invalid_worker_count_rejected() {
        let path = write_config("zero-workers", "workers = 0\n");
        let err = DaemonConfig::build(Some(&path), true).unwrap_err();
        assert!(err.to_string().contains("workers"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_optional_file_is_fine() {
        let missing = std::env::temp_dir().join("propscore-does-not-exist.toml");
        assert!(DaemonConfig::build(Some(&missing), false).is_ok());
        assert!(DaemonConfig::build(Some(&missing), true).is_err());
    }

    #[test]
    fn test_database_url_for_plain_path() {
        let cfg = DaemonConfig {
            db_path: "/var/lib/propscore/propscore.db".into(),
            ..Default::default()
        };
        assert_eq!(cfg.database_url(), "sqlite:///var/lib/propscore/propscore.db");
        assert_eq!(cfg.db_dir(), Some(PathBuf::from("/var/lib/propscore")));
    }
}
