use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};

static WAIT_TASK_RETRIES: AtomicU32 = AtomicU32::new(100);

/// Process-wide default number of status queries made by `wait_task`
pub fn default_wait_task_retries() -> u32 {
    WAIT_TASK_RETRIES.load(Ordering::Relaxed)
}

/// Change the process-wide default used when neither the config nor the call sets a budget
pub fn set_default_wait_task_retries(retries: u32) {
    WAIT_TASK_RETRIES.store(retries, Ordering::Relaxed);
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub api_key: String,

    /// Host used for reads; defaults to `https://{app_id}-dsn.algolia.net`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_host: Option<String>,
    /// Host used for writes; defaults to `https://{app_id}.algolia.net`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_host: Option<String>,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,

    /// Extra attempts for reads failing with a retryable error
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    /// Status queries made by `wait_task`; falls back to the process-wide default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_task_retries: Option<u32>,

    #[serde(default)]
    pub insecure_skip_verify: bool,
}

fn default_connect_timeout_secs() -> u64 {
    2
}

fn default_read_timeout_secs() -> u64 {
    5
}

fn default_write_timeout_secs() -> u64 {
    30
}

fn default_read_retries() -> u32 {
    2
}

impl Config {
    pub fn new(app_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
            read_host: None,
            write_host: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            write_timeout_secs: default_write_timeout_secs(),
            read_retries: default_read_retries(),
            wait_task_retries: None,
            insecure_skip_verify: false,
        }
    }

    pub fn load(path: &str) -> Result<Self> {
        let config = Self::load_unvalidated(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, overlay `QUARRY_*` variables, then validate the result
    pub fn load_with_env(path: &str) -> Result<Self> {
        let mut config = Self::load_unvalidated(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn load_unvalidated(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path, e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path, e)))
    }

    /// Build a config from `QUARRY_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::new(String::new(), String::new());
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Overlay any `QUARRY_*` environment variables onto this config
    pub fn apply_env(&mut self) {
        if let Ok(app_id) = std::env::var("QUARRY_APP_ID") {
            self.app_id = app_id;
        }
        if let Ok(api_key) = std::env::var("QUARRY_API_KEY") {
            self.api_key = api_key;
        }
        if let Ok(host) = std::env::var("QUARRY_READ_HOST") {
            self.read_host = Some(host);
        }
        if let Ok(host) = std::env::var("QUARRY_WRITE_HOST") {
            self.write_host = Some(host);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.app_id.trim().is_empty() {
            return Err(Error::Config("app_id is required".to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("api_key is required".to_string()));
        }
        Ok(())
    }

    pub fn read_host(&self) -> String {
        self.read_host
            .clone()
            .unwrap_or_else(|| format!("https://{}-dsn.algolia.net", self.app_id))
    }

    pub fn write_host(&self) -> String {
        self.write_host
            .clone()
            .unwrap_or_else(|| format!("https://{}.algolia.net", self.app_id))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn wait_task_retries(&self) -> u32 {
        self.wait_task_retries
            .unwrap_or_else(default_wait_task_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_applies_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"app_id": "APP123", "api_key": "secret"}}"#).unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.app_id, "APP123");
        assert_eq!(config.connect_timeout_secs, 2);
        assert_eq!(config.read_timeout_secs, 5);
        assert_eq!(config.write_timeout_secs, 30);
        assert_eq!(config.read_retries, 2);
        assert!(config.wait_task_retries.is_none());
        assert_eq!(config.read_host(), "https://APP123-dsn.algolia.net");
        assert_eq!(config.write_host(), "https://APP123.algolia.net");
    }

    #[test]
    fn test_load_rejects_missing_api_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"app_id": "APP123", "api_key": ""}}"#).unwrap();

        let err = Config::load(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = Config::load("/nonexistent/quarry.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_explicit_hosts_and_retry_budget() {
        let mut config = Config::new("APP", "KEY");
        config.read_host = Some("http://localhost:7700".to_string());
        config.wait_task_retries = Some(7);

        assert_eq!(config.read_host(), "http://localhost:7700");
        assert_eq!(config.write_host(), "https://APP.algolia.net");
        assert_eq!(config.wait_task_retries(), 7);
    }

    #[test]
    fn test_process_default_budget() {
        // Only test in this crate touching the process-wide value
        set_default_wait_task_retries(250);
        assert_eq!(Config::new("APP", "KEY").wait_task_retries(), 250);
        assert_eq!(crate::task::TaskPoller::default().max_attempts(), 250);
        set_default_wait_task_retries(100);
    }

    // Tests touching QUARRY_* variables hold this lock
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    const ENV_VARS: [&str; 4] = [
        "QUARRY_APP_ID",
        "QUARRY_API_KEY",
        "QUARRY_READ_HOST",
        "QUARRY_WRITE_HOST",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_apply_env_overrides_file_values() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        std::env::set_var("QUARRY_API_KEY", "from-env");
        std::env::set_var("QUARRY_WRITE_HOST", "http://localhost:7701");

        let mut config = Config::new("APP", "from-file");
        config.apply_env();
        clear_env();

        assert_eq!(config.app_id, "APP");
        assert_eq!(config.api_key, "from-env");
        assert_eq!(config.write_host(), "http://localhost:7701");
        assert_eq!(config.read_host(), "https://APP-dsn.algolia.net");
    }

    #[test]
    fn test_load_with_env_fills_missing_key() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"app_id": "APP123"}}"#).unwrap();
        let path = file.path().to_str().unwrap();

        clear_env();
        assert!(matches!(Config::load(path), Err(Error::Config(_))));

        std::env::set_var("QUARRY_API_KEY", "secret");
        let config = Config::load_with_env(path);
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.app_id, "APP123");
        assert_eq!(config.api_key, "secret");
    }

    #[test]
    fn test_load_with_env_revalidates_empty_values() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"app_id": "APP123", "api_key": "secret"}}"#).unwrap();

        clear_env();
        std::env::set_var("QUARRY_API_KEY", "");
        let result = Config::load_with_env(file.path().to_str().unwrap());
        clear_env();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_env() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        assert!(matches!(Config::from_env(), Err(Error::Config(_))));

        std::env::set_var("QUARRY_APP_ID", "ENVAPP");
        std::env::set_var("QUARRY_API_KEY", "envkey");
        std::env::set_var("QUARRY_READ_HOST", "http://127.0.0.1:9000");
        let config = Config::from_env();
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.app_id, "ENVAPP");
        assert_eq!(config.read_host(), "http://127.0.0.1:9000");
        assert_eq!(config.write_host(), "https://ENVAPP.algolia.net");
    }
}
