use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thermo_core::{Result, ThermoError};
use thermo_logging::LoggingConfig;
use thermo_notify::AlertConfig;

use crate::sensor::SensorMode;

/// 设备端配置
///
/// 加载顺序：默认值 → TOML 文件（可选）→ `THERMO_` 前缀环境变量。
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub ingest_url: String,

    #[serde(default = "default_device_id")]
    pub device_id: String,

    #[serde(default)]
    pub signing_secret: String,

    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_backoff_initial")]
    pub backoff_initial_secs: u64,

    #[serde(default = "default_backoff_max")]
    pub backoff_max_secs: u64,

    #[serde(default = "default_queue_path")]
    pub queue_path: PathBuf,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub sensor: SensorConfig,

    #[serde(default)]
    pub alert: AlertConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SensorConfig {
    #[serde(default)]
    pub mode: SensorMode,
}

// 默认值函数
fn default_device_id() -> String {
    "pi-unknown".to_string()
}

fn default_sample_interval() -> u64 {
    15
}

fn default_request_timeout() -> u64 {
    5
}

fn default_backoff_initial() -> u64 {
    1
}

fn default_backoff_max() -> u64 {
    300
}

fn default_queue_path() -> PathBuf {
    PathBuf::from("queue.jsonl")
}

fn default_queue_capacity() -> usize {
    10_000
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            ingest_url: String::new(),
            device_id: default_device_id(),
            signing_secret: String::new(),
            sample_interval_secs: default_sample_interval(),
            request_timeout_secs: default_request_timeout(),
            backoff_initial_secs: default_backoff_initial(),
            backoff_max_secs: default_backoff_max(),
            queue_path: default_queue_path(),
            queue_capacity: default_queue_capacity(),
            sensor: SensorConfig::default(),
            alert: AlertConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl DeviceConfig {
    /// 从文件和进程环境变量加载
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// `env` 为 `Some` 时代替进程环境变量（测试用）
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            let path_str = path
                .to_str()
                .ok_or_else(|| ThermoError::config(format!("invalid config path: {:?}", path)))?;
            builder = builder.add_source(File::new(path_str, FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("THERMO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: DeviceConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ThermoError::config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// 启动前校验，任何网络请求之前执行
    pub fn validate(&self) -> Result<()> {
        if self.signing_secret.is_empty() {
            return Err(ThermoError::config("signing_secret is not set"));
        }
        if self.ingest_url.is_empty() {
            return Err(ThermoError::config("ingest_url is not set"));
        }
        if !self.ingest_url.starts_with("http://") && !self.ingest_url.starts_with("https://") {
            return Err(ThermoError::config(format!(
                "ingest_url must be an http(s) URL: {}",
                self.ingest_url
            )));
        }
        if self.device_id.trim().is_empty() {
            return Err(ThermoError::config("device_id must not be empty"));
        }
        if self.sample_interval_secs == 0 {
            return Err(ThermoError::config("sample_interval_secs must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ThermoError::config("request_timeout_secs must be > 0"));
        }
        if self.backoff_initial_secs == 0 || self.backoff_max_secs < self.backoff_initial_secs {
            return Err(ThermoError::config(format!(
                "invalid backoff range: {}s..{}s",
                self.backoff_initial_secs, self.backoff_max_secs
            )));
        }
        if self.queue_capacity == 0 {
            return Err(ThermoError::config("queue_capacity must be > 0"));
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backoff_initial(&self) -> Duration {
        Duration::from_secs(self.backoff_initial_secs)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_from_env_only() {
        let config = DeviceConfig::load_with_env(
            None,
            env(&[
                ("THERMO_INGEST_URL", "http://collector:5000/api/ingest"),
                ("THERMO_SIGNING_SECRET", "s3cret"),
            ]),
        )
        .unwrap();

        assert_eq!(config.device_id, "pi-unknown");
        assert_eq!(config.sample_interval_secs, 15);
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.backoff_initial_secs, 1);
        assert_eq!(config.backoff_max_secs, 300);
        assert_eq!(config.queue_path, PathBuf::from("queue.jsonl"));
        assert_eq!(config.queue_capacity, 10_000);
        assert_eq!(config.sensor.mode, SensorMode::Realistic);
        assert!(!config.alert.enabled);
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let err = DeviceConfig::load_with_env(
            None,
            env(&[("THERMO_INGEST_URL", "http://collector:5000/api/ingest")]),
        )
        .unwrap_err();

        assert!(matches!(err, ThermoError::Configuration(_)));
        assert!(err.to_string().contains("signing_secret"));
    }

    #[test]
    fn test_missing_url_is_fatal() {
        let err =
            DeviceConfig::load_with_env(None, env(&[("THERMO_SIGNING_SECRET", "s3cret")]))
                .unwrap_err();
        assert!(err.to_string().contains("ingest_url"));
    }

    #[test]
    fn test_file_then_env_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
ingest_url = "http://file:5000/api/ingest"
signing_secret = "from-file"
device_id = "pi-kitchen"
sample_interval_secs = 30

[sensor]
mode = "demo"

[alert]
enabled = true
threshold_c = 28.5
"#
        )
        .unwrap();

        let config = DeviceConfig::load_with_env(
            Some(file.path()),
            env(&[
                ("THERMO_SAMPLE_INTERVAL_SECS", "5"),
                ("THERMO_ALERT__COOLDOWN_MINUTES", "10"),
            ]),
        )
        .unwrap();

        assert_eq!(config.device_id, "pi-kitchen");
        assert_eq!(config.signing_secret, "from-file");
        assert_eq!(config.sample_interval_secs, 5);
        assert_eq!(config.sensor.mode, SensorMode::Demo);
        assert!(config.alert.enabled);
        assert_eq!(config.alert.threshold_c, 28.5);
        assert_eq!(config.alert.cooldown_minutes, 10);
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let base = DeviceConfig {
            ingest_url: "http://localhost:5000/api/ingest".to_string(),
            signing_secret: "s".to_string(),
            ..Default::default()
        };
        assert!(base.validate().is_ok());

        let zero_interval = DeviceConfig {
            sample_interval_secs: 0,
            ..base.clone()
        };
        assert!(zero_interval.validate().is_err());

        let inverted_backoff = DeviceConfig {
            backoff_initial_secs: 10,
            backoff_max_secs: 5,
            ..base.clone()
        };
        assert!(inverted_backoff.validate().is_err());

        let bad_scheme = DeviceConfig {
            ingest_url: "ftp://collector".to_string(),
            ..base
        };
        assert!(bad_scheme.validate().is_err());
    }
}
