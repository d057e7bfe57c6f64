use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thermo_core::{Result, ThermoError};
use thermo_logging::LoggingConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub signing_secret: String,

    /// 时间戳允许的最大偏差（秒），两端包含
    #[serde(default = "default_freshness_window")]
    pub freshness_window_secs: u64,

    /// 保留的最近读数条数
    #[serde(default = "default_retention")]
    pub retention: usize,

    /// Prometheus exporter 监听地址，不设置则不导出
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

// 默认值函数
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_freshness_window() -> u64 {
    300
}

fn default_retention() -> usize {
    50
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            signing_secret: String::new(),
            freshness_window_secs: default_freshness_window(),
            retention: default_retention(),
            metrics_addr: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
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

        let config: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ThermoError::config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.signing_secret.is_empty() {
            return Err(ThermoError::config("signing_secret is not set"));
        }
        if self.retention == 0 {
            return Err(ThermoError::config("retention must be > 0"));
        }
        if self.freshness_window_secs == 0 {
            return Err(ThermoError::config("freshness_window_secs must be > 0"));
        }
        Ok(())
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
