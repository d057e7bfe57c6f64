use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thermo_types::celsius_to_fahrenheit;

/// 告警级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    /// 超出阈值 `CRITICAL_MARGIN_C` 及以上
    Critical,
}

/// 高出阈值多少摄氏度时升级为 Critical
pub const CRITICAL_MARGIN_C: f64 = 5.0;

/// 告警消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertMessage {
    pub title: String,
    pub content: String,
    pub level: AlertLevel,
    pub device_id: String,
    pub value_c: f64,
    pub timestamp: DateTime<Utc>,
}

impl AlertMessage {
    /// 温度超过阈值
    pub fn threshold_exceeded(
        device_id: impl Into<String>,
        value_c: f64,
        threshold_c: f64,
        at: DateTime<Utc>,
    ) -> Self {
        let device_id = device_id.into();
        let value_f = celsius_to_fahrenheit(value_c);

        let level = if value_c >= threshold_c + CRITICAL_MARGIN_C {
            AlertLevel::Critical
        } else {
            AlertLevel::Warning
        };

        let title = format!("Temperature Alert: {:.1}°C ({:.1}°F)", value_c, value_f);
        let content = format!(
            "The temperature reported by {} has reached {:.1}°C ({:.1}°F), \
             which exceeds the threshold of {:.1}°C.\n\nTime: {}",
            device_id,
            value_c,
            value_f,
            threshold_c,
            at.format("%Y-%m-%d %H:%M:%S UTC"),
        );

        Self {
            title,
            content,
            level,
            device_id,
            value_c,
            timestamp: at,
        }
    }
}
