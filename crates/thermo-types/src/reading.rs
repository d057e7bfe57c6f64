use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一次温度采样（摄氏度为规范单位）
///
/// 字段按字典序声明，序列化结果的键顺序与规范化 JSON 一致。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Reading {
    pub fn new(device_id: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp,
            value,
        }
    }

    /// 以当前时间创建采样
    pub fn now(device_id: impl Into<String>, value: f64) -> Self {
        Self::new(device_id, value, Utc::now())
    }

    /// 保留两位小数
    pub fn rounded(mut self) -> Self {
        self.value = (self.value * 100.0).round() / 100.0;
        self
    }

    /// 华氏度视图（不存储）
    pub fn fahrenheit(&self) -> f64 {
        celsius_to_fahrenheit(self.value)
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Ingest body as it arrives on the wire.
///
/// `timestamp` is kept as a string because devices may send either an
/// RFC 3339 instant or epoch seconds; the collector parses it. Unknown
/// fields are rejected so legacy shapes (`temperature`, `c`, `deviceId`)
/// never get through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadingPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_reading_fahrenheit() {
        let reading = Reading::now("pi-1", 100.0);
        assert_eq!(reading.fahrenheit(), 212.0);
        assert_eq!(celsius_to_fahrenheit(-40.0), -40.0);
    }

    #[test]
    fn test_reading_rounded() {
        let reading = Reading::now("pi-1", 23.456_789).rounded();
        assert_eq!(reading.value, 23.46);
    }

    #[test]
    fn test_reading_serializes_sorted_keys() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap();
        let reading = Reading::new("pi-1", 23.4, ts);
        let json = serde_json::to_string(&reading).unwrap();

        assert_eq!(
            json,
            r#"{"device_id":"pi-1","timestamp":"2026-10-19T10:00:00Z","value":23.4}"#
        );
    }

    #[test]
    fn test_payload_rejects_legacy_shapes() {
        assert!(serde_json::from_str::<ReadingPayload>(r#"{"temperature": 21.5}"#).is_err());
        assert!(serde_json::from_str::<ReadingPayload>(r#"{"c": 21.5}"#).is_err());
        assert!(
            serde_json::from_str::<ReadingPayload>(r#"{"value": 21.5, "deviceId": "pi"}"#)
                .is_err()
        );
    }

    #[test]
    fn test_payload_optional_fields() {
        let payload: ReadingPayload = serde_json::from_str(r#"{"value": 21.5}"#).unwrap();
        assert_eq!(payload.value, 21.5);
        assert!(payload.device_id.is_none());
        assert!(payload.timestamp.is_none());
    }
}
