use chrono::{DateTime, Utc};
use std::time::Duration;
use thermo_core::{check_freshness, parse_timestamp, Result, SigningKey, ThermoError};
use thermo_types::{Envelope, Reading, ReadingPayload};
use tracing::debug;

/// 一次入站请求中参与验证的部分
#[derive(Debug, Clone, Copy)]
pub struct IngestRequest<'a> {
    pub device_id: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub signature: Option<&'a str>,
    pub body: &'a [u8],
}

impl<'a> IngestRequest<'a> {
    pub fn from_envelope(envelope: &'a Envelope) -> Self {
        Self {
            device_id: Some(&envelope.device_id),
            timestamp: Some(&envelope.timestamp),
            signature: Some(&envelope.signature),
            body: &envelope.body,
        }
    }
}

/// 采集端验证器
///
/// 顺序：解析时间戳 → 新鲜度 → 对原始 body 字节做 HMAC 常数时间比较 → 严格解析 body。
/// 验证失败不产生任何副作用。
#[derive(Debug, Clone)]
pub struct Verifier {
    key: SigningKey,
    window: Duration,
}

impl Verifier {
    pub fn new(secret: impl AsRef<[u8]>, window: Duration) -> Result<Self> {
        Ok(Self {
            key: SigningKey::new(secret)?,
            window,
        })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn verify(&self, request: &IngestRequest<'_>, now: DateTime<Utc>) -> Result<Reading> {
        let raw_ts = request
            .timestamp
            .ok_or_else(|| ThermoError::InvalidTimestamp("missing X-Timestamp".to_string()))?;
        let signed_at = parse_timestamp(raw_ts)?;

        check_freshness(signed_at, now, self.window)?;

        let signature = request.signature.ok_or(ThermoError::SignatureMismatch)?;
        self.key.verify(raw_ts, request.body, signature)?;

        let reading = parse_body(request.body, request.device_id, signed_at)?;
        debug!(device_id = %reading.device_id, value = reading.value, "Envelope verified");
        Ok(reading)
    }

    pub fn verify_envelope(&self, envelope: &Envelope, now: DateTime<Utc>) -> Result<Reading> {
        self.verify(&IngestRequest::from_envelope(envelope), now)
    }
}

fn parse_body(body: &[u8], header_device: Option<&str>, signed_at: DateTime<Utc>) -> Result<Reading> {
    let payload: ReadingPayload =
        serde_json::from_slice(body).map_err(|e| ThermoError::malformed(e.to_string()))?;

    if !payload.value.is_finite() {
        return Err(ThermoError::malformed("value must be a finite number"));
    }

    let header_device = header_device.map(str::trim).filter(|s| !s.is_empty());
    let device_id = match (header_device, payload.device_id.as_deref()) {
        (Some(h), Some(b)) if h != b => {
            return Err(ThermoError::malformed(format!(
                "device id mismatch: header {} vs body {}",
                h, b
            )))
        }
        (Some(h), _) => h.to_string(),
        (None, Some(b)) if !b.trim().is_empty() => b.to_string(),
        _ => return Err(ThermoError::malformed("missing device id")),
    };

    // body 中的时间是采集时间；缺省时使用签名时间
    let timestamp = match payload.timestamp.as_deref() {
        Some(raw) => parse_timestamp(raw)
            .map_err(|e| ThermoError::malformed(format!("body timestamp: {}", e)))?,
        None => signed_at,
    };

    Ok(Reading::new(device_id, payload.value, timestamp))
}
