use chrono::{DateTime, Utc};
use thermo_core::{canonical_body, format_timestamp, Result, SigningKey};
use thermo_types::{Envelope, Reading, ReadingPayload};
use tracing::debug;

/// 设备端签名器
///
/// body 保留采集时间；`X-Timestamp` 使用每次发送时的新时间，
/// 所以重试的条目不会因为签名过期被拒绝。
#[derive(Debug, Clone)]
pub struct Signer {
    key: SigningKey,
}

impl Signer {
    /// 密钥为空时返回 `Configuration` 错误
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        Ok(Self {
            key: SigningKey::new(secret)?,
        })
    }

    /// 按 `signed_at` 为一次发送生成签名信封
    pub fn sign(&self, reading: &Reading, signed_at: DateTime<Utc>) -> Result<Envelope> {
        let payload = ReadingPayload {
            device_id: Some(reading.device_id.clone()),
            timestamp: Some(format_timestamp(reading.timestamp)),
            value: reading.value,
        };
        let body = canonical_body(&payload)?;
        let timestamp = format_timestamp(signed_at);
        let signature = self.key.sign(&timestamp, &body);

        debug!(
            device_id = %reading.device_id,
            signed_at = %timestamp,
            "Reading signed"
        );

        Ok(Envelope {
            device_id: reading.device_id.clone(),
            timestamp,
            signature,
            body,
        })
    }
}
