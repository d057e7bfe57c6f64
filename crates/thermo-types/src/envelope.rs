use serde::{Deserialize, Serialize};

pub const HEADER_DEVICE_ID: &str = "x-device-id";
pub const HEADER_TIMESTAMP: &str = "x-timestamp";
pub const HEADER_SIGNATURE: &str = "x-signature";

/// 签名信封
///
/// `signature = hex(HMAC-SHA256(secret, timestamp + "." + body))`。
/// 创建后不可修改，由采集端验证一次。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// 传输元数据，随 `x-device-id` 头发送
    pub device_id: String,
    pub timestamp: String,
    pub signature: String,
    pub body: Vec<u8>,
}

impl Envelope {
    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or("<non-utf8 body>")
    }
}

/// Response body of the ingest endpoint.
///
/// Success: `{"ok": true, "count": N}`. Failure: `{"ok": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestResponse {
    pub fn accepted(count: usize) -> Self {
        Self {
            ok: true,
            count: Some(count),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            count: None,
            error: Some(error.into()),
        }
    }

    /// 设备端判定确认是否有效
    pub fn is_well_formed_ack(&self) -> bool {
        self.ok && self.count.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_response_shapes() {
        let ok = serde_json::to_value(IngestResponse::accepted(3)).unwrap();
        assert_eq!(ok, serde_json::json!({"ok": true, "count": 3}));

        let err = serde_json::to_value(IngestResponse::rejected("signature mismatch")).unwrap();
        assert_eq!(
            err,
            serde_json::json!({"ok": false, "error": "signature mismatch"})
        );
    }

    #[test]
    fn test_ack_validation() {
        let ack: IngestResponse = serde_json::from_str(r#"{"ok": true, "count": 1}"#).unwrap();
        assert!(ack.is_well_formed_ack());

        let missing_count: IngestResponse = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert!(!missing_count.is_well_formed_ack());
    }
}
