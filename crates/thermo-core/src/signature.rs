use crate::error::{Result, ThermoError};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// 共享密钥，设备端与采集端共用
///
/// 签名材料为 `timestamp + "." + body`，输出小写十六进制。
#[derive(Clone)]
pub struct SigningKey {
    mac: HmacSha256,
}

impl SigningKey {
    /// Fails with `Configuration` when the secret is empty.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(ThermoError::config("signing secret is not set"));
        }

        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| ThermoError::config(format!("invalid signing secret: {}", e)))?;

        Ok(Self { mac })
    }

    fn keyed(&self, timestamp: &str, body: &[u8]) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        mac
    }

    pub fn sign(&self, timestamp: &str, body: &[u8]) -> String {
        hex::encode(self.keyed(timestamp, body).finalize().into_bytes())
    }

    /// 常量时间比较；签名不是合法十六进制时同样视为不匹配
    pub fn verify(&self, timestamp: &str, body: &[u8], signature: &str) -> Result<()> {
        let expected = hex::decode(signature.trim()).map_err(|_| ThermoError::SignatureMismatch)?;

        self.keyed(timestamp, body)
            .verify_slice(&expected)
            .map_err(|_| ThermoError::SignatureMismatch)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Serialize `value` as compact JSON with lexicographically sorted keys.
///
/// Going through `serde_json::Value` sorts object keys, so the bytes do
/// not depend on struct field order.
pub fn canonical_body<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_secret_is_configuration_error() {
        let err = SigningKey::new("").unwrap_err();
        assert!(matches!(err, ThermoError::Configuration(_)));
    }

    #[test]
    fn test_sign_matches_plain_hmac_over_joined_input() {
        let key = SigningKey::new("secret").unwrap();
        let sig = key.sign("1700000000", br#"{"value":1}"#);

        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(br#"1700000000.{"value":1}"#);
        assert_eq!(sig, hex::encode(mac.finalize().into_bytes()));

        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(key.verify("1700000000", br#"{"value":1}"#, &sig).is_ok());
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let device = SigningKey::new("device-secret").unwrap();
        let collector = SigningKey::new("other-secret").unwrap();

        let sig = device.sign("ts", b"body");
        assert!(matches!(
            collector.verify("ts", b"body", &sig),
            Err(ThermoError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_verify_rejects_non_hex() {
        let key = SigningKey::new("secret").unwrap();
        assert!(matches!(
            key.verify("ts", b"body", "not-hex!"),
            Err(ThermoError::SignatureMismatch)
        ));
        assert!(matches!(
            key.verify("ts", b"body", ""),
            Err(ThermoError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_timestamp_is_bound() {
        let key = SigningKey::new("secret").unwrap();
        let sig = key.sign("2026-10-19T10:00:00Z", b"{}");

        assert!(key.verify("2026-10-19T10:00:01Z", b"{}", &sig).is_err());
    }

    #[test]
    fn test_canonical_body_sorts_keys() {
        let body = canonical_body(&json!({"value": 23.4, "device_id": "pi-1", "timestamp": "t"}))
            .unwrap();
        assert_eq!(
            String::from_utf8(body).unwrap(),
            r#"{"device_id":"pi-1","timestamp":"t","value":23.4}"#
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let key = SigningKey::new("super-secret").unwrap();
        assert!(!format!("{:?}", key).contains("super-secret"));
    }
}
