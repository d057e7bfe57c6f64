use async_trait::async_trait;
use std::time::Duration;
use thermo_core::{DeliveryFailure, Result, ThermoError};
use thermo_types::{Envelope, IngestResponse, HEADER_DEVICE_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP};
use tracing::debug;

/// 单次投递，不做重试；重试由采样循环决定
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, envelope: &Envelope) -> std::result::Result<IngestResponse, DeliveryFailure>;
}

/// HTTP 投递（POST JSON 到采集端）
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ThermoError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn classify(&self, err: reqwest::Error) -> DeliveryFailure {
        if err.is_timeout() {
            DeliveryFailure::Timeout(self.timeout)
        } else {
            DeliveryFailure::Connection(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn deliver(&self, envelope: &Envelope) -> std::result::Result<IngestResponse, DeliveryFailure> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(HEADER_DEVICE_ID, &envelope.device_id)
            .header(HEADER_TIMESTAMP, &envelope.timestamp)
            .header(HEADER_SIGNATURE, &envelope.signature)
            .body(envelope.body.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(DeliveryFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        let ack: IngestResponse = serde_json::from_str(&body)
            .map_err(|e| DeliveryFailure::InvalidAck(format!("{}: {}", e, body)))?;
        if !ack.is_well_formed_ack() {
            return Err(DeliveryFailure::InvalidAck(body));
        }

        debug!(status = status.as_u16(), count = ?ack.count, "Delivery acknowledged");
        Ok(ack)
    }
}
