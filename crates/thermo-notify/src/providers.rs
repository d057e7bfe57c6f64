use crate::message::AlertMessage;
use crate::notifier::Notifier;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

// ============================================================================
// 日志通知
// ============================================================================

/// 只写日志，未配置其他渠道时使用
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &AlertMessage) -> Result<()> {
        warn!(
            device_id = %message.device_id,
            value_c = message.value_c,
            "{}",
            message.title
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

// ============================================================================
// Webhook 通知
// ============================================================================

pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &AlertMessage) -> Result<()> {
        let response = self.client.post(&self.url).json(message).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Webhook failed with status: {}", response.status()));
        }

        info!("Webhook notification sent to {}", self.url);
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

// ============================================================================
// 邮件通知
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    /// 多个收件人用逗号分隔
    pub to: String,
}

fn default_smtp_port() -> u16 {
    587
}

impl EmailConfig {
    pub fn recipients(&self) -> Vec<String> {
        self.to
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Result<Self> {
        if config.recipients().is_empty() {
            return Err(anyhow!("email notifier needs at least one recipient"));
        }
        Ok(Self { config })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, message: &AlertMessage) -> Result<()> {
        use lettre::message::{header::ContentType, Mailbox};
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

        let recipients = self.config.recipients();

        let mut builder = Message::builder()
            .from(self.config.from.parse::<Mailbox>()?)
            .subject(&message.title)
            .header(ContentType::TEXT_PLAIN);
        for to in &recipients {
            builder = builder.to(to.parse::<Mailbox>()?);
        }
        let email = builder.body(message.content.clone())?;

        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.clone(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
            .credentials(creds)
            .port(self.config.smtp_port)
            .build();

        mailer.send(email).await?;

        info!(
            recipients = recipients.len(),
            "Email alert sent: {}", message.title
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_config(to: &str) -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            username: "alerts@example.com".to_string(),
            password: "app-password".to_string(),
            from: "alerts@example.com".to_string(),
            to: to.to_string(),
        }
    }

    #[test]
    fn test_email_recipients_split() {
        let config = email_config("a@example.com, b@example.com,,");
        assert_eq!(config.recipients(), vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn test_email_requires_recipient() {
        assert!(EmailNotifier::new(email_config(" , ")).is_err());
        assert!(EmailNotifier::new(email_config("ops@example.com")).is_ok());
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let msg = AlertMessage::threshold_exceeded("pi-1", 35.0, 30.0, chrono::Utc::now());
        assert!(LogNotifier.send(&msg).await.is_ok());
    }

    #[tokio::test]
    async fn test_webhook_unreachable_is_error() {
        // 端口 9 (discard) 通常没有监听
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/alerts").unwrap();
        let msg = AlertMessage::threshold_exceeded("pi-1", 35.0, 30.0, chrono::Utc::now());
        assert!(notifier.send(&msg).await.is_err());
    }
}
