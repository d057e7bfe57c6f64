use crate::message::AlertMessage;
use crate::notifier::Notifier;
use crate::providers::{EmailConfig, EmailNotifier, LogNotifier, WebhookNotifier};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info};

/// 单个渠道发送的默认超时
pub const DEFAULT_SEND_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// 告警配置
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_threshold")]
    pub threshold_c: f64,

    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u64,

    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default)]
    pub email: Option<EmailConfig>,
}

fn default_threshold() -> f64 {
    30.0
}

fn default_cooldown_minutes() -> u64 {
    30
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_c: default_threshold(),
            cooldown_minutes: default_cooldown_minutes(),
            webhook_url: None,
            email: None,
        }
    }
}

/// 一次观测的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    BelowThreshold,
    CoolingDown,
    /// `delivered` 为成功送达的渠道数
    Sent { delivered: usize },
    /// 所有渠道都失败，冷却期不开始
    Failed,
}

/// 阈值告警器
///
/// 读数达到阈值且不在冷却期内时，向所有渠道发送告警。
/// 冷却期只在至少一个渠道送达后才开始计时，全部失败时下一次读数会重试。
/// 每个渠道的发送受 `send_timeout` 限制，超时按失败处理。
pub struct ThresholdAlerter {
    threshold_c: f64,
    cooldown: Duration,
    send_timeout: StdDuration,
    last_sent: Option<DateTime<Utc>>,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl ThresholdAlerter {
    pub fn new(threshold_c: f64, cooldown: Duration) -> Self {
        Self {
            threshold_c,
            cooldown,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            last_sent: None,
            notifiers: Vec::new(),
        }
    }

    /// 按配置构建渠道；没有配置任何外部渠道时回落到日志
    pub fn from_config(config: &AlertConfig) -> anyhow::Result<Self> {
        let cooldown = Duration::minutes(config.cooldown_minutes as i64);
        let mut alerter = Self::new(config.threshold_c, cooldown);

        if let Some(url) = &config.webhook_url {
            alerter = alerter.with_notifier(Box::new(WebhookNotifier::new(url.clone())?));
        }
        if let Some(email) = &config.email {
            alerter = alerter.with_notifier(Box::new(EmailNotifier::new(email.clone())?));
        }
        if alerter.notifiers.is_empty() {
            alerter = alerter.with_notifier(Box::new(LogNotifier));
        }

        info!(
            threshold_c = config.threshold_c,
            cooldown_minutes = config.cooldown_minutes,
            channels = alerter.notifiers.len(),
            "Threshold alerter configured"
        );
        Ok(alerter)
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn with_send_timeout(mut self, timeout: StdDuration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn threshold_c(&self) -> f64 {
        self.threshold_c
    }

    pub fn last_sent(&self) -> Option<DateTime<Utc>> {
        self.last_sent
    }

    fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.last_sent {
            Some(sent) => now - sent < self.cooldown,
            None => false,
        }
    }

    /// 处理一个读数
    pub async fn observe(&mut self, device_id: &str, value_c: f64, now: DateTime<Utc>) -> AlertOutcome {
        if value_c < self.threshold_c {
            return AlertOutcome::BelowThreshold;
        }

        if self.in_cooldown(now) {
            debug!(value_c, "Alert suppressed by cooldown");
            return AlertOutcome::CoolingDown;
        }

        let message = AlertMessage::threshold_exceeded(device_id, value_c, self.threshold_c, now);

        let mut delivered = 0;
        for notifier in &self.notifiers {
            match tokio::time::timeout(self.send_timeout, notifier.send(&message)).await {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => error!(channel = notifier.name(), "Failed to send alert: {}", e),
                Err(_) => error!(
                    channel = notifier.name(),
                    timeout_secs = self.send_timeout.as_secs(),
                    "Alert channel timed out"
                ),
            }
        }

        if delivered == 0 {
            return AlertOutcome::Failed;
        }

        self.last_sent = Some(now);
        AlertOutcome::Sent { delivered }
    }
}
