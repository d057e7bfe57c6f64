pub mod alerter;
pub mod message;
pub mod notifier;
pub mod providers;

pub use alerter::{AlertConfig, AlertOutcome, ThresholdAlerter, DEFAULT_SEND_TIMEOUT};
pub use message::{AlertLevel, AlertMessage, CRITICAL_MARGIN_C};
pub use notifier::Notifier;
pub use providers::{EmailConfig, EmailNotifier, LogNotifier, WebhookNotifier};
