use crate::message::AlertMessage;
use anyhow::Result;
use async_trait::async_trait;

/// 通知器 trait
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 发送通知；返回 Err 表示该渠道未送达
    async fn send(&self, message: &AlertMessage) -> Result<()>;

    /// 通知器名称
    fn name(&self) -> &str;
}
