use tokio::sync::broadcast;
use tracing::info;

/// 触发关闭的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM（systemd stop / docker stop）
    Terminate,
    /// SIGINT 或 Ctrl+C
    Interrupt,
    /// 进程内调用 `trigger_shutdown`
    Requested,
}

/// 关闭广播
///
/// `new` 返回的接收端交给采样循环；HTTP 服务用 `shutdown_future`。
/// 广播只发一次即可，晚订阅的一方拿不到之前的信号。
#[derive(Debug, Clone)]
pub struct SignalHandler {
    tx: broadcast::Sender<ShutdownSignal>,
}

impl SignalHandler {
    pub fn new() -> (Self, broadcast::Receiver<ShutdownSignal>) {
        let (tx, rx) = broadcast::channel(4);
        (Self { tx }, rx)
    }

    /// 阻塞到收到 SIGTERM / SIGINT，然后广播
    pub async fn wait_for_system_signal(&self) -> std::io::Result<ShutdownSignal> {
        let received = os_signal().await?;
        info!(signal = ?received, "Shutdown signal received");
        self.broadcast(received);
        Ok(received)
    }

    pub fn trigger_shutdown(&self) {
        info!("Shutdown requested");
        self.broadcast(ShutdownSignal::Requested);
    }

    /// 任意关闭信号广播后完成，可直接交给 `with_graceful_shutdown`
    pub fn shutdown_future(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    fn broadcast(&self, signal: ShutdownSignal) {
        // 没有接收端时发送失败，无需处理
        let _ = self.tx.send(signal);
    }
}

#[cfg(unix)]
async fn os_signal() -> std::io::Result<ShutdownSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = term.recv() => ShutdownSignal::Terminate,
        _ = int.recv() => ShutdownSignal::Interrupt,
    })
}

#[cfg(not(unix))]
async fn os_signal() -> std::io::Result<ShutdownSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(ShutdownSignal::Interrupt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_trigger_reaches_receiver() {
        let (handler, mut rx) = SignalHandler::new();

        handler.trigger_shutdown();

        assert_eq!(rx.recv().await.unwrap(), ShutdownSignal::Requested);
    }

    #[tokio::test]
    async fn test_clones_share_one_channel() {
        let (handler, mut rx) = SignalHandler::new();
        let server_side = handler.shutdown_future();

        handler.clone().trigger_shutdown();

        assert_eq!(rx.recv().await.unwrap(), ShutdownSignal::Requested);
        timeout(Duration::from_millis(100), server_side)
            .await
            .expect("shutdown future should resolve");
    }

    #[tokio::test]
    async fn test_future_pending_without_signal() {
        let (handler, _rx) = SignalHandler::new();

        let result = timeout(Duration::from_millis(50), handler.shutdown_future()).await;
        assert!(result.is_err());
    }
}
