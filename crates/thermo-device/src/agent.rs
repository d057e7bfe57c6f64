use chrono::{Duration as ChronoDuration, Utc};
use metrics::counter;
use std::time::Duration;
use thermo_core::{DeliveryFailure, Result, ThermoError};
use thermo_notify::{AlertOutcome, ThresholdAlerter};
use thermo_shutdown::ShutdownSignal;
use thermo_types::Reading;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::config::DeviceConfig;
use crate::queue::RetryQueue;
use crate::sensor::{SimulatedSensor, TemperatureSensor};
use crate::signer::Signer;
use crate::transport::{HttpTransport, Transport};

/// 一轮采样的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 最新读数已送达；`flushed` 为本轮补发成功的队列条目数
    Delivered { flushed: usize },
    /// 最新读数发送失败并已入队；`wait` 为退避时间
    Queued { flushed: usize, wait: Duration },
    /// 传感器读取失败，本轮跳过
    SensorFailed,
}

/// 单次回填的上限（一周的分钟数）
pub const MAX_BACKFILL: usize = 7 * 24 * 60;

/// 告警任务最多积压的读数
const ALERT_BACKLOG: usize = 8;

/// 回填结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    pub sent: usize,
    pub queued: usize,
    pub skipped: usize,
}

/// 设备端采样代理
///
/// 每一轮：读传感器 → 按 FIFO 补发队列 → 发送最新读数 → 交给告警任务。
/// 整轮顺序执行，关闭信号只在两轮之间生效。告警在独立任务中发送，
/// 渠道阻塞不会拖慢采样和投递。
pub struct DeviceAgent<S, T> {
    device_id: String,
    sensor: S,
    signer: Signer,
    transport: T,
    queue: RetryQueue,
    backoff: Backoff,
    interval: Duration,
    alerts: Option<mpsc::Sender<Reading>>,
}

impl DeviceAgent<Box<dyn TemperatureSensor>, HttpTransport> {
    /// 按配置组装：模拟传感器 + HTTP 投递
    pub async fn from_config(config: &DeviceConfig) -> anyhow::Result<Self> {
        let sensor: Box<dyn TemperatureSensor> = Box::new(SimulatedSensor::new(config.sensor.mode));
        DeviceAgent::from_config_with_sensor(config, sensor).await
    }
}

impl<S: TemperatureSensor> DeviceAgent<S, HttpTransport> {
    /// 按配置组装，传感器由调用方提供
    ///
    /// 热敏电阻 / 热电偶需要具体的 ADC、SPI 总线实现，二进制不带这些驱动；
    /// 嵌入方实现 `AdcReader` / `SpiReader` 后从这里接入。
    pub async fn from_config_with_sensor(config: &DeviceConfig, sensor: S) -> anyhow::Result<Self> {
        config.validate()?;

        let signer = Signer::new(&config.signing_secret)?;
        let transport = HttpTransport::new(&config.ingest_url, config.request_timeout())?;
        let queue = RetryQueue::open(&config.queue_path, config.queue_capacity).await?;

        let mut agent = Self::new(config.device_id.clone(), sensor, signer, transport, queue)
            .with_interval(config.sample_interval())
            .with_backoff(Backoff::new(config.backoff_initial(), config.backoff_max()));

        if config.alert.enabled {
            agent = agent.with_alerter(ThresholdAlerter::from_config(&config.alert)?);
        }

        Ok(agent)
    }
}

impl<S, T> DeviceAgent<S, T>
where
    S: TemperatureSensor,
    T: Transport,
{
    pub fn new(
        device_id: impl Into<String>,
        sensor: S,
        signer: Signer,
        transport: T,
        queue: RetryQueue,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            sensor,
            signer,
            transport,
            queue,
            backoff: Backoff::default(),
            interval: Duration::from_secs(15),
            alerts: None,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// 启动后台告警任务，需在 tokio 运行时内调用
    pub fn with_alerter(mut self, alerter: ThresholdAlerter) -> Self {
        self.alerts = Some(spawn_alert_task(alerter));
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn queue(&self) -> &RetryQueue {
        &self.queue
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// 执行一轮采样
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let value = match self.sensor.read() {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    device_id = %self.device_id,
                    sensor = self.sensor.name(),
                    "Sensor read failed, skipping cycle: {}", e
                );
                return CycleOutcome::SensorFailed;
            }
        };

        let reading = Reading::now(self.device_id.clone(), value).rounded();
        let flushed = self.drain_queue().await;

        let outcome = match self.send(&reading).await {
            Ok(count) => {
                self.backoff.on_success();
                info!(
                    device_id = %self.device_id,
                    value_c = reading.value,
                    stored = count,
                    "Reading delivered"
                );
                CycleOutcome::Delivered { flushed }
            }
            Err(failure) => {
                self.enqueue(&reading).await;
                let wait = self.backoff.on_failure();
                warn!(
                    device_id = %self.device_id,
                    backoff_secs = wait.as_secs(),
                    pending = self.queue.len(),
                    "Delivery failed: {}", failure
                );
                CycleOutcome::Queued { flushed, wait }
            }
        };

        self.raise_alert(reading);
        outcome
    }

    /// 运行到收到关闭信号为止，返回完成的轮数
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<ShutdownSignal>) -> u64 {
        info!(
            device_id = %self.device_id,
            interval_secs = self.interval.as_secs(),
            pending = self.queue.len(),
            "Device agent started"
        );

        let mut cycles = 0u64;
        loop {
            match shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                Ok(signal) => {
                    info!(?signal, "Shutdown requested, stopping agent");
                    break;
                }
                Err(e) => {
                    info!("Shutdown channel {}, stopping agent", e);
                    break;
                }
            }

            let outcome = self.run_cycle().await;
            cycles += 1;

            let wait = match outcome {
                CycleOutcome::Queued { wait, .. } => wait + self.interval,
                _ => self.interval,
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                signal = shutdown.recv() => {
                    info!(?signal, "Shutdown requested, stopping agent");
                    break;
                }
            }
        }

        info!(cycles, pending = self.queue.len(), "Device agent stopped");
        cycles
    }

    /// 发送 `count` 条历史读数，采集时间按分钟倒推，最旧的先发
    ///
    /// `count` 超过 [`MAX_BACKFILL`] 时按上限处理。
    pub async fn backfill(&mut self, count: usize) -> BackfillSummary {
        let now = Utc::now();
        let mut summary = BackfillSummary::default();

        let count = if count > MAX_BACKFILL {
            warn!(requested = count, max = MAX_BACKFILL, "Backfill count capped");
            MAX_BACKFILL
        } else {
            count
        };

        for minutes_ago in (1..=count).rev() {
            let value = match self.sensor.read() {
                Ok(v) => v,
                Err(e) => {
                    warn!("Sensor read failed during backfill: {}", e);
                    summary.skipped += 1;
                    continue;
                }
            };

            let at = now - ChronoDuration::minutes(minutes_ago as i64);
            let reading = Reading::new(self.device_id.clone(), value, at).rounded();

            match self.send(&reading).await {
                Ok(_) => summary.sent += 1,
                Err(failure) => {
                    debug!("Backfill delivery failed: {}", failure);
                    self.enqueue(&reading).await;
                    summary.queued += 1;
                }
            }
        }

        info!(
            sent = summary.sent,
            queued = summary.queued,
            skipped = summary.skipped,
            "Backfill finished"
        );
        summary
    }

    /// 用新的签名时间发送一条读数
    async fn send(&self, reading: &Reading) -> Result<usize> {
        let envelope = self.signer.sign(reading, Utc::now())?;

        match self.transport.deliver(&envelope).await {
            Ok(ack) => Ok(ack.count.unwrap_or_default()),
            Err(failure) => {
                counter!("thermo_delivery_failures_total", 1);
                Err(failure.into())
            }
        }
    }

    fn raise_alert(&self, reading: Reading) {
        let Some(alerts) = &self.alerts else {
            return;
        };

        match alerts.try_send(reading) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(r)) => {
                debug!(value_c = r.value, "Alert task busy, reading not checked");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Alert task stopped, alerts disabled");
            }
        }
    }

    async fn enqueue(&mut self, reading: &Reading) {
        if let Err(e) = self.queue.push(reading).await {
            error!(
                device_id = %self.device_id,
                value_c = reading.value,
                "Failed to persist reading to retry queue: {}", e
            );
        }
    }

    /// 按 FIFO 补发队列；失败的条目按原顺序保留
    ///
    /// 遇到连接或超时错误时停止本轮补发，剩余条目原样保留。
    async fn drain_queue(&mut self) -> usize {
        if self.queue.is_empty() {
            return 0;
        }

        let pending = match self.queue.load().await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to read retry queue: {}", e);
                return 0;
            }
        };

        let mut kept = Vec::new();
        let mut flushed = 0;
        let mut entries = pending.into_iter();

        while let Some(entry) = entries.next() {
            match self.send(&entry).await {
                Ok(_) => flushed += 1,
                Err(failure) => {
                    debug!(timestamp = %entry.timestamp, "Queued reading still undeliverable: {}", failure);
                    kept.push(entry);
                    if matches!(
                        failure,
                        ThermoError::Delivery(
                            DeliveryFailure::Connection(_) | DeliveryFailure::Timeout(_)
                        )
                    ) {
                        kept.extend(entries.by_ref());
                        break;
                    }
                }
            }
        }

        if flushed > 0 {
            if let Err(e) = self.queue.rewrite(&kept).await {
                error!("Failed to rewrite retry queue: {}", e);
            }
            counter!("thermo_queue_flushed_total", flushed as u64);
            info!(flushed, pending = kept.len(), "Flushed queued readings");
        }

        flushed
    }
}

fn spawn_alert_task(mut alerter: ThresholdAlerter) -> mpsc::Sender<Reading> {
    let (tx, mut rx) = mpsc::channel::<Reading>(ALERT_BACKLOG);

    tokio::spawn(async move {
        while let Some(reading) = rx.recv().await {
            if let AlertOutcome::Sent { delivered } = alerter
                .observe(&reading.device_id, reading.value, reading.timestamp)
                .await
            {
                info!(value_c = reading.value, delivered, "Temperature alert sent");
            }
        }
        debug!("Alert task finished");
    });

    tx
}
