use std::collections::VecDeque;
use thermo_types::{Reading, Stats};
use tokio::sync::RwLock;

/// 一次一致性读取的结果
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub current: Option<Reading>,
    pub history: Vec<Reading>,
    pub stats: Option<Stats>,
}

/// 固定容量的最近读数序列
///
/// 写入串行（写锁），读取可并发；超过容量时从头部淘汰最旧的读数。
/// 统计在读取时按当前内容计算，不缓存。
#[derive(Debug)]
pub struct BoundedSeries {
    capacity: usize,
    readings: RwLock<VecDeque<Reading>>,
}

impl BoundedSeries {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            readings: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 追加到尾部，返回追加后的条数
    pub async fn append(&self, reading: Reading) -> usize {
        let mut readings = self.readings.write().await;
        readings.push_back(reading);
        while readings.len() > self.capacity {
            readings.pop_front();
        }
        readings.len()
    }

    pub async fn len(&self) -> usize {
        self.readings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.readings.read().await.is_empty()
    }

    pub async fn current(&self) -> Option<Reading> {
        self.readings.read().await.back().cloned()
    }

    /// 最旧的在前
    pub async fn history(&self) -> Vec<Reading> {
        self.readings.read().await.iter().cloned().collect()
    }

    pub async fn stats(&self) -> Option<Stats> {
        let readings = self.readings.read().await;
        Stats::from_values(readings.iter().map(|r| r.value))
    }

    /// 在同一个读锁下取 current / history / stats
    pub async fn snapshot(&self) -> SeriesSnapshot {
        let readings = self.readings.read().await;
        SeriesSnapshot {
            current: readings.back().cloned(),
            history: readings.iter().cloned().collect(),
            stats: Stats::from_values(readings.iter().map(|r| r.value)),
        }
    }
}
