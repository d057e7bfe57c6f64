use serde::{Deserialize, Serialize};

/// 序列统计，读取时按当前内容计算
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub count: usize,
}

impl Stats {
    /// Returns `None` for an empty input.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;

        for v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }

        if count == 0 {
            return None;
        }

        // 浮点累加误差可能让均值略微越界
        let avg = (sum / count as f64).clamp(min, max);

        Some(Self {
            min,
            max,
            avg,
            count,
        })
    }
}
