use super::{round2, TemperatureSensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::f64::consts::PI;
use thermo_core::Result;

/// 模拟模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorMode {
    /// 正弦日变化 + 高斯噪声
    #[default]
    Realistic,
    /// 15–35 °C 均匀分布
    Random,
    /// 快速升温、降温，然后回到 realistic
    Demo,
}

impl std::str::FromStr for SensorMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "realistic" => Ok(SensorMode::Realistic),
            "random" => Ok(SensorMode::Random),
            "demo" => Ok(SensorMode::Demo),
            other => Err(format!("unknown sensor mode: {}", other)),
        }
    }
}

const BASE_TEMP_C: f64 = 22.0;
const DAILY_VARIATION_C: f64 = 5.0;
const NOISE_SIGMA_C: f64 = 0.5;
const RANDOM_MIN_C: f64 = 15.0;
const RANDOM_MAX_C: f64 = 35.0;
const DEMO_CYCLE: u32 = 60;

/// 无硬件时使用的模拟传感器
pub struct SimulatedSensor {
    mode: SensorMode,
    rng: StdRng,
    time_offset: u64,
    demo_count: u32,
}

impl SimulatedSensor {
    pub fn new(mode: SensorMode) -> Self {
        Self::with_rng(mode, StdRng::from_entropy())
    }

    /// 固定种子，结果可复现
    pub fn seeded(mode: SensorMode, seed: u64) -> Self {
        Self::with_rng(mode, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mode: SensorMode, rng: StdRng) -> Self {
        Self {
            mode,
            rng,
            time_offset: 0,
            demo_count: 0,
        }
    }

    pub fn mode(&self) -> SensorMode {
        self.mode
    }

    fn realistic(&mut self) -> f64 {
        let daily = (self.time_offset as f64 / 3600.0).sin() * DAILY_VARIATION_C;
        let noise = self.gaussian() * NOISE_SIGMA_C;
        self.time_offset += 1;
        round2(BASE_TEMP_C + daily + noise)
    }

    fn random(&mut self) -> f64 {
        round2(self.rng.gen_range(RANDOM_MIN_C..=RANDOM_MAX_C))
    }

    fn demo(&mut self) -> f64 {
        self.demo_count += 1;
        let count = self.demo_count;

        let value = if count < 20 {
            20.0 + count as f64 * 0.5
        } else if count < 40 {
            30.0 - (count - 20) as f64 * 0.3
        } else {
            self.realistic()
        };

        if self.demo_count >= DEMO_CYCLE {
            self.demo_count = 0;
        }
        round2(value)
    }

    /// 标准正态分布（Box-Muller）
    fn gaussian(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}

impl TemperatureSensor for SimulatedSensor {
    fn read(&mut self) -> Result<f64> {
        Ok(match self.mode {
            SensorMode::Realistic => self.realistic(),
            SensorMode::Random => self.random(),
            SensorMode::Demo => self.demo(),
        })
    }

    fn name(&self) -> &str {
        match self.mode {
            SensorMode::Realistic => "simulated-realistic",
            SensorMode::Random => "simulated-random",
            SensorMode::Demo => "simulated-demo",
        }
    }
}
