//! 温度传感器适配器
//!
//! 采样循环只依赖 [`TemperatureSensor`]；硬件总线（ADC / SPI）通过
//! [`AdcReader`] 和 [`SpiReader`] 注入，寄存器访问不在本 crate 内。

mod simulated;
mod thermistor;
mod thermocouple;

pub use simulated::{SensorMode, SimulatedSensor};
pub use thermistor::{AdcReader, ThermistorParams, ThermistorSensor};
pub use thermocouple::{SpiReader, ThermocoupleSensor};

use thermo_core::Result;

/// 传感器读数接口，返回摄氏度
///
/// 失败时返回 `ThermoError::Sensor`，调用方跳过本轮采样。
pub trait TemperatureSensor: Send {
    fn read(&mut self) -> Result<f64>;

    fn name(&self) -> &str;
}

impl<T: TemperatureSensor + ?Sized> TemperatureSensor for Box<T> {
    fn read(&mut self) -> Result<f64> {
        (**self).read()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
