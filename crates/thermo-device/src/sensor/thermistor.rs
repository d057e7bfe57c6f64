use super::{round2, TemperatureSensor};
use thermo_core::{Result, ThermoError};

/// MCP3008 一类 10 位 ADC
pub trait AdcReader: Send {
    /// 读取通道原始值（0..=1023）
    fn read_channel(&mut self, channel: u8) -> Result<u16>;
}

const ADC_MAX: f64 = 1023.0;
const KELVIN_OFFSET: f64 = 273.15;

/// NTC 热敏电阻参数（Beta 方程）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermistorParams {
    pub channel: u8,
    pub vref: f64,
    pub beta: f64,
    pub r0_ohms: f64,
    pub t0_c: f64,
    pub series_ohms: f64,
}

impl Default for ThermistorParams {
    fn default() -> Self {
        Self {
            channel: 0,
            vref: 3.3,
            beta: 3950.0,
            r0_ohms: 10_000.0,
            t0_c: 25.0,
            series_ohms: 10_000.0,
        }
    }
}

impl ThermistorParams {
    pub fn voltage(&self, raw: u16) -> f64 {
        (raw as f64 / ADC_MAX) * self.vref
    }

    /// 分压电压 → 摄氏度
    pub fn celsius_from_voltage(&self, v: f64) -> Result<f64> {
        if v <= 0.0 || v >= self.vref {
            return Err(ThermoError::sensor("ADC out of range; check wiring"));
        }

        let r_ntc = self.series_ohms * (v / (self.vref - v));
        let t0_k = self.t0_c + KELVIN_OFFSET;
        let inv_t = 1.0 / t0_k + (r_ntc / self.r0_ohms).ln() / self.beta;
        Ok(1.0 / inv_t - KELVIN_OFFSET)
    }
}

pub struct ThermistorSensor<A: AdcReader> {
    adc: A,
    params: ThermistorParams,
}

impl<A: AdcReader> ThermistorSensor<A> {
    pub fn new(adc: A, params: ThermistorParams) -> Self {
        Self { adc, params }
    }
}

impl<A: AdcReader> TemperatureSensor for ThermistorSensor<A> {
    fn read(&mut self) -> Result<f64> {
        let raw = self.adc.read_channel(self.params.channel)?;
        let v = self.params.voltage(raw);
        self.params.celsius_from_voltage(v).map(round2)
    }

    fn name(&self) -> &str {
        "thermistor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAdc(u16);

    impl AdcReader for FixedAdc {
        fn read_channel(&mut self, _channel: u8) -> Result<u16> {
            Ok(self.0)
        }
    }

    struct BrokenAdc;

    impl AdcReader for BrokenAdc {
        fn read_channel(&mut self, _channel: u8) -> Result<u16> {
            Err(ThermoError::sensor("SPI transfer failed"))
        }
    }

    #[test]
    fn test_midpoint_is_reference_temperature() {
        // 分压中点时 R_ntc == R0，即 25 °C
        let params = ThermistorParams::default();
        let t = params.celsius_from_voltage(params.vref / 2.0).unwrap();
        assert!((t - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_lower_voltage_is_warmer() {
        let mut sensor = ThermistorSensor::new(FixedAdc(400), ThermistorParams::default());
        let t = sensor.read().unwrap();
        assert!(t > 25.0 && t < 40.0, "unexpected {}", t);
    }

    #[test]
    fn test_rails_are_rejected() {
        for raw in [0u16, 1023] {
            let mut sensor = ThermistorSensor::new(FixedAdc(raw), ThermistorParams::default());
            let err = sensor.read().unwrap_err();
            assert!(matches!(err, ThermoError::Sensor(_)));
            assert!(err.to_string().contains("check wiring"));
        }
    }

    #[test]
    fn test_bus_error_propagates() {
        let mut sensor = ThermistorSensor::new(BrokenAdc, ThermistorParams::default());
        assert!(matches!(sensor.read(), Err(ThermoError::Sensor(_))));
    }
}
