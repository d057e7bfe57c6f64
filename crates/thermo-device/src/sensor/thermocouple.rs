use super::{round2, TemperatureSensor};
use thermo_core::{Result, ThermoError};

/// SPI 总线，读取 MAX6675 的两字节数据帧
pub trait SpiReader: Send {
    fn read_frame(&mut self) -> Result<[u8; 2]>;
}

/// D2 置位表示热电偶开路
const OPEN_CIRCUIT_BIT: u16 = 0x0004;
const DEGREES_PER_LSB: f64 = 0.25;

/// MAX6675 K 型热电偶
pub struct ThermocoupleSensor<S: SpiReader> {
    spi: S,
}

impl<S: SpiReader> ThermocoupleSensor<S> {
    pub fn new(spi: S) -> Self {
        Self { spi }
    }

    pub fn decode(frame: [u8; 2]) -> Result<f64> {
        let raw = u16::from_be_bytes(frame);
        if raw & OPEN_CIRCUIT_BIT != 0 {
            return Err(ThermoError::sensor("thermocouple not connected"));
        }
        Ok((raw >> 3) as f64 * DEGREES_PER_LSB)
    }
}

impl<S: SpiReader> TemperatureSensor for ThermocoupleSensor<S> {
    fn read(&mut self) -> Result<f64> {
        let frame = self.spi.read_frame()?;
        Self::decode(frame).map(round2)
    }

    fn name(&self) -> &str {
        "max6675"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSpi([u8; 2]);

    impl SpiReader for FixedSpi {
        fn read_frame(&mut self) -> Result<[u8; 2]> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_decode_value() {
        // 100 LSB = 25.0 °C
        let raw: u16 = 100 << 3;
        let mut sensor = ThermocoupleSensor::new(FixedSpi(raw.to_be_bytes()));
        assert_eq!(sensor.read().unwrap(), 25.0);

        let raw: u16 = 0x0FFF << 3;
        assert_eq!(
            ThermocoupleSensor::<FixedSpi>::decode(raw.to_be_bytes()).unwrap(),
            1023.75
        );
    }

    #[test]
    fn test_open_circuit_fault() {
        let raw: u16 = (100 << 3) | OPEN_CIRCUIT_BIT;
        let mut sensor = ThermocoupleSensor::new(FixedSpi(raw.to_be_bytes()));
        assert!(matches!(sensor.read(), Err(ThermoError::Sensor(_))));
    }
}
