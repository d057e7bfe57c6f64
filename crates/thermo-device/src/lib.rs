pub mod agent;
pub mod backoff;
pub mod config;
pub mod queue;
pub mod sensor;
pub mod signer;
pub mod transport;

pub use agent::{BackfillSummary, CycleOutcome, DeviceAgent, MAX_BACKFILL};
pub use backoff::Backoff;
pub use config::{DeviceConfig, SensorConfig};
pub use queue::RetryQueue;
pub use sensor::{SensorMode, SimulatedSensor, TemperatureSensor};
pub use signer::Signer;
pub use transport::{HttpTransport, Transport};
