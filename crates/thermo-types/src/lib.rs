pub mod envelope;
pub mod reading;
pub mod stats;

pub use envelope::{
    Envelope, IngestResponse, HEADER_DEVICE_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP,
};
pub use reading::{celsius_to_fahrenheit, Reading, ReadingPayload};
pub use stats::Stats;
