pub mod error;
pub mod signature;
pub mod timestamp;

pub use error::{DeliveryFailure, Result, ThermoError};
pub use signature::{canonical_body, SigningKey};
pub use timestamp::{check_freshness, format_timestamp, parse_timestamp};
