pub mod subscriber;

pub use subscriber::{build_filter, init_logging, LogFormat, LoggingConfig, LoggingError};
