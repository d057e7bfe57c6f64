pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod state;
pub mod store;
pub mod verifier;

pub use api::create_router;
pub use config::AppConfig;
pub use error::ApiError;
pub use state::AppState;
pub use store::{BoundedSeries, SeriesSnapshot};
pub use verifier::{IngestRequest, Verifier};
