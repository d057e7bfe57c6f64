use crate::config::AppConfig;
use crate::store::BoundedSeries;
use crate::verifier::Verifier;
use std::sync::Arc;
use thermo_core::Result;

/// API 应用状态
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<Verifier>,
    pub series: Arc<BoundedSeries>,
}

impl AppState {
    pub fn new(verifier: Verifier, series: BoundedSeries) -> Self {
        Self {
            verifier: Arc::new(verifier),
            series: Arc::new(series),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let verifier = Verifier::new(&config.signing_secret, config.freshness_window())?;
        Ok(Self::new(verifier, BoundedSeries::new(config.retention)))
    }
}
