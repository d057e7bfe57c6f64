use crate::error::{ApiError, Result};
use crate::metrics;
use crate::state::AppState;
use crate::store::SeriesSnapshot;
use crate::verifier::IngestRequest;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thermo_types::{
    IngestResponse, Reading, Stats, HEADER_DEVICE_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// 查询接口中的读数，附带华氏度
#[derive(Debug, Serialize)]
pub struct ReadingView {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub value_f: f64,
}

impl From<Reading> for ReadingView {
    fn from(reading: Reading) -> Self {
        let value_f = reading.fahrenheit();
        Self {
            device_id: reading.device_id,
            timestamp: reading.timestamp,
            value: reading.value,
            value_f,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TemperatureResponse {
    pub current: Option<ReadingView>,
    pub history: Vec<ReadingView>,
    pub stats: Option<Stats>,
}

impl From<SeriesSnapshot> for TemperatureResponse {
    fn from(snapshot: SeriesSnapshot) -> Self {
        Self {
            current: snapshot.current.map(ReadingView::from),
            history: snapshot.history.into_iter().map(ReadingView::from).collect(),
            stats: snapshot.stats,
        }
    }
}

/// 创建 API 路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/ingest", post(ingest))
        .route("/api/temperature", get(get_temperature))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// 接收签名读数
async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestResponse>> {
    let verified = {
        let request = IngestRequest {
            device_id: header_str(&headers, HEADER_DEVICE_ID),
            timestamp: header_str(&headers, HEADER_TIMESTAMP),
            signature: header_str(&headers, HEADER_SIGNATURE),
            body: &body,
        };
        state.verifier.verify(&request, Utc::now())
    };

    let reading = match verified {
        Ok(reading) => reading,
        Err(e) => {
            let err = ApiError::from(e);
            warn!(
                reason = err.reason(),
                device_id = header_str(&headers, HEADER_DEVICE_ID).unwrap_or("-"),
                "Ingest rejected: {}", err
            );
            metrics::record_rejected(err.reason());
            return Err(err);
        }
    };

    let device_id = reading.device_id.clone();
    let value = reading.value;
    let count = state.series.append(reading).await;
    metrics::record_accepted(count);

    info!(device_id = %device_id, value, count, "Reading accepted");
    Ok(Json(IngestResponse::accepted(count)))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// 当前值、历史和统计
async fn get_temperature(State(state): State<AppState>) -> Json<TemperatureResponse> {
    Json(state.series.snapshot().await.into())
}
