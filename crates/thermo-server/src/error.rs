use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thermo_core::ThermoError;
use thermo_types::IngestResponse;

/// 接入接口错误
///
/// 验证失败映射为 401，body 格式错误映射为 400，均返回 `{"ok": false, "error": ...}`。
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(ThermoError),

    #[error("{0}")]
    BadRequest(ThermoError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 指标标签
    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(e) | ApiError::BadRequest(e) => e.reason(),
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<ThermoError> for ApiError {
    fn from(err: ThermoError) -> Self {
        if err.is_rejection() {
            ApiError::Unauthorized(err)
        } else if matches!(err, ThermoError::MalformedPayload(_)) {
            ApiError::BadRequest(err)
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(IngestResponse::rejected(self.to_string()));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
