use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub meta: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: None,
            timestamp: Utc::now(),
        }
    }

    pub fn success_with_meta(data: T, meta: Value) -> Self {
        Self {
            meta: Some(meta),
            ..Self::success(data)
        }
    }
}

impl ApiResponse<()> {
    pub fn error(code: impl Into<String>, message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
                details,
            }),
            meta: None,
            timestamp: Utc::now(),
        }
    }
}

/// Failures surfaced by the config editor API.
#[derive(Debug)]
pub enum WebError {
    NotFound(String),
    UnprocessableEntity { message: String, details: Option<Value> },
    InternalServerError(String),
}

impl WebError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            WebError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            WebError::NotFound(_) => "NOT_FOUND",
            WebError::UnprocessableEntity { .. } => "UNPROCESSABLE_ENTITY",
            WebError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(format!("{} not found", resource.into()))
    }

    pub fn unprocessable(msg: impl Into<String>, details: Value) -> Self {
        Self::UnprocessableEntity {
            message: msg.into(),
            details: Some(details),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalServerError(msg.into())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let body = match self {
            WebError::UnprocessableEntity { message, details } => ApiResponse::error(code, message, details),
            WebError::NotFound(message)
            | WebError::InternalServerError(message) => ApiResponse::error(code, message, None),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: i64,
    pub checks: Vec<HealthCheck>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    pub message: Option<String>,
}

impl HealthResponse {
    pub fn from_checks(started_at: DateTime<Utc>, checks: Vec<HealthCheck>) -> Self {
        let healthy = checks.iter().all(|check| check.status == "healthy");
        let now = Utc::now();
        Self {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            timestamp: now,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: now.signed_duration_since(started_at).num_seconds(),
            checks,
        }
    }
}

impl HealthCheck {
    pub fn healthy(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: "healthy".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn degraded(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: "degraded".to_string(),
            message: Some(message.into()),
        }
    }
}
