use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;
use insights::InsightError;

use serde::Serialize;
pub use server::{ServerState, router, run_with_listener};

mod assets;
mod catalog;
mod dashboard;
pub mod dispatch;
pub mod events;
mod exchange;
mod history;
mod insight;
mod server;
mod views;

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Insight(InsightError),
    InsightsDisabled,
    Conflict(String),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) | EngineError::InUse(_) => StatusCode::CONFLICT,
        EngineError::Csv(_) | EngineError::InvalidId(_) => StatusCode::BAD_REQUEST,
        EngineError::Database(_) | EngineError::Password(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::Validation(_) | EngineError::InvalidState(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Password(err) => {
            tracing::error!("password hashing error: {err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Insight(err) => {
                tracing::warn!("analysis failed: {err}");
                (StatusCode::BAD_GATEWAY, "analysis failed".to_string())
            }
            ServerError::InsightsDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "analysis is not configured".to_string(),
            ),
            ServerError::Conflict(err) => (StatusCode::CONFLICT, err),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<InsightError> for ServerError {
    fn from(value: InsightError) -> Self {
        Self::Insight(value)
    }
}
