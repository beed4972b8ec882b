//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::deco::models::{TOOL, TOOL_VERSION};
use crate::deco::DecoError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Deco(#[from] DecoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("planning task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Deco(DecoError::Config(_) | DecoError::Precondition(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Deco(DecoError::Invariant(_) | DecoError::Validation(_))
            | AppError::Serialization(_)
            | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("deco planning failed: {}", self);
        }
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "tool": TOOL,
            "tool_version": TOOL_VERSION
        }));
        (status, body).into_response()
    }
}
