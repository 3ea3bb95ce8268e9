pub mod orders;
pub mod simulation;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::middleware::Fault;

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    /// Message plus the trace text stored in the error ring
    Internal { message: String, detail: String },
    AlreadyRunning,
}

impl AppError {
    /// Internal error carrying the full source chain of `err`.
    pub fn internal(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut detail = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            detail.push_str("\n  caused by: ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Internal {
            message: err.to_string(),
            detail,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut fault = None;
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal { message, detail } => {
                fault = Some(Fault::new(message.clone(), detail));
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            Self::AlreadyRunning => {
                (StatusCode::CONFLICT, "Simulation already running".into())
            }
        };

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        let mut response = (status, Json(body)).into_response();
        if let Some(fault) = fault {
            response.extensions_mut().insert(fault);
        }
        response
    }
}
