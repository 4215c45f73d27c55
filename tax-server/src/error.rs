use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tax_core::CalculationError;
use thiserror::Error;

/// JSON body of every failed API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Body missing, not JSON, or missing required fields.
    #[error("Invalid request parameters")]
    InvalidRequest,

    #[error(transparent)]
    Calculation(#[from] CalculationError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Calculation(CalculationError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            Self::Calculation(CalculationError::UpstreamUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Calculation(CalculationError::BracketInvariantViolation(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to clients. Upstream and data errors stay generic;
    /// the details go to the log instead.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidRequest => self.to_string(),
            Self::Calculation(CalculationError::InvalidInput(message)) => message.clone(),
            Self::Calculation(CalculationError::UpstreamUnavailable(_)) => {
                "Unable to fetch tax data".to_string()
            }
            Self::Calculation(CalculationError::BracketInvariantViolation(_)) => {
                "Calculation failed".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
