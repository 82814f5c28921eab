//! API error type with the structured HTTP error body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orchestrator::{ChargeError, OrchestratorError};
use serde::Serialize;
use settlement::SettlementError;
use store::StoreError;
use tokenizer::TokenizerError;

/// Error response body shared by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
}

/// An API-level error carrying the request path it occurred on.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    path: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, path)
    }

    pub fn not_found(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, path)
    }

    pub fn unauthorized(path: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "missing or invalid API key",
            path,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Maps an orchestrator error onto the HTTP taxonomy: validation
    /// 400, conflict 409, unprocessable charge 422, upstream 502,
    /// everything else 500.
    pub fn from_orchestrator(err: OrchestratorError, path: &str) -> Self {
        let status = match &err {
            OrchestratorError::Validation(_)
            | OrchestratorError::UnknownCustomer(_)
            | OrchestratorError::UnknownProduct(_)
            | OrchestratorError::Order(_) => StatusCode::BAD_REQUEST,
            OrchestratorError::InsufficientStock { .. } => StatusCode::CONFLICT,
            OrchestratorError::Charge(ChargeError::Invalid(_)) => StatusCode::BAD_REQUEST,
            OrchestratorError::Charge(ChargeError::Unprocessable(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            OrchestratorError::Charge(ChargeError::Upstream(_)) => StatusCode::BAD_GATEWAY,
            OrchestratorError::Store(StoreError::OrderNotFound(_)) => StatusCode::NOT_FOUND,
            OrchestratorError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::with_taxonomy(status, err.to_string(), path)
    }

    pub fn from_settlement(err: SettlementError, path: &str) -> Self {
        let status = match &err {
            SettlementError::Validation(_) | SettlementError::Card(_) => StatusCode::BAD_REQUEST,
            SettlementError::Rejected { .. } | SettlementError::TokenizationRejected { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            SettlementError::Tokenization(_) | SettlementError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::with_taxonomy(status, err.to_string(), path)
    }

    pub fn from_tokenizer(err: TokenizerError, path: &str) -> Self {
        let status = match &err {
            TokenizerError::Card(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::with_taxonomy(status, err.to_string(), path)
    }

    /// Server-side failures keep their full chain in the log and ship a
    /// generic message to the client.
    fn with_taxonomy(status: StatusCode, message: String, path: &str) -> Self {
        if status.is_server_error() {
            tracing::error!(%status, error = %message, path, "request failed");
            let generic = if status == StatusCode::BAD_GATEWAY {
                "upstream collaborator unavailable"
            } else {
                "internal server error"
            };
            return Self::new(status, generic, path);
        }
        Self::new(status, message, path)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: self.status.as_u16(),
            error: self
                .status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            message: self.message,
            path: self.path,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;

    #[test]
    fn insufficient_stock_maps_to_conflict() {
        let err = ApiError::from_orchestrator(
            OrchestratorError::InsufficientStock {
                product_id: ProductId::new(1),
                requested: 5,
                available: 2,
            },
            "/orders",
        );
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn rejected_settlement_maps_to_unprocessable() {
        let err =
            ApiError::from_settlement(SettlementError::Rejected { attempts: 3 }, "/payments/charge");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn upstream_charge_failure_maps_to_bad_gateway() {
        let err = ApiError::from_orchestrator(
            OrchestratorError::Charge(ChargeError::Upstream("down".into())),
            "/orders",
        );
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
