//! Card tokenization endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use domain::CardData;
use serde::Serialize;
use tokenizer::TokenizationOutcome;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizeResponse {
    /// Absent when the tokenization was rejected.
    pub token: Option<String>,
    pub last4: String,
    pub brand: String,
    pub status: String,
}

/// POST /tokenize — exchange raw card data for a token.
///
/// 200 with an issued token, 422 when the acquirer rejected the card;
/// both carry brand and last4.
#[tracing::instrument(skip(state, card))]
pub async fn tokenize(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    Json(card): Json<CardData>,
) -> Result<(StatusCode, Json<TokenizeResponse>), ApiError> {
    let path = uri.path();
    let outcome = state
        .tokenizer
        .tokenize(&card)
        .await
        .map_err(|e| ApiError::from_tokenizer(e, path))?;

    let (status, response) = match outcome {
        TokenizationOutcome::Issued {
            token,
            last4,
            brand,
        } => (
            StatusCode::OK,
            TokenizeResponse {
                token: Some(token),
                last4,
                brand: brand.to_string(),
                status: "ISSUED".to_string(),
            },
        ),
        TokenizationOutcome::Rejected { last4, brand } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            TokenizeResponse {
                token: None,
                last4,
                brand: brand.to_string(),
                status: "REJECTED".to_string(),
            },
        ),
    };
    Ok((status, Json(response)))
}
