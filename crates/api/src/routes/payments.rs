//! Standalone charge and payment lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{OriginalUri, Path, State};
use axum::{Extension, http::StatusCode};
use chrono::{DateTime, Utc};
use common::{CorrelationId, Money, PaymentId};
use domain::{CardData, PaymentMethod};
use serde::{Deserialize, Serialize};
use settlement::ChargeRequest;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeBody {
    /// Order reference the payment correlates to (`ORD-...`).
    pub order_id: String,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    pub token: Option<String>,
    pub card: Option<CardData>,
    pub customer_email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeResponse {
    pub status: String,
    pub attempts: u32,
    pub auth_code: String,
    pub order_id: String,
    pub payment_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub token: String,
    pub last4: Option<String>,
    pub brand: Option<String>,
    pub auth_code: Option<String>,
    pub attempts: u32,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// POST /payments/charge — charge a token or card directly.
#[tracing::instrument(skip(state, correlation, body))]
pub async fn charge(
    State(state): State<Arc<AppState>>,
    Extension(correlation): Extension<CorrelationId>,
    OriginalUri(uri): OriginalUri,
    Json(body): Json<ChargeBody>,
) -> Result<(StatusCode, Json<ChargeResponse>), ApiError> {
    let path = uri.path();
    let method = PaymentMethod::from_parts(body.token, body.card)
        .map_err(|e| ApiError::bad_request(e.to_string(), path))?;

    let request = ChargeRequest {
        order_ref: body.order_id.clone(),
        amount: Money::from_minor(body.amount),
        currency: body.currency,
        method,
        customer_email: body.customer_email,
    };
    let outcome = state
        .settler
        .charge(&correlation, request)
        .await
        .map_err(|e| ApiError::from_settlement(e, path))?;

    Ok((
        StatusCode::OK,
        Json(ChargeResponse {
            status: "APPROVED".to_string(),
            attempts: outcome.attempts,
            auth_code: outcome.auth_code,
            order_id: body.order_id,
            payment_id: outcome.payment_id.to_string(),
        }),
    ))
}

/// GET /payments/{id} — read-only projection of a persisted payment.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let path = uri.path();
    let uuid = uuid::Uuid::parse_str(&id)
        .map_err(|e| ApiError::bad_request(format!("invalid payment id: {e}"), path))?;
    let payment = state
        .settler
        .get_payment(PaymentId::from_uuid(uuid))
        .await
        .map_err(|e| ApiError::from_settlement(e, path))?
        .ok_or_else(|| ApiError::not_found(format!("payment {id} not found"), path))?;

    Ok(Json(PaymentResponse {
        id: payment.id.to_string(),
        order_id: payment.order_ref,
        amount: payment.amount.minor(),
        currency: payment.currency,
        token: payment.token,
        last4: payment.last4,
        brand: payment.brand,
        auth_code: payment.auth_code,
        attempts: payment.attempts,
        status: payment.status.to_string(),
        created_at: payment.created_at,
    }))
}
