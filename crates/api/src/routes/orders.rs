//! Order creation and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{OriginalUri, Path, State};
use axum::http::{StatusCode, header};
use axum::{Extension, response::IntoResponse};
use chrono::{DateTime, Utc};
use common::{CorrelationId, CustomerId, OrderId, ProductId};
use domain::{CardData, Order, PaymentMethod};
use orchestrator::{CreateOrderRequest, OrderItem, OrderReceipt};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderBody {
    pub customer_id: i64,
    pub address: String,
    pub token_card: Option<String>,
    pub card: Option<CardData>,
    pub items: Vec<ItemBody>,
    pub customer_email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    pub product_id: i64,
    pub qty: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: String,
    pub status: String,
    pub total_amount: i64,
    pub items: Vec<ItemResponse>,
    pub payment_attempts: Option<u32>,
    pub payment_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub product_id: i64,
    pub qty: u32,
    pub unit_price: i64,
    pub subtotal: i64,
}

fn project(order: &Order, attempts: Option<u32>, payment_status: Option<String>) -> OrderResponse {
    OrderResponse {
        order_id: order.id.to_string(),
        status: order.status.to_string(),
        total_amount: order.total_amount.minor(),
        items: order
            .lines
            .iter()
            .map(|line| ItemResponse {
                product_id: line.product_id.value(),
                qty: line.quantity,
                unit_price: line.unit_price.minor(),
                subtotal: line.subtotal.minor(),
            })
            .collect(),
        payment_attempts: attempts,
        payment_status,
        created_at: order.created_at,
    }
}

/// POST /orders — run the full order saga.
#[tracing::instrument(skip(state, correlation, body))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(correlation): Extension<CorrelationId>,
    OriginalUri(uri): OriginalUri,
    Json(body): Json<CreateOrderBody>,
) -> Result<impl IntoResponse, ApiError> {
    let path = uri.path();
    let method = PaymentMethod::from_parts(body.token_card, body.card)
        .map_err(|e| ApiError::bad_request(e.to_string(), path))?;

    let request = CreateOrderRequest {
        customer_id: CustomerId::new(body.customer_id),
        address: body.address,
        method,
        items: body
            .items
            .iter()
            .map(|item| OrderItem {
                product_id: ProductId::new(item.product_id),
                quantity: item.qty,
            })
            .collect(),
        customer_email: body.customer_email,
    };

    let OrderReceipt {
        order,
        payment_attempts,
        payment_status,
    } = state
        .orchestrator
        .create_order(&correlation, request)
        .await
        .map_err(|e| ApiError::from_orchestrator(e, path))?;

    let location = format!("/orders/{}", order.id);
    let response = project(
        &order,
        payment_attempts,
        payment_status.map(|s| s.to_string()),
    );
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(response),
    ))
}

/// GET /orders/{id} — read-only projection; payment fields are absent.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let path = uri.path();
    let order_id = parse_order_id(&id, path)?;
    let order = state
        .orchestrator
        .get_order(order_id)
        .await
        .map_err(|e| ApiError::from_orchestrator(e, path))?
        .ok_or_else(|| ApiError::not_found(format!("order {id} not found"), path))?;
    Ok(Json(project(&order, None, None)))
}

fn parse_order_id(id: &str, path: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::bad_request(format!("invalid order id: {e}"), path))?;
    Ok(OrderId::from_uuid(uuid))
}
