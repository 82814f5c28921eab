//! PostgreSQL-backed store implementations.

use async_trait::async_trait;
use common::{CustomerId, Money, OrderId, PaymentId, ProductId};
use domain::{
    CardBrand, CardToken, Order, OrderError, OrderLine, OrderStatus, Payment, PaymentStatus,
    TokenStatus,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::orders::OrderStore;
use crate::payments::PaymentStore;
use crate::tokens::TokenStore;

/// Runs the workspace SQL migrations against the given pool.
pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

fn parse_order_status(s: &str) -> Result<OrderStatus> {
    match s {
        "CREATED" => Ok(OrderStatus::Created),
        "PAID" => Ok(OrderStatus::Paid),
        "FAILED" => Ok(OrderStatus::Failed),
        other => Err(StoreError::Corrupt(format!("order status: {other}"))),
    }
}

fn parse_payment_status(s: &str) -> Result<PaymentStatus> {
    match s {
        "APPROVED" => Ok(PaymentStatus::Approved),
        "REJECTED" => Ok(PaymentStatus::Rejected),
        other => Err(StoreError::Corrupt(format!("payment status: {other}"))),
    }
}

/// PostgreSQL order store.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: CustomerId::new(row.try_get("customer_id")?),
            address_snapshot: row.try_get("address_snapshot")?,
            status: parse_order_status(&status)?,
            total_amount: Money::from_minor(row.try_get("total_minor")?),
            created_at: row.try_get("created_at")?,
            lines,
        })
    }

    async fn load_lines(&self, id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            "SELECT product_id, quantity, unit_price_minor, subtotal_minor \
             FROM order_lines WHERE order_id = $1 ORDER BY position",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OrderLine {
                    product_id: ProductId::new(row.try_get("product_id")?),
                    quantity: row.try_get::<i32, _>("quantity")? as u32,
                    unit_price: Money::from_minor(row.try_get("unit_price_minor")?),
                    subtotal: Money::from_minor(row.try_get("subtotal_minor")?),
                })
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, customer_id, address_snapshot, status, total_minor, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.value())
        .bind(&order.address_snapshot)
        .bind(order.status.to_string())
        .bind(order.total_amount.minor())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, line) in order.lines.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_lines (order_id, position, product_id, quantity, unit_price_minor, subtotal_minor) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(order.id.as_uuid())
            .bind(position as i32)
            .bind(line.product_id.value())
            .bind(line.quantity as i32)
            .bind(line.unit_price.minor())
            .bind(line.subtotal.minor())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn finalize(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        // Guarding on the CREATED status makes the transition-once rule a
        // single compare-and-set statement.
        let updated = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1 AND status = 'CREATED'")
            .bind(id.as_uuid())
            .bind(status.to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            let current = self.get(id).await?.ok_or(StoreError::OrderNotFound(id))?;
            return Err(StoreError::Domain(OrderError::InvalidTransition {
                from: current.status,
                to: status,
            }));
        }

        self.get(id).await?.ok_or(StoreError::OrderNotFound(id))
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT id, customer_id, address_snapshot, status, total_minor, created_at \
             FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lines = self.load_lines(id).await?;
                Ok(Some(Self::row_to_order(&row, lines)?))
            }
            None => Ok(None),
        }
    }
}

/// PostgreSQL payment store.
#[derive(Clone)]
pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    /// Creates a new PostgreSQL payment store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: &PgRow) -> Result<Payment> {
        let status: String = row.try_get("status")?;
        Ok(Payment {
            id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_ref: row.try_get("order_ref")?,
            amount: Money::from_minor(row.try_get("amount_minor")?),
            currency: row.try_get("currency")?,
            token: row.try_get("token")?,
            last4: row.try_get("last4")?,
            brand: row.try_get("brand")?,
            auth_code: row.try_get("auth_code")?,
            attempts: row.try_get::<i32, _>("attempts")? as u32,
            status: parse_payment_status(&status)?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            "INSERT INTO payments (id, order_ref, amount_minor, currency, token, last4, brand, auth_code, attempts, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(payment.id.as_uuid())
        .bind(&payment.order_ref)
        .bind(payment.amount.minor())
        .bind(&payment.currency)
        .bind(&payment.token)
        .bind(&payment.last4)
        .bind(&payment.brand)
        .bind(&payment.auth_code)
        .bind(payment.attempts as i32)
        .bind(payment.status.to_string())
        .bind(payment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        let row = sqlx::query(
            "SELECT id, order_ref, amount_minor, currency, token, last4, brand, auth_code, attempts, status, created_at \
             FROM payments WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::row_to_payment(&row)).transpose()
    }
}

/// PostgreSQL card token store.
#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    /// Creates a new PostgreSQL token store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_token(row: &PgRow) -> Result<CardToken> {
        let brand: String = row.try_get("brand")?;
        let status: String = row.try_get("status")?;
        Ok(CardToken {
            token: row.try_get("token")?,
            last4: row.try_get("last4")?,
            brand: brand
                .parse::<CardBrand>()
                .map_err(StoreError::Corrupt)?,
            encrypted_payload: row.try_get("encrypted_payload")?,
            nonce_hex: row.try_get("nonce_hex")?,
            status: match status.as_str() {
                "ISSUED" => TokenStatus::Issued,
                other => return Err(StoreError::Corrupt(format!("token status: {other}"))),
            },
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn insert(&self, token: &CardToken) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO card_tokens (token, last4, brand, encrypted_payload, nonce_hex, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&token.token)
        .bind(&token.last4)
        .bind(token.brand.to_string())
        .bind(&token.encrypted_payload)
        .bind(&token.nonce_hex)
        .bind(token.status.to_string())
        .bind(token.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateToken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<CardToken>> {
        let row = sqlx::query(
            "SELECT token, last4, brand, encrypted_payload, nonce_hex, status, created_at \
             FROM card_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::row_to_token(&row)).transpose()
    }
}
