//! Order aggregate and its status state machine.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// The status of an order in its lifecycle.
///
/// Transitions happen exactly once:
/// ```text
/// Created ──┬──► Paid
///           └──► Failed
/// ```
/// `Created` is never re-entered; `Paid` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Durably recorded, settlement outcome still unknown.
    #[default]
    Created,

    /// Payment approved and stock decrement requested (terminal).
    Paid,

    /// Payment rejected or settlement failed hard (terminal).
    Failed,
}

impl OrderStatus {
    /// Returns true if the status can still be finalized.
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Paid => "PAID",
            OrderStatus::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

/// A priced order line, lifetime-bound to its order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Snapshot of the catalog price at order time, in minor units.
    pub unit_price: Money,
    pub subtotal: Money,
}

impl OrderLine {
    /// Prices a line from a catalog snapshot, computing the subtotal with
    /// checked minor-unit arithmetic.
    pub fn price(
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, OrderError> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { product_id });
        }
        let subtotal = unit_price
            .checked_mul(quantity)
            .ok_or(OrderError::AmountOverflow)?;
        Ok(Self {
            product_id,
            quantity,
            unit_price,
            subtotal,
        })
    }
}

/// The order aggregate, owned exclusively by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    /// Shipping address captured at creation time, not a live reference.
    pub address_snapshot: String,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Creates a new order in `Created` status from priced lines.
    ///
    /// The total is the checked sum of the line subtotals, so the
    /// `total_amount == Σ subtotal` invariant holds by construction.
    pub fn create(
        customer_id: CustomerId,
        address_snapshot: impl Into<String>,
        lines: Vec<OrderLine>,
    ) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::NoItems);
        }
        let mut total = Money::zero();
        for line in &lines {
            total = total
                .checked_add(line.subtotal)
                .ok_or(OrderError::AmountOverflow)?;
        }
        Ok(Self {
            id: OrderId::new(),
            customer_id,
            address_snapshot: address_snapshot.into(),
            status: OrderStatus::Created,
            total_amount: total,
            created_at: Utc::now(),
            lines,
        })
    }

    /// Finalizes the order into a terminal status.
    ///
    /// Only `Created -> Paid` and `Created -> Failed` are legal; any
    /// other transition is rejected so a terminal state can never be
    /// overwritten.
    pub fn finalize(&mut self, status: OrderStatus) -> Result<(), OrderError> {
        if !self.status.is_open() || status == OrderStatus::Created {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> Vec<OrderLine> {
        vec![
            OrderLine::price(ProductId::new(1), 3, Money::from_minor(15900)).unwrap(),
            OrderLine::price(ProductId::new(2), 1, Money::from_minor(2500)).unwrap(),
        ]
    }

    #[test]
    fn total_equals_sum_of_subtotals() {
        let order = Order::create(CustomerId::new(7), "Cra 1 #2-3", lines()).unwrap();
        assert_eq!(order.total_amount, Money::from_minor(47700 + 2500));
        let summed: Money = order.lines.iter().map(|l| l.subtotal).sum();
        assert_eq!(order.total_amount, summed);
    }

    #[test]
    fn create_rejects_empty_lines() {
        let err = Order::create(CustomerId::new(7), "addr", vec![]).unwrap_err();
        assert_eq!(err, OrderError::NoItems);
    }

    #[test]
    fn line_rejects_zero_quantity() {
        let err = OrderLine::price(ProductId::new(1), 0, Money::from_minor(100)).unwrap_err();
        assert!(matches!(err, OrderError::InvalidQuantity { .. }));
    }

    #[test]
    fn line_detects_overflow() {
        let err =
            OrderLine::price(ProductId::new(1), 3, Money::from_minor(i64::MAX)).unwrap_err();
        assert_eq!(err, OrderError::AmountOverflow);
    }

    #[test]
    fn finalize_transitions_once() {
        let mut order = Order::create(CustomerId::new(7), "addr", lines()).unwrap();
        order.finalize(OrderStatus::Paid).unwrap();
        assert_eq!(order.status, OrderStatus::Paid);

        let err = order.finalize(OrderStatus::Failed).unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }

    #[test]
    fn finalize_rejects_created_reentry() {
        let mut order = Order::create(CustomerId::new(7), "addr", lines()).unwrap();
        let err = order.finalize(OrderStatus::Created).unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }
}
