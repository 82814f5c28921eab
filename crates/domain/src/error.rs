//! Domain error types.

use common::ProductId;
use thiserror::Error;

use crate::order::OrderStatus;

/// Errors raised by order construction and state transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// The request carried no items.
    #[error("items required")]
    NoItems,

    /// Neither a card token nor raw card data was supplied.
    #[error("either 'tokenCard' or 'card' must be provided")]
    PaymentMethodRequired,

    /// Both a card token and raw card data were supplied.
    #[error("exactly one of 'tokenCard' or 'card' must be provided")]
    AmbiguousPaymentMethod,

    /// A line quantity was zero.
    #[error("quantity must be > 0 for product {product_id}")]
    InvalidQuantity { product_id: ProductId },

    /// Minor-unit arithmetic overflowed.
    #[error("order amount overflows minor-unit arithmetic")]
    AmountOverflow,

    /// An order status transition other than Created -> {Paid, Failed}.
    #[error("invalid order status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

/// Errors raised by card data validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CardError {
    /// PAN is not 12-19 digits or fails the Luhn check.
    #[error("invalid card number")]
    InvalidPan,

    /// Expiration month outside 1-12 or year outside the accepted window.
    #[error("invalid card expiration")]
    InvalidExpiry,

    /// CVV does not match the detected brand's format.
    #[error("invalid cvv")]
    InvalidCvv,

    /// Cardholder name is blank.
    #[error("cardholder name required")]
    HolderNameRequired,
}
