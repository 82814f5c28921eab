//! Order creation saga.

use std::sync::Arc;

use collaborators::{AuditEvent, Catalog, CustomerDirectory, SideEffects};
use common::{CorrelationId, CustomerId, OrderId, ProductId};
use domain::{Order, OrderLine, OrderStatus, PaymentMethod, PaymentStatus};
use serde_json::json;
use store::OrderStore;

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::ports::{ChargeResult, ChargeSpec, PaymentsPort};

/// One requested order line, not yet priced.
#[derive(Debug, Clone, Copy)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A parsed order request. The token-or-card XOR is already structural
/// in [`PaymentMethod`]; the API edge resolves the wire fields.
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub customer_id: CustomerId,
    pub address: String,
    pub method: PaymentMethod,
    pub items: Vec<OrderItem>,
    pub customer_email: Option<String>,
}

/// Creation response projection. Payment attempts and status exist only
/// here; the order itself never persists them.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
    pub order: Order,
    pub payment_attempts: Option<u32>,
    pub payment_status: Option<PaymentStatus>,
}

/// Order orchestrator.
pub struct Orchestrator {
    orders: Arc<dyn OrderStore>,
    customers: Arc<dyn CustomerDirectory>,
    catalog: Arc<dyn Catalog>,
    payments: Arc<dyn PaymentsPort>,
    side_effects: SideEffects,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Creates a new orchestrator.
    pub fn new(
        orders: Arc<dyn OrderStore>,
        customers: Arc<dyn CustomerDirectory>,
        catalog: Arc<dyn Catalog>,
        payments: Arc<dyn PaymentsPort>,
        side_effects: SideEffects,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            orders,
            customers,
            catalog,
            payments,
            side_effects,
            config,
        }
    }

    /// Runs the order saga: validate, price, persist `Created`, charge,
    /// finalize.
    ///
    /// The order row is the durability checkpoint; everything after it
    /// reconciles the order into a terminal status exactly once. A hard
    /// settlement error still finalizes the order to `Failed` before the
    /// error propagates, so no order is left open by a charge that never
    /// completed.
    #[tracing::instrument(skip(self, correlation, request), fields(customer_id = %request.customer_id))]
    pub async fn create_order(
        &self,
        correlation: &CorrelationId,
        request: CreateOrderRequest,
    ) -> Result<OrderReceipt, OrchestratorError> {
        if request.address.trim().is_empty() {
            return Err(OrchestratorError::Validation("address is required".into()));
        }
        if request.items.is_empty() {
            return Err(OrchestratorError::Validation(
                "at least one item is required".into(),
            ));
        }
        if !self.customers.exists(request.customer_id).await {
            return Err(OrchestratorError::UnknownCustomer(request.customer_id));
        }

        // Point-in-time price/stock check; no lock is held across the
        // later decrement.
        let mut lines = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let snapshot = self
                .catalog
                .snapshot(item.product_id)
                .await
                .ok_or(OrchestratorError::UnknownProduct(item.product_id))?;
            if item.quantity > snapshot.stock {
                return Err(OrchestratorError::InsufficientStock {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available: snapshot.stock,
                });
            }
            lines.push(OrderLine::price(item.product_id, item.quantity, snapshot.price)?);
        }

        let order = Order::create(request.customer_id, request.address.clone(), lines)?;
        self.orders.insert(&order).await?;
        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, total = %order.total_amount, "order persisted");

        self.side_effects.audit(AuditEvent::new(
            correlation,
            "orders",
            "ORDER.CREATED",
            Some(order.id.order_ref()),
            json!({
                "customerId": request.customer_id.value(),
                "totalMinor": order.total_amount.minor(),
                "itemsCount": order.lines.len(),
            }),
        ));

        let spec = ChargeSpec {
            order_ref: order.id.order_ref(),
            amount: order.total_amount,
            currency: self.config.currency.clone(),
            method: request.method.clone(),
            customer_email: request.customer_email.clone(),
        };
        match self.payments.charge(correlation, spec).await {
            Ok(ChargeResult::Approved {
                attempts,
                auth_code,
            }) => {
                self.decrement_stock(&order).await;
                let order = self.orders.finalize(order.id, OrderStatus::Paid).await?;
                metrics::counter!("orders_finalized_total", "status" => "paid").increment(1);
                self.side_effects.audit(AuditEvent::new(
                    correlation,
                    "orders",
                    "ORDER.PAID",
                    Some(order.id.order_ref()),
                    json!({ "paymentAttempts": attempts, "authCode": auth_code }),
                ));
                Ok(OrderReceipt {
                    order,
                    payment_attempts: Some(attempts),
                    payment_status: Some(PaymentStatus::Approved),
                })
            }
            Ok(ChargeResult::Rejected { attempts }) => {
                let order = self.fail_order(correlation, order.id, "payment_rejected").await?;
                Ok(OrderReceipt {
                    order,
                    payment_attempts: Some(attempts),
                    payment_status: Some(PaymentStatus::Rejected),
                })
            }
            Err(e) => {
                // Reconcile the checkpoint before the error propagates.
                tracing::error!(order_id = %order.id, error = %e, "charge failed hard");
                if let Err(fin) = self.fail_order(correlation, order.id, "settlement_error").await
                {
                    tracing::error!(order_id = %order.id, error = %fin, "order left unreconciled");
                }
                Err(e.into())
            }
        }
    }

    /// Loads an order. Payment attempts and status are absent on this
    /// read-only path.
    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>, OrchestratorError> {
        Ok(self.orders.get(id).await?)
    }

    async fn fail_order(
        &self,
        correlation: &CorrelationId,
        id: OrderId,
        reason: &str,
    ) -> Result<Order, OrchestratorError> {
        let order = self.orders.finalize(id, OrderStatus::Failed).await?;
        metrics::counter!("orders_finalized_total", "status" => "failed").increment(1);
        self.side_effects.audit(AuditEvent::new(
            correlation,
            "orders",
            "ORDER.FAILED",
            Some(order.id.order_ref()),
            json!({ "reason": reason }),
        ));
        Ok(order)
    }

    /// Best-effort stock decrement after an approved charge. Failures
    /// are logged, never compensated against order state.
    async fn decrement_stock(&self, order: &Order) {
        for line in &order.lines {
            if let Err(e) = self
                .catalog
                .decrement(line.product_id, line.quantity)
                .await
            {
                tracing::warn!(
                    order_id = %order.id,
                    product_id = %line.product_id,
                    error = %e,
                    "stock decrement failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use collaborators::{
        InMemoryAuditSink, InMemoryCatalog, InMemoryCustomerDirectory,
        InMemoryNotificationGateway, spawn_side_effects,
    };
    use common::Money;
    use domain::CardData;
    use store::InMemoryOrderStore;

    use crate::ports::ChargeError;

    struct ScriptedPayments {
        results: Mutex<VecDeque<Result<ChargeResult, ChargeError>>>,
        specs: Mutex<Vec<ChargeSpec>>,
    }

    impl ScriptedPayments {
        fn new(results: impl IntoIterator<Item = Result<ChargeResult, ChargeError>>) -> Self {
            Self {
                results: Mutex::new(results.into_iter().collect()),
                specs: Mutex::new(Vec::new()),
            }
        }

        fn specs(&self) -> Vec<ChargeSpec> {
            self.specs.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl PaymentsPort for ScriptedPayments {
        async fn charge(
            &self,
            _correlation: &CorrelationId,
            spec: ChargeSpec,
        ) -> Result<ChargeResult, ChargeError> {
            self.specs.lock().unwrap().push(spec);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted charge result")
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        orders: Arc<InMemoryOrderStore>,
        catalog: InMemoryCatalog,
        customers: InMemoryCustomerDirectory,
        payments: Arc<ScriptedPayments>,
        sink: InMemoryAuditSink,
        side_effects: SideEffects,
    }

    fn harness(payments: ScriptedPayments) -> Harness {
        let orders = Arc::new(InMemoryOrderStore::new());
        let catalog = InMemoryCatalog::new();
        let customers = InMemoryCustomerDirectory::new();
        let sink = InMemoryAuditSink::new();
        let gateway = InMemoryNotificationGateway::new();
        let (side_effects, _worker) =
            spawn_side_effects(Arc::new(sink.clone()), Arc::new(gateway.clone()), 64);

        customers.register(CustomerId::new(7));
        catalog.stock(ProductId::new(1), Money::from_minor(15_900), 10);
        catalog.stock(ProductId::new(2), Money::from_minor(2_500), 4);

        let payments = Arc::new(payments);
        let orchestrator = Orchestrator::new(
            orders.clone(),
            Arc::new(customers.clone()),
            Arc::new(catalog.clone()),
            payments.clone(),
            side_effects.clone(),
            OrchestratorConfig::default(),
        );
        Harness {
            orchestrator,
            orders,
            catalog,
            customers,
            payments,
            sink,
            side_effects,
        }
    }

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            customer_id: CustomerId::new(7),
            address: "Cra 1 #2-3, Bogota".to_string(),
            method: PaymentMethod::Token("tok_abc".to_string()),
            items: vec![
                OrderItem {
                    product_id: ProductId::new(1),
                    quantity: 3,
                },
                OrderItem {
                    product_id: ProductId::new(2),
                    quantity: 1,
                },
            ],
            customer_email: Some("jane@example.com".to_string()),
        }
    }

    fn card() -> CardData {
        CardData {
            pan: "4111111111111111".to_string(),
            cvv: "123".to_string(),
            exp_month: 10,
            exp_year: 2030,
            name: "JANE DOE".to_string(),
        }
    }

    #[tokio::test]
    async fn approved_charge_pays_order_and_decrements_stock() {
        let h = harness(ScriptedPayments::new([Ok(ChargeResult::Approved {
            attempts: 1,
            auth_code: "A1B2C3".to_string(),
        })]));
        let correlation = CorrelationId::from_header("tx-1");

        let receipt = h
            .orchestrator
            .create_order(&correlation, request())
            .await
            .unwrap();
        assert_eq!(receipt.order.status, OrderStatus::Paid);
        assert_eq!(receipt.order.total_amount, Money::from_minor(50_200));
        assert_eq!(receipt.payment_attempts, Some(1));
        assert_eq!(receipt.payment_status, Some(PaymentStatus::Approved));

        let specs = h.payments.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].order_ref, receipt.order.id.order_ref());
        assert_eq!(specs[0].amount, Money::from_minor(50_200));
        assert_eq!(specs[0].currency, "COP");

        assert_eq!(
            h.catalog.decrements(),
            vec![(ProductId::new(1), 3), (ProductId::new(2), 1)]
        );

        h.side_effects.flush().await;
        assert_eq!(h.sink.events_of_type("ORDER.CREATED").len(), 1);
        assert_eq!(h.sink.events_of_type("ORDER.PAID").len(), 1);
    }

    #[tokio::test]
    async fn rejected_charge_fails_order_without_decrement() {
        let h = harness(ScriptedPayments::new([Ok(ChargeResult::Rejected {
            attempts: 3,
        })]));
        let correlation = CorrelationId::from_header("tx-2");

        let receipt = h
            .orchestrator
            .create_order(&correlation, request())
            .await
            .unwrap();
        assert_eq!(receipt.order.status, OrderStatus::Failed);
        assert_eq!(receipt.payment_attempts, Some(3));
        assert_eq!(receipt.payment_status, Some(PaymentStatus::Rejected));
        assert!(h.catalog.decrements().is_empty());

        h.side_effects.flush().await;
        let failed = h.sink.events_of_type("ORDER.FAILED");
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].payload["reason"], "payment_rejected");
    }

    #[tokio::test]
    async fn insufficient_stock_conflicts_before_any_write() {
        let h = harness(ScriptedPayments::new([]));
        let correlation = CorrelationId::from_header("tx-3");

        let mut request = request();
        request.items[1].quantity = 5;
        let err = h
            .orchestrator
            .create_order(&correlation, request)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::InsufficientStock {
                requested: 5,
                available: 4,
                ..
            }
        ));
        assert_eq!(h.orders.order_count().await, 0);
        assert!(h.payments.specs().is_empty());
        assert!(h.catalog.decrements().is_empty());
    }

    #[tokio::test]
    async fn unknown_customer_is_rejected() {
        let h = harness(ScriptedPayments::new([]));
        let correlation = CorrelationId::from_header("tx-4");

        let mut request = request();
        request.customer_id = CustomerId::new(99);
        let err = h
            .orchestrator
            .create_order(&correlation, request)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownCustomer(_)));
        assert_eq!(h.orders.order_count().await, 0);
    }

    #[tokio::test]
    async fn directory_outage_degrades_to_unknown_customer() {
        let h = harness(ScriptedPayments::new([]));
        let correlation = CorrelationId::from_header("tx-5");

        h.customers.set_unavailable(true);
        let err = h
            .orchestrator
            .create_order(&correlation, request())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownCustomer(_)));
    }

    #[tokio::test]
    async fn unknown_product_is_rejected() {
        let h = harness(ScriptedPayments::new([]));
        let correlation = CorrelationId::from_header("tx-6");

        let mut request = request();
        request.items[0].product_id = ProductId::new(42);
        let err = h
            .orchestrator
            .create_order(&correlation, request)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownProduct(_)));
    }

    #[tokio::test]
    async fn hard_settlement_error_fails_order_then_propagates() {
        let h = harness(ScriptedPayments::new([Err(ChargeError::Upstream(
            "settler unreachable".to_string(),
        ))]));
        let correlation = CorrelationId::from_header("tx-7");

        let err = h
            .orchestrator
            .create_order(&correlation, request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Charge(ChargeError::Upstream(_))
        ));

        // The order is reconciled to Failed, not left in Created.
        let orders = h.orders.order_count().await;
        assert_eq!(orders, 1);
        h.side_effects.flush().await;
        let failed = h.sink.events_of_type("ORDER.FAILED");
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].payload["reason"], "settlement_error");
        let order_ref = failed[0].order_ref.clone().unwrap();
        assert!(order_ref.starts_with("ORD-"));
    }

    #[tokio::test]
    async fn card_method_is_passed_through_to_the_port() {
        let h = harness(ScriptedPayments::new([Ok(ChargeResult::Approved {
            attempts: 1,
            auth_code: "A1B2C3".to_string(),
        })]));
        let correlation = CorrelationId::from_header("tx-8");

        let mut request = request();
        request.method = PaymentMethod::Card(card());
        h.orchestrator
            .create_order(&correlation, request)
            .await
            .unwrap();
        assert!(matches!(
            h.payments.specs()[0].method,
            PaymentMethod::Card(_)
        ));
    }

    #[tokio::test]
    async fn decrement_failure_still_pays_the_order() {
        let h = harness(ScriptedPayments::new([Ok(ChargeResult::Approved {
            attempts: 1,
            auth_code: "A1B2C3".to_string(),
        })]));
        let correlation = CorrelationId::from_header("tx-9");

        h.catalog.set_fail_on_decrement(true);
        let receipt = h
            .orchestrator
            .create_order(&correlation, request())
            .await
            .unwrap();
        assert_eq!(receipt.order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn get_order_reads_back_without_payment_fields() {
        let h = harness(ScriptedPayments::new([Ok(ChargeResult::Approved {
            attempts: 2,
            auth_code: "A1B2C3".to_string(),
        })]));
        let correlation = CorrelationId::from_header("tx-10");

        let receipt = h
            .orchestrator
            .create_order(&correlation, request())
            .await
            .unwrap();
        let loaded = h
            .orchestrator
            .get_order(receipt.order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status, OrderStatus::Paid);

        assert!(h.orchestrator.get_order(OrderId::new()).await.unwrap().is_none());
    }
}
