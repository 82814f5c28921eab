//! Charge execution.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use collaborators::{AuditEvent, PaymentNotification, SideEffects};
use common::{CorrelationId, Money, PaymentId, RandomSource};
use domain::{CardData, Payment, PaymentMethod, PaymentStatus};
use serde_json::json;
use store::PaymentStore;
use tokenizer::{TokenizationOutcome, Tokenizer, TokenizerError};
use uuid::Uuid;

use crate::config::SettlementConfig;
use crate::error::SettlementError;

/// Token issuance as the settler sees it. The production implementation
/// is the tokenizer service; tests script outcomes directly.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn tokenize(&self, card: &CardData) -> Result<TokenizationOutcome, TokenizerError>;
}

#[async_trait]
impl TokenProvider for Tokenizer {
    async fn tokenize(&self, card: &CardData) -> Result<TokenizationOutcome, TokenizerError> {
        Tokenizer::tokenize(self, card).await
    }
}

/// A charge to execute against a payment method.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub order_ref: String,
    pub amount: Money,
    pub currency: String,
    pub method: PaymentMethod,
    pub customer_email: Option<String>,
}

/// An approved charge. Rejection surfaces as
/// [`SettlementError::Rejected`], after the payment record is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeOutcome {
    pub payment_id: PaymentId,
    pub attempts: u32,
    pub auth_code: String,
    pub token: String,
    pub last4: Option<String>,
    pub brand: Option<String>,
}

/// Payment settler.
///
/// Exactly one payment record is written per charge, approved or
/// rejected, and exactly one outcome notification is enqueued. The
/// record is never updated afterwards.
pub struct Settler {
    payments: Arc<dyn PaymentStore>,
    tokens: Arc<dyn TokenProvider>,
    side_effects: SideEffects,
    random: Arc<dyn RandomSource>,
    config: SettlementConfig,
}

impl Settler {
    /// Creates a new settler.
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        tokens: Arc<dyn TokenProvider>,
        side_effects: SideEffects,
        random: Arc<dyn RandomSource>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            payments,
            tokens,
            side_effects,
            random,
            config,
        }
    }

    /// Executes a charge: resolve the payment method to a token, run up
    /// to `max_retries + 1` settlement attempts with fixed backoff, then
    /// persist and notify the outcome.
    #[tracing::instrument(skip(self, correlation, request), fields(order_ref = %request.order_ref))]
    pub async fn charge(
        &self,
        correlation: &CorrelationId,
        request: ChargeRequest,
    ) -> Result<ChargeOutcome, SettlementError> {
        validate(&request)?;

        self.side_effects.audit(AuditEvent::new(
            correlation,
            "payments",
            "PAYMENT.REQUESTED",
            Some(request.order_ref.clone()),
            json!({
                "amountMinor": request.amount.minor(),
                "currency": request.currency,
                "method": method_name(&request.method),
            }),
        ));

        let (token, last4, brand) = self.resolve_token(&request.method).await?;

        let max_attempts = self.config.max_retries + 1;
        let mut attempts = 0;
        let approved = loop {
            attempts += 1;
            if self.random.draw() >= self.config.rejection_probability {
                break true;
            }
            tracing::debug!(attempts, "settlement attempt rejected");
            if attempts == max_attempts {
                break false;
            }
            tokio::time::sleep(self.config.backoff).await;
        };

        let status = if approved {
            PaymentStatus::Approved
        } else {
            PaymentStatus::Rejected
        };
        let payment = Payment {
            id: PaymentId::new(),
            order_ref: request.order_ref.clone(),
            amount: request.amount,
            currency: request.currency.to_uppercase(),
            token: token.clone(),
            last4: last4.clone(),
            brand: brand.clone(),
            auth_code: approved.then(auth_code),
            attempts,
            status,
            created_at: Utc::now(),
        };
        self.payments.insert(&payment).await?;
        metrics::counter!("payments_total", "status" => status_label(status)).increment(1);
        tracing::info!(payment_id = %payment.id, %status, attempts, "charge settled");

        let event_type = if approved {
            "PAYMENT_SUCCEEDED"
        } else {
            "PAYMENT_FAILED"
        };
        self.side_effects.notify(PaymentNotification {
            event_type: event_type.to_string(),
            order_ref: request.order_ref.clone(),
            email: request.customer_email.clone(),
            amount: request.amount,
            currency: payment.currency.clone(),
            attempts,
            status: status.to_string(),
        });
        self.side_effects.audit(AuditEvent::new(
            correlation,
            "payments",
            if approved {
                "PAYMENT.APPROVED"
            } else {
                "PAYMENT.REJECTED"
            },
            Some(request.order_ref.clone()),
            json!({
                "paymentId": payment.id.to_string(),
                "attempts": attempts,
                "authCode": payment.auth_code,
            }),
        ));

        if approved {
            Ok(ChargeOutcome {
                payment_id: payment.id,
                attempts,
                auth_code: payment.auth_code.unwrap_or_default(),
                token,
                last4,
                brand,
            })
        } else {
            Err(SettlementError::Rejected { attempts })
        }
    }

    /// Loads a payment record.
    pub async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, SettlementError> {
        Ok(self.payments.get(id).await?)
    }

    /// Exchanges the payment method for a settleable token. A raw card
    /// goes through the tokenizer, retrying rejected attempts up to
    /// `tokenization_max_retries` extra times; no payment record exists
    /// yet if this gives up.
    async fn resolve_token(
        &self,
        method: &PaymentMethod,
    ) -> Result<(String, Option<String>, Option<String>), SettlementError> {
        let card = match method {
            PaymentMethod::Token(token) => return Ok((token.clone(), None, None)),
            PaymentMethod::Card(card) => card,
        };

        let max_attempts = self.config.tokenization_max_retries + 1;
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.tokens.tokenize(card).await {
                Ok(TokenizationOutcome::Issued {
                    token,
                    last4,
                    brand,
                }) => {
                    return Ok((token, Some(last4), Some(brand.to_string())));
                }
                Ok(TokenizationOutcome::Rejected { .. }) => {
                    tracing::debug!(attempts, "tokenization attempt rejected");
                    if attempts == max_attempts {
                        return Err(SettlementError::TokenizationRejected { attempts });
                    }
                    tokio::time::sleep(self.config.tokenization_backoff).await;
                }
                Err(TokenizerError::Card(e)) => return Err(SettlementError::Card(e)),
                Err(e) => return Err(SettlementError::Tokenization(e.to_string())),
            }
        }
    }
}

fn validate(request: &ChargeRequest) -> Result<(), SettlementError> {
    if request.order_ref.trim().is_empty() {
        return Err(SettlementError::Validation("orderRef is required".into()));
    }
    if request.amount.minor() <= 0 {
        return Err(SettlementError::Validation(
            "amount must be positive".into(),
        ));
    }
    if request.currency.trim().is_empty() {
        return Err(SettlementError::Validation("currency is required".into()));
    }
    Ok(())
}

fn method_name(method: &PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Token(_) => "TOKEN",
        PaymentMethod::Card(_) => "CARD",
    }
}

fn status_label(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Approved => "approved",
        PaymentStatus::Rejected => "rejected",
    }
}

/// Six uppercase hex chars, minted only for approved charges.
fn auth_code() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..6].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use collaborators::{
        InMemoryAuditSink, InMemoryNotificationGateway, spawn_side_effects,
    };
    use common::ScriptedRandom;
    use domain::CardBrand;
    use store::InMemoryPaymentStore;

    struct ScriptedTokens {
        outcomes: Mutex<VecDeque<TokenizationOutcome>>,
    }

    impl ScriptedTokens {
        fn new(outcomes: impl IntoIterator<Item = TokenizationOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl TokenProvider for ScriptedTokens {
        async fn tokenize(
            &self,
            _card: &CardData,
        ) -> Result<TokenizationOutcome, TokenizerError> {
            Ok(self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted tokenization outcome"))
        }
    }

    struct Harness {
        settler: Settler,
        payments: Arc<InMemoryPaymentStore>,
        sink: InMemoryAuditSink,
        gateway: InMemoryNotificationGateway,
        side_effects: SideEffects,
    }

    fn harness(
        draws: Vec<f64>,
        config: SettlementConfig,
        tokens: ScriptedTokens,
    ) -> Harness {
        let payments = Arc::new(InMemoryPaymentStore::new());
        let sink = InMemoryAuditSink::new();
        let gateway = InMemoryNotificationGateway::new();
        let (side_effects, _worker) =
            spawn_side_effects(Arc::new(sink.clone()), Arc::new(gateway.clone()), 64);
        let settler = Settler::new(
            payments.clone(),
            Arc::new(tokens),
            side_effects.clone(),
            Arc::new(ScriptedRandom::new(draws)),
            config,
        );
        Harness {
            settler,
            payments,
            sink,
            gateway,
            side_effects,
        }
    }

    fn fast_config(rejection_probability: f64) -> SettlementConfig {
        SettlementConfig {
            rejection_probability,
            max_retries: 2,
            backoff: Duration::from_millis(1),
            tokenization_max_retries: 1,
            tokenization_backoff: Duration::from_millis(1),
        }
    }

    fn token_request() -> ChargeRequest {
        ChargeRequest {
            order_ref: "ORD-1".to_string(),
            amount: Money::from_minor(47_700),
            currency: "cop".to_string(),
            method: PaymentMethod::Token("tok_abc".to_string()),
            customer_email: Some("jane@example.com".to_string()),
        }
    }

    fn card_request() -> ChargeRequest {
        ChargeRequest {
            method: PaymentMethod::Card(CardData {
                pan: "4111111111111111".to_string(),
                cvv: "123".to_string(),
                exp_month: 10,
                exp_year: 2030,
                name: "JANE DOE".to_string(),
            }),
            ..token_request()
        }
    }

    fn issued() -> TokenizationOutcome {
        TokenizationOutcome::Issued {
            token: "tok_derived".to_string(),
            last4: "1111".to_string(),
            brand: CardBrand::Visa,
        }
    }

    fn rejected() -> TokenizationOutcome {
        TokenizationOutcome::Rejected {
            last4: "1111".to_string(),
            brand: CardBrand::Visa,
        }
    }

    #[tokio::test]
    async fn first_attempt_approval_persists_and_notifies_once() {
        let h = harness(vec![0.9], fast_config(0.2), ScriptedTokens::new([]));
        let correlation = CorrelationId::from_header("tx-1");

        let outcome = h.settler.charge(&correlation, token_request()).await.unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.auth_code.len(), 6);
        assert_eq!(outcome.auth_code, outcome.auth_code.to_uppercase());
        assert_eq!(outcome.token, "tok_abc");

        let rows = h.payments.payments_for_order("ORD-1").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, PaymentStatus::Approved);
        assert_eq!(rows[0].currency, "COP");
        assert_eq!(rows[0].attempts, 1);
        assert_eq!(rows[0].auth_code.as_deref(), Some(outcome.auth_code.as_str()));

        h.side_effects.flush().await;
        let sent = h.gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event_type, "PAYMENT_SUCCEEDED");
        assert_eq!(sent[0].status, "APPROVED");
        assert_eq!(h.sink.events_of_type("PAYMENT.REQUESTED").len(), 1);
        assert_eq!(h.sink.events_of_type("PAYMENT.APPROVED").len(), 1);
    }

    #[tokio::test]
    async fn exhausted_rejections_leave_rejected_record_and_one_failure_notification() {
        // Certain rejection with two retries means exactly three attempts.
        let h = harness(vec![0.5], fast_config(1.0), ScriptedTokens::new([]));
        let correlation = CorrelationId::from_header("tx-2");

        let err = h
            .settler
            .charge(&correlation, token_request())
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Rejected { attempts: 3 }));

        let rows = h.payments.payments_for_order("ORD-1").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, PaymentStatus::Rejected);
        assert_eq!(rows[0].attempts, 3);
        assert_eq!(rows[0].auth_code, None);

        h.side_effects.flush().await;
        let sent = h.gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event_type, "PAYMENT_FAILED");
        assert_eq!(sent[0].attempts, 3);
        assert_eq!(h.sink.events_of_type("PAYMENT.REJECTED").len(), 1);
    }

    #[tokio::test]
    async fn retries_until_a_draw_clears_the_threshold() {
        let h = harness(
            vec![0.1, 0.1, 0.9],
            fast_config(0.2),
            ScriptedTokens::new([]),
        );
        let correlation = CorrelationId::from_header("tx-3");

        let outcome = h.settler.charge(&correlation, token_request()).await.unwrap();
        assert_eq!(outcome.attempts, 3);

        let rows = h.payments.payments_for_order("ORD-1").await;
        assert_eq!(rows[0].attempts, 3);
        assert_eq!(rows[0].status, PaymentStatus::Approved);
    }

    #[tokio::test]
    async fn card_is_tokenized_before_settlement() {
        let h = harness(vec![0.9], fast_config(0.2), ScriptedTokens::new([issued()]));
        let correlation = CorrelationId::from_header("tx-4");

        let outcome = h.settler.charge(&correlation, card_request()).await.unwrap();
        assert_eq!(outcome.token, "tok_derived");
        assert_eq!(outcome.last4.as_deref(), Some("1111"));
        assert_eq!(outcome.brand.as_deref(), Some("VISA"));

        let rows = h.payments.payments_for_order("ORD-1").await;
        assert_eq!(rows[0].token, "tok_derived");
        assert_eq!(rows[0].brand.as_deref(), Some("VISA"));
    }

    #[tokio::test]
    async fn tokenization_retries_once_then_succeeds() {
        let h = harness(
            vec![0.9],
            fast_config(0.2),
            ScriptedTokens::new([rejected(), issued()]),
        );
        let correlation = CorrelationId::from_header("tx-5");

        let outcome = h.settler.charge(&correlation, card_request()).await.unwrap();
        assert_eq!(outcome.token, "tok_derived");
    }

    #[tokio::test]
    async fn tokenization_exhaustion_leaves_no_payment_record() {
        let h = harness(
            vec![0.9],
            fast_config(0.2),
            ScriptedTokens::new([rejected(), rejected()]),
        );
        let correlation = CorrelationId::from_header("tx-6");

        let err = h
            .settler
            .charge(&correlation, card_request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettlementError::TokenizationRejected { attempts: 2 }
        ));
        assert_eq!(h.payments.payment_count().await, 0);

        h.side_effects.flush().await;
        assert!(h.gateway.sent().is_empty());
        assert_eq!(h.sink.events_of_type("PAYMENT.REQUESTED").len(), 1);
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_any_side_effect() {
        let h = harness(vec![0.9], fast_config(0.2), ScriptedTokens::new([]));
        let correlation = CorrelationId::from_header("tx-7");

        let mut request = token_request();
        request.amount = Money::from_minor(0);
        let err = h.settler.charge(&correlation, request).await.unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)));

        assert_eq!(h.payments.payment_count().await, 0);
        h.side_effects.flush().await;
        assert!(h.sink.events().is_empty());
    }

    #[tokio::test]
    async fn get_payment_roundtrips() {
        let h = harness(vec![0.9], fast_config(0.0), ScriptedTokens::new([]));
        let correlation = CorrelationId::from_header("tx-8");

        let outcome = h.settler.charge(&correlation, token_request()).await.unwrap();
        let loaded = h.settler.get_payment(outcome.payment_id).await.unwrap();
        assert_eq!(loaded.unwrap().id, outcome.payment_id);

        let missing = h.settler.get_payment(PaymentId::new()).await.unwrap();
        assert!(missing.is_none());
    }
}
