//! Application state and wiring.

use std::sync::Arc;

use collaborators::{
    AuditSink, Catalog, CustomerDirectory, InMemoryAuditSink, InMemoryCatalog,
    InMemoryCustomerDirectory, InMemoryNotificationGateway, NotificationGateway, SideEffects,
    SideEffectsWorker, spawn_side_effects,
};
use common::{RandomSource, ThreadRandom};
use orchestrator::{Orchestrator, OrchestratorConfig};
use settlement::{SettlementConfig, Settler};
use store::{
    InMemoryOrderStore, InMemoryPaymentStore, InMemoryTokenStore, OrderStore, PaymentStore,
    TokenStore,
};
use tokenizer::{CardCipher, Tokenizer, TokenizerConfig, TokenizerError};

use crate::config::Config;
use crate::ports::SettlerPort;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub settler: Arc<Settler>,
    pub tokenizer: Arc<Tokenizer>,
    pub side_effects: SideEffects,
    pub api_key: String,
}

/// The backing stores an application instance runs against.
pub struct Stores {
    pub orders: Arc<dyn OrderStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub tokens: Arc<dyn TokenStore>,
}

/// The external collaborators an application instance talks to.
pub struct CollaboratorSet {
    pub customers: Arc<dyn CustomerDirectory>,
    pub catalog: Arc<dyn Catalog>,
    pub audit: Arc<dyn AuditSink>,
    pub notifications: Arc<dyn NotificationGateway>,
}

/// Wires services, stores, and collaborators into application state.
///
/// Fails only when the configured crypto key is unusable.
pub fn create_state(
    config: &Config,
    stores: Stores,
    collaborators: CollaboratorSet,
    random: Arc<dyn RandomSource>,
) -> Result<(Arc<AppState>, SideEffectsWorker), TokenizerError> {
    let (side_effects, worker) = spawn_side_effects(
        collaborators.audit,
        collaborators.notifications,
        config.side_effect_capacity,
    );

    let tokenizer = Arc::new(Tokenizer::new(
        stores.tokens,
        CardCipher::from_hex_key(&config.crypto_key_hex)?,
        random.clone(),
        TokenizerConfig {
            rejection_probability: config.token_rejection_probability,
            hmac_secret: config.token_hmac_secret.clone(),
        },
    ));

    let settler = Arc::new(Settler::new(
        stores.payments,
        tokenizer.clone(),
        side_effects.clone(),
        random,
        SettlementConfig {
            rejection_probability: config.payment_rejection_probability,
            max_retries: config.payment_max_retries,
            backoff: config.payment_backoff,
            tokenization_max_retries: config.tokenization_max_retries,
            tokenization_backoff: config.tokenization_backoff,
        },
    ));

    let orchestrator = Orchestrator::new(
        stores.orders,
        collaborators.customers,
        collaborators.catalog,
        Arc::new(SettlerPort::new(settler.clone())),
        side_effects.clone(),
        OrchestratorConfig {
            currency: config.currency.clone(),
        },
    );

    let state = Arc::new(AppState {
        orchestrator,
        settler,
        tokenizer,
        side_effects,
        api_key: config.api_key.clone(),
    });
    Ok((state, worker))
}

/// State backed entirely by in-memory stores and collaborators, with
/// handles kept for seeding and inspection.
pub struct DefaultState {
    pub state: Arc<AppState>,
    pub worker: SideEffectsWorker,
    pub customers: InMemoryCustomerDirectory,
    pub catalog: InMemoryCatalog,
    pub audit: InMemoryAuditSink,
    pub notifications: InMemoryNotificationGateway,
}

/// Creates application state with in-memory stores and collaborators.
pub fn create_default_state(config: &Config) -> Result<DefaultState, TokenizerError> {
    let customers = InMemoryCustomerDirectory::new();
    let catalog = InMemoryCatalog::new();
    let audit = InMemoryAuditSink::new();
    let notifications = InMemoryNotificationGateway::new();

    let (state, worker) = create_state(
        config,
        Stores {
            orders: Arc::new(InMemoryOrderStore::new()),
            payments: Arc::new(InMemoryPaymentStore::new()),
            tokens: Arc::new(InMemoryTokenStore::new()),
        },
        CollaboratorSet {
            customers: Arc::new(customers.clone()),
            catalog: Arc::new(catalog.clone()),
            audit: Arc::new(audit.clone()),
            notifications: Arc::new(notifications.clone()),
        },
        Arc::new(ThreadRandom),
    )?;

    Ok(DefaultState {
        state,
        worker,
        customers,
        catalog,
        audit,
        notifications,
    })
}
