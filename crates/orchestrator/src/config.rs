//! Orchestrator configuration.

/// Orchestrator behavior knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Currency every order is charged in. Orders carry no currency of
    /// their own; pricing is minor units in this one currency.
    pub currency: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            currency: "COP".to_string(),
        }
    }
}
