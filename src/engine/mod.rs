//! Transition engine over the four contracts.
//!
//! [`ContractEngine`] owns one instance of each contract, all sharing a
//! single authorization policy, and dispatches [`Transition`]s to them.
//! Identical transition sequences produce identical snapshots and digests.

/// Single-writer runtime around the engine.
pub mod runtime;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::contracts::{
    AnomalySnapshot, AnomalyWorkflow, EventSnapshot, SimulationSnapshot, SimulationWorkflow,
    TemporalEventRegistry, TokenLedger, TokenSnapshot,
};
use crate::error::{ConfigError, LedgerError, LedgerResult};
use crate::identity::Identity;
use crate::ids::{AnomalyId, EventTokenId, SimulationId};
use crate::ir::{Transition, TransitionRequest};
use crate::policy::AuthorizationPolicy;

/// Result of a committed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The transition committed and allocated nothing.
    Committed,

    /// A temporal event token was minted.
    EventMinted {
        /// The new token ID.
        token_id: EventTokenId,
    },

    /// An anomaly was reported.
    AnomalyReported {
        /// The new anomaly ID.
        anomaly_id: AnomalyId,
    },

    /// A simulation was registered.
    SimulationCreated {
        /// The new simulation ID.
        simulation_id: SimulationId,
    },
}

/// Serializable view of every contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Fungible token ledger.
    pub tokens: TokenSnapshot,
    /// Temporal event registry.
    pub events: EventSnapshot,
    /// Anomaly workflow.
    pub anomalies: AnomalySnapshot,
    /// Simulation workflow.
    pub simulations: SimulationSnapshot,
}

impl LedgerSnapshot {
    /// BLAKE3 digest of the canonical JSON encoding, as lowercase hex.
    pub fn digest(&self) -> LedgerResult<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| LedgerError::internal(format!("serialize snapshot: {e}")))?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}

/// Dispatches transitions to the contracts.
#[derive(Debug)]
pub struct ContractEngine {
    policy: AuthorizationPolicy,
    tokens: TokenLedger,
    events: TemporalEventRegistry,
    anomalies: AnomalyWorkflow,
    simulations: SimulationWorkflow,
}

impl ContractEngine {
    /// Create an engine from a config, validating it first.
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = config.policy();
        Ok(Self {
            tokens: TokenLedger::new(policy.clone()),
            events: TemporalEventRegistry::new(policy.clone()),
            anomalies: AnomalyWorkflow::new(policy.clone(), config.transition_rule()),
            simulations: SimulationWorkflow::new(policy.clone()),
            policy,
        })
    }

    /// Create an engine with default settings and the given privileged identity.
    pub fn with_privileged(identity: impl Into<Identity>) -> Result<Self, ConfigError> {
        Self::new(&EngineConfig::new(identity))
    }

    /// The shared authorization policy.
    #[must_use]
    pub const fn policy(&self) -> &AuthorizationPolicy {
        &self.policy
    }

    /// Fungible token ledger.
    #[must_use]
    pub const fn tokens(&self) -> &TokenLedger {
        &self.tokens
    }

    /// Temporal event registry.
    #[must_use]
    pub const fn events(&self) -> &TemporalEventRegistry {
        &self.events
    }

    /// Anomaly workflow.
    #[must_use]
    pub const fn anomalies(&self) -> &AnomalyWorkflow {
        &self.anomalies
    }

    /// Simulation workflow.
    #[must_use]
    pub const fn simulations(&self) -> &SimulationWorkflow {
        &self.simulations
    }

    /// Validate and execute a request.
    pub fn execute(&self, request: TransitionRequest) -> LedgerResult<TransitionOutcome> {
        request.validate()?;
        let op = request.transition.name();
        let request_id = request.request_id;
        let result = self.apply(request.transition);
        match &result {
            Ok(outcome) => tracing::debug!(%request_id, op, ?outcome, "request committed"),
            Err(err) => tracing::debug!(%request_id, op, kind = %err.kind(), "request rejected"),
        }
        result
    }

    /// Apply a single transition.
    pub fn apply(&self, transition: Transition) -> LedgerResult<TransitionOutcome> {
        match transition {
            Transition::MintTokens {
                amount,
                recipient,
                caller,
            } => self
                .tokens
                .mint(amount, recipient, caller)
                .map(|()| TransitionOutcome::Committed),
            Transition::TransferTokens {
                amount,
                sender,
                recipient,
            } => self
                .tokens
                .transfer(amount, sender, recipient)
                .map(|()| TransitionOutcome::Committed),
            Transition::BurnTokens { amount, owner } => self
                .tokens
                .burn(amount, owner)
                .map(|()| TransitionOutcome::Committed),
            Transition::MintEvent { event, creator } => self
                .events
                .mint(event, creator)
                .map(|token_id| TransitionOutcome::EventMinted { token_id }),
            Transition::TransferEvent {
                token_id,
                sender,
                recipient,
            } => self
                .events
                .transfer(token_id, sender, recipient)
                .map(|()| TransitionOutcome::Committed),
            Transition::ReportAnomaly {
                description,
                timestamp,
                location,
                severity,
                reporter,
            } => self
                .anomalies
                .report(description, timestamp, location, severity, reporter)
                .map(|anomaly_id| TransitionOutcome::AnomalyReported { anomaly_id }),
            Transition::UpdateAnomalyStatus {
                anomaly_id,
                status,
                caller,
            } => self
                .anomalies
                .update_status_named(anomaly_id, &status, caller)
                .map(|()| TransitionOutcome::Committed),
            Transition::ProposeResolutionStrategy {
                anomaly_id,
                strategy,
            } => self
                .anomalies
                .propose_resolution_strategy(anomaly_id, strategy)
                .map(|()| TransitionOutcome::Committed),
            Transition::CreateSimulation {
                description,
                parameters,
                creator,
            } => self
                .simulations
                .create(description, parameters, creator)
                .map(|simulation_id| TransitionOutcome::SimulationCreated { simulation_id }),
            Transition::UpdateSimulationResult {
                simulation_id,
                result,
                updater,
            } => self
                .simulations
                .update_result(simulation_id, result, updater)
                .map(|()| TransitionOutcome::Committed),
            Transition::SetConsistencyScore {
                simulation_id,
                score,
                setter,
            } => self
                .simulations
                .set_consistency_score(simulation_id, score, setter)
                .map(|()| TransitionOutcome::Committed),
        }
    }

    /// Copy of every contract's state.
    ///
    /// Each contract is read under its own lock, so a snapshot taken while
    /// other threads write may mix states from different moments. Take it
    /// through the runtime for a consistent cut.
    pub fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        Ok(LedgerSnapshot {
            tokens: self.tokens.snapshot()?,
            events: self.events.snapshot()?,
            anomalies: self.anomalies.snapshot()?,
            simulations: self.simulations.snapshot()?,
        })
    }

    /// Digest of [`ContractEngine::snapshot`].
    pub fn state_digest(&self) -> LedgerResult<String> {
        self.snapshot()?.digest()
    }
}
