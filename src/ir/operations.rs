//! Transition definitions and the request envelope.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contracts::NewTemporalEvent;
use crate::identity::Identity;
use crate::ids::{AnomalyId, EventTokenId, SimulationId};

/// Envelope around a single transition.
///
/// The envelope carries:
/// - Protocol versioning so replay scripts stay readable across releases
/// - A request ID for correlating log lines and replies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    /// Request format version (e.g., "1.0").
    pub version: String,

    /// Correlation ID for this request.
    pub request_id: Uuid,

    /// The transition to apply.
    pub transition: Transition,
}

impl TransitionRequest {
    /// Current request format version.
    pub const CURRENT_VERSION: &'static str = "1.0";

    /// Wraps a transition with a fresh request ID.
    #[must_use]
    pub fn new(transition: Transition) -> Self {
        Self {
            version: Self::CURRENT_VERSION.to_string(),
            request_id: Uuid::new_v4(),
            transition,
        }
    }

    /// Sets a custom request ID (useful for correlation).
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }
}

impl From<Transition> for TransitionRequest {
    fn from(transition: Transition) -> Self {
        Self::new(transition)
    }
}

/// Every supported state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "payload", rename_all = "snake_case")]
pub enum Transition {
    /// Mint fungible tokens (privileged role only).
    MintTokens {
        /// Tokens to create.
        amount: u64,
        /// Account credited.
        recipient: Identity,
        /// Caller identity.
        caller: Identity,
    },

    /// Move fungible tokens between accounts.
    TransferTokens {
        /// Tokens to move.
        amount: u64,
        /// Account debited; also the caller.
        sender: Identity,
        /// Account credited.
        recipient: Identity,
    },

    /// Destroy fungible tokens.
    BurnTokens {
        /// Tokens to destroy.
        amount: u64,
        /// Account debited; also the caller.
        owner: Identity,
    },

    /// Mint a temporal event token.
    MintEvent {
        /// Token metadata.
        event: NewTemporalEvent,
        /// Caller and first owner.
        creator: Identity,
    },

    /// Hand a temporal event token to a new owner.
    TransferEvent {
        /// Token to move.
        token_id: EventTokenId,
        /// Current owner; also the caller.
        sender: Identity,
        /// New owner.
        recipient: Identity,
    },

    /// Report a temporal anomaly.
    ReportAnomaly {
        /// Free-form description.
        description: String,
        /// Unix seconds.
        timestamp: i64,
        /// Free-form location.
        location: String,
        /// Reporter-assigned severity.
        severity: u32,
        /// Caller identity.
        reporter: Identity,
    },

    /// Change the status of an anomaly (privileged role only).
    UpdateAnomalyStatus {
        /// Target anomaly.
        anomaly_id: AnomalyId,
        /// Status name, parsed by the workflow.
        status: String,
        /// Caller identity.
        caller: Identity,
    },

    /// Propose a resolution strategy for an anomaly under investigation.
    ProposeResolutionStrategy {
        /// Target anomaly.
        anomaly_id: AnomalyId,
        /// Strategy text.
        strategy: String,
    },

    /// Register a causal simulation.
    CreateSimulation {
        /// Free-form description.
        description: String,
        /// Opaque parameter payload.
        parameters: String,
        /// Caller identity.
        creator: Identity,
    },

    /// Record a simulation result (creator only).
    UpdateSimulationResult {
        /// Target simulation.
        simulation_id: SimulationId,
        /// Result text.
        result: String,
        /// Caller identity.
        updater: Identity,
    },

    /// Score a simulation's consistency (privileged role only).
    SetConsistencyScore {
        /// Target simulation.
        simulation_id: SimulationId,
        /// Raw score; must lie in [0, 100].
        score: i64,
        /// Caller identity.
        setter: Identity,
    },
}

impl Transition {
    /// Stable operation name, matching the serialized `op` tag.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MintTokens { .. } => "mint_tokens",
            Self::TransferTokens { .. } => "transfer_tokens",
            Self::BurnTokens { .. } => "burn_tokens",
            Self::MintEvent { .. } => "mint_event",
            Self::TransferEvent { .. } => "transfer_event",
            Self::ReportAnomaly { .. } => "report_anomaly",
            Self::UpdateAnomalyStatus { .. } => "update_anomaly_status",
            Self::ProposeResolutionStrategy { .. } => "propose_resolution_strategy",
            Self::CreateSimulation { .. } => "create_simulation",
            Self::UpdateSimulationResult { .. } => "update_simulation_result",
            Self::SetConsistencyScore { .. } => "set_consistency_score",
        }
    }
}
