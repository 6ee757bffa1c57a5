//! # chronoledger - Deterministic record-keeping contracts
//!
//! chronoledger models four mock contracts that share one pattern: a
//! state-transition engine over keyed records, gated by role-based
//! authorization and field invariants.
//!
//! ## Contracts
//!
//! - **TokenLedger**: fungible tokens with mint, transfer and burn
//! - **TemporalEventRegistry**: non-fungible event tokens with metadata
//! - **AnomalyWorkflow**: anomaly reports with a status lifecycle
//! - **SimulationWorkflow**: causal simulations with results and scores
//!
//! Every transition is all-or-nothing: existence, authorization and field
//! checks all run before any state changes.
//!
//! ## Usage
//!
//! ```rust
//! use chronoledger::{ContractEngine, Identity, Transition, TransitionOutcome};
//!
//! let engine = ContractEngine::with_privileged("CONTRACT_OWNER")?;
//!
//! engine.tokens().mint(1000, "scientist1", "CONTRACT_OWNER")?;
//! engine.tokens().transfer(500, "scientist1", "researcher1")?;
//! assert_eq!(engine.tokens().balance_of("researcher1")?, 500);
//!
//! let outcome = engine.apply(Transition::ReportAnomaly {
//!     description: "Unexpected time loop".to_string(),
//!     timestamp: 1_625_097_600,
//!     location: "Sector 7".to_string(),
//!     severity: 8,
//!     reporter: Identity::from("scientist1"),
//! })?;
//! assert!(matches!(outcome, TransitionOutcome::AnomalyReported { .. }));
//! # Ok::<(), chronoledger::LedgerError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod error;
pub mod identity;
pub mod ids;
pub mod invariant;
pub mod policy;

// State and contracts
pub mod contracts;
pub mod storage;

// Execution
pub mod config;
pub mod engine;
pub mod ir;

// Re-export primary types at crate root for convenience
pub use config::{EngineConfig, RuntimeConfig};
pub use contracts::{
    AnomalyStatus, AnomalyWorkflow, CausalSimulation, NewTemporalEvent, SimulationWorkflow,
    TemporalAnomaly, TemporalEvent, TemporalEventRegistry, TokenLedger, TransitionRule,
};
pub use engine::runtime::{LedgerRuntime, TransitionHandle};
pub use engine::{ContractEngine, LedgerSnapshot, TransitionOutcome};
pub use error::{
    ConfigError, ContractError, ErrorKind, LedgerError, LedgerResult, RequestError, RuntimeError,
};
pub use identity::Identity;
pub use ids::{AnomalyId, EventTokenId, SimulationId};
pub use invariant::Percentage;
pub use ir::{script_from_json, Transition, TransitionRequest};
pub use policy::AuthorizationPolicy;
pub use storage::StorageError;
