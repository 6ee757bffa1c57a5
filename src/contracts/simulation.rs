//! Causal simulation workflow.
//!
//! Parameters are an opaque payload; this layer never parses them. The
//! creator alone may record a result, the privileged role alone may score
//! consistency. Both fields are last-write-wins.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::contracts::finish;
use crate::error::{ContractError, LedgerResult};
use crate::identity::Identity;
use crate::ids::{IdAllocator, SimulationId};
use crate::invariant::{check_score, Percentage};
use crate::policy::{AuthorizationPolicy, Requirement};
use crate::storage::{lock_err, Record, RecordKind, RecordStore};

/// A registered causal simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalSimulation {
    /// Sequential ID.
    pub id: SimulationId,
    /// Who registered the simulation.
    pub creator: Identity,
    /// Free-form description.
    pub description: String,
    /// Opaque parameter payload, stored verbatim.
    pub parameters: String,
    /// Latest result recorded by the creator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Latest consistency score set by the privileged role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency_score: Option<Percentage>,
}

impl Record for CausalSimulation {
    type Id = SimulationId;
    const KIND: RecordKind = RecordKind::Simulation;

    fn id(&self) -> SimulationId {
        self.id
    }
}

/// Serializable view of the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Last issued simulation ID (0 if none).
    pub last_id: u64,
    /// All simulations in ID order.
    pub simulations: Vec<CausalSimulation>,
}

#[derive(Debug, Default)]
struct SimulationState {
    ids: IdAllocator<SimulationId>,
    records: RecordStore<CausalSimulation>,
}

/// Simulation registration, result and scoring workflow.
#[derive(Debug)]
pub struct SimulationWorkflow {
    policy: AuthorizationPolicy,
    state: RwLock<SimulationState>,
}

impl SimulationWorkflow {
    /// Create an empty workflow.
    #[must_use]
    pub fn new(policy: AuthorizationPolicy) -> Self {
        Self {
            policy,
            state: RwLock::new(SimulationState::default()),
        }
    }

    /// Register a simulation. Anyone may create one.
    pub fn create(
        &self,
        description: impl Into<String>,
        parameters: impl Into<String>,
        creator: impl Into<Identity>,
    ) -> LedgerResult<SimulationId> {
        let mut state = self.state.write().map_err(|_| lock_err("simulation.create"))?;

        let id = state.ids.next_id();
        let simulation = CausalSimulation {
            id,
            creator: creator.into(),
            description: description.into(),
            parameters: parameters.into(),
            result: None,
            consistency_score: None,
        };
        tracing::debug!(%id, creator = %simulation.creator, "created simulation");
        state.records.insert(simulation)?;
        Ok(id)
    }

    /// Record the result of `id`. Only its creator may do this.
    pub fn update_result(
        &self,
        id: SimulationId,
        result: impl Into<String>,
        updater: impl Into<Identity>,
    ) -> LedgerResult<()> {
        let updater = updater.into();
        let mut state = self.state.write().map_err(|_| lock_err("simulation.update_result"))?;

        let simulation = finish("simulation.update_result", state.records.require_mut(id))?;
        finish(
            "simulation.update_result",
            self.policy
                .authorize(&updater, Requirement::RecordCreator(&simulation.creator)),
        )?;

        simulation.result = Some(result.into());
        tracing::debug!(%id, updater = %updater, "updated simulation result");
        Ok(())
    }

    /// Score the consistency of `id`. Only the privileged role may do this.
    pub fn set_consistency_score(
        &self,
        id: SimulationId,
        score: i64,
        setter: impl Into<Identity>,
    ) -> LedgerResult<()> {
        let setter = setter.into();
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("simulation.set_consistency_score"))?;

        let simulation = finish("simulation.set_consistency_score", state.records.require_mut(id))?;
        let score = finish("simulation.set_consistency_score", self.check_scoring(score, &setter))?;

        simulation.consistency_score = Some(score);
        tracing::debug!(%id, %score, "set consistency score");
        Ok(())
    }

    fn check_scoring(&self, score: i64, setter: &Identity) -> Result<Percentage, ContractError> {
        self.policy.authorize(setter, Requirement::PrivilegedRole)?;
        check_score(score)
    }

    /// Get a simulation by ID.
    pub fn get(&self, id: SimulationId) -> LedgerResult<Option<CausalSimulation>> {
        let state = self.state.read().map_err(|_| lock_err("simulation.get"))?;
        Ok(state.records.get(id).cloned())
    }

    /// Simulations registered by `creator`, in ID order.
    pub fn simulations_by_creator(&self, creator: &str) -> LedgerResult<Vec<CausalSimulation>> {
        let state = self.state.read().map_err(|_| lock_err("simulation.by_creator"))?;
        Ok(state.records.collect_where(|s| s.creator == creator))
    }

    /// Number of registered simulations.
    pub fn len(&self) -> LedgerResult<usize> {
        let state = self.state.read().map_err(|_| lock_err("simulation.len"))?;
        Ok(state.records.len())
    }

    /// Returns true if nothing was registered yet.
    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy of the full workflow state.
    pub fn snapshot(&self) -> LedgerResult<SimulationSnapshot> {
        let state = self.state.read().map_err(|_| lock_err("simulation.snapshot"))?;
        Ok(SimulationSnapshot {
            last_id: state.ids.last_issued(),
            simulations: state.records.values().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ErrorKind;

    const OWNER: &str = "CONTRACT_OWNER";

    fn workflow() -> SimulationWorkflow {
        SimulationWorkflow::new(AuthorizationPolicy::new(OWNER))
    }

    #[test]
    fn create_starts_without_result_or_score() {
        let wf = workflow();
        let id = wf
            .create(
                "Temporal loop analysis",
                r#"{"iterations": 1000, "timespan": 100}"#,
                "scientist1",
            )
            .unwrap();

        assert_eq!(id, SimulationId::new(1));
        let sim = wf.get(id).unwrap().unwrap();
        assert_eq!(sim.description, "Temporal loop analysis");
        assert_eq!(sim.parameters, r#"{"iterations": 1000, "timespan": 100}"#);
        assert!(sim.result.is_none());
        assert!(sim.consistency_score.is_none());
    }

    #[test]
    fn creator_updates_result() {
        let wf = workflow();
        let id = wf
            .create(
                "Paradox resolution simulation",
                r#"{"method": "quantum_interference", "duration": 50}"#,
                "scientist2",
            )
            .unwrap();

        wf.update_result(id, "Paradox successfully resolved with 95% probability", "scientist2")
            .unwrap();
        assert_eq!(
            wf.get(id).unwrap().unwrap().result.as_deref(),
            Some("Paradox successfully resolved with 95% probability")
        );

        wf.update_result(id, "Revised", "scientist2").unwrap();
        assert_eq!(wf.get(id).unwrap().unwrap().result.as_deref(), Some("Revised"));
    }

    #[test]
    fn privileged_role_sets_score() {
        let wf = workflow();
        let id = wf
            .create(
                "Causal chain preservation test",
                r#"{"events": 100, "branching_factor": 3}"#,
                "scientist3",
            )
            .unwrap();
        wf.set_consistency_score(id, 92, OWNER).unwrap();
        assert_eq!(
            wf.get(id).unwrap().unwrap().consistency_score.map(Percentage::get),
            Some(92)
        );
    }

    #[test]
    fn non_creator_cannot_update_result() {
        let wf = workflow();
        let id = wf
            .create(
                "Time travel impact assessment",
                r#"{"travelers": 5, "destinations": 3}"#,
                "scientist4",
            )
            .unwrap();

        let err = wf
            .update_result(id, "Unauthorized result", "unauthorized_user")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);
        assert!(err.to_string().starts_with("Not authorized"));
        assert!(wf.get(id).unwrap().unwrap().result.is_none());

        // The privileged role gets no bypass either.
        assert!(wf.update_result(id, "Owner result", OWNER).is_err());
    }

    #[test]
    fn out_of_range_score_is_rejected_without_mutation() {
        let wf = workflow();
        let id = wf
            .create(
                "Multiverse coherence analysis",
                r#"{"universes": 10, "interaction_level": "high"}"#,
                "scientist5",
            )
            .unwrap();

        let err = wf.set_consistency_score(id, 101, OWNER).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidScore);
        assert!(err.to_string().starts_with("Invalid score"));

        let err = wf.set_consistency_score(id, -1, OWNER).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidScore);

        assert!(wf.get(id).unwrap().unwrap().consistency_score.is_none());
    }

    #[test]
    fn score_checks_authorization_before_range() {
        let wf = workflow();
        let id = wf.create("d", "p", "scientist1").unwrap();
        let err = wf.set_consistency_score(id, 500, "scientist1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);
    }

    #[test]
    fn missing_simulation_is_not_found() {
        let wf = workflow();
        let err = wf
            .update_result(SimulationId::new(3), "r", "scientist1")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().starts_with("Invalid simulation"));

        let err = wf
            .set_consistency_score(SimulationId::new(3), 50, OWNER)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn creator_filter_and_snapshot() {
        let wf = workflow();
        wf.create("a", "{}", "alice").unwrap();
        wf.create("b", "{}", "bob").unwrap();
        wf.create("c", "{}", "alice").unwrap();

        let mine = wf.simulations_by_creator("alice").unwrap();
        assert_eq!(
            mine.iter().map(|s| s.id.get()).collect::<Vec<_>>(),
            vec![1, 3]
        );

        let snapshot = wf.snapshot().unwrap();
        assert_eq!(snapshot.last_id, 3);
        assert_eq!(snapshot.simulations.len(), 3);
    }
}
