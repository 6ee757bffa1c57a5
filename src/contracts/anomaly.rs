//! Anomaly tracking workflow.
//!
//! Anomalies move through `reported -> investigating -> {resolved, unresolvable}`.
//! By default the privileged role may set any of the three non-initial
//! statuses from any state. [`TransitionRule::Strict`] additionally enforces
//! the edges above and makes terminal states final.

use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contracts::{finish, unix_to_utc};
use crate::error::{ContractError, LedgerResult};
use crate::identity::Identity;
use crate::ids::{AnomalyId, IdAllocator};
use crate::policy::{AuthorizationPolicy, Requirement};
use crate::storage::{lock_err, Record, RecordKind, RecordStore};

/// Lifecycle status of an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyStatus {
    /// Initial status after a report.
    #[default]
    Reported,
    /// Under investigation; strategies may be proposed.
    Investigating,
    /// Terminal: the anomaly was resolved.
    Resolved,
    /// Terminal: the anomaly cannot be resolved.
    Unresolvable,
}

impl AnomalyStatus {
    /// Returns true for `resolved` and `unresolvable`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Unresolvable)
    }

    /// Returns true if `self` may be set through a status update.
    #[must_use]
    pub const fn is_update_target(self) -> bool {
        !matches!(self, Self::Reported)
    }

    /// Returns true if the strict lifecycle has an edge from `self` to `to`.
    #[must_use]
    pub const fn precedes(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Reported, Self::Investigating)
                | (Self::Investigating, Self::Resolved | Self::Unresolvable)
        )
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reported => "reported",
            Self::Investigating => "investigating",
            Self::Resolved => "resolved",
            Self::Unresolvable => "unresolvable",
        }
    }
}

impl fmt::Display for AnomalyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnomalyStatus {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reported" => Ok(Self::Reported),
            "investigating" => Ok(Self::Investigating),
            "resolved" => Ok(Self::Resolved),
            "unresolvable" => Ok(Self::Unresolvable),
            other => Err(ContractError::UnpermittedStatus {
                value: other.to_string(),
            }),
        }
    }
}

/// Which status changes the workflow accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionRule {
    /// Any non-initial status may be set from any state.
    #[default]
    Permissive,
    /// Only lifecycle edges are accepted; terminal states are final.
    Strict,
}

/// A reported temporal anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalAnomaly {
    /// Sequential ID.
    pub id: AnomalyId,
    /// Who reported it.
    pub reporter: Identity,
    /// Free-form description.
    pub description: String,
    /// Unix seconds, as reported.
    pub timestamp: i64,
    /// Free-form location (place and era).
    pub location: String,
    /// Reporter-assigned severity. Not range checked.
    pub severity: u32,
    /// Current lifecycle status.
    pub status: AnomalyStatus,
    /// Latest proposed resolution strategy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_strategy: Option<String>,
}

impl TemporalAnomaly {
    /// The report timestamp as a UTC datetime, if representable.
    #[must_use]
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.timestamp)
    }
}

impl Record for TemporalAnomaly {
    type Id = AnomalyId;
    const KIND: RecordKind = RecordKind::Anomaly;

    fn id(&self) -> AnomalyId {
        self.id
    }
}

/// Serializable view of the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalySnapshot {
    /// Last issued anomaly ID (0 if none).
    pub last_id: u64,
    /// All anomalies in ID order.
    pub anomalies: Vec<TemporalAnomaly>,
}

#[derive(Debug, Default)]
struct AnomalyState {
    ids: IdAllocator<AnomalyId>,
    records: RecordStore<TemporalAnomaly>,
}

/// Anomaly report/investigate/resolve workflow.
#[derive(Debug)]
pub struct AnomalyWorkflow {
    policy: AuthorizationPolicy,
    rule: TransitionRule,
    state: RwLock<AnomalyState>,
}

impl AnomalyWorkflow {
    /// Create an empty workflow.
    #[must_use]
    pub fn new(policy: AuthorizationPolicy, rule: TransitionRule) -> Self {
        Self {
            policy,
            rule,
            state: RwLock::new(AnomalyState::default()),
        }
    }

    /// The status rule this workflow enforces.
    #[must_use]
    pub const fn rule(&self) -> TransitionRule {
        self.rule
    }

    /// Record a new anomaly. Anyone may report.
    pub fn report(
        &self,
        description: impl Into<String>,
        timestamp: i64,
        location: impl Into<String>,
        severity: u32,
        reporter: impl Into<Identity>,
    ) -> LedgerResult<AnomalyId> {
        let mut state = self.state.write().map_err(|_| lock_err("anomaly.report"))?;

        let id = state.ids.next_id();
        let anomaly = TemporalAnomaly {
            id,
            reporter: reporter.into(),
            description: description.into(),
            timestamp,
            location: location.into(),
            severity,
            status: AnomalyStatus::Reported,
            resolution_strategy: None,
        };
        tracing::debug!(%id, reporter = %anomaly.reporter, severity, "reported anomaly");
        state.records.insert(anomaly)?;
        Ok(id)
    }

    /// Set the status of `id`. Only the privileged role may do this.
    pub fn update_status(
        &self,
        id: AnomalyId,
        new_status: AnomalyStatus,
        caller: impl Into<Identity>,
    ) -> LedgerResult<()> {
        self.apply_status(id, Ok(new_status), &caller.into())
    }

    /// Like [`AnomalyWorkflow::update_status`], with the status given by name.
    ///
    /// The name is only parsed after the existence and authorization checks,
    /// so an unknown anomaly reports `NotFound` whatever the name.
    pub fn update_status_named(
        &self,
        id: AnomalyId,
        new_status: &str,
        caller: impl Into<Identity>,
    ) -> LedgerResult<()> {
        self.apply_status(id, new_status.parse(), &caller.into())
    }

    fn apply_status(
        &self,
        id: AnomalyId,
        requested: Result<AnomalyStatus, ContractError>,
        caller: &Identity,
    ) -> LedgerResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("anomaly.update_status"))?;

        let anomaly = finish("anomaly.update_status", state.records.require_mut(id))?;
        let (from, to) = finish(
            "anomaly.update_status",
            self.check_status_change(anomaly, requested, caller),
        )?;

        anomaly.status = to;
        tracing::debug!(%id, %from, %to, caller = %caller, "updated anomaly status");
        Ok(())
    }

    fn check_status_change(
        &self,
        anomaly: &TemporalAnomaly,
        requested: Result<AnomalyStatus, ContractError>,
        caller: &Identity,
    ) -> Result<(AnomalyStatus, AnomalyStatus), ContractError> {
        self.policy.authorize(caller, Requirement::PrivilegedRole)?;

        let to = requested?;
        if !to.is_update_target() {
            return Err(ContractError::UnpermittedStatus {
                value: to.to_string(),
            });
        }

        let from = anomaly.status;
        if self.rule == TransitionRule::Strict && !from.precedes(to) {
            return Err(ContractError::IllegalTransition {
                id: anomaly.id,
                from,
                to,
            });
        }
        Ok((from, to))
    }

    /// Attach a resolution strategy. Only allowed while investigating; anyone may propose.
    pub fn propose_resolution_strategy(
        &self,
        id: AnomalyId,
        strategy: impl Into<String>,
    ) -> LedgerResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("anomaly.propose_resolution_strategy"))?;

        let anomaly = finish("anomaly.propose_resolution_strategy", state.records.require_mut(id))?;
        if anomaly.status != AnomalyStatus::Investigating {
            return finish(
                "anomaly.propose_resolution_strategy",
                Err(ContractError::StatusPrecondition {
                    id,
                    current: anomaly.status,
                    required: AnomalyStatus::Investigating,
                }),
            );
        }

        let replaced = anomaly.resolution_strategy.replace(strategy.into()).is_some();
        tracing::debug!(%id, replaced, "proposed resolution strategy");
        Ok(())
    }

    /// Get an anomaly by ID.
    pub fn get(&self, id: AnomalyId) -> LedgerResult<Option<TemporalAnomaly>> {
        let state = self.state.read().map_err(|_| lock_err("anomaly.get"))?;
        Ok(state.records.get(id).cloned())
    }

    /// All anomalies currently in `status`, in ID order.
    pub fn anomalies_with_status(&self, status: AnomalyStatus) -> LedgerResult<Vec<TemporalAnomaly>> {
        let state = self.state.read().map_err(|_| lock_err("anomaly.with_status"))?;
        Ok(state.records.collect_where(|a| a.status == status))
    }

    /// Number of reported anomalies.
    pub fn len(&self) -> LedgerResult<usize> {
        let state = self.state.read().map_err(|_| lock_err("anomaly.len"))?;
        Ok(state.records.len())
    }

    /// Returns true if nothing was reported yet.
    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy of the full workflow state.
    pub fn snapshot(&self) -> LedgerResult<AnomalySnapshot> {
        let state = self.state.read().map_err(|_| lock_err("anomaly.snapshot"))?;
        Ok(AnomalySnapshot {
            last_id: state.ids.last_issued(),
            anomalies: state.records.values().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ErrorKind;

    const OWNER: &str = "CONTRACT_OWNER";

    fn workflow(rule: TransitionRule) -> AnomalyWorkflow {
        AnomalyWorkflow::new(AuthorizationPolicy::new(OWNER), rule)
    }

    fn report(wf: &AnomalyWorkflow) -> AnomalyId {
        wf.report("Bootstrap paradox observed", 1_640_000_000, "London, 2025", 80, "scientist2")
            .unwrap()
    }

    #[test]
    fn report_starts_in_reported() {
        let wf = workflow(TransitionRule::Permissive);
        let id = wf
            .report("Grandfather paradox detected", 1_630_000_000, "New York, 1930", 95, "scientist1")
            .unwrap();

        assert_eq!(id, AnomalyId::new(1));
        let anomaly = wf.get(id).unwrap().unwrap();
        assert_eq!(anomaly.description, "Grandfather paradox detected");
        assert_eq!(anomaly.status, AnomalyStatus::Reported);
        assert!(anomaly.resolution_strategy.is_none());
        assert_eq!(anomaly.occurred_at().unwrap().timestamp(), 1_630_000_000);
    }

    #[test]
    fn privileged_role_updates_status() {
        let wf = workflow(TransitionRule::Permissive);
        let id = report(&wf);
        wf.update_status(id, AnomalyStatus::Investigating, OWNER).unwrap();
        assert_eq!(wf.get(id).unwrap().unwrap().status, AnomalyStatus::Investigating);
    }

    #[test]
    fn unauthorized_status_update_is_rejected() {
        let wf = workflow(TransitionRule::Permissive);
        let id = report(&wf);
        let err = wf
            .update_status(id, AnomalyStatus::Resolved, "unauthorized_user")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);
        assert_eq!(wf.get(id).unwrap().unwrap().status, AnomalyStatus::Reported);
    }

    #[test]
    fn reported_is_not_an_update_target() {
        let wf = workflow(TransitionRule::Permissive);
        let id = report(&wf);
        let err = wf.update_status(id, AnomalyStatus::Reported, OWNER).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatus);
    }

    #[test]
    fn unknown_status_name_is_invalid_status() {
        let wf = workflow(TransitionRule::Permissive);
        let id = report(&wf);
        let err = wf.update_status_named(id, "closed", OWNER).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatus);
        assert!(err.to_string().starts_with("Invalid status"));
    }

    #[test]
    fn checks_run_existence_then_authorization_then_status() {
        let wf = workflow(TransitionRule::Permissive);
        let missing = AnomalyId::new(99);
        let err = wf.update_status_named(missing, "closed", "intruder").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().starts_with("Invalid anomaly"));

        let id = report(&wf);
        let err = wf.update_status_named(id, "closed", "intruder").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthorized);
    }

    #[test]
    fn permissive_rule_allows_any_jump() {
        let wf = workflow(TransitionRule::Permissive);
        let id = report(&wf);
        wf.update_status(id, AnomalyStatus::Resolved, OWNER).unwrap();
        wf.update_status(id, AnomalyStatus::Investigating, OWNER).unwrap();
        wf.update_status(id, AnomalyStatus::Unresolvable, OWNER).unwrap();
        assert_eq!(wf.get(id).unwrap().unwrap().status, AnomalyStatus::Unresolvable);
    }

    #[test]
    fn strict_rule_enforces_lifecycle() {
        let wf = workflow(TransitionRule::Strict);
        let id = report(&wf);

        let err = wf.update_status(id, AnomalyStatus::Resolved, OWNER).unwrap_err();
        assert!(matches!(
            err.as_contract(),
            Some(ContractError::IllegalTransition {
                from: AnomalyStatus::Reported,
                to: AnomalyStatus::Resolved,
                ..
            })
        ));

        wf.update_status(id, AnomalyStatus::Investigating, OWNER).unwrap();
        wf.update_status(id, AnomalyStatus::Resolved, OWNER).unwrap();

        let err = wf.update_status(id, AnomalyStatus::Investigating, OWNER).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatus);
        assert_eq!(wf.get(id).unwrap().unwrap().status, AnomalyStatus::Resolved);
    }

    #[test]
    fn default_status_is_reported() {
        assert_eq!(AnomalyStatus::default(), AnomalyStatus::Reported);
    }

    #[test]
    fn strategy_requires_investigating() {
        let wf = workflow(TransitionRule::Permissive);
        let id = wf
            .report("Temporal loop detected", 1_670_000_000, "Beijing, 2060", 85, "scientist5")
            .unwrap();

        let err = wf
            .propose_resolution_strategy(id, "Apply quantum decoherence")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatus);
        assert!(wf.get(id).unwrap().unwrap().resolution_strategy.is_none());

        wf.update_status(id, AnomalyStatus::Investigating, OWNER).unwrap();
        wf.propose_resolution_strategy(id, "Implement closed timelike curve")
            .unwrap();
        assert_eq!(
            wf.get(id).unwrap().unwrap().resolution_strategy.as_deref(),
            Some("Implement closed timelike curve")
        );

        wf.update_status(id, AnomalyStatus::Resolved, OWNER).unwrap();
        let err = wf.propose_resolution_strategy(id, "Too late").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatus);

        wf.update_status(id, AnomalyStatus::Unresolvable, OWNER).unwrap();
        let err = wf
            .propose_resolution_strategy(id, "Abandon the timeline")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStatus);
        assert!(err.to_string().starts_with("Invalid status"));
        assert_eq!(
            wf.get(id).unwrap().unwrap().resolution_strategy.as_deref(),
            Some("Implement closed timelike curve")
        );
    }

    #[test]
    fn strategy_is_overwritable_while_investigating() {
        let wf = workflow(TransitionRule::Permissive);
        let id = report(&wf);
        wf.update_status(id, AnomalyStatus::Investigating, OWNER).unwrap();
        wf.propose_resolution_strategy(id, "first").unwrap();
        wf.propose_resolution_strategy(id, "second").unwrap();
        assert_eq!(
            wf.get(id).unwrap().unwrap().resolution_strategy.as_deref(),
            Some("second")
        );
    }

    #[test]
    fn strategy_on_missing_anomaly_is_not_found() {
        let wf = workflow(TransitionRule::Permissive);
        let err = wf
            .propose_resolution_strategy(AnomalyId::new(1), "anything")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn status_filter_and_snapshot() {
        let wf = workflow(TransitionRule::Permissive);
        let a = report(&wf);
        let _b = report(&wf);
        wf.update_status(a, AnomalyStatus::Investigating, OWNER).unwrap();

        let investigating = wf.anomalies_with_status(AnomalyStatus::Investigating).unwrap();
        assert_eq!(investigating.len(), 1);
        assert_eq!(investigating[0].id, a);

        let snapshot = wf.snapshot().unwrap();
        assert_eq!(snapshot.last_id, 2);
        assert_eq!(snapshot.anomalies.len(), 2);
        assert_eq!(wf.len().unwrap(), 2);
    }

    #[test]
    fn status_parsing_and_display_agree() {
        for status in [
            AnomalyStatus::Reported,
            AnomalyStatus::Investigating,
            AnomalyStatus::Resolved,
            AnomalyStatus::Unresolvable,
        ] {
            assert_eq!(status.to_string().parse::<AnomalyStatus>().unwrap(), status);
        }
        assert!(AnomalyStatus::Resolved.is_terminal());
        assert!(!AnomalyStatus::Investigating.is_terminal());
    }
}
