//! Non-fungible temporal event registry.
//!
//! Anyone may mint an event token; the creator becomes its first owner and
//! only the current owner may hand it on. Tokens are never destroyed.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contracts::{finish, unix_to_utc};
use crate::error::LedgerResult;
use crate::identity::Identity;
use crate::ids::{AnomalyId, EventTokenId, IdAllocator};
use crate::invariant::{check_significance, Percentage};
use crate::policy::{AuthorizationPolicy, Requirement};
use crate::storage::{lock_err, Record, RecordKind, RecordStore};

/// Metadata for a token that has not been minted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemporalEvent {
    /// Category label, e.g. "Paradox Resolution".
    pub event_type: String,
    /// Free-form description.
    pub description: String,
    /// Unix seconds.
    pub timestamp: i64,
    /// Raw significance; must lie in [0, 100].
    pub significance: i64,
    /// Informational link to an anomaly. Not checked for existence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_anomaly: Option<AnomalyId>,
}

impl NewTemporalEvent {
    /// Creates event metadata with no related anomaly.
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        description: impl Into<String>,
        timestamp: i64,
        significance: i64,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            description: description.into(),
            timestamp,
            significance,
            related_anomaly: None,
        }
    }

    /// Links the event to an anomaly.
    pub fn related_to(mut self, anomaly: impl Into<Option<AnomalyId>>) -> Self {
        self.related_anomaly = anomaly.into();
        self
    }
}

/// A minted temporal event token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalEvent {
    /// Sequential token ID.
    pub id: EventTokenId,
    /// Who minted the token.
    pub creator: Identity,
    /// Category label.
    pub event_type: String,
    /// Free-form description.
    pub description: String,
    /// Unix seconds.
    pub timestamp: i64,
    /// Significance in [0, 100].
    pub significance: Percentage,
    /// Informational link to an anomaly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_anomaly: Option<AnomalyId>,
    /// Current owner.
    pub owner: Identity,
}

impl TemporalEvent {
    /// The event timestamp as a UTC datetime, if representable.
    #[must_use]
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.timestamp)
    }
}

impl Record for TemporalEvent {
    type Id = EventTokenId;
    const KIND: RecordKind = RecordKind::TemporalEvent;

    fn id(&self) -> EventTokenId {
        self.id
    }
}

/// Serializable view of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    /// Last issued token ID (0 if none).
    pub last_id: u64,
    /// All tokens in ID order.
    pub events: Vec<TemporalEvent>,
}

#[derive(Debug, Default)]
struct EventState {
    ids: IdAllocator<EventTokenId>,
    records: RecordStore<TemporalEvent>,
}

/// Registry of temporal event tokens.
#[derive(Debug)]
pub struct TemporalEventRegistry {
    policy: AuthorizationPolicy,
    state: RwLock<EventState>,
}

impl TemporalEventRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(policy: AuthorizationPolicy) -> Self {
        Self {
            policy,
            state: RwLock::new(EventState::default()),
        }
    }

    /// Mint a token owned by `creator`.
    ///
    /// Significance is validated before an ID is allocated, so a rejected
    /// mint never leaves a gap in the ID sequence.
    pub fn mint(&self, event: NewTemporalEvent, creator: impl Into<Identity>) -> LedgerResult<EventTokenId> {
        let creator = creator.into();
        let mut state = self.state.write().map_err(|_| lock_err("event.mint"))?;

        let significance = finish("event.mint", check_significance(event.significance))?;

        let id = state.ids.next_id();
        let token = TemporalEvent {
            id,
            owner: creator.clone(),
            creator,
            event_type: event.event_type,
            description: event.description,
            timestamp: event.timestamp,
            significance,
            related_anomaly: event.related_anomaly,
        };
        tracing::debug!(%id, creator = %token.creator, %significance, "minted temporal event");
        state.records.insert(token)?;
        Ok(id)
    }

    /// Hand `token_id` from `sender` to `recipient`. Only the current owner may transfer.
    pub fn transfer(
        &self,
        token_id: EventTokenId,
        sender: impl Into<Identity>,
        recipient: impl Into<Identity>,
    ) -> LedgerResult<()> {
        let sender = sender.into();
        let recipient = recipient.into();
        let mut state = self.state.write().map_err(|_| lock_err("event.transfer"))?;

        let token = finish("event.transfer", state.records.require_mut(token_id))?;
        finish(
            "event.transfer",
            self.policy
                .authorize(&sender, Requirement::CurrentOwner(&token.owner)),
        )?;

        tracing::debug!(id = %token_id, from = %sender, to = %recipient, "transferred temporal event");
        token.owner = recipient;
        Ok(())
    }

    /// Current owner of `token_id`.
    pub fn owner_of(&self, token_id: EventTokenId) -> LedgerResult<Option<Identity>> {
        let state = self.state.read().map_err(|_| lock_err("event.owner_of"))?;
        Ok(state.records.get(token_id).map(|t| t.owner.clone()))
    }

    /// Get a token by ID.
    pub fn get(&self, token_id: EventTokenId) -> LedgerResult<Option<TemporalEvent>> {
        let state = self.state.read().map_err(|_| lock_err("event.get"))?;
        Ok(state.records.get(token_id).cloned())
    }

    /// Tokens currently owned by `owner`, in ID order.
    pub fn tokens_owned_by(&self, owner: &str) -> LedgerResult<Vec<TemporalEvent>> {
        let state = self.state.read().map_err(|_| lock_err("event.tokens_owned_by"))?;
        Ok(state.records.collect_where(|t| t.owner == owner))
    }

    /// Tokens that reference `anomaly`, in ID order.
    pub fn events_for_anomaly(&self, anomaly: AnomalyId) -> LedgerResult<Vec<TemporalEvent>> {
        let state = self.state.read().map_err(|_| lock_err("event.events_for_anomaly"))?;
        Ok(state.records.collect_where(|t| t.related_anomaly == Some(anomaly)))
    }

    /// Number of minted tokens.
    pub fn len(&self) -> LedgerResult<usize> {
        let state = self.state.read().map_err(|_| lock_err("event.len"))?;
        Ok(state.records.len())
    }

    /// Returns true if nothing was minted yet.
    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy of the full registry state.
    pub fn snapshot(&self) -> LedgerResult<EventSnapshot> {
        let state = self.state.read().map_err(|_| lock_err("event.snapshot"))?;
        Ok(EventSnapshot {
            last_id: state.ids.last_issued(),
            events: state.records.values().cloned().collect(),
        })
    }
}
