//! JSON helpers for requests and replay scripts.
//!
//! A replay script is a JSON array whose elements are either bare
//! transitions or full request envelopes. Bare transitions are wrapped with
//! the current version and a fresh request ID.

use serde::Deserialize;

use crate::error::{LedgerError, RequestError};
use crate::ir::operations::{Transition, TransitionRequest};

/// Serialize a request to pretty JSON.
pub fn to_json_pretty(request: &TransitionRequest) -> Result<String, LedgerError> {
    serde_json::to_string_pretty(request)
        .map_err(|e| LedgerError::internal(format!("serialize request: {e}")))
}

/// Deserialize a request from JSON.
///
/// Callers should then invoke `request.validate()` before executing.
pub fn from_json(s: &str) -> Result<TransitionRequest, LedgerError> {
    serde_json::from_str::<TransitionRequest>(s).map_err(|e| malformed(&e))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScriptEntry {
    Request(TransitionRequest),
    Bare(Transition),
}

/// Deserialize a replay script into validated requests, in order.
pub fn script_from_json(s: &str) -> Result<Vec<TransitionRequest>, LedgerError> {
    let entries: Vec<ScriptEntry> = serde_json::from_str(s).map_err(|e| malformed(&e))?;
    entries
        .into_iter()
        .map(|entry| {
            let request = match entry {
                ScriptEntry::Request(request) => request,
                ScriptEntry::Bare(transition) => TransitionRequest::new(transition),
            };
            request.validate()?;
            Ok(request)
        })
        .collect()
}

fn malformed(e: &serde_json::Error) -> LedgerError {
    RequestError::Malformed {
        message: e.to_string(),
    }
    .into()
}
