//! Serializable transition requests.
//!
//! Every contract operation has a [`Transition`] variant. Requests carry a
//! version and a correlation ID and are the unit of work for the engine,
//! the single-writer runtime and replay scripts.

mod operations;
mod serialization;
mod validation;

pub use operations::{Transition, TransitionRequest};

pub use serialization::{from_json, script_from_json, to_json_pretty};
pub use validation::{MAX_IDENTITY_LEN, MAX_TEXT_LEN};
