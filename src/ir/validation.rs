//! Request validation.
//!
//! Contracts accept any text, but requests decoded from JSON scripts are
//! untrusted, so their free-form fields are bounded here before execution.

use crate::error::RequestError;
use crate::identity::Identity;
use crate::ir::operations::{Transition, TransitionRequest};

/// Upper bound for free-form text fields in a decoded request.
pub const MAX_TEXT_LEN: usize = 16 * 1024;

/// Upper bound for identity fields in a decoded request.
pub const MAX_IDENTITY_LEN: usize = 256;

fn validate_text(field: &'static str, value: &str) -> Result<(), RequestError> {
    if value.len() > MAX_TEXT_LEN {
        return Err(RequestError::FieldTooLong {
            field,
            max_length: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

fn validate_identity(field: &'static str, value: &Identity) -> Result<(), RequestError> {
    if value.as_str().len() > MAX_IDENTITY_LEN {
        return Err(RequestError::FieldTooLong {
            field,
            max_length: MAX_IDENTITY_LEN,
        });
    }
    Ok(())
}

impl Transition {
    /// Checks field bounds. Contract rules are left to the contracts.
    pub fn validate(&self) -> Result<(), RequestError> {
        match self {
            Self::MintTokens {
                recipient, caller, ..
            } => {
                validate_identity("recipient", recipient)?;
                validate_identity("caller", caller)
            }
            Self::TransferTokens {
                sender, recipient, ..
            }
            | Self::TransferEvent {
                sender, recipient, ..
            } => {
                validate_identity("sender", sender)?;
                validate_identity("recipient", recipient)
            }
            Self::BurnTokens { owner, .. } => validate_identity("owner", owner),
            Self::MintEvent { event, creator } => {
                validate_text("event_type", &event.event_type)?;
                validate_text("description", &event.description)?;
                validate_identity("creator", creator)
            }
            Self::ReportAnomaly {
                description,
                location,
                reporter,
                ..
            } => {
                validate_text("description", description)?;
                validate_text("location", location)?;
                validate_identity("reporter", reporter)
            }
            Self::UpdateAnomalyStatus { status, caller, .. } => {
                validate_text("status", status)?;
                validate_identity("caller", caller)
            }
            Self::ProposeResolutionStrategy { strategy, .. } => validate_text("strategy", strategy),
            Self::CreateSimulation {
                description,
                parameters,
                creator,
            } => {
                validate_text("description", description)?;
                validate_text("parameters", parameters)?;
                validate_identity("creator", creator)
            }
            Self::UpdateSimulationResult {
                result, updater, ..
            } => {
                validate_text("result", result)?;
                validate_identity("updater", updater)
            }
            Self::SetConsistencyScore { setter, .. } => validate_identity("setter", setter),
        }
    }
}

impl TransitionRequest {
    /// Validates the envelope version and the transition's field bounds.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.version != Self::CURRENT_VERSION {
            return Err(RequestError::UnsupportedVersion {
                version: self.version.clone(),
                expected: Self::CURRENT_VERSION,
            });
        }
        self.transition.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ids::SimulationId;

    #[test]
    fn current_version_passes() {
        let req = TransitionRequest::new(Transition::SetConsistencyScore {
            simulation_id: SimulationId::new(1),
            score: 500,
            setter: Identity::from("anyone"),
        });
        // Out-of-range scores are a contract concern, not a request one.
        assert!(req.validate().is_ok());
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut req = TransitionRequest::new(Transition::BurnTokens {
            amount: 1,
            owner: Identity::from("a"),
        });
        req.version = "2.0".to_string();
        assert!(matches!(
            req.validate(),
            Err(RequestError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn oversized_text_is_rejected() {
        let t = Transition::CreateSimulation {
            description: "d".to_string(),
            parameters: "x".repeat(MAX_TEXT_LEN + 1),
            creator: Identity::from("c"),
        };
        assert_eq!(
            t.validate(),
            Err(RequestError::FieldTooLong {
                field: "parameters",
                max_length: MAX_TEXT_LEN,
            })
        );
    }

    #[test]
    fn oversized_identity_is_rejected() {
        let t = Transition::BurnTokens {
            amount: 1,
            owner: Identity::new("o".repeat(MAX_IDENTITY_LEN + 1)),
        };
        assert!(matches!(
            t.validate(),
            Err(RequestError::FieldTooLong { field: "owner", .. })
        ));
    }

    #[test]
    fn empty_text_is_allowed() {
        let t = Transition::ReportAnomaly {
            description: String::new(),
            timestamp: 0,
            location: String::new(),
            severity: 0,
            reporter: Identity::from("r"),
        };
        assert!(t.validate().is_ok());
    }
}
