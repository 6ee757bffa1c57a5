//! Role-based authorization.
//!
//! There is exactly one privileged identity per engine, supplied through
//! configuration. Everything else is authorized by comparing the caller with
//! an identity recorded on the target record.

use std::fmt;

use crate::error::ContractError;
use crate::identity::Identity;

/// Who a transition requires the caller to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement<'a> {
    /// The configured privileged role.
    PrivilegedRole,
    /// The identity that created the target record.
    RecordCreator(&'a Identity),
    /// The identity that currently owns the target token.
    CurrentOwner(&'a Identity),
}

impl fmt::Display for Requirement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivilegedRole => write!(f, "privileged role"),
            Self::RecordCreator(creator) => write!(f, "record creator ({creator})"),
            Self::CurrentOwner(owner) => write!(f, "current owner ({owner})"),
        }
    }
}

/// Decides whether a caller may perform a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationPolicy {
    privileged: Identity,
}

impl AuthorizationPolicy {
    /// Creates a policy with the given privileged identity.
    #[must_use]
    pub fn new(privileged: impl Into<Identity>) -> Self {
        Self {
            privileged: privileged.into(),
        }
    }

    /// The privileged identity.
    #[must_use]
    pub fn privileged(&self) -> &Identity {
        &self.privileged
    }

    /// Returns true if `caller` is the privileged identity.
    #[must_use]
    pub fn is_privileged(&self, caller: &Identity) -> bool {
        *caller == self.privileged
    }

    /// Fails with `NotAuthorized` unless `caller` satisfies `requirement`.
    pub fn authorize(&self, caller: &Identity, requirement: Requirement<'_>) -> Result<(), ContractError> {
        let allowed = match requirement {
            Requirement::PrivilegedRole => self.is_privileged(caller),
            Requirement::RecordCreator(expected) | Requirement::CurrentOwner(expected) => {
                caller == expected
            }
        };

        if allowed {
            Ok(())
        } else {
            Err(ContractError::NotAuthorized {
                caller: caller.clone(),
                required: requirement.to_string(),
            })
        }
    }
}
