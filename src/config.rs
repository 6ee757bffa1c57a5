//! Engine configuration.
//!
//! Configuration is a small JSON document:
//!
//! ```json
//! {
//!   "privileged_identity": "CONTRACT_OWNER",
//!   "strict_anomaly_transitions": false,
//!   "runtime": { "queue_capacity": 1024 }
//! }
//! ```
//!
//! Only `privileged_identity` is required. The privileged identity can be
//! overridden with `CHRONOLEDGER_PRIVILEGED_IDENTITY`.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::contracts::TransitionRule;
use crate::error::ConfigError;
use crate::identity::Identity;
use crate::policy::AuthorizationPolicy;

/// Environment variable that replaces the configured privileged identity.
pub const PRIVILEGED_IDENTITY_ENV: &str = "CHRONOLEDGER_PRIVILEGED_IDENTITY";

const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Single-writer runtime settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Maximum transitions waiting for the writer.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Identity holding the privileged role across all contracts.
    pub privileged_identity: Identity,

    /// Enforce the anomaly lifecycle instead of accepting any permitted target.
    #[serde(default)]
    pub strict_anomaly_transitions: bool,

    /// Single-writer runtime settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl EngineConfig {
    /// Config with defaults and the given privileged identity.
    #[must_use]
    pub fn new(privileged_identity: impl Into<Identity>) -> Self {
        Self {
            privileged_identity: privileged_identity.into(),
            strict_anomaly_transitions: false,
            runtime: RuntimeConfig::default(),
        }
    }

    /// Enables strict anomaly lifecycle checks.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict_anomaly_transitions = true;
        self
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&content)?;
        tracing::debug!(?path, privileged = %config.privileged_identity, "loaded config");
        Ok(config)
    }

    /// Applies overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(identity) = lookup(PRIVILEGED_IDENTITY_ENV) {
            tracing::debug!(%identity, "privileged identity overridden from environment");
            self.privileged_identity = Identity::new(identity);
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.privileged_identity.is_blank() {
            return Err(ConfigError::EmptyPrivilegedIdentity);
        }
        if self.runtime.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }

    /// Authorization policy shared by all contracts.
    #[must_use]
    pub fn policy(&self) -> AuthorizationPolicy {
        AuthorizationPolicy::new(self.privileged_identity.clone())
    }

    /// Anomaly status rule selected by this config.
    #[must_use]
    pub const fn transition_rule(&self) -> TransitionRule {
        if self.strict_anomaly_transitions {
            TransitionRule::Strict
        } else {
            TransitionRule::Permissive
        }
    }
}
