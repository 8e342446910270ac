//! Advisory warnings and the policy that decides whether they block.

use grove_path::NodePath;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::{TreeError, TreeResult};

/// An advisory condition noticed during an operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Warning {
    /// The name cannot be used as a plain member name, or it is shadowed
    /// by (or shadows) a front-end member.
    #[error("name {name:?} is not a natural name: {reason}")]
    NaturalName { name: String, reason: String },

    /// A leaf carries a flavor this reader does not know.
    #[error("node {path} has unknown flavor {flavor:?}; using the default")]
    Flavor { path: NodePath, flavor: String },

    /// A leaf's payload type cannot be decoded.
    #[error("node {path} has an unsupported payload type")]
    Unsupported { path: NodePath },

    /// The file root lacks the expected format metadata.
    #[error("file format compatibility: {reason}")]
    FormatCompat { reason: String },
}

/// What to do when a warning is raised.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningPolicy {
    /// Log and record the warning; the operation proceeds.
    #[default]
    Log,
    /// Fail the operation with [`TreeError::Warning`] before it mutates
    /// anything.
    Error,
}

/// Per-session warning sink.
#[derive(Debug, Default)]
pub(crate) struct WarningLog {
    policy: WarningPolicy,
    recorded: Vec<Warning>,
}

impl WarningLog {
    pub(crate) fn new(policy: WarningPolicy) -> Self {
        Self {
            policy,
            recorded: Vec::new(),
        }
    }

    /// Log `warning`, then record it or escalate it per the policy.
    pub(crate) fn emit(&mut self, warning: Warning) -> TreeResult<()> {
        warn!(%warning, "tree warning");
        match self.policy {
            WarningPolicy::Log => {
                self.recorded.push(warning);
                Ok(())
            }
            WarningPolicy::Error => Err(TreeError::Warning(warning)),
        }
    }

    pub(crate) fn take(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.recorded)
    }
}
