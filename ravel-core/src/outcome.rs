//! The settled result of one solver invocation.
//!
//! The module's entry point returns a status value and leaves message
//! bytes behind the descriptor for both the success and the failure
//! case. On the host side that pair becomes a proper sum type, with a
//! third variant for invocations that never produced a message at all
//! (trap, allocation failure, dead worker). Keeping [`Outcome::Fault`]
//! separate from [`Outcome::Failure`] is what lets callers tell "the
//! solver rejected this input" apart from "the solver blew up".

use crate::error::RavelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one invocation arm, always settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum Outcome {
    /// The module ran and reported success; the message is the result.
    Success(String),
    /// The module ran and reported failure; the message is the
    /// human-readable reason, intended for the user.
    Failure(String),
    /// The invocation never completed normally: the module trapped,
    /// allocation failed, or the channel's worker went away.
    Fault(String),
}

impl Outcome {
    /// Build an outcome from the entry point's status value and the
    /// decoded message bytes.
    #[must_use]
    pub fn from_status(ok: bool, message: String) -> Self {
        if ok {
            Self::Success(message)
        } else {
            Self::Failure(message)
        }
    }

    /// Check if the module reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Check if the module reported failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Check if the invocation faulted before producing a result.
    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }

    /// The message carried by any variant.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Success(m) | Self::Failure(m) | Self::Fault(m) => m,
        }
    }
}

impl From<RavelError> for Outcome {
    /// Settle a host error as a fault.
    ///
    /// This is the arm-settlement boundary: inside the host, traps and
    /// transport failures stay as typed errors; once an arm must
    /// settle, they collapse into `Fault` with the error's display
    /// form (which includes its code).
    fn from(err: RavelError) -> Self {
        Self::Fault(err.to_string())
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(m) => write!(f, "ok: {m}"),
            Self::Failure(m) => write!(f, "failed: {m}"),
            Self::Fault(m) => write!(f, "fault: {m}"),
        }
    }
}
