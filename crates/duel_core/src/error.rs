//! Error types for the duel simulation.

use thiserror::Error;

/// Result type alias for duel operations.
pub type Result<T> = std::result::Result<T, DuelError>;

/// Errors that can occur during match setup or state handling.
///
/// Step-time non-events (attack on cooldown, target out of arc, dash not
/// ready) are routine control flow and are modeled as `Option`/`bool`
/// returns, never as errors. Timing out without a winner is a defined
/// terminal outcome ([`crate::phase::Termination::NoWinnerTimeout`]), not
/// an error either.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DuelError {
    /// Requested weapon name is not present in the registry.
    #[error("Unknown weapon: {name}")]
    UnknownWeapon {
        /// The name that failed lookup.
        name: String,
    },

    /// A weapon name was registered twice.
    #[error("Weapon already registered: {name}")]
    DuplicateWeapon {
        /// The name that was registered twice.
        name: String,
    },

    /// Initial entity placement is overlapping or out of bounds.
    #[error("Invalid spawn configuration: {0}")]
    InvalidSpawnConfiguration(String),

    /// A configuration value violates a documented invariant.
    #[error("Malformed configuration: {field}: {message}")]
    MalformedConfiguration {
        /// Name of the offending parameter.
        field: &'static str,
        /// What invariant it violates.
        message: String,
    },

    /// Simulation state is invalid (serialization failures, phase misuse).
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl DuelError {
    /// Shorthand for a [`DuelError::MalformedConfiguration`].
    pub fn malformed(field: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedConfiguration {
            field,
            message: message.into(),
        }
    }
}
