//! Error types for patchbay-core.

use crate::component::ComponentDescription;
use crate::parameter::ParameterAddress;
use thiserror::Error;

/// Error type for patchbay-core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to instantiate {kind}: {reason}")]
    InstantiationFailed {
        kind: ComponentDescription,
        reason: String,
    },

    #[error("Node is not attached to the engine yet")]
    NotYetAttached,

    #[error("Node is inert: {reason}")]
    Inert { reason: String },

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Unknown parameter address: {0}")]
    UnknownParameterAddress(ParameterAddress),

    #[error("Duplicate parameter: {0}")]
    DuplicateParameter(String),

    #[error("No factory registered for {0}")]
    UnregisteredComponent(ComponentDescription),

    #[error("Invalid four-character code: {0:?}")]
    InvalidFourCharCode(String),

    #[error("Unit produced for {kind} is not a {expected}")]
    UnitTypeMismatch {
        kind: ComponentDescription,
        expected: &'static str,
    },

    #[error("Engine has been shut down")]
    EngineStopped,
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
