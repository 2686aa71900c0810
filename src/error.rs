//! Centralized error type for the patchbay umbrella crate.
//!
//! Wraps the core error so `?` propagates naturally across crate boundaries.

use patchbay_core::NodeId;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] patchbay_core::Error),

    #[error("{node} was not attached within {timeout:?}")]
    AttachTimeout { node: NodeId, timeout: Duration },
}

pub type Result<T> = std::result::Result<T, Error>;
