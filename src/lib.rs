//! # Patchbay - audio node lifecycle and parameter automation
//!
//! Nodes wrap engine-side processing units. A node is usable as soon as it is
//! constructed: its parameters are mirrored fields that buffer writes until the
//! unit has been instantiated and attached, then stay in sync with the unit in
//! both directions.
//!
//! ## Architecture
//!
//! - **patchbay-core** - parameter trees, ramping, engine boundary, node lifecycle
//! - **patchbay-nodes** - amplitude tracker and modal resonance filter
//!
//! ## Quick Start
//!
//! ```ignore
//! use patchbay::prelude::*;
//!
//! let patchbay = Patchbay::builder().sample_rate(48000.0).build()?;
//! let tracker = patchbay.amplitude_tracker(&patchbay.input(), 10.0);
//!
//! patchbay.wait_attached(&*tracker, Duration::from_millis(500))?;
//! tracker.stop()?;
//! ```

/// Re-export of patchbay-core for direct access
pub use patchbay_core as core;

pub use patchbay_core::{
    ComponentDescription, ComponentRegistry, Engine, FourCharCode, InputNode,
    InstantiationOptions, Node, NodeId, NodeState, ObserverToken, ParameterAddress,
    ParameterRange, ParameterSpec, ParameterTree, ProcessingUnit, Settings, Toggleable,
};

pub use patchbay_nodes::{
    calibrated_amplitude, register_builtin_components, AmplitudeTracker, AmplitudeTrackerUnit,
    ModalResonanceFilter, ModalResonanceFilterBuilder, ModalResonanceFilterUnit,
};

mod error;
pub use error::{Error, Result};

mod builder;
pub use builder::PatchbayBuilder;

mod engine;
pub use engine::{Attachable, Patchbay};

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        AmplitudeTracker, Attachable, Error, ModalResonanceFilter, Node, NodeState, Patchbay,
        Result, Toggleable,
    };
    pub use std::sync::Arc;
    pub use std::time::Duration;
}
