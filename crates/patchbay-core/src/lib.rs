//! Node lifecycle and parameter automation core.
//!
//! # Primary API
//!
//! - [`Engine`] / [`EngineBuilder`]: unit instantiation, attachment and the control plane
//! - [`ParameterTree`]: addressed parameters with originator-filtered observers
//! - [`NodeCore`]: mirrored node fields that follow a node from construction to attachment
//! - [`ComponentRegistry`]: process-wide factories keyed by [`ComponentDescription`]
//! - [`RampTable`] / [`SmoothedValue`]: render-side parameter ramps
//!
//! # Example
//!
//! ```ignore
//! use patchbay_core::{Engine, InputNode, InstantiationOptions, NodeCore};
//!
//! let engine = Engine::builder().sample_rate(48000.0).build()?;
//! let input = InputNode::new(&engine);
//! let core = Arc::new(Mutex::new(NodeCore::<MyUnit>::new(&engine, id, desc, specs, &[])));
//! NodeCore::begin_instantiation(&core, &input, InstantiationOptions::default());
//!
//! engine.run_pending_timeout(Duration::from_millis(100));
//! ```

pub mod error;
pub use error::{Error, Result};

mod settings;
pub use settings::{Settings, DEFAULT_RAMP_TIME, DEFAULT_SAMPLE_RATE};

pub(crate) mod lockfree;
pub use lockfree::{AtomicDouble, AtomicFlag, AtomicFloat, Generation};

pub mod parameter;
pub use parameter::{
    Parameter, ParameterAddress, ParameterRange, ParameterScale, ParameterSpec, ParameterUnit,
};

mod tree;
pub use tree::{ObserverToken, ParameterTree};

pub mod smooth;
pub use smooth::{ramp_samples, RampConfig, RampTable, SmoothedValue};

mod unit;
pub use unit::{downcast_unit, ProcessingUnit, UnitCore};

mod component;
pub use component::{
    ComponentDescription, ComponentRegistration, ComponentRegistry, FourCharCode, UnitFactory,
};

mod control;
pub use control::{ControlHandle, ControlQueue, ControlTask};

mod engine;
pub use engine::{Connection, Engine, EngineBuilder, InstantiationOptions, UnitHandle, UnitId};

pub mod node;
pub use node::{
    ConnectionPoints, InputNode, MirroredParameter, Node, NodeCore, NodeId, NodeState,
    PendingWrite, SharedNodeCore, Toggleable,
};

#[cfg(test)]
mod testing;
