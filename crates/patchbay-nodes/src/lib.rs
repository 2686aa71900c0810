//! Concrete processing nodes: [`AmplitudeTracker`] and [`ModalResonanceFilter`].
//!
//! Each node drives an engine-side unit registered under its own component kind.
//! The units hold parameters and state only; signal processing happens in the
//! render path that reads them.

mod unit_node;
pub use unit_node::UnitNode;

mod amplitude_tracker;
pub use amplitude_tracker::{calibrated_amplitude, AmplitudeTracker, AmplitudeTrackerUnit};

mod modal_resonance_filter;
pub use modal_resonance_filter::{
    ModalResonanceFilter, ModalResonanceFilterBuilder, ModalResonanceFilterUnit,
};

mod registration;
pub use registration::register_builtin_components;
