//! Patchbay facade over the engine and the built-in nodes.

use crate::{Error, PatchbayBuilder, Result};
use patchbay_core::{Engine, InputNode, Node, NodeState, Toggleable};
use patchbay_nodes::{AmplitudeTracker, ModalResonanceFilter};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A node whose attachment can be awaited.
pub trait Attachable: Node + Toggleable {
    fn state(&self) -> NodeState;

    fn failure(&self) -> Option<patchbay_core::Error>;
}

impl Attachable for AmplitudeTracker {
    fn state(&self) -> NodeState {
        AmplitudeTracker::state(self)
    }

    fn failure(&self) -> Option<patchbay_core::Error> {
        AmplitudeTracker::failure(self)
    }
}

impl Attachable for ModalResonanceFilter {
    fn state(&self) -> NodeState {
        ModalResonanceFilter::state(self)
    }

    fn failure(&self) -> Option<patchbay_core::Error> {
        ModalResonanceFilter::failure(self)
    }
}

/// Owns the engine and its input bus, and creates nodes on it.
///
/// Node completions are delivered on the control plane. Whoever owns the
/// `Patchbay` drives it with [`run_pending`](Self::run_pending) or
/// [`wait_attached`](Self::wait_attached).
///
/// # Example
///
/// ```ignore
/// use patchbay::prelude::*;
///
/// let patchbay = Patchbay::builder().build()?;
/// let filter = patchbay.modal_resonance_filter(&patchbay.input(), 500.0, 50.0);
/// filter.set_frequency(1000.0);
///
/// patchbay.wait_attached(&*filter, Duration::from_secs(1))?;
/// ```
pub struct Patchbay {
    engine: Engine,
    input: Arc<InputNode>,
}

impl Patchbay {
    pub fn builder() -> PatchbayBuilder {
        PatchbayBuilder::default()
    }

    pub(crate) fn from_parts(engine: Engine, input: Arc<InputNode>) -> Self {
        Self { engine, input }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn sample_rate(&self) -> f64 {
        self.engine.sample_rate()
    }

    /// The engine's input bus.
    pub fn input(&self) -> Arc<dyn Node> {
        self.input.clone()
    }

    pub fn amplitude_tracker(
        &self,
        input: &Arc<dyn Node>,
        half_power_point: f64,
    ) -> Arc<AmplitudeTracker> {
        AmplitudeTracker::new(&self.engine, input, half_power_point)
    }

    pub fn modal_resonance_filter(
        &self,
        input: &Arc<dyn Node>,
        frequency: f64,
        quality_factor: f64,
    ) -> Arc<ModalResonanceFilter> {
        ModalResonanceFilter::new(&self.engine, input, frequency, quality_factor)
    }

    /// Run queued control-plane work (completions, remote parameter changes).
    pub fn run_pending(&self) -> usize {
        self.engine.run_pending()
    }

    /// Drive the control plane until `node` leaves the instantiating state.
    ///
    /// Returns the node's failure if instantiation failed and
    /// [`Error::AttachTimeout`] if `timeout` passes first. Neither outcome
    /// changes the node; a late completion still attaches it.
    pub fn wait_attached<N: Attachable + ?Sized>(&self, node: &N, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            self.engine.run_pending();
            match node.state() {
                NodeState::Attached => return Ok(()),
                NodeState::Failed => {
                    let err = node.failure().unwrap_or(patchbay_core::Error::Inert {
                        reason: "instantiation failed".into(),
                    });
                    return Err(err.into());
                }
                NodeState::Constructing | NodeState::Instantiating => {}
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(node = node.id().raw(), ?timeout, "Node not attached in time");
                return Err(Error::AttachTimeout {
                    node: node.id(),
                    timeout,
                });
            }
            self.engine.run_pending_timeout(remaining);
        }
    }

    /// Stop the engine. Attached units are detached; nodes created afterwards stay inert.
    pub fn shutdown(&self) {
        self.engine.shutdown();
    }
}

impl Drop for Patchbay {
    fn drop(&mut self) {
        self.engine.disconnect_node(self.input.id());
    }
}
