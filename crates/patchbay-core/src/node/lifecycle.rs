//! Node construction, attachment and parameter mirroring.
//!
//! ```text
//! Constructing ──instantiate──▶ Instantiating ──completion(Ok)──▶ Attached
//!                                     │
//!                                     └──────completion(Err)────▶ Failed (terminal)
//! ```
//!
//! Mirrored fields are always readable. Until the node is `Attached` a write
//! only updates the mirrored field; attachment flushes every field into the
//! unit once. After that, writes go through the addressed parameter under the
//! node's own observer token (ramped) while the unit is set up, and through the
//! unit's raw fields while it is not.
//!
//! Addressed writes notify the tree's observers, and a host observer may read
//! back into the node. Such writes are therefore captured as a [`PendingWrite`]
//! under the node lock and performed after it is released. A node's writes are
//! expected to come from one control-plane task at a time.

use super::{Node, NodeId};
use crate::component::ComponentDescription;
use crate::engine::{Engine, InstantiationOptions, UnitHandle};
use crate::lockfree::AtomicFlag;
use crate::parameter::{ParameterAddress, ParameterSpec};
use crate::tree::{ObserverToken, ParameterTree};
use crate::unit::{downcast_unit, ProcessingUnit};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// A node core shared between its handle and the callbacks that reach it.
pub type SharedNodeCore<U> = Arc<Mutex<NodeCore<U>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Constructing,
    Instantiating,
    Attached,
    Failed,
}

/// Node-side copy of one unit parameter.
#[derive(Debug, Clone)]
pub struct MirroredParameter {
    spec: ParameterSpec,
    value: f64,
    address: Option<ParameterAddress>,
}

impl MirroredParameter {
    pub fn spec(&self) -> &ParameterSpec {
        &self.spec
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Bound address, once the unit's tree has been queried.
    pub fn address(&self) -> Option<ParameterAddress> {
        self.address
    }
}

struct Attachment<U> {
    handle: UnitHandle,
    unit: Arc<U>,
    tree: Option<Arc<ParameterTree>>,
    token: Option<ObserverToken>,
}

impl<U: ProcessingUnit> Attachment<U> {
    fn write(&self, name: &'static str, address: Option<ParameterAddress>, value: f64) -> Option<PendingWrite> {
        match (&self.tree, address, self.token) {
            (Some(tree), Some(address), Some(token)) if self.unit.is_set_up() => Some(PendingWrite {
                tree: Arc::clone(tree),
                address,
                token,
                value: value as f32,
                name,
            }),
            _ => {
                // Raw fields notify no one.
                self.unit.set_raw_value(name, value as f32);
                None
            }
        }
    }
}

/// An addressed tree write taken under the node lock, to be applied once the
/// lock is released.
#[must_use = "the unit is not updated until the write is applied"]
#[derive(Debug)]
pub struct PendingWrite {
    tree: Arc<ParameterTree>,
    address: ParameterAddress,
    token: ObserverToken,
    value: f32,
    name: &'static str,
}

impl PendingWrite {
    pub fn address(&self) -> ParameterAddress {
        self.address
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Store the value in the tree and notify every observer but the node's own.
    pub fn apply(self) {
        if let Err(err) = self.tree.set_value(self.address, self.value, Some(self.token)) {
            tracing::warn!(parameter = self.name, error = %err, "Addressed write rejected");
        }
    }
}

enum Lifecycle<U> {
    Constructing,
    Instantiating,
    Attached(Attachment<U>),
    Failed(Error),
}

/// State machine and mirrored fields of one node driving a unit of type `U`.
pub struct NodeCore<U: ProcessingUnit> {
    id: NodeId,
    engine: Engine,
    description: ComponentDescription,
    lifecycle: Lifecycle<U>,
    parameters: Vec<MirroredParameter>,
    ramp_time: f64,
}

impl<U: ProcessingUnit> NodeCore<U> {
    /// `initial` pairs with `specs` by position; missing entries take the spec default.
    pub fn new(
        engine: &Engine,
        id: NodeId,
        description: ComponentDescription,
        specs: Vec<ParameterSpec>,
        initial: &[f64],
    ) -> Self {
        let parameters = specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| {
                let value = initial
                    .get(i)
                    .copied()
                    .unwrap_or(spec.range.default as f64);
                MirroredParameter {
                    value: spec.range.clamp_f64(value),
                    spec,
                    address: None,
                }
            })
            .collect();

        Self {
            id,
            engine: engine.clone(),
            description,
            lifecycle: Lifecycle::Constructing,
            parameters,
            ramp_time: engine.settings().ramp_time,
        }
    }

    /// Move `core` to `Instantiating` and ask the engine for its unit.
    ///
    /// The completion holds only weak references to the node and to
    /// `upstream`; if the node is gone by then, the unit is dropped unattached.
    pub fn begin_instantiation(
        core: &SharedNodeCore<U>,
        upstream: &Arc<dyn Node>,
        options: InstantiationOptions,
    ) {
        let (engine, description, id) = {
            let mut guard = core.lock();
            guard.lifecycle = Lifecycle::Instantiating;
            (guard.engine.clone(), guard.description, guard.id)
        };
        tracing::debug!(node = id.raw(), kind = %description, "Node instantiating");

        let this = Arc::downgrade(core);
        let upstream = Arc::downgrade(upstream);
        engine.instantiate(description, options, move |result| {
            let Some(node) = this.upgrade() else {
                tracing::debug!(node = id.raw(), "Node released before instantiation completed");
                return;
            };
            let upstream = upstream.upgrade();
            let pushes = node.lock().complete(result, &this, upstream);
            for push in pushes {
                push.apply();
            }
        });
    }

    /// Attach the instantiated unit. Returns the initial pushes of every bound
    /// field, which the caller applies after releasing the node lock.
    fn complete(
        &mut self,
        result: Result<UnitHandle>,
        this: &Weak<Mutex<NodeCore<U>>>,
        upstream: Option<Arc<dyn Node>>,
    ) -> Vec<PendingWrite> {
        let handle = match result {
            Ok(handle) => handle,
            Err(err) => {
                self.fail(err);
                return Vec::new();
            }
        };
        let Some(unit) = downcast_unit::<U>(Arc::clone(handle.unit())) else {
            self.fail(Error::UnitTypeMismatch {
                kind: self.description,
                expected: std::any::type_name::<U>(),
            });
            return Vec::new();
        };

        // Unit is not set up yet: seed its raw fields.
        for param in &self.parameters {
            unit.set_raw_value(param.spec.name, param.value as f32);
        }
        unit.set_ramp_time(self.ramp_time);

        if let Err(err) = self.engine.attach(&handle) {
            self.fail(err);
            return Vec::new();
        }

        match upstream {
            Some(upstream) => upstream.add_connection_point(self.id),
            None => tracing::warn!(node = self.id.raw(), "Upstream node released before attachment"),
        }

        let mut attachment = Attachment {
            handle,
            unit,
            tree: None,
            token: None,
        };

        let mut pushes = Vec::new();
        match attachment.unit.parameter_tree() {
            Some(tree) => {
                for param in &mut self.parameters {
                    param.address = match tree.parameter(param.spec.name) {
                        Ok(bound) => Some(bound.address()),
                        Err(err) => {
                            tracing::warn!(node = self.id.raw(), error = %err, "Field left unbound");
                            None
                        }
                    };
                }

                let bound = self.parameters.iter().filter_map(|p| p.address).collect();
                let token = tree.add_observer(remote_change_observer(this.clone(), &self.engine, bound));
                pushes = self
                    .parameters
                    .iter()
                    .filter_map(|param| {
                        Some(PendingWrite {
                            tree: Arc::clone(&tree),
                            address: param.address?,
                            token,
                            value: param.value as f32,
                            name: param.spec.name,
                        })
                    })
                    .collect();
                attachment.tree = Some(tree);
                attachment.token = Some(token);
            }
            None => {
                tracing::debug!(node = self.id.raw(), "Parameter tree not live; writes stay on raw fields");
            }
        }

        tracing::debug!(
            node = self.id.raw(),
            unit = attachment.handle.id().raw(),
            "Node attached"
        );
        self.lifecycle = Lifecycle::Attached(attachment);
        pushes
    }

    fn fail(&mut self, err: Error) {
        tracing::warn!(node = self.id.raw(), kind = %self.description, error = %err, "Node is inert");
        self.lifecycle = Lifecycle::Failed(err);
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn description(&self) -> &ComponentDescription {
        &self.description
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn state(&self) -> NodeState {
        match self.lifecycle {
            Lifecycle::Constructing => NodeState::Constructing,
            Lifecycle::Instantiating => NodeState::Instantiating,
            Lifecycle::Attached(_) => NodeState::Attached,
            Lifecycle::Failed(_) => NodeState::Failed,
        }
    }

    /// Why instantiation failed, for a node in [`NodeState::Failed`].
    pub fn failure(&self) -> Option<&Error> {
        match &self.lifecycle {
            Lifecycle::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn unit(&self) -> Option<&Arc<U>> {
        match &self.lifecycle {
            Lifecycle::Attached(attachment) => Some(&attachment.unit),
            _ => None,
        }
    }

    pub fn unit_handle(&self) -> Option<&UnitHandle> {
        match &self.lifecycle {
            Lifecycle::Attached(attachment) => Some(&attachment.handle),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<ObserverToken> {
        match &self.lifecycle {
            Lifecycle::Attached(attachment) => attachment.token,
            _ => None,
        }
    }

    pub fn parameters(&self) -> &[MirroredParameter] {
        &self.parameters
    }

    /// Mirrored value; `0.0` for an index the node does not have.
    pub fn value(&self, index: usize) -> f64 {
        self.parameters.get(index).map_or(0.0, |p| p.value)
    }

    /// Write a mirrored field and forward it to the unit if there is one.
    ///
    /// Values are clamped to the parameter range; non-finite values are
    /// rejected. Writing the current value is a no-op. An addressed write is
    /// returned rather than performed, see [`NodeCore::write`].
    pub fn set_value(&mut self, index: usize, value: f64) -> Option<PendingWrite> {
        let Some(param) = self.parameters.get_mut(index) else {
            tracing::warn!(node = self.id.raw(), index, "No parameter at index");
            return None;
        };
        if !value.is_finite() {
            tracing::warn!(node = self.id.raw(), parameter = param.spec.name, value, "Ignoring non-finite write");
            return None;
        }
        let value = param.spec.range.clamp_f64(value);
        if param.value == value {
            return None;
        }
        param.value = value;

        match &self.lifecycle {
            Lifecycle::Attached(attachment) => attachment.write(param.spec.name, param.address, value),
            _ => None,
        }
    }

    /// [`set_value`](Self::set_value) on a shared core, with the tree write
    /// performed after the lock is dropped.
    pub fn write(core: &Mutex<Self>, index: usize, value: f64) {
        let pending = core.lock().set_value(index, value);
        if let Some(pending) = pending {
            pending.apply();
        }
    }

    /// Refresh every bound field from the tree's current value.
    ///
    /// Fields are assigned directly; nothing is written back. Returns how many
    /// fields changed.
    pub(crate) fn sync_remote(&mut self) -> usize {
        let Lifecycle::Attached(Attachment { tree: Some(tree), .. }) = &self.lifecycle else {
            return 0;
        };

        let mut changed = 0;
        for param in &mut self.parameters {
            let Some(live) = param.address.and_then(|address| tree.by_address(address)).map(|p| p.value()) else {
                continue;
            };
            if param.value as f32 == live {
                continue;
            }
            param.value = live as f64;
            changed += 1;
            tracing::trace!(
                node = self.id.raw(),
                parameter = param.spec.name,
                value = param.value,
                "Mirrored remote change"
            );
        }
        changed
    }

    pub fn ramp_time(&self) -> f64 {
        self.ramp_time
    }

    /// Forward-only: reconfigures the unit's ramp immediately, no observer binding.
    pub fn set_ramp_time(&mut self, ramp_time: f64) {
        let ramp_time = ramp_time.max(0.0);
        if self.ramp_time == ramp_time {
            return;
        }
        self.ramp_time = ramp_time;
        if let Some(unit) = self.unit() {
            unit.set_ramp_time(ramp_time);
        }
    }

    fn require_unit(&self) -> Result<&Arc<U>> {
        match &self.lifecycle {
            Lifecycle::Attached(attachment) => Ok(&attachment.unit),
            Lifecycle::Failed(err) => Err(Error::Inert {
                reason: err.to_string(),
            }),
            Lifecycle::Constructing | Lifecycle::Instantiating => Err(Error::NotYetAttached),
        }
    }

    pub fn is_started(&self) -> bool {
        self.unit().is_some_and(|unit| unit.is_playing())
    }

    pub fn start(&self) -> Result<()> {
        self.require_unit()
            .inspect_err(|err| tracing::warn!(node = self.id.raw(), error = %err, "start() without a unit"))?
            .start();
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        self.require_unit()
            .inspect_err(|err| tracing::warn!(node = self.id.raw(), error = %err, "stop() without a unit"))?
            .stop();
        Ok(())
    }
}

impl<U: ProcessingUnit> Drop for NodeCore<U> {
    fn drop(&mut self) {
        if let Lifecycle::Attached(attachment) = &self.lifecycle {
            if let (Some(tree), Some(token)) = (&attachment.tree, attachment.token) {
                tree.remove_observer(token);
            }
            self.engine.detach(attachment.handle.id());
            self.engine.disconnect_node(self.id);
            tracing::debug!(node = self.id.raw(), "Node released");
        }
    }
}

/// Observer that marshals remote changes onto the control plane.
///
/// At most one sync task per node is queued at a time; it refreshes every
/// bound field from the live tree, so a burst of host writes costs one task.
fn remote_change_observer<U: ProcessingUnit>(
    node: Weak<Mutex<NodeCore<U>>>,
    engine: &Engine,
    bound: Vec<ParameterAddress>,
) -> impl Fn(ParameterAddress, f32) + Send + Sync + 'static {
    let control = engine.control();
    let pending = Arc::new(AtomicFlag::new(false));
    move |address, _| {
        if !bound.contains(&address) {
            tracing::warn!(error = %Error::UnknownParameterAddress(address), "Ignoring change notification");
            return;
        }
        if pending.swap(true) {
            return;
        }
        let node = node.clone();
        let flag = Arc::clone(&pending);
        if !control.post(move || {
            flag.set(false);
            if let Some(node) = node.upgrade() {
                node.lock().sync_remote();
            }
        }) {
            pending.set(false);
        }
    }
}
