//! Engine boundary: unit instantiation, graph attachment and connections.
//!
//! The engine here is the control-side face of the running audio graph. It
//! creates units from registered factories off the calling thread, allocates
//! their render resources when they are attached, and records which node feeds
//! which. Pulling audio through the graph belongs to the render side and is not
//! modelled here.

use crate::component::{ComponentDescription, ComponentRegistry};
use crate::control::{ControlHandle, ControlQueue};
use crate::lockfree::AtomicFlag;
use crate::node::NodeId;
use crate::settings::Settings;
use crate::unit::ProcessingUnit;
use crate::{Error, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Engine-assigned identity of an instantiated unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u64);

impl UnitId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InstantiationOptions {
    /// Run the factory on the calling thread. The completion is still posted to
    /// the control queue, never invoked re-entrantly.
    pub synchronous: bool,
}

/// A unit produced by [`Engine::instantiate`].
#[derive(Clone)]
pub struct UnitHandle {
    id: UnitId,
    description: ComponentDescription,
    name: String,
    unit: Arc<dyn ProcessingUnit>,
}

impl UnitHandle {
    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn description(&self) -> &ComponentDescription {
        &self.description
    }

    /// Registration name of the unit's kind.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &Arc<dyn ProcessingUnit> {
        &self.unit
    }
}

impl fmt::Debug for UnitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitHandle")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Output of `from` feeds the input of `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
}

type Completion = Box<dyn FnOnce(Result<UnitHandle>) + Send + 'static>;

/// Holds a completion until it is posted, so it survives a failed thread spawn.
struct PendingCompletion {
    control: ControlHandle,
    completion: Mutex<Option<Completion>>,
}

impl PendingCompletion {
    fn deliver(&self, result: Result<UnitHandle>) {
        if let Some(completion) = self.completion.lock().take() {
            self.control.post(move || completion(result));
        }
    }
}

struct EngineInner {
    settings: Settings,
    registry: Arc<ComponentRegistry>,
    control: ControlQueue,
    units: DashMap<UnitId, UnitHandle>,
    connections: Mutex<Vec<Connection>>,
    next_unit: AtomicU64,
    next_node: AtomicU64,
    running: AtomicFlag,
}

/// Cheap to clone; clones share one engine.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn sample_rate(&self) -> f64 {
        self.inner.settings.sample_rate
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.inner.registry
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// Handle for posting work onto this engine's control plane.
    pub fn control(&self) -> ControlHandle {
        self.inner.control.handle()
    }

    /// Run queued control-plane work on the calling thread.
    pub fn run_pending(&self) -> usize {
        self.inner.control.run_pending()
    }

    /// Wait up to `timeout` for control-plane work, then drain.
    pub fn run_pending_timeout(&self, timeout: Duration) -> usize {
        self.inner.control.run_pending_timeout(timeout)
    }

    pub fn allocate_node_id(&self) -> NodeId {
        NodeId::new(self.inner.next_node.fetch_add(1, Ordering::Relaxed))
    }

    /// Request a unit of kind `description`.
    ///
    /// Returns immediately. `completion` runs later on the control plane (the
    /// next [`run_pending`](Self::run_pending)) with the unit or the reason it
    /// could not be produced. There is no cancellation and no deadline.
    pub fn instantiate<F>(
        &self,
        description: ComponentDescription,
        options: InstantiationOptions,
        completion: F,
    ) where
        F: FnOnce(Result<UnitHandle>) + Send + 'static,
    {
        let pending = Arc::new(PendingCompletion {
            control: self.control(),
            completion: Mutex::new(Some(Box::new(completion))),
        });

        if !self.is_running() {
            tracing::warn!(kind = %description, "Instantiation requested on a stopped engine");
            pending.deliver(Err(Error::EngineStopped));
            return;
        }

        let id = UnitId(self.inner.next_unit.fetch_add(1, Ordering::Relaxed));
        let registry = Arc::clone(&self.inner.registry);
        tracing::debug!(kind = %description, unit = id.0, "Instantiating unit");

        let worker = Arc::clone(&pending);
        let job = move || {
            let result = build_unit(&registry, id, description);
            worker.deliver(result);
        };

        if options.synchronous {
            job();
            return;
        }

        let spawned = std::thread::Builder::new()
            .name("patchbay-instantiate".into())
            .spawn(job);
        if let Err(err) = spawned {
            tracing::warn!(kind = %description, error = %err, "Could not spawn instantiation worker");
            pending.deliver(Err(Error::InstantiationFailed {
                kind: description,
                reason: err.to_string(),
            }));
        }
    }

    /// Add the unit to the running graph and allocate its render resources.
    pub fn attach(&self, handle: &UnitHandle) -> Result<()> {
        if !self.is_running() {
            return Err(Error::EngineStopped);
        }
        handle
            .unit
            .allocate_render_resources(self.inner.settings.sample_rate)?;
        self.inner.units.insert(handle.id, handle.clone());
        tracing::debug!(unit = handle.id.0, name = %handle.name, "Attached unit");
        Ok(())
    }

    /// Remove the unit from the graph and release its render resources.
    pub fn detach(&self, id: UnitId) -> bool {
        match self.inner.units.remove(&id) {
            Some((_, handle)) => {
                handle.unit.deallocate_render_resources();
                tracing::debug!(unit = id.0, name = %handle.name, "Detached unit");
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self, id: UnitId) -> bool {
        self.inner.units.contains_key(&id)
    }

    pub fn attached_count(&self) -> usize {
        self.inner.units.len()
    }

    /// Connect `from`'s output to `to`'s input. Returns `false` if already connected.
    pub fn connect(&self, from: NodeId, to: NodeId) -> bool {
        let connection = Connection { from, to };
        let mut connections = self.inner.connections.lock();
        if connections.contains(&connection) {
            return false;
        }
        connections.push(connection);
        tracing::debug!(from = from.raw(), to = to.raw(), "Connected nodes");
        true
    }

    /// Drop every connection into or out of `node`.
    pub fn disconnect_node(&self, node: NodeId) -> usize {
        let mut connections = self.inner.connections.lock();
        let before = connections.len();
        connections.retain(|c| c.from != node && c.to != node);
        before - connections.len()
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.inner.connections.lock().clone()
    }

    /// Stop accepting work. Attached units are detached; later instantiations
    /// fail with [`Error::EngineStopped`].
    pub fn shutdown(&self) {
        if !self.inner.running.swap(false) {
            return;
        }
        let ids: Vec<UnitId> = self.inner.units.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.detach(id);
        }
        tracing::debug!("Engine shut down");
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.inner.settings)
            .field("running", &self.is_running())
            .field("attached", &self.attached_count())
            .finish()
    }
}

fn build_unit(
    registry: &ComponentRegistry,
    id: UnitId,
    description: ComponentDescription,
) -> Result<UnitHandle> {
    let registration = registry
        .registration(&description)
        .ok_or(Error::UnregisteredComponent(description))?;
    let unit = registration
        .instantiate(&description)
        .map_err(|err| match err {
            Error::InstantiationFailed { .. } => err,
            other => Error::InstantiationFailed {
                kind: description,
                reason: other.to_string(),
            },
        })?;
    Ok(UnitHandle {
        id,
        description,
        name: registration.name,
        unit,
    })
}

/// Builder for [`Engine`].
///
/// Starts from the process-wide [`Settings::global`] snapshot.
#[derive(Default)]
pub struct EngineBuilder {
    settings: Option<Settings>,
    registry: Option<Arc<ComponentRegistry>>,
}

impl EngineBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.settings_mut().sample_rate = sample_rate;
        self
    }

    pub fn ramp_time(mut self, ramp_time: f64) -> Self {
        self.settings_mut().ramp_time = ramp_time;
        self
    }

    /// Use a private registry instead of the process-wide one.
    pub fn registry(mut self, registry: Arc<ComponentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    fn settings_mut(&mut self) -> &mut Settings {
        self.settings
            .get_or_insert_with(|| Settings::global().as_ref().clone())
    }

    pub fn build(self) -> Result<Engine> {
        let settings = self
            .settings
            .unwrap_or_else(|| Settings::global().as_ref().clone());
        settings.validate()?;

        Ok(Engine {
            inner: Arc::new(EngineInner {
                settings,
                registry: self.registry.unwrap_or_else(ComponentRegistry::global),
                control: ControlQueue::new(),
                units: DashMap::new(),
                connections: Mutex::new(Vec::new()),
                next_unit: AtomicU64::new(1),
                next_node: AtomicU64::new(1),
                running: AtomicFlag::new(true),
            }),
        })
    }
}
