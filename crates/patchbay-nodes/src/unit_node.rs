//! Shared plumbing for nodes that drive a single processing unit.

use parking_lot::Mutex;
use patchbay_core::{
    ComponentDescription, ConnectionPoints, Engine, Error, InstantiationOptions, Node, NodeCore,
    NodeId, NodeState, ParameterSpec, ProcessingUnit, Result, SharedNodeCore, Toggleable,
};
use std::fmt;
use std::sync::Arc;

/// A node that owns one unit of type `U` and its mirrored fields.
pub struct UnitNode<U: ProcessingUnit> {
    id: NodeId,
    core: SharedNodeCore<U>,
    points: ConnectionPoints,
}

impl<U: ProcessingUnit> UnitNode<U> {
    /// Store `initial` as mirrored fields and start instantiating the unit.
    pub fn spawn(
        engine: &Engine,
        input: &Arc<dyn Node>,
        description: ComponentDescription,
        specs: Vec<ParameterSpec>,
        initial: &[f64],
        options: InstantiationOptions,
    ) -> Self {
        let id = engine.allocate_node_id();
        let core = Arc::new(Mutex::new(NodeCore::new(
            engine,
            id,
            description,
            specs,
            initial,
        )));
        NodeCore::begin_instantiation(&core, input, options);

        Self {
            id,
            core,
            points: ConnectionPoints::new(engine, id),
        }
    }

    pub fn state(&self) -> NodeState {
        self.core.lock().state()
    }

    pub fn failure(&self) -> Option<Error> {
        self.core.lock().failure().cloned()
    }

    pub fn unit(&self) -> Option<Arc<U>> {
        self.core.lock().unit().cloned()
    }

    pub fn value(&self, index: usize) -> f64 {
        self.core.lock().value(index)
    }

    pub fn set_value(&self, index: usize, value: f64) {
        NodeCore::write(&self.core, index, value);
    }

    pub fn ramp_time(&self) -> f64 {
        self.core.lock().ramp_time()
    }

    pub fn set_ramp_time(&self, ramp_time: f64) {
        self.core.lock().set_ramp_time(ramp_time);
    }

    /// Run `f` against the unit, or return `default` while there is none.
    pub fn with_unit<R>(&self, default: R, f: impl FnOnce(&U) -> R) -> R {
        match self.core.lock().unit() {
            Some(unit) => f(unit),
            None => default,
        }
    }
}

impl<U: ProcessingUnit> Node for UnitNode<U> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn add_connection_point(&self, downstream: NodeId) {
        self.points.add(downstream);
    }

    fn connection_points(&self) -> Vec<NodeId> {
        self.points.list()
    }
}

impl<U: ProcessingUnit> Toggleable for UnitNode<U> {
    fn is_started(&self) -> bool {
        self.core.lock().is_started()
    }

    fn start(&self) -> Result<()> {
        self.core.lock().start()
    }

    fn stop(&self) -> Result<()> {
        self.core.lock().stop()
    }
}

impl<U: ProcessingUnit> fmt::Debug for UnitNode<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.lock();
        f.debug_struct("UnitNode")
            .field("id", &self.id)
            .field("kind", core.description())
            .field("state", &core.state())
            .field("parameters", &core.parameters())
            .finish()
    }
}
