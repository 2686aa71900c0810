//! Graph nodes: identity, connection points and the start/stop capability.
//!
//! Concrete nodes wrap a [`NodeCore`], which runs the attachment protocol and
//! keeps the node's mirrored parameter fields in step with its unit.

mod lifecycle;

pub use lifecycle::{MirroredParameter, NodeCore, NodeState, PendingWrite, SharedNodeCore};

use crate::engine::Engine;
use crate::Result;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Engine-assigned node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A vertex of the signal graph.
pub trait Node: Send + Sync {
    fn id(&self) -> NodeId;

    /// Record `downstream` as fed by this node's output.
    fn add_connection_point(&self, downstream: NodeId);

    fn connection_points(&self) -> Vec<NodeId>;
}

/// Start/stop capability shared by processing nodes.
///
/// Some units call the inactive state "stopped", others "bypassed"; both map
/// to the same pair of calls. Calling either before the node has a unit is a
/// contract violation reported as an error, never a panic.
pub trait Toggleable {
    /// `false` whenever the node has no unit.
    fn is_started(&self) -> bool;

    fn start(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;

    fn play(&self) -> Result<()> {
        self.start()
    }

    fn bypass(&self) -> Result<()> {
        self.stop()
    }
}

/// Downstream connections of one node, mirrored into the engine graph.
pub struct ConnectionPoints {
    engine: Engine,
    owner: NodeId,
    points: Mutex<Vec<NodeId>>,
}

impl ConnectionPoints {
    pub fn new(engine: &Engine, owner: NodeId) -> Self {
        Self {
            engine: engine.clone(),
            owner,
            points: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, downstream: NodeId) {
        let mut points = self.points.lock();
        if !points.contains(&downstream) {
            points.push(downstream);
        }
        self.engine.connect(self.owner, downstream);
    }

    pub fn list(&self) -> Vec<NodeId> {
        self.points.lock().clone()
    }
}

/// Signal source at the head of a chain (the engine's input bus).
///
/// Owns no unit; it only feeds the nodes connected to it.
pub struct InputNode {
    id: NodeId,
    points: ConnectionPoints,
}

impl InputNode {
    pub fn new(engine: &Engine) -> Arc<Self> {
        let id = engine.allocate_node_id();
        Arc::new(Self {
            id,
            points: ConnectionPoints::new(engine, id),
        })
    }
}

impl Node for InputNode {
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

impl fmt::Debug for InputNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputNode").field("id", &self.id).finish()
    }
}
