//! Reference-frame graph: an arena of frames wired child -> parent by
//! rigid or joint-parameterized transforms.
//!
//! Graph construction is three strictly ordered passes over a canonical tree:
//!
//! 1. [`FrameGraphElement::declared_frames`] allocates one node per frame and
//!    returns a [`FrameRegistry`] mapping scoped names to node ids.
//! 2. [`FrameGraphElement::to_static_graph`] wires every frame to the frame its
//!    authored pose is expressed in.
//! 3. [`FrameGraphElement::to_dynamic_graph`] wires a second, freshly declared
//!    graph along kinematic connectivity, reading rigid offsets from the static
//!    graph (the [`Scaffolding`]).

use hashbrown::{HashMap, HashSet};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use tracing::{debug, warn};

use crate::bfs::bfs;
use crate::error::{Result, SdfError};
use crate::joint::JointType;
use crate::transform::{JointTransform, Transform};

/// Implicit root frame of a world.
pub const WORLD_FRAME: &str = "world";
/// Implicit frame of a model.
pub const MODEL_FRAME: &str = "__model__";

/// Handle of a frame node inside one [`FrameGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(usize);

impl FrameId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Transform carried by the edge between a frame and its parent.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEdge {
    Rigid(Transform),
    Joint(JointTransform),
    /// Joint type without a motion model: identity placeholder that keeps the
    /// graph connected but is kinematically wrong.
    Degraded(JointType),
}

impl FrameEdge {
    /// Child frame expressed in parent frame.
    pub fn transform(&self) -> Transform {
        match self {
            FrameEdge::Rigid(transform) => *transform,
            FrameEdge::Joint(joint) => joint.transform(),
            FrameEdge::Degraded(_) => Transform::identity(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, FrameEdge::Degraded(_))
    }
}

/// Arena of frames. Every frame has at most one parent, so each connected
/// component is a tree.
#[derive(Debug, Clone, Default)]
pub struct FrameGraph {
    names: Vec<String>,
    driven: Vec<bool>,
    // parent -> child, weight is the child expressed in the parent
    edges: DiGraphMap<FrameId, FrameEdge>,
}

impl FrameGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_frame(&mut self, name: impl Into<String>) -> FrameId {
        let id = FrameId(self.names.len());
        self.names.push(name.into());
        self.driven.push(false);
        self.edges.add_node(id);
        id
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.edge_count()
    }

    /// Fully scoped name, e.g. `robot::arm`.
    pub fn name(&self, id: FrameId) -> &str {
        self.names.get(id.0).map_or("<unknown>", String::as_str)
    }

    pub fn find(&self, name: &str) -> Option<FrameId> {
        self.names.iter().position(|n| n == name).map(FrameId)
    }

    pub(crate) fn rename(&mut self, id: FrameId, name: String) {
        if let Some(slot) = self.names.get_mut(id.0) {
            *slot = name;
        }
    }

    pub fn parent(&self, id: FrameId) -> Option<FrameId> {
        self.edges
            .neighbors_directed(id, Direction::Incoming)
            .next()
    }

    pub fn children(&self, id: FrameId) -> impl Iterator<Item = FrameId> + '_ {
        self.edges.neighbors_directed(id, Direction::Outgoing)
    }

    /// Edge between `child` and its parent.
    pub fn edge(&self, child: FrameId) -> Option<&FrameEdge> {
        let parent = self.parent(child)?;
        self.edges.edge_weight(parent, child)
    }

    /// Wire `child` under `parent`. `edge` expresses the child in the parent.
    pub fn attach(&mut self, child: FrameId, parent: FrameId, edge: FrameEdge) -> Result<()> {
        if let Some(existing) = self.parent(child) {
            return Err(SdfError::AlreadyAttached {
                child: self.name(child).to_string(),
                parent: self.name(existing).to_string(),
            });
        }
        let mut cursor = Some(parent);
        while let Some(frame) = cursor {
            if frame == child {
                return Err(SdfError::FrameCycle {
                    child: self.name(child).to_string(),
                    parent: self.name(parent).to_string(),
                });
            }
            cursor = self.parent(frame);
        }
        if let FrameEdge::Degraded(joint_type) = &edge {
            warn!(
                child = self.name(child),
                ?joint_type,
                "joint type has no motion model, using identity placeholder"
            );
        }
        self.edges.add_edge(parent, child, edge);
        Ok(())
    }

    fn edge_transform(&self, parent: FrameId, child: FrameId) -> Transform {
        self.edges
            .edge_weight(parent, child)
            .map(FrameEdge::transform)
            .unwrap_or_default()
    }

    /// Root of `id`'s tree and the pose of `id` expressed in it.
    fn pose_in_root(&self, id: FrameId) -> (FrameId, Transform) {
        let mut pose = Transform::identity();
        let mut cursor = id;
        while let Some(parent) = self.parent(cursor) {
            pose = self.edge_transform(parent, cursor) * pose;
            cursor = parent;
        }
        (cursor, pose)
    }

    /// Pose of `from` expressed in `to`.
    pub fn transform(&self, from: FrameId, to: FrameId) -> Result<Transform> {
        let (from_root, from_pose) = self.pose_in_root(from);
        let (to_root, to_pose) = self.pose_in_root(to);
        if from_root != to_root {
            return Err(SdfError::disconnected(self.name(from), self.name(to)));
        }
        Ok(to_pose.inverse() * from_pose)
    }

    /// Number of edges between `id` and the root of its tree.
    pub fn depth(&self, id: FrameId) -> usize {
        std::iter::successors(self.parent(id), |frame| self.parent(*frame)).count()
    }

    /// Set the state of the joint edge above `frame`, clamped to its limits.
    pub fn set_joint_position(&mut self, frame: FrameId, value: f64) -> Result<f64> {
        let name = self.name(frame).to_string();
        let parent = self.parent(frame).ok_or_else(|| SdfError::NotAJoint(name.clone()))?;
        match self.edges.edge_weight_mut(parent, frame) {
            Some(FrameEdge::Joint(joint)) => Ok(joint.set_position(value)),
            _ => Err(SdfError::NotAJoint(name)),
        }
    }

    pub fn joint_position(&self, frame: FrameId) -> Option<f64> {
        match self.edge(frame)? {
            FrameEdge::Joint(joint) => Some(joint.position()),
            _ => None,
        }
    }

    /// Child frames whose parent edge is a degraded placeholder.
    pub fn degraded_edges(&self) -> Vec<(FrameId, JointType)> {
        let mut degraded: Vec<_> = self
            .edges
            .all_edges()
            .filter_map(|(_, child, edge)| match edge {
                FrameEdge::Degraded(joint_type) => Some((child, *joint_type)),
                _ => None,
            })
            .collect();
        degraded.sort_by_key(|(child, _)| *child);
        degraded
    }

    /// Pose of every frame below `root`, expressed in `root`.
    pub fn poses_from(&self, root: FrameId) -> HashMap<FrameId, Transform> {
        let mut poses: HashMap<FrameId, Transform> = HashMap::new();
        for frame in bfs(&self.edges, root) {
            let pose = match self.parent(frame) {
                Some(parent) if frame != root => {
                    let parent_pose = poses.get(&parent).copied().unwrap_or_default();
                    parent_pose * self.edge_transform(parent, frame)
                }
                _ => Transform::identity(),
            };
            poses.insert(frame, pose);
        }
        poses
    }

    /// Mark a frame as the child of a joint; its dynamic parent edge belongs
    /// to that joint.
    pub(crate) fn mark_driven(&mut self, id: FrameId) {
        if let Some(flag) = self.driven.get_mut(id.0) {
            *flag = true;
        }
    }

    pub(crate) fn is_driven(&self, id: FrameId) -> bool {
        self.driven.get(id.0).copied().unwrap_or(false)
    }
}

/// Scoped names of declared frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameRegistry {
    frames: HashMap<String, FrameId>,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, id: FrameId) -> Result<()> {
        let name = name.into();
        if self.frames.contains_key(&name) {
            return Err(SdfError::DuplicateFrame(name));
        }
        self.frames.insert(name, id);
        Ok(())
    }

    /// Id of a declared frame; fails when declaration was skipped.
    pub fn get(&self, name: &str) -> Result<FrameId> {
        self.frames
            .get(name)
            .copied()
            .ok_or_else(|| SdfError::UndeclaredFrame(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Declared names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.frames.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn extend(&mut self, other: FrameRegistry) -> Result<()> {
        for (name, id) in other.frames {
            self.declare(name, id)?;
        }
        Ok(())
    }

    /// Re-key a nested model's frames as `prefix::name` and expose its model
    /// frame as `prefix`.
    pub(crate) fn nest(
        &mut self,
        prefix: &str,
        child: FrameRegistry,
        graph: &mut FrameGraph,
    ) -> Result<()> {
        let model_frame = child.get(MODEL_FRAME)?;
        let mut renamed = HashSet::new();
        for (name, id) in child.frames {
            if renamed.insert(id) {
                let full = format!("{prefix}::{}", graph.name(id));
                graph.rename(id, full);
            }
            self.declare(format!("{prefix}::{name}"), id)?;
        }
        self.declare(prefix, model_frame)
    }

    /// View of the frames under `prefix::`, with the prefix stripped and the
    /// world frame threaded through.
    pub fn scope(&self, prefix: &str) -> FrameRegistry {
        let head = format!("{prefix}::");
        let mut frames: HashMap<String, FrameId> = self
            .frames
            .iter()
            .filter_map(|(name, id)| {
                name.strip_prefix(head.as_str())
                    .map(|rest| (rest.to_string(), *id))
            })
            .collect();
        if let Some(world) = self.frames.get(WORLD_FRAME) {
            frames.entry(WORLD_FRAME.to_string()).or_insert(*world);
        }
        FrameRegistry { frames }
    }
}

/// Read-only static graph consulted for rigid offsets while the dynamic
/// graph is being wired.
#[derive(Debug, Clone)]
pub struct Scaffolding<'g> {
    graph: &'g FrameGraph,
    frames: FrameRegistry,
}

impl<'g> Scaffolding<'g> {
    pub fn new(graph: &'g FrameGraph, frames: FrameRegistry) -> Self {
        Self { graph, frames }
    }

    pub fn scope(&self, prefix: &str) -> Scaffolding<'g> {
        Scaffolding {
            graph: self.graph,
            frames: self.frames.scope(prefix),
        }
    }

    /// Authored pose of `child` expressed in `parent`.
    pub fn offset(&self, child: &str, parent: &str) -> Result<Transform> {
        self.graph
            .transform(self.frames.get(child)?, self.frames.get(parent)?)
    }
}

/// Rigidly wire `child` to `parent` in the dynamic graph at their authored offset.
pub(crate) fn attach_rigid(
    frames: &FrameRegistry,
    graph: &mut FrameGraph,
    scaffolding: &Scaffolding<'_>,
    child: &str,
    parent: &str,
) -> Result<()> {
    let offset = scaffolding.offset(child, parent)?;
    debug!(child, parent, "wiring dynamic rigid edge");
    graph.attach(frames.get(child)?, frames.get(parent)?, FrameEdge::Rigid(offset))
}

/// The frame-graph protocol implemented by every element that owns frames.
pub trait FrameGraphElement {
    /// Allocate a fresh node for every frame this element owns. Calling it
    /// twice yields distinct nodes.
    fn declared_frames(&self, graph: &mut FrameGraph) -> Result<FrameRegistry>;

    /// Wire the element's frames along their authored poses.
    fn to_static_graph(&self, frames: &FrameRegistry, graph: &mut FrameGraph) -> Result<FrameId>;

    /// Wire the element's frames along kinematic connectivity.
    fn to_dynamic_graph(
        &self,
        frames: &FrameRegistry,
        graph: &mut FrameGraph,
        scaffolding: &Scaffolding<'_>,
    ) -> Result<FrameId>;
}

/// Static and dynamic graphs of one element, built in the required order.
#[derive(Debug, Clone)]
pub struct FrameGraphs {
    pub static_graph: FrameGraph,
    pub static_frames: FrameRegistry,
    pub dynamic_graph: FrameGraph,
    pub dynamic_frames: FrameRegistry,
}

impl FrameGraphs {
    pub fn build<E: FrameGraphElement>(element: &E) -> Result<Self> {
        let mut static_graph = FrameGraph::new();
        let static_frames = element.declared_frames(&mut static_graph)?;
        element.to_static_graph(&static_frames, &mut static_graph)?;

        let mut dynamic_graph = FrameGraph::new();
        let dynamic_frames = element.declared_frames(&mut dynamic_graph)?;
        let scaffolding = Scaffolding::new(&static_graph, static_frames.clone());
        element.to_dynamic_graph(&dynamic_frames, &mut dynamic_graph, &scaffolding)?;

        Ok(Self {
            static_graph,
            static_frames,
            dynamic_graph,
            dynamic_frames,
        })
    }

    /// Authored pose of `from` expressed in `to`.
    pub fn static_transform(&self, from: &str, to: &str) -> Result<Transform> {
        self.static_graph
            .transform(self.static_frames.get(from)?, self.static_frames.get(to)?)
    }

    /// Current pose of `from` expressed in `to`, joint states included.
    pub fn dynamic_transform(&self, from: &str, to: &str) -> Result<Transform> {
        self.dynamic_graph
            .transform(self.dynamic_frames.get(from)?, self.dynamic_frames.get(to)?)
    }

    /// Set the angle or displacement of a scoped joint, e.g. `robot::hinge`.
    pub fn set_joint_position(&mut self, joint: &str, value: f64) -> Result<f64> {
        let staging = self.dynamic_frames.get(&format!("{joint}_child"))?;
        self.dynamic_graph.set_joint_position(staging, value)
    }
}
