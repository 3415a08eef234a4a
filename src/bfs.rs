use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Bfs;

use super::graph::FrameId;

// BFS traversal of the parent -> child frame graph
// Returns frame ids in the order they were visited
// every parent frame is visited before its children
pub(super) fn bfs<E>(graph: &DiGraphMap<FrameId, E>, start: FrameId) -> Vec<FrameId> {
    let mut bfs = Bfs::new(graph, start);
    let mut order = Vec::new();
    while let Some(frame) = bfs.next(graph) {
        order.push(frame);
    }
    order
}
