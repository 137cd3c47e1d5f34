//! Topology-first navigation over a single edge set.
//!
//! Queries never look at coordinates: they walk `strip`, `surface` or
//! `region` adjacency in ascending neighbor order, so results are
//! deterministic for a given graph.

use std::collections::{BTreeSet, VecDeque};

use crate::store::{MultiGraphStore, NodeStore};
use crate::types::{EdgeSet, NodeId};

/// Breadth-first order from `start`, optionally bounded by hop depth.
///
/// `start` is always the first element, even when it has no edges.
pub fn breadth_first(
    graph: &MultiGraphStore,
    set: EdgeSet,
    start: NodeId,
    max_depth: Option<usize>,
) -> Vec<NodeId> {
    let edges = graph.edge_set(set);
    let mut order = Vec::new();
    let mut visited = BTreeSet::from([start]);
    let mut queue = VecDeque::from([(start, 0usize)]);

    while let Some((node, depth)) = queue.pop_front() {
        order.push(node);
        if max_depth.is_some_and(|max| depth >= max) {
            continue;
        }
        for &neighbor in edges.neighbors_ref(node).into_iter().flatten() {
            if visited.insert(neighbor) {
                queue.push_back((neighbor, depth + 1));
            }
        }
    }
    order
}

/// Fewest-hop path from `start` to `goal`, inclusive of both ends.
///
/// Returns `None` when `goal` is unreachable within `set`.
pub fn shortest_hop_path(
    graph: &MultiGraphStore,
    set: EdgeSet,
    start: NodeId,
    goal: NodeId,
) -> Option<Vec<NodeId>> {
    if start == goal {
        return Some(vec![start]);
    }
    let edges = graph.edge_set(set);
    let mut visited = BTreeSet::from([start]);
    let mut queue = VecDeque::from([vec![start]]);

    while let Some(path) = queue.pop_front() {
        let current = *path.last()?;
        for &neighbor in edges.neighbors_ref(current).into_iter().flatten() {
            if !visited.insert(neighbor) {
                continue;
            }
            let mut next = path.clone();
            next.push(neighbor);
            if neighbor == goal {
                return Some(next);
            }
            queue.push_back(next);
        }
    }
    None
}

/// Active nodes that sit on a boundary between the listed regions.
///
/// A node qualifies when it belongs to one listed region and has a
/// `surface` neighbor tagged with a different listed region.
pub fn region_boundary(nodes: &NodeStore, graph: &MultiGraphStore, regions: &[&str]) -> Vec<NodeId> {
    let region_of = |id: NodeId| {
        nodes
            .get(id)
            .ok()
            .filter(|n| n.active)
            .and_then(|n| n.metadata.region.as_deref())
            .filter(|r| regions.contains(r))
    };

    let mut boundary = BTreeSet::new();
    for node in nodes.list_active() {
        let Some(own) = region_of(node.id) else {
            continue;
        };
        let crosses = graph
            .neighbors(EdgeSet::Surface, node.id)
            .into_iter()
            .any(|n| region_of(n).is_some_and(|r| r != own));
        if crosses {
            boundary.insert(node.id);
        }
    }
    boundary.into_iter().collect()
}

/// Connected components of `set` restricted to `members`.
///
/// Each component is sorted; components are ordered by their smallest
/// member. Members without edges form singleton components.
pub fn connected_components(
    graph: &MultiGraphStore,
    set: EdgeSet,
    members: &BTreeSet<NodeId>,
) -> Vec<Vec<NodeId>> {
    let edges = graph.edge_set(set);
    let mut seen = BTreeSet::new();
    let mut components = Vec::new();

    for &root in members {
        if !seen.insert(root) {
            continue;
        }
        let mut component = vec![root];
        let mut queue = VecDeque::from([root]);
        while let Some(node) = queue.pop_front() {
            for &neighbor in edges.neighbors_ref(node).into_iter().flatten() {
                if members.contains(&neighbor) && seen.insert(neighbor) {
                    component.push(neighbor);
                    queue.push_back(neighbor);
                }
            }
        }
        component.sort();
        components.push(component);
    }
    components
}
