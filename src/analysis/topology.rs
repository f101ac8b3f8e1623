use crate::store::{DriverCatalog, DriverId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolveError {
    #[error("Cyclic dependency: {}", format_path(.path))]
    CyclicDependency { path: Vec<DriverId> },
}

fn format_path(path: &[DriverId]) -> String {
    path.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(" -> ")
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    None,
    Visiting,
    Visited,
}

/// Orders the catalog so every dependency precedes its dependents.
///
/// Depth-first post-order over an explicit stack, so deep chains cannot blow the
/// call stack. Roots are taken in catalog order and dependencies in declared
/// order, which makes the result reproducible for identical input. Declared
/// dependencies that are not in the catalog are ignored here; they fail at
/// evaluation time instead.
///
/// A cycle aborts the whole resolution: no partial order is returned.
pub fn sort(catalog: &DriverCatalog) -> Result<Vec<DriverId>, ResolveError> {
    let drivers = catalog.drivers();
    let count = drivers.len();
    let mut order = Vec::with_capacity(count);
    let mut state = vec![VisitState::None; count];
    // (driver index, next dependency cursor)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..count {
        if state[root] != VisitState::None {
            continue;
        }
        state[root] = VisitState::Visiting;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (idx, cursor) = *frame;
            let deps = &drivers[idx].dependencies;

            if cursor == deps.len() {
                state[idx] = VisitState::Visited;
                order.push(drivers[idx].id.clone());
                stack.pop();
                continue;
            }
            frame.1 += 1;

            let Some(dep) = catalog.position(&deps[cursor]) else { continue };
            match state[dep] {
                VisitState::Visited => {}
                VisitState::Visiting => {
                    let start = stack.iter().position(|&(i, _)| i == dep).unwrap_or(0);
                    let mut path: Vec<DriverId> = stack[start..].iter().map(|&(i, _)| drivers[i].id.clone()).collect();
                    path.push(drivers[dep].id.clone());
                    return Err(ResolveError::CyclicDependency { path });
                }
                VisitState::None => {
                    state[dep] = VisitState::Visiting;
                    stack.push((dep, 0));
                }
            }
        }
    }

    Ok(order)
}

/// Every driver whose value may change when any of `changed` changes,
/// including the changed drivers themselves.
pub fn downstream_of(catalog: &DriverCatalog, changed: &[DriverId]) -> BTreeSet<DriverId> {
    let drivers = catalog.drivers();
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(drivers.len(), 0);
    let nodes: Vec<NodeIndex> = (0..drivers.len()).map(|i| graph.add_node(i)).collect();

    // Edges point from dependency to dependent.
    for (i, driver) in drivers.iter().enumerate() {
        for dep in &driver.dependencies {
            if let Some(d) = catalog.position(dep) {
                graph.add_edge(nodes[d], nodes[i], ());
            }
        }
    }

    let mut affected = BTreeSet::new();
    for id in changed {
        let Some(start) = catalog.position(id) else { continue };
        let mut bfs = Bfs::new(&graph, nodes[start]);
        while let Some(node) = bfs.next(&graph) {
            affected.insert(drivers[graph[node]].id.clone());
        }
    }
    affected
}
