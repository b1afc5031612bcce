#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Navigation system: weighted graph, A* planner and background workers.
//!
//! [`Navigation`] reacts to `LayoutChanged` events by scheduling a rebuild of
//! the whole graph from a cost snapshot, and serves per-agent path searches
//! against whichever graph is published at request time. Neither kind of
//! work blocks the tick: results are drained by [`Navigation::poll`].

mod graph;
mod paths;
mod planner;
mod rebuild;

use std::sync::Arc;

use colony_core::{AgentId, CellCoord, Event};
use colony_world::World;

pub use graph::{CostField, Edge, NavigationGraph};
pub use paths::{PathResult, PathService};
pub use planner::find_path;
pub use rebuild::{Dispatch, GraphRebuilder};

/// Owns the published graph and both kinds of background work.
#[derive(Debug)]
pub struct Navigation {
    rebuilder: GraphRebuilder,
    paths: PathService,
}

impl Navigation {
    /// Creates the system with a graph built synchronously from `world`.
    #[must_use]
    pub fn new(dispatch: Dispatch, world: &World) -> Self {
        let initial = NavigationGraph::build(CostField::capture(world));
        Self {
            rebuilder: GraphRebuilder::new(dispatch, initial),
            paths: PathService::new(dispatch),
        }
    }

    /// Schedules a rebuild when the batch reports a layout change.
    pub fn handle(&mut self, events: &[Event], world: &World) {
        let changed = events
            .iter()
            .any(|event| matches!(event, Event::LayoutChanged { .. }));
        if changed {
            self.rebuilder.request(CostField::capture(world));
        }
    }

    /// Publishes finished rebuilds and returns finished path searches.
    pub fn poll(&mut self, out: &mut Vec<Event>) -> Vec<PathResult> {
        if let Some(revision) = self.rebuilder.poll() {
            out.push(Event::NavigationRebuilt { revision });
        }
        self.paths.poll()
    }

    /// Most recently published graph.
    #[must_use]
    pub fn graph(&self) -> Arc<NavigationGraph> {
        self.rebuilder.graph()
    }

    /// Whether a rebuild is in flight.
    #[must_use]
    pub fn is_rebuilding(&self) -> bool {
        self.rebuilder.is_computing()
    }

    /// Requests a route for `agent` against the current graph.
    ///
    /// Returns `false` when a search for the agent is already outstanding.
    pub fn request_path(&mut self, agent: AgentId, start: CellCoord, goal: CellCoord) -> bool {
        let graph = self.rebuilder.graph();
        self.paths.request(agent, graph, start, goal)
    }

    /// Whether a search for `agent` is outstanding.
    #[must_use]
    pub fn is_path_pending(&self, agent: AgentId) -> bool {
        self.paths.is_pending(agent)
    }

    /// Discards the outstanding search of `agent`.
    pub fn forget(&mut self, agent: AgentId) {
        self.paths.forget(agent);
    }
}
