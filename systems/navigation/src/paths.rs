//! Per-agent single-flight path searches.

use std::{
    collections::BTreeMap,
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc,
    },
};

use colony_core::{AgentId, CellCoord};
use tracing::trace;

use crate::{graph::NavigationGraph, planner, rebuild::Dispatch};

/// Finished search delivered back to the tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathResult {
    /// Agent that asked for the route.
    pub agent: AgentId,
    /// Goal the route was searched for.
    pub goal: CellCoord,
    /// Waypoints after the start cell; empty when unreachable.
    pub path: Vec<CellCoord>,
}

/// Runs path searches against graph snapshots and hands back results.
///
/// Each agent has at most one outstanding search. Results for agents that
/// were forgotten or retargeted in the meantime are dropped on delivery.
#[derive(Debug)]
pub struct PathService {
    dispatch: Dispatch,
    outstanding: BTreeMap<AgentId, CellCoord>,
    sender: Sender<PathResult>,
    receiver: Receiver<PathResult>,
}

impl PathService {
    /// Creates an idle service.
    #[must_use]
    pub fn new(dispatch: Dispatch) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            dispatch,
            outstanding: BTreeMap::new(),
            sender,
            receiver,
        }
    }

    /// Starts a search unless one is already outstanding for `agent`.
    pub fn request(
        &mut self,
        agent: AgentId,
        graph: Arc<NavigationGraph>,
        start: CellCoord,
        goal: CellCoord,
    ) -> bool {
        if self.outstanding.contains_key(&agent) {
            return false;
        }
        let _ = self.outstanding.insert(agent, goal);

        let sender = self.sender.clone();
        self.dispatch.run(move || {
            let path = planner::find_path(&graph, start, goal);
            let _ = sender.send(PathResult { agent, goal, path });
        });
        true
    }

    /// Whether a search for `agent` is outstanding.
    #[must_use]
    pub fn is_pending(&self, agent: AgentId) -> bool {
        self.outstanding.contains_key(&agent)
    }

    /// Drops the outstanding search of `agent`; its result will be ignored.
    pub fn forget(&mut self, agent: AgentId) {
        let _ = self.outstanding.remove(&agent);
    }

    /// Drains finished searches without blocking, in agent order.
    pub fn poll(&mut self) -> Vec<PathResult> {
        let mut delivered: Vec<PathResult> = Vec::new();
        while let Ok(result) = self.receiver.try_recv() {
            if self.outstanding.get(&result.agent) != Some(&result.goal) {
                trace!(agent = result.agent.get(), "superseded path dropped");
                continue;
            }
            let _ = self.outstanding.remove(&result.agent);
            delivered.push(result);
        }
        delivered.sort_by_key(|result| result.agent);
        delivered
    }
}
