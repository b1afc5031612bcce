#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Agent system: the worker state machine and the pool that drives it.
//!
//! Each tick an agent either sleeps, claims a job, walks towards the current
//! step of its job, or applies work to it. Routes come from the navigation
//! system and arrive asynchronously; an agent waiting for one stays in
//! [`AgentActivity::Routing`](colony_core::AgentActivity::Routing).

mod agent;

use std::collections::{BTreeMap, BTreeSet};

use colony_core::{AgentId, CellCoord, Event};
use colony_system_navigation::{Navigation, PathResult};
use colony_world::World;
use tracing::debug;

pub use agent::{Agent, AgentRecord};

/// Tuning of agent behaviour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentConfig {
    /// Cells travelled per second on ground of cost 1.
    pub speed: f32,
    /// Energy spent per second of work.
    pub energy_drain: f32,
    /// Factor applied to the drain rate while resting in bed.
    pub rest_multiplier: f32,
}

impl AgentConfig {
    /// Creates a configuration with the provided travel speed and drain rate.
    #[must_use]
    pub const fn new(speed: f32, energy_drain: f32) -> Self {
        Self {
            speed,
            energy_drain,
            rest_multiplier: 2.0,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new(2.0, 5.0)
    }
}

/// Owns every agent and raises their lifecycle events.
#[derive(Debug)]
pub struct AgentPool {
    config: AgentConfig,
    agents: BTreeMap<AgentId, Agent>,
    next_id: u32,
}

impl AgentPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            agents: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Recreates a pool from persisted agents, announcing each one.
    pub fn restore(config: AgentConfig, records: Vec<AgentRecord>, out: &mut Vec<Event>) -> Self {
        let mut pool = Self::new(config);
        for record in records {
            pool.next_id = pool.next_id.max(record.id.get().saturating_add(1));
            let agent = Agent::from_record(record);
            let _ = pool.agents.insert(agent.id(), agent);
        }
        out.extend(pool.agents.values().map(|agent| Event::AgentCreated {
            agent: agent.snapshot(),
        }));
        pool
    }

    /// Tuning shared by every agent.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Adds an agent standing on `cell`.
    pub fn spawn(&mut self, cell: CellCoord, out: &mut Vec<Event>) -> AgentId {
        let id = AgentId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let agent = Agent::new(id, cell);
        out.push(Event::AgentCreated {
            agent: agent.snapshot(),
        });
        let _ = self.agents.insert(id, agent);
        debug!(agent = id.get(), ?cell, "agent spawned");
        id
    }

    /// Removes an agent, handing its job back to the queue.
    pub fn despawn(&mut self, id: AgentId, world: &mut World, navigation: &mut Navigation) -> bool {
        let Some(mut agent) = self.agents.remove(&id) else {
            return false;
        };
        agent.detach(world, navigation);
        true
    }

    /// Hands finished path searches to their agents.
    pub fn deliver(&mut self, results: Vec<PathResult>) {
        for result in results {
            if let Some(agent) = self.agents.get_mut(&result.agent) {
                agent.accept_path(result.goal, result.path);
            }
        }
    }

    /// Advances every agent by `dt` seconds of scaled simulation time.
    pub fn tick(
        &mut self,
        dt: f32,
        world: &mut World,
        navigation: &mut Navigation,
        out: &mut Vec<Event>,
    ) {
        let ids: Vec<AgentId> = self.agents.keys().copied().collect();
        for id in ids {
            let taken_beds: BTreeSet<CellCoord> = self
                .agents
                .values()
                .filter(|other| other.id() != id)
                .filter_map(Agent::bed)
                .collect();
            let Some(agent) = self.agents.get_mut(&id) else {
                continue;
            };
            agent.tick(dt, &self.config, &taken_beds, world, navigation, out);
            out.push(Event::AgentUpdated {
                agent: agent.snapshot(),
            });
        }
    }

    /// Agent with the provided identifier.
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Every agent in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Number of agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the pool has no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Persisted form of every agent in identifier order.
    #[must_use]
    pub fn records(&self) -> Vec<AgentRecord> {
        self.agents.values().map(Agent::record).collect()
    }
}
