#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Owning context of a running colony.
//!
//! A [`Colony`] is created once at simulation start and threaded through every
//! tick. It holds the world, the navigation system and the agent pool, and it
//! sequences them so that background results are drained before the world
//! advances and layout changes are forwarded to navigation afterwards.

use std::{
    collections::BTreeSet,
    io::{Read, Write},
    time::Duration,
};

use colony_core::{AgentId, CellCoord, Command, Event, JobId, PlacementError};
use colony_system_agents::{AgentConfig, AgentPool, AgentRecord};
use colony_system_navigation::{Dispatch, Navigation};
use colony_world::{self as world, query, Job, SnapshotError, World, WorldSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Configuration parameters required to start a colony.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColonyConfig {
    /// Grid width in cells. Ignored when restoring a snapshot.
    pub columns: u32,
    /// Grid height in cells. Ignored when restoring a snapshot.
    pub rows: u32,
    /// Factor applied to every wall-clock tick before it reaches the world.
    pub time_multiplier: f32,
    /// Where navigation work runs.
    pub dispatch: Dispatch,
    /// Agent tuning.
    pub agents: AgentConfig,
}

impl ColonyConfig {
    /// Creates a configuration for a grid of the provided size at normal speed.
    #[must_use]
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            rows,
            time_multiplier: 1.0,
            dispatch: Dispatch::Background,
            agents: AgentConfig::new(2.0, 5.0),
        }
    }

    /// Replaces the time multiplier.
    #[must_use]
    pub const fn with_time_multiplier(mut self, time_multiplier: f32) -> Self {
        self.time_multiplier = time_multiplier;
        self
    }

    /// Replaces the dispatch mode of navigation work.
    #[must_use]
    pub const fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Replaces the agent tuning.
    #[must_use]
    pub const fn with_agents(mut self, agents: AgentConfig) -> Self {
        self.agents = agents;
        self
    }
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self::new(64, 64)
    }
}

/// Logical state of a colony, independent of in-flight background work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColonySnapshot {
    /// Tiles, inventory and jobs.
    pub world: WorldSnapshot,
    /// Every agent in identifier order.
    pub agents: Vec<AgentRecord>,
    /// Ticks processed before the snapshot was taken.
    pub tick: u64,
}

/// Failures raised while saving or loading a colony.
#[derive(Debug, thiserror::Error)]
pub enum ColonyError {
    /// The snapshot bytes could not be encoded or decoded.
    #[error("snapshot codec failed: {0}")]
    Codec(#[from] bincode::Error),
    /// The decoded snapshot is inconsistent.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Running colony.
#[derive(Debug)]
pub struct Colony {
    config: ColonyConfig,
    world: World,
    navigation: Navigation,
    agents: AgentPool,
}

impl Colony {
    /// Starts a fresh grass-covered colony.
    #[must_use]
    pub fn new(config: ColonyConfig) -> Self {
        let world = World::new(config.columns, config.rows);
        let navigation = Navigation::new(config.dispatch, &world);
        info!(
            columns = config.columns,
            rows = config.rows,
            multiplier = config.time_multiplier,
            "colony started"
        );
        Self {
            config,
            world,
            navigation,
            agents: AgentPool::new(config.agents),
        }
    }

    /// Rebuilds a colony from its logical snapshot.
    ///
    /// Agents referencing jobs that are not registered are rejected. Claims
    /// that no restored agent backs up are handed back to the queue, and
    /// agents whose job is held by someone else drop it. Every restored agent
    /// is announced on `out`.
    pub fn restore(
        config: ColonyConfig,
        snapshot: ColonySnapshot,
        out: &mut Vec<Event>,
    ) -> Result<Self, ColonyError> {
        let ColonySnapshot {
            world,
            mut agents,
            tick,
        } = snapshot;
        let mut world = World::restore(world)?;
        if query::tick_index(&world) != tick {
            warn!(
                tick,
                world_tick = query::tick_index(&world),
                "snapshot tick disagrees with world"
            );
        }

        for record in &mut agents {
            let Some(job) = record.job else {
                continue;
            };
            let held_by = query::job(&world, job)
                .ok_or(SnapshotError::UnknownJob(job))?
                .agent();
            if held_by != Some(record.id) {
                warn!(agent = record.id.get(), job = job.get(), "agent dropped a claim it does not hold");
                record.job = None;
                record.target = None;
                record.path.clear();
            }
        }

        let holders: BTreeSet<(AgentId, JobId)> = agents
            .iter()
            .filter_map(|record| record.job.map(|job| (record.id, job)))
            .collect();
        let orphaned: Vec<JobId> = query::jobs(&world)
            .jobs()
            .filter(|job| {
                job.agent()
                    .is_some_and(|agent| !holders.contains(&(agent, job.id())))
            })
            .map(Job::id)
            .collect();
        for job in orphaned {
            debug!(job = job.get(), "orphaned claim returned to queue");
            world.release_job(job);
        }

        let navigation = Navigation::new(config.dispatch, &world);
        let agents = AgentPool::restore(config.agents, agents, out);
        info!(
            agents = agents.len(),
            jobs = query::jobs(&world).len(),
            "colony restored"
        );
        Ok(Self {
            config,
            world,
            navigation,
            agents,
        })
    }

    /// Decodes a snapshot from `reader` and restores it.
    pub fn load<R: Read>(
        config: ColonyConfig,
        reader: R,
        out: &mut Vec<Event>,
    ) -> Result<Self, ColonyError> {
        let snapshot: ColonySnapshot = bincode::deserialize_from(reader)?;
        Self::restore(config, snapshot, out)
    }

    /// Captures the logical state of the colony.
    #[must_use]
    pub fn snapshot(&self) -> ColonySnapshot {
        ColonySnapshot {
            world: self.world.snapshot(),
            agents: self.agents.records(),
            tick: query::tick_index(&self.world),
        }
    }

    /// Encodes the current snapshot into `writer`.
    pub fn save<W: Write>(&self, writer: W) -> Result<(), ColonyError> {
        bincode::serialize_into(writer, &self.snapshot())?;
        debug!(tick = query::tick_index(&self.world), "colony saved");
        Ok(())
    }

    /// Applies a command and forwards resulting layout changes to navigation.
    ///
    /// `Tick` commands run the full tick sequence of [`Colony::tick`].
    pub fn apply(&mut self, command: Command, out: &mut Vec<Event>) {
        if let Command::Tick { dt } = command {
            self.tick(dt, out);
            return;
        }
        let start = out.len();
        world::apply(&mut self.world, command, out);
        self.navigation.handle(&out[start..], &self.world);
    }

    /// Advances the colony by `dt` of wall-clock time.
    pub fn tick(&mut self, dt: Duration, out: &mut Vec<Event>) {
        let scaled = self.scale(dt);
        let start = out.len();
        let results = self.navigation.poll(out);
        self.agents.deliver(results);
        world::apply(&mut self.world, Command::Tick { dt: scaled }, out);
        self.agents.tick(
            scaled.as_secs_f32(),
            &mut self.world,
            &mut self.navigation,
            out,
        );
        self.navigation.handle(&out[start..], &self.world);
    }

    /// Adds an agent standing on `cell`.
    pub fn spawn_agent(
        &mut self,
        cell: CellCoord,
        out: &mut Vec<Event>,
    ) -> Result<AgentId, PlacementError> {
        if !query::grid(&self.world).in_bounds(cell) {
            return Err(PlacementError::OutOfBounds);
        }
        Ok(self.agents.spawn(cell, out))
    }

    /// Removes an agent, handing its job back to the queue.
    pub fn despawn_agent(&mut self, agent: AgentId) -> bool {
        self.agents
            .despawn(agent, &mut self.world, &mut self.navigation)
    }

    /// Configuration the colony runs with.
    #[must_use]
    pub const fn config(&self) -> &ColonyConfig {
        &self.config
    }

    /// Authoritative world state.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Every agent.
    #[must_use]
    pub const fn agents(&self) -> &AgentPool {
        &self.agents
    }

    /// Navigation system.
    #[must_use]
    pub const fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    fn scale(&self, dt: Duration) -> Duration {
        let seconds = dt.as_secs_f64() * f64::from(self.config.time_multiplier);
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
    }
}
