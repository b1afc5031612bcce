//! Worker state machine.

use std::collections::{BTreeSet, VecDeque};

use colony_core::{
    AgentActivity, AgentId, AgentSnapshot, CellCoord, Event, JobId, Position, MAX_ENERGY,
};
use colony_system_navigation::Navigation;
use colony_world::{query, WorkOutcome, World};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::AgentConfig;

/// Persisted form of an agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Identifier of the agent.
    pub id: AgentId,
    /// Continuous position.
    pub position: Position,
    /// Job held by the agent.
    pub job: Option<JobId>,
    /// Remaining energy.
    pub energy: f32,
    /// Whether the agent must sleep before working again.
    pub needs_sleep: bool,
    /// Base cell of the agent's bed.
    pub bed: Option<CellCoord>,
    /// Waypoints still to walk.
    pub path: Vec<CellCoord>,
    /// Cell the agent is heading to.
    pub target: Option<CellCoord>,
}

/// Autonomous worker.
#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    id: AgentId,
    position: Position,
    energy: f32,
    needs_sleep: bool,
    bed: Option<CellCoord>,
    job: Option<JobId>,
    path: VecDeque<CellCoord>,
    target: Option<CellCoord>,
    activity: AgentActivity,
}

impl Agent {
    pub(crate) fn new(id: AgentId, cell: CellCoord) -> Self {
        Self {
            id,
            position: Position::at_cell(cell),
            energy: MAX_ENERGY,
            needs_sleep: false,
            bed: None,
            job: None,
            path: VecDeque::new(),
            target: None,
            activity: AgentActivity::Idle,
        }
    }

    pub(crate) fn from_record(record: AgentRecord) -> Self {
        Self {
            id: record.id,
            position: record.position,
            energy: record.energy.clamp(0.0, MAX_ENERGY),
            needs_sleep: record.needs_sleep,
            bed: record.bed,
            job: record.job,
            path: record.path.into(),
            target: record.target,
            activity: AgentActivity::Idle,
        }
    }

    /// Persisted form of the agent.
    #[must_use]
    pub fn record(&self) -> AgentRecord {
        AgentRecord {
            id: self.id,
            position: self.position,
            job: self.job,
            energy: self.energy,
            needs_sleep: self.needs_sleep,
            bed: self.bed,
            path: self.path.iter().copied().collect(),
            target: self.target,
        }
    }

    /// Externally visible state of the agent.
    #[must_use]
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            position: self.position,
            energy: self.energy,
            needs_sleep: self.needs_sleep,
            activity: self.activity,
            job: self.job,
            target: self.target,
        }
    }

    /// Identifier of the agent.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Continuous position.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Remaining energy.
    #[must_use]
    pub const fn energy(&self) -> f32 {
        self.energy
    }

    /// Whether the agent must sleep before working again.
    #[must_use]
    pub const fn needs_sleep(&self) -> bool {
        self.needs_sleep
    }

    /// Base cell of the agent's bed.
    #[must_use]
    pub const fn bed(&self) -> Option<CellCoord> {
        self.bed
    }

    /// Job held by the agent.
    #[must_use]
    pub const fn job(&self) -> Option<JobId> {
        self.job
    }

    /// Cell the agent is heading to.
    #[must_use]
    pub const fn target(&self) -> Option<CellCoord> {
        self.target
    }

    /// Current activity.
    #[must_use]
    pub const fn activity(&self) -> AgentActivity {
        self.activity
    }

    /// Waypoints still to walk.
    pub fn path(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.path.iter().copied()
    }

    pub(crate) fn accept_path(&mut self, goal: CellCoord, path: Vec<CellCoord>) {
        if self.target != Some(goal) {
            return;
        }
        trace!(agent = self.id.get(), waypoints = path.len(), "path delivered");
        self.path = path.into();
    }

    /// Hands back the held job and any outstanding search.
    pub(crate) fn detach(&mut self, world: &mut World, navigation: &mut Navigation) {
        if let Some(job) = self.job.take() {
            world.release_job(job);
        }
        navigation.forget(self.id);
        self.path.clear();
        self.target = None;
    }

    pub(crate) fn tick(
        &mut self,
        dt: f32,
        config: &AgentConfig,
        taken_beds: &BTreeSet<CellCoord>,
        world: &mut World,
        navigation: &mut Navigation,
        out: &mut Vec<Event>,
    ) {
        if self.needs_sleep {
            self.sleep(dt, config, taken_beds, world, navigation);
            return;
        }

        if self.job.is_none() {
            self.activity = AgentActivity::Seeking;
            self.job = world.claim_job(self.id);
            if self.job.is_none() {
                self.activity = AgentActivity::Idle;
                return;
            }
        }
        let Some(job) = self.job else {
            return;
        };
        let Some(goal) = query::current_step(world, job).map(|step| step.cell()) else {
            debug!(agent = self.id.get(), job = job.get(), "held job vanished");
            self.job = None;
            self.activity = AgentActivity::Idle;
            return;
        };

        if self.position.exact_cell() != Some(goal) {
            self.travel(goal, dt, config, world, navigation);
            return;
        }

        self.activity = AgentActivity::Working;
        let outcome = world.work_job(job, dt, out);
        self.energy = (self.energy - config.energy_drain * dt).max(0.0);
        if self.energy <= 0.0 {
            self.needs_sleep = true;
            debug!(agent = self.id.get(), "agent exhausted");
        }
        match outcome {
            Some(WorkOutcome::JobCompleted { .. }) | None => {
                self.job = None;
                self.target = None;
                self.activity = AgentActivity::Idle;
            }
            Some(WorkOutcome::StepCompleted { .. } | WorkOutcome::InProgress) => {}
        }
    }

    fn sleep(
        &mut self,
        dt: f32,
        config: &AgentConfig,
        taken_beds: &BTreeSet<CellCoord>,
        world: &mut World,
        navigation: &mut Navigation,
    ) {
        if let Some(job) = self.job.take() {
            debug!(agent = self.id.get(), job = job.get(), "job abandoned for sleep");
            world.release_job(job);
        }

        let beds = query::grid(world).beds();
        if self.bed.is_some_and(|bed| !beds.contains(&bed)) {
            self.bed = None;
        }
        if self.bed.is_none() {
            self.bed = beds
                .iter()
                .copied()
                .find(|bed| !taken_beds.contains(bed));
        }

        let Some(bed) = self.bed else {
            self.target = None;
            self.path.clear();
            self.rest(dt * config.energy_drain);
            return;
        };

        if self.position.exact_cell() == Some(bed) {
            self.rest(dt * config.energy_drain * config.rest_multiplier);
            return;
        }

        self.travel(bed, dt, config, world, navigation);
        self.activity = AgentActivity::Sleeping;
    }

    fn rest(&mut self, amount: f32) {
        self.activity = AgentActivity::Resting;
        self.energy = (self.energy + amount).min(MAX_ENERGY);
        if self.energy >= MAX_ENERGY {
            self.needs_sleep = false;
            self.target = None;
            self.activity = AgentActivity::Idle;
        }
    }

    fn travel(
        &mut self,
        goal: CellCoord,
        dt: f32,
        config: &AgentConfig,
        world: &World,
        navigation: &mut Navigation,
    ) {
        if self.target != Some(goal) {
            self.target = Some(goal);
            self.path.clear();
            navigation.forget(self.id);
        }

        let grid = query::grid(world);
        if let Some(&next) = self.path.front() {
            if next != goal && !grid.is_walkable(next) {
                trace!(agent = self.id.get(), ?next, "stale path discarded");
                self.path.clear();
            }
        }

        let Some(&next) = self.path.front() else {
            self.activity = AgentActivity::Routing;
            if navigation.is_path_pending(self.id) {
                return;
            }
            match self.position.nearest_cell() {
                Some(start) if start == goal => self.path.push_back(goal),
                Some(start) => {
                    let _ = navigation.request_path(self.id, start, goal);
                }
                None => {}
            }
            return;
        };

        self.activity = AgentActivity::Traveling;
        let cost = match grid.movement_cost(next) {
            cost if cost > 0.0 => cost,
            _ => 1.0,
        };
        let waypoint = Position::at_cell(next);
        self.position = self.position.step_toward(waypoint, config.speed / cost * dt);
        if self.position == waypoint {
            let _ = self.path.pop_front();
        }
    }
}
