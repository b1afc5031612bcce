//! Job register and FIFO claim queue.
//!
//! A [`Job`] is an ordered list of [`JobStep`]s. Each step carries the timed
//! work it needs and an ordered list of [`JobEffect`]s that the world applies
//! when the step finishes. The queue owns every registered job; agents only
//! hold identifiers.

use std::collections::{BTreeMap, VecDeque};

use colony_core::{
    AgentId, CellCoord, Event, JobId, JobStepKind, ResourceKind, ResourceTable, Rotation,
    WorldLayer,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{inventory::Inventory, tiles::TileTemplate};

const CRAFT_SECONDS: f32 = 4.0;
const HARVEST_SETUP_SECONDS: f32 = 1.0;
const HARVEST_SECONDS: f32 = 3.0;
const HARVEST_FOOD: u32 = 2;

/// Mutation applied by the world when a step finishes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JobEffect {
    /// Installs a tile from the named template.
    InstallTile {
        /// Registry name of the template.
        template: String,
        /// Cell anchoring the footprint.
        base: CellCoord,
        /// Footprint rotation.
        rotation: Rotation,
    },
    /// Removes the tile covering the cell on the layer, crediting its yield.
    RemoveTile {
        /// Any cell covered by the tile.
        cell: CellCoord,
        /// Layer of the tile.
        layer: WorldLayer,
    },
    /// Credits resources to the inventory.
    Credit(ResourceTable),
    /// Clears the outstanding job of the workshop at the cell.
    ReleaseWorkshop {
        /// Any cell covered by the workshop.
        cell: CellCoord,
    },
}

/// Unit of timed work inside a job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobStep {
    kind: JobStepKind,
    cell: CellCoord,
    layer: WorldLayer,
    remaining: f32,
    complete: bool,
    indicator: String,
    effects: Vec<JobEffect>,
}

impl JobStep {
    /// Creates a pending step.
    #[must_use]
    pub fn new(
        kind: JobStepKind,
        cell: CellCoord,
        layer: WorldLayer,
        work: f32,
        indicator: &str,
        effects: Vec<JobEffect>,
    ) -> Self {
        Self {
            kind,
            cell,
            layer,
            remaining: work.max(0.0),
            complete: false,
            indicator: indicator.to_owned(),
            effects,
        }
    }

    /// Kind of work the step performs.
    #[must_use]
    pub const fn kind(&self) -> JobStepKind {
        self.kind
    }

    /// Cell an agent must stand on to perform the step.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Layer the step acts on.
    #[must_use]
    pub const fn layer(&self) -> WorldLayer {
        self.layer
    }

    /// Seconds of work still required.
    #[must_use]
    pub const fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Whether the step has finished.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Template name shown while the step is pending.
    #[must_use]
    pub fn indicator(&self) -> &str {
        &self.indicator
    }

    /// Effects applied when the step finishes.
    #[must_use]
    pub fn effects(&self) -> &[JobEffect] {
        &self.effects
    }

    /// Slot two jobs may not target at the same time.
    ///
    /// Demolition is keyed on the designation layer so it never collides
    /// with construction of the same cell.
    #[must_use]
    pub const fn conflict_key(&self) -> (CellCoord, WorldLayer) {
        match self.kind {
            JobStepKind::Demolish => (self.cell, WorldLayer::Designation),
            _ => (self.cell, self.layer),
        }
    }
}

/// Ordered list of steps plus the claim bookkeeping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    steps: Vec<JobStep>,
    current: usize,
    complete: bool,
    cost: ResourceTable,
    paid: bool,
    agent: Option<AgentId>,
    created_at: u64,
}

impl Job {
    /// Creates an unregistered job; the queue assigns its identifier.
    #[must_use]
    pub fn new(steps: Vec<JobStep>, cost: ResourceTable) -> Self {
        Self {
            id: JobId::new(0),
            steps,
            current: 0,
            complete: false,
            cost,
            paid: false,
            agent: None,
            created_at: 0,
        }
    }

    /// Single-step construction of `template` at `base`.
    #[must_use]
    pub fn build(template: &TileTemplate, base: CellCoord, rotation: Rotation) -> Self {
        let step = JobStep::new(
            JobStepKind::Build,
            base,
            template.layer(),
            template.build_time(),
            template.name(),
            vec![JobEffect::InstallTile {
                template: template.name().to_owned(),
                base,
                rotation,
            }],
        );
        Self::new(vec![step], template.construction_cost().clone())
    }

    /// Single-step demolition of the tile based at `cell` on `layer`.
    ///
    /// The designation marker at `cell` is cleared alongside the tile.
    #[must_use]
    pub fn demolish(cell: CellCoord, layer: WorldLayer, work: f32, indicator: &str) -> Self {
        let step = JobStep::new(
            JobStepKind::Demolish,
            cell,
            layer,
            work,
            indicator,
            vec![
                JobEffect::RemoveTile { cell, layer },
                JobEffect::RemoveTile {
                    cell,
                    layer: WorldLayer::Designation,
                },
            ],
        );
        Self::new(vec![step], ResourceTable::new())
    }

    /// Plank crafting at the table covering `cell`.
    #[must_use]
    pub fn craft(cell: CellCoord, indicator: &str) -> Self {
        let step = JobStep::new(
            JobStepKind::Craft,
            cell,
            WorldLayer::Structure,
            CRAFT_SECONDS,
            indicator,
            vec![
                JobEffect::Credit(ResourceTable::new().with(ResourceKind::Planks, 1)),
                JobEffect::ReleaseWorkshop { cell },
            ],
        );
        Self::new(
            vec![step],
            ResourceTable::new().with(ResourceKind::Wood, 1),
        )
    }

    /// Two-step food harvest: set-up at the table, then the harvest itself.
    #[must_use]
    pub fn harvest(cell: CellCoord, indicator: &str) -> Self {
        let setup = JobStep::new(
            JobStepKind::Craft,
            cell,
            WorldLayer::Structure,
            HARVEST_SETUP_SECONDS,
            indicator,
            Vec::new(),
        );
        let harvest = JobStep::new(
            JobStepKind::Harvest,
            cell,
            WorldLayer::Structure,
            HARVEST_SECONDS,
            indicator,
            vec![
                JobEffect::Credit(ResourceTable::new().with(ResourceKind::Food, HARVEST_FOOD)),
                JobEffect::ReleaseWorkshop { cell },
            ],
        );
        Self::new(vec![setup, harvest], ResourceTable::new())
    }

    /// Identifier assigned at registration.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Every step of the job.
    #[must_use]
    pub fn steps(&self) -> &[JobStep] {
        &self.steps
    }

    /// Step being worked, if the job is not complete.
    #[must_use]
    pub fn current_step(&self) -> Option<&JobStep> {
        if self.complete {
            return None;
        }
        self.steps.get(self.current)
    }

    /// Steps that still need work.
    pub fn remaining_steps(&self) -> impl Iterator<Item = &JobStep> {
        self.steps
            .iter()
            .skip(self.current)
            .filter(|step| !step.complete)
    }

    /// Whether every step finished.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Resources charged when the job is first claimed.
    #[must_use]
    pub fn cost(&self) -> &ResourceTable {
        &self.cost
    }

    /// Whether the cost has been debited.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        self.paid
    }

    /// Agent currently holding the job.
    #[must_use]
    pub const fn agent(&self) -> Option<AgentId> {
        self.agent
    }

    /// Tick index at which the job was registered.
    #[must_use]
    pub const fn created_at(&self) -> u64 {
        self.created_at
    }

    fn conflicts_with(&self, other: &Job) -> Option<(CellCoord, WorldLayer)> {
        self.remaining_steps()
            .map(JobStep::conflict_key)
            .find(|key| other.remaining_steps().any(|step| step.conflict_key() == *key))
    }
}

/// Reasons a job cannot be registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum JobRejected {
    /// A registered job already targets one of the job's slots.
    #[error("a registered job already targets {layer:?} at {cell:?}")]
    Duplicate {
        /// Contested cell.
        cell: CellCoord,
        /// Contested layer.
        layer: WorldLayer,
    },
    /// The job has no steps.
    #[error("job has no steps")]
    Empty,
}

/// Result of applying work to a job.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkOutcome {
    /// The current step needs more work.
    InProgress,
    /// A step finished and the job advanced to the next one.
    StepCompleted {
        /// Index of the finished step.
        step: usize,
        /// Effects of the finished step.
        effects: Vec<JobEffect>,
    },
    /// The final step finished and the job left the register.
    JobCompleted {
        /// Effects of the final step.
        effects: Vec<JobEffect>,
        /// Resources that were charged for the job.
        charged: ResourceTable,
    },
}

/// Register of incomplete jobs plus the FIFO of unclaimed ones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobQueue {
    jobs: BTreeMap<JobId, Job>,
    fifo: VecDeque<JobId>,
    next_id: u32,
}

impl JobQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `job` and appends it to the FIFO.
    ///
    /// Fails when any remaining step shares its conflict key with a remaining
    /// step of an already registered job.
    pub fn enqueue(
        &mut self,
        mut job: Job,
        created_at: u64,
        out: &mut Vec<Event>,
    ) -> Result<JobId, JobRejected> {
        let Some(first) = job.steps.first() else {
            return Err(JobRejected::Empty);
        };
        if let Some((cell, layer)) = self.conflict(&job) {
            debug!(?cell, ?layer, "duplicate job rejected");
            return Err(JobRejected::Duplicate { cell, layer });
        }

        let id = JobId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        out.push(Event::JobCreated {
            job: id,
            kind: first.kind,
            cell: first.cell,
            indicator: first.indicator.clone(),
        });

        job.id = id;
        job.created_at = created_at;
        job.agent = None;
        let _ = self.jobs.insert(id, job);
        self.fifo.push_back(id);
        Ok(id)
    }

    /// Slot `job` would contest with an already registered job.
    #[must_use]
    pub fn conflict(&self, job: &Job) -> Option<(CellCoord, WorldLayer)> {
        self.jobs
            .values()
            .filter(|registered| !registered.complete)
            .find_map(|registered| job.conflicts_with(registered))
    }

    /// Pops the front of the FIFO and hands it to `agent` if it is affordable.
    ///
    /// An unpaid job is charged exactly once here. When the inventory cannot
    /// cover it the job goes to the back of the FIFO and nothing is claimed.
    pub fn claim_next(&mut self, agent: AgentId, inventory: &mut Inventory) -> Option<JobId> {
        let id = self.fifo.pop_front()?;
        let job = self.jobs.get_mut(&id)?;
        if !job.paid {
            if !inventory.spend(&job.cost) {
                self.fifo.push_back(id);
                return None;
            }
            job.paid = true;
        }
        job.agent = Some(agent);
        debug!(job = id.get(), agent = agent.get(), "job claimed");
        Some(id)
    }

    /// Unassigns `job` and puts it at the front of the FIFO.
    pub fn release(&mut self, id: JobId) {
        let Some(job) = self.jobs.get_mut(&id) else {
            return;
        };
        if job.agent.take().is_some() && !self.fifo.contains(&id) {
            self.fifo.push_front(id);
            debug!(job = id.get(), "job released");
        }
    }

    /// Applies `amount` seconds of work to the current step of `job`.
    ///
    /// Returns `None` when the job is unknown.
    pub fn work(&mut self, id: JobId, amount: f32) -> Option<WorkOutcome> {
        let job = self.jobs.get_mut(&id)?;
        let index = job.current;
        let step = job.steps.get_mut(index)?;
        step.remaining -= amount.max(0.0);
        if step.remaining > 0.0 {
            return Some(WorkOutcome::InProgress);
        }

        step.remaining = 0.0;
        step.complete = true;
        let effects = step.effects.clone();
        job.current += 1;
        if job.current < job.steps.len() {
            return Some(WorkOutcome::StepCompleted {
                step: index,
                effects,
            });
        }

        job.complete = true;
        let charged = if job.paid {
            job.cost.clone()
        } else {
            ResourceTable::new()
        };
        let _ = self.jobs.remove(&id);
        self.fifo.retain(|queued| *queued != id);
        Some(WorkOutcome::JobCompleted { effects, charged })
    }

    /// Removes an unfinished job from the register.
    pub fn cancel(&mut self, id: JobId) -> Option<Job> {
        self.fifo.retain(|queued| *queued != id);
        self.jobs.remove(&id)
    }

    /// Registered job with the provided identifier.
    #[must_use]
    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    /// Every registered job in identifier order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    /// Unclaimed jobs in claim order.
    pub fn pending(&self) -> impl Iterator<Item = JobId> + '_ {
        self.fifo.iter().copied()
    }

    /// Number of registered jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether no job is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// First FIFO entry without a registered job.
    pub(crate) fn find_dangling(&self) -> Option<JobId> {
        self.fifo
            .iter()
            .copied()
            .find(|id| !self.jobs.contains_key(id))
    }
}
