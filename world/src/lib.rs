#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state of the colony.
//!
//! The [`World`] owns the tile grid, the colony inventory, the job register
//! and the template registry. Adapters mutate it through [`apply`]; systems
//! read it through [`query`] and drive jobs through the claim/work methods.

mod grid;
mod inventory;
mod jobs;
mod snapshot;
mod tiles;

use colony_core::{
    AgentId, CellCoord, Command, Event, JobId, PlacementError, ResourceTable, Rotation, TileId,
    TileKind, WorldLayer,
};
use tracing::{debug, trace, warn};

pub use grid::{WorldGrid, WorldTile};
pub use inventory::Inventory;
pub use jobs::{Job, JobEffect, JobQueue, JobRejected, JobStep, WorkOutcome};
pub use snapshot::{SnapshotError, TileRecord, WorldSnapshot};
pub use tiles::{Growth, TemplateRegistry, TileBehavior, TileTemplate, Workshop, GRASS, RESERVED};

use tiles::TickAction;

const DEFAULT_DEMOLISH_SECONDS: f32 = 1.0;

/// Represents the authoritative colony world state.
#[derive(Debug)]
pub struct World {
    grid: WorldGrid,
    inventory: Inventory,
    jobs: JobQueue,
    templates: TemplateRegistry,
    tick_index: u64,
}

impl World {
    /// Creates a grass-covered world using the standard template registry.
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        let templates = TemplateRegistry::standard();
        let grid = match templates.get(GRASS) {
            Some(terrain) => WorldGrid::new(columns, rows, terrain),
            None => WorldGrid::empty(columns, rows),
        };
        Self::from_parts(grid, Inventory::new(), JobQueue::new(), templates, 0)
    }

    pub(crate) fn from_parts(
        grid: WorldGrid,
        inventory: Inventory,
        jobs: JobQueue,
        templates: TemplateRegistry,
        tick_index: u64,
    ) -> Self {
        Self {
            grid,
            inventory,
            jobs,
            templates,
            tick_index,
        }
    }

    fn template(&self, name: &str) -> Result<&TileTemplate, PlacementError> {
        self.templates.get(name).ok_or(PlacementError::UnknownTemplate)
    }

    /// Places a tile immediately, bypassing the job queue.
    pub fn place_tile(
        &mut self,
        template: &str,
        base: CellCoord,
        rotation: Rotation,
        out: &mut Vec<Event>,
    ) -> Result<TileId, PlacementError> {
        let template = self.template(template)?.clone();
        self.grid.place(base, &template, rotation, out)
    }

    /// Removes the tile covering `cell` on `layer`, crediting its yield.
    ///
    /// A workshop's outstanding job is cancelled along with it and whatever
    /// was charged for that job goes back to the inventory.
    pub fn remove_tile(
        &mut self,
        cell: CellCoord,
        layer: WorldLayer,
        out: &mut Vec<Event>,
    ) -> Option<TileId> {
        let orphaned = self.grid.get(cell, layer).and_then(WorldTile::current_job);
        let removed = self.grid.remove(cell, layer, &mut self.inventory, out)?;
        if let Some(job) = orphaned {
            self.cancel_job(job);
        }
        Some(removed)
    }

    fn cancel_job(&mut self, id: JobId) {
        let Some(job) = self.jobs.cancel(id) else {
            return;
        };
        if job.is_paid() {
            self.inventory.add(job.cost());
        }
        debug!(job = id.get(), paid = job.is_paid(), "job cancelled with its tile");
    }

    /// Replaces the terrain of a single cell.
    pub fn set_terrain(
        &mut self,
        cell: CellCoord,
        template: &str,
        out: &mut Vec<Event>,
    ) -> Result<TileId, PlacementError> {
        let template = self.template(template)?.clone();
        self.grid.set_terrain(cell, &template, out)
    }

    /// Validates a hypothetical placement, reserves its cells and queues the build.
    pub fn designate_build(
        &mut self,
        template: &str,
        base: CellCoord,
        rotation: Rotation,
        out: &mut Vec<Event>,
    ) -> Result<JobId, PlacementError> {
        let template = self.template(template)?.clone();
        let layer = template.layer();

        if self
            .jobs
            .conflict(&Job::build(&template, base, rotation))
            .is_some()
        {
            return Err(PlacementError::DuplicateJob);
        }
        let region = template.unrotated_footprint().with_rotation(rotation).region(base);
        if region.cells().any(|cell| self.grid.is_reserved(cell, layer)) {
            return Err(PlacementError::Reserved);
        }
        let rotation = self.grid.check_placement(base, &template, rotation)?;

        let placeholder = self.template(RESERVED)?.on_layer(layer);
        let mut reserved = Vec::new();
        for cell in region.cells() {
            match self.grid.place(cell, &placeholder, Rotation::Deg0, out) {
                Ok(_) => reserved.push(cell),
                Err(reason) => {
                    self.release_reservations(&reserved, layer, out);
                    return Err(reason);
                }
            }
        }

        match self
            .jobs
            .enqueue(Job::build(&template, base, rotation), self.tick_index, out)
        {
            Ok(job) => {
                debug!(job = job.get(), template = template.name(), ?base, "build designated");
                Ok(job)
            }
            Err(rejected) => {
                debug!(%rejected, "build designation rolled back");
                self.release_reservations(&reserved, layer, out);
                Err(PlacementError::DuplicateJob)
            }
        }
    }

    /// Marks the tile covering `cell` on `layer` for demolition and queues the job.
    pub fn designate_demolish(
        &mut self,
        cell: CellCoord,
        layer: WorldLayer,
        out: &mut Vec<Event>,
    ) -> Result<JobId, PlacementError> {
        if layer == WorldLayer::Terrain {
            return Err(PlacementError::TerrainLocked);
        }
        let Some(tile) = self
            .grid
            .get(cell, layer)
            .filter(|tile| tile.kind() != TileKind::Reserved)
        else {
            return Err(PlacementError::Missing);
        };
        let base = tile.base();
        let name = tile.template().to_owned();
        let work = self
            .templates
            .get(&name)
            .map_or(DEFAULT_DEMOLISH_SECONDS, TileTemplate::demolish_time);

        let job = Job::demolish(base, layer, work, &name);
        if self.jobs.conflict(&job).is_some() {
            return Err(PlacementError::DuplicateJob);
        }

        let marker = self.template(RESERVED)?.on_layer(WorldLayer::Designation);
        let _ = self.grid.place(base, &marker, Rotation::Deg0, out)?;
        match self.jobs.enqueue(job, self.tick_index, out) {
            Ok(job) => {
                debug!(job = job.get(), template = %name, ?base, "demolition designated");
                Ok(job)
            }
            Err(rejected) => {
                debug!(%rejected, "demolition designation rolled back");
                self.release_reservations(&[base], WorldLayer::Designation, out);
                Err(PlacementError::DuplicateJob)
            }
        }
    }

    fn release_reservations(&mut self, cells: &[CellCoord], layer: WorldLayer, out: &mut Vec<Event>) {
        for cell in cells {
            let is_placeholder = self
                .grid
                .get(*cell, layer)
                .is_some_and(|tile| tile.kind() == TileKind::Reserved);
            if is_placeholder {
                let _ = self.grid.remove(*cell, layer, &mut self.inventory, out);
            }
        }
    }

    /// Hands the next affordable job to `agent`.
    pub fn claim_job(&mut self, agent: AgentId) -> Option<JobId> {
        self.jobs.claim_next(agent, &mut self.inventory)
    }

    /// Returns a claimed job to the front of the queue.
    pub fn release_job(&mut self, job: JobId) {
        self.jobs.release(job);
    }

    /// Applies `amount` seconds of work to `job` and executes finished steps.
    pub fn work_job(&mut self, job: JobId, amount: f32, out: &mut Vec<Event>) -> Option<WorkOutcome> {
        let outcome = self.jobs.work(job, amount)?;
        match &outcome {
            WorkOutcome::InProgress => {}
            WorkOutcome::StepCompleted { step, effects } => {
                self.apply_effects(effects, &ResourceTable::new(), out);
                out.push(Event::JobStepCompleted { job, step: *step });
            }
            WorkOutcome::JobCompleted { effects, charged } => {
                self.apply_effects(effects, charged, out);
                debug!(job = job.get(), "job completed");
                out.push(Event::JobCompleted { job });
            }
        }
        Some(outcome)
    }

    fn apply_effects(&mut self, effects: &[JobEffect], charged: &ResourceTable, out: &mut Vec<Event>) {
        for effect in effects {
            match effect {
                JobEffect::InstallTile {
                    template,
                    base,
                    rotation,
                } => self.install(template, *base, *rotation, charged, out),
                JobEffect::RemoveTile { cell, layer } => {
                    let _ = self.remove_tile(*cell, *layer, out);
                }
                JobEffect::Credit(resources) => self.inventory.add(resources),
                JobEffect::ReleaseWorkshop { cell } => {
                    let workshop = self
                        .grid
                        .get(*cell, WorldLayer::Structure)
                        .filter(|tile| tile.kind().is_workshop())
                        .map(WorldTile::id);
                    if let Some(tile) = workshop.and_then(|id| self.grid.tile_mut(id)) {
                        tile.set_current_job(None);
                    }
                }
            }
        }
    }

    fn install(
        &mut self,
        name: &str,
        base: CellCoord,
        rotation: Rotation,
        charged: &ResourceTable,
        out: &mut Vec<Event>,
    ) {
        let template = match self.template(name) {
            Ok(template) => template.clone(),
            Err(reason) => {
                warn!(template = name, ?base, %reason, "finished build has no template");
                self.inventory.add(charged);
                return;
            }
        };
        if let Err(reason) = self.grid.place(base, &template, rotation, out) {
            warn!(template = name, ?base, %reason, "finished build could not be installed; refunding");
            let region = template.unrotated_footprint().with_rotation(rotation).region(base);
            let cells: Vec<CellCoord> = region.cells().collect();
            self.release_reservations(&cells, template.layer(), out);
            self.inventory.add(charged);
        }
    }

    /// Sets the remaining job count of the workshop covering `cell`.
    pub fn set_workshop_job_count(
        &mut self,
        cell: CellCoord,
        job_count: u32,
        out: &mut Vec<Event>,
    ) -> Result<(), PlacementError> {
        self.update_workshop(cell, out, |workshop| workshop.job_count = job_count)
    }

    /// Toggles continuous production of the workshop covering `cell`.
    pub fn set_workshop_continuous(
        &mut self,
        cell: CellCoord,
        continuous: bool,
        out: &mut Vec<Event>,
    ) -> Result<(), PlacementError> {
        self.update_workshop(cell, out, |workshop| workshop.continuous = continuous)
    }

    fn update_workshop(
        &mut self,
        cell: CellCoord,
        out: &mut Vec<Event>,
        update: impl FnOnce(&mut Workshop),
    ) -> Result<(), PlacementError> {
        let id = self
            .grid
            .get(cell, WorldLayer::Structure)
            .map(WorldTile::id)
            .ok_or(PlacementError::Missing)?;
        let workshop = self
            .grid
            .tile_mut(id)
            .and_then(|tile| tile.behavior_mut().workshop_mut())
            .ok_or(PlacementError::Missing)?;
        update(workshop);
        out.push(Event::TileMetadataChanged {
            tile: id,
            job_count: workshop.job_count,
            continuous: workshop.continuous,
        });
        Ok(())
    }

    /// Credits resources to the colony inventory.
    pub fn add_resources(&mut self, resources: &ResourceTable) {
        self.inventory.add(resources);
    }

    fn tick(&mut self, dt: f32, out: &mut Vec<Event>) {
        for (id, action) in self.grid.advance_tiles(dt) {
            match action {
                TickAction::Mature(form) => self.mature(id, &form, out),
                TickAction::ScheduleJob => self.schedule_workshop_job(id, out),
            }
        }
    }

    fn mature(&mut self, id: TileId, form: &str, out: &mut Vec<Event>) {
        let template = match self.template(form) {
            Ok(template) => template.clone(),
            Err(reason) => {
                warn!(tile = id.get(), form, %reason, "matured form is not registered");
                return;
            }
        };
        match self.grid.replace(id, &template, out) {
            Ok(replacement) => trace!(tile = id.get(), replacement = replacement.get(), form, "tile matured"),
            Err(reason) => warn!(tile = id.get(), form, %reason, "tile could not mature"),
        }
    }

    fn schedule_workshop_job(&mut self, id: TileId, out: &mut Vec<Event>) {
        let Some(tile) = self.grid.tile(id) else {
            return;
        };
        let base = tile.base();
        let job = match tile.kind() {
            TileKind::CraftingTable => Job::craft(base, tile.template()),
            TileKind::HarvestingTable => Job::harvest(base, tile.template()),
            _ => return,
        };

        let job = match self.jobs.enqueue(job, self.tick_index, out) {
            Ok(job) => job,
            Err(rejected) => {
                trace!(tile = id.get(), %rejected, "workshop job not scheduled");
                return;
            }
        };

        let Some(tile) = self.grid.tile_mut(id) else {
            return;
        };
        tile.set_current_job(Some(job));
        if let Some(workshop) = tile.behavior_mut().workshop_mut() {
            if !workshop.continuous {
                workshop.job_count = workshop.job_count.saturating_sub(1);
            }
            out.push(Event::TileMetadataChanged {
                tile: id,
                job_count: workshop.job_count,
                continuous: workshop.continuous,
            });
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });
            world.tick(dt.as_secs_f32(), out_events);
        }
        Command::PlaceTile {
            template,
            base,
            rotation,
        } => {
            if let Err(reason) = world.place_tile(&template, base, rotation, out_events) {
                out_events.push(Event::PlacementRejected {
                    template,
                    base,
                    reason,
                });
            }
        }
        Command::RemoveTile { cell, layer } => {
            let _ = world.remove_tile(cell, layer, out_events);
        }
        Command::SetTerrain { cell, template } => {
            if let Err(reason) = world.set_terrain(cell, &template, out_events) {
                out_events.push(Event::PlacementRejected {
                    template,
                    base: cell,
                    reason,
                });
            }
        }
        Command::DesignateBuild {
            template,
            base,
            rotation,
        } => {
            if let Err(reason) = world.designate_build(&template, base, rotation, out_events) {
                out_events.push(Event::PlacementRejected {
                    template,
                    base,
                    reason,
                });
            }
        }
        Command::DesignateDemolish { cell, layer } => {
            if let Err(reason) = world.designate_demolish(cell, layer, out_events) {
                let template = world
                    .grid
                    .get(cell, layer)
                    .map(|tile| tile.template().to_owned())
                    .unwrap_or_default();
                out_events.push(Event::PlacementRejected {
                    template,
                    base: cell,
                    reason,
                });
            }
        }
        Command::SetWorkshopJobCount { cell, job_count } => {
            if let Err(reason) = world.set_workshop_job_count(cell, job_count, out_events) {
                trace!(?cell, %reason, "job count ignored");
            }
        }
        Command::SetWorkshopContinuous { cell, continuous } => {
            if let Err(reason) = world.set_workshop_continuous(cell, continuous, out_events) {
                trace!(?cell, %reason, "continuous flag ignored");
            }
        }
        Command::AddResources { resources } => world.add_resources(&resources),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use colony_core::{CellCoord, JobId};

    use super::{Inventory, Job, JobQueue, JobStep, TemplateRegistry, World, WorldGrid};

    /// Provides read-only access to the tile grid.
    #[must_use]
    pub fn grid(world: &World) -> &WorldGrid {
        &world.grid
    }

    /// Provides read-only access to the colony inventory.
    #[must_use]
    pub fn inventory(world: &World) -> &Inventory {
        &world.inventory
    }

    /// Provides read-only access to the job register.
    #[must_use]
    pub fn jobs(world: &World) -> &JobQueue {
        &world.jobs
    }

    /// Registered job with the provided identifier.
    #[must_use]
    pub fn job(world: &World, id: JobId) -> Option<&Job> {
        world.jobs.job(id)
    }

    /// Step currently worked for the provided job.
    #[must_use]
    pub fn current_step(world: &World, id: JobId) -> Option<&JobStep> {
        world.jobs.job(id).and_then(Job::current_step)
    }

    /// Templates the world can instantiate.
    #[must_use]
    pub fn templates(world: &World) -> &TemplateRegistry {
        &world.templates
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Movement cost of every cell in row-major order.
    #[must_use]
    pub fn movement_costs(world: &World) -> Vec<f32> {
        let grid = &world.grid;
        (0..grid.rows())
            .flat_map(|row| (0..grid.columns()).map(move |column| CellCoord::new(column, row)))
            .map(|cell| grid.movement_cost(cell))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_core::ResourceKind;
    use std::time::Duration;

    fn tick(world: &mut World, seconds: f32, events: &mut Vec<Event>) {
        apply(
            world,
            Command::Tick {
                dt: Duration::from_secs_f32(seconds),
            },
            events,
        );
    }

    #[test]
    fn tick_advances_time() {
        let mut world = World::new(4, 4);
        let mut events = Vec::new();
        tick(&mut world, 0.5, &mut events);
        assert_eq!(query::tick_index(&world), 1);
        assert_eq!(
            events,
            vec![Event::TimeAdvanced {
                dt: Duration::from_secs_f32(0.5)
            }]
        );
    }

    #[test]
    fn rejected_placement_is_reported() {
        let mut world = World::new(4, 4);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceTile {
                template: "statue".to_owned(),
                base: CellCoord::new(0, 0),
                rotation: Rotation::Deg0,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::PlacementRejected {
                template: "statue".to_owned(),
                base: CellCoord::new(0, 0),
                reason: PlacementError::UnknownTemplate,
            }]
        );
    }

    #[test]
    fn designation_reserves_and_duplicate_is_rejected() {
        let mut world = World::new(6, 6);
        let mut events = Vec::new();
        let base = CellCoord::new(2, 2);
        let job = world
            .designate_build("wall", base, Rotation::Deg0, &mut events)
            .expect("designated");
        assert!(query::grid(&world).is_reserved(base, WorldLayer::Structure));
        assert!(events.iter().any(|event| matches!(
            event,
            Event::JobCreated { job: created, .. } if *created == job
        )));

        assert_eq!(
            world.designate_build("wall", base, Rotation::Deg0, &mut events),
            Err(PlacementError::DuplicateJob)
        );
        assert_eq!(query::jobs(&world).len(), 1);
    }

    #[test]
    fn finished_build_installs_tile_and_clears_reservation() {
        let mut world = World::new(6, 6);
        let mut events = Vec::new();
        world.add_resources(&ResourceTable::new().with(ResourceKind::Wood, 1));
        let base = CellCoord::new(1, 1);
        let job = world
            .designate_build("wall", base, Rotation::Deg0, &mut events)
            .expect("designated");
        assert_eq!(world.claim_job(AgentId::new(0)), Some(job));
        assert_eq!(query::inventory(&world).amount(ResourceKind::Wood), 0);

        assert_eq!(world.work_job(job, 1.0, &mut events), Some(WorkOutcome::InProgress));
        assert!(matches!(
            world.work_job(job, 1.0, &mut events),
            Some(WorkOutcome::JobCompleted { .. })
        ));

        let grid = query::grid(&world);
        assert_eq!(grid.get(base, WorldLayer::Structure).map(WorldTile::kind), Some(TileKind::Wall));
        assert!(!grid.is_reserved(base, WorldLayer::Structure));
        assert!(events.contains(&Event::JobCompleted { job }));
    }

    #[test]
    fn demolition_credits_yield_and_clears_marker() {
        let mut world = World::new(6, 6);
        let mut events = Vec::new();
        let cell = CellCoord::new(3, 3);
        let _ = world
            .place_tile("tree", cell, Rotation::Deg0, &mut events)
            .expect("tree placed");
        let job = world
            .designate_demolish(cell, WorldLayer::Structure, &mut events)
            .expect("designated");
        assert!(query::grid(&world).get(cell, WorldLayer::Designation).is_some());
        assert_eq!(
            world.designate_demolish(cell, WorldLayer::Structure, &mut events),
            Err(PlacementError::DuplicateJob)
        );

        assert_eq!(world.claim_job(AgentId::new(0)), Some(job));
        let _ = world.work_job(job, 10.0, &mut events);

        let grid = query::grid(&world);
        assert!(grid.get(cell, WorldLayer::Structure).is_none());
        assert!(grid.get(cell, WorldLayer::Designation).is_none());
        assert_eq!(query::inventory(&world).amount(ResourceKind::Wood), 3);
    }

    #[test]
    fn failed_install_refunds_cost() {
        let mut world = World::new(6, 6);
        let mut events = Vec::new();
        world.add_resources(&ResourceTable::new().with(ResourceKind::Wood, 1));
        let base = CellCoord::new(2, 2);
        let _ = world.place_tile("wall", CellCoord::new(2, 1), Rotation::Deg0, &mut events);
        let _ = world.place_tile("wall", CellCoord::new(2, 3), Rotation::Deg0, &mut events);
        let job = world
            .designate_build("door", base, Rotation::Deg0, &mut events)
            .expect("door designated");
        let _ = world.remove_tile(CellCoord::new(2, 1), WorldLayer::Structure, &mut events);
        let wood_after_demolition = query::inventory(&world).amount(ResourceKind::Wood);

        assert_eq!(world.claim_job(AgentId::new(0)), Some(job));
        let _ = world.work_job(job, 10.0, &mut events);

        let grid = query::grid(&world);
        assert!(grid.get(base, WorldLayer::Structure).is_none());
        assert!(!grid.is_reserved(base, WorldLayer::Structure));
        assert_eq!(
            query::inventory(&world).amount(ResourceKind::Wood),
            wood_after_demolition
        );
    }

    fn enclose(world: &mut World, min: u32, max: u32, events: &mut Vec<Event>) {
        for row in min..=max {
            for column in min..=max {
                let cell = CellCoord::new(column, row);
                let border = row == min || row == max || column == min || column == max;
                let template = if border { "wall" } else { "floor" };
                let _ = world
                    .place_tile(template, cell, Rotation::Deg0, events)
                    .expect("room tile placed");
            }
        }
    }

    #[test]
    fn workshop_schedules_jobs_until_count_runs_out() {
        let mut world = World::new(8, 8);
        let mut events = Vec::new();
        enclose(&mut world, 2, 6, &mut events);
        let cell = CellCoord::new(3, 4);
        let _ = world
            .place_tile("crafting_table", cell, Rotation::Deg0, &mut events)
            .expect("table placed indoors");
        events.clear();

        world
            .set_workshop_job_count(cell, 1, &mut events)
            .expect("workshop present");
        tick(&mut world, 0.1, &mut events);
        let created: Vec<JobId> = events
            .iter()
            .filter_map(|event| match event {
                Event::JobCreated { job, .. } => Some(*job),
                _ => None,
            })
            .collect();
        assert_eq!(created.len(), 1);
        let tile = query::grid(&world).get(cell, WorldLayer::Structure).expect("bench");
        assert_eq!(tile.current_job(), Some(created[0]));
        assert_eq!(
            tile.behavior().workshop().map(|workshop| workshop.job_count),
            Some(0)
        );

        tick(&mut world, 0.1, &mut events);
        assert_eq!(query::jobs(&world).len(), 1);
    }

    #[test]
    fn removing_a_workshop_cancels_its_job() {
        let mut world = World::new(8, 8);
        let mut events = Vec::new();
        enclose(&mut world, 2, 6, &mut events);
        let cell = CellCoord::new(3, 4);
        let _ = world
            .place_tile("harvesting_table", cell, Rotation::Deg0, &mut events)
            .expect("table placed indoors");
        world
            .set_workshop_job_count(cell, 1, &mut events)
            .expect("workshop present");
        tick(&mut world, 0.1, &mut events);
        let job = world.claim_job(AgentId::new(0)).expect("harvest scheduled");

        assert!(world
            .remove_tile(cell, WorldLayer::Structure, &mut events)
            .is_some());
        assert!(query::job(&world, job).is_none());
        assert_eq!(world.work_job(job, 10.0, &mut events), None);
        assert_eq!(query::inventory(&world).amount(ResourceKind::Food), 0);
        assert!(!events.contains(&Event::JobCompleted { job }));
    }

    #[test]
    fn demolished_crafting_table_refunds_its_charged_job() {
        let mut world = World::new(8, 8);
        let mut events = Vec::new();
        enclose(&mut world, 2, 6, &mut events);
        let cell = CellCoord::new(4, 3);
        let _ = world
            .place_tile("crafting_table", cell, Rotation::Deg0, &mut events)
            .expect("table placed indoors");
        world
            .set_workshop_job_count(cell, 1, &mut events)
            .expect("workshop present");
        tick(&mut world, 0.1, &mut events);
        world.add_resources(&ResourceTable::new().with(ResourceKind::Wood, 1));
        let craft = world.claim_job(AgentId::new(0)).expect("craft scheduled");
        assert_eq!(query::inventory(&world).amount(ResourceKind::Wood), 0);

        let demolish = world
            .designate_demolish(cell, WorldLayer::Structure, &mut events)
            .expect("designated");
        assert_eq!(world.claim_job(AgentId::new(1)), Some(demolish));
        let _ = world.work_job(demolish, 10.0, &mut events);

        assert!(query::job(&world, craft).is_none());
        let inventory = query::inventory(&world);
        assert_eq!(inventory.amount(ResourceKind::Planks), 0);
        // Refunded craft cost plus the table's own yield.
        assert_eq!(inventory.amount(ResourceKind::Wood), 2);
    }

    #[test]
    fn unaffordable_wall_waits_until_wood_arrives() {
        let mut world = World::new(5, 5);
        let mut events = Vec::new();
        let job = world
            .designate_build("wall", CellCoord::new(2, 2), Rotation::Deg0, &mut events)
            .expect("designated");

        assert_eq!(world.claim_job(AgentId::new(0)), None);
        assert_eq!(query::jobs(&world).pending().collect::<Vec<_>>(), vec![job]);
        assert_eq!(query::job(&world, job).and_then(Job::agent), None);

        world.add_resources(&ResourceTable::new().with(ResourceKind::Wood, 1));
        assert_eq!(world.claim_job(AgentId::new(0)), Some(job));
        assert_eq!(query::inventory(&world).amount(ResourceKind::Wood), 0);
        assert_eq!(
            query::job(&world, job).and_then(Job::agent),
            Some(AgentId::new(0))
        );
        assert!(query::jobs(&world).pending().next().is_none());
    }

    #[test]
    fn sapling_matures_into_tree() {
        let mut world = World::new(4, 4);
        let mut events = Vec::new();
        let cell = CellCoord::new(1, 1);
        let _ = world
            .place_tile("sapling", cell, Rotation::Deg0, &mut events)
            .expect("sapling placed");
        for _ in 0..31 {
            tick(&mut world, 1.0, &mut events);
        }
        let grid = query::grid(&world);
        assert_eq!(grid.get(cell, WorldLayer::Structure).map(WorldTile::kind), Some(TileKind::Tree));
    }
}
