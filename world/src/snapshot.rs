//! Logical snapshot of the world and its restoration.

use colony_core::{CellCoord, JobId, Rotation, WorldLayer};
use serde::{Deserialize, Serialize};

use crate::{
    grid::{RestoreConflict, WorldGrid},
    inventory::Inventory,
    jobs::JobQueue,
    tiles::{TemplateRegistry, Workshop},
    World,
};

/// Persisted form of one placed tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    /// Registry name of the template.
    pub template: String,
    /// Layer the tile occupies.
    pub layer: WorldLayer,
    /// Origin cell of the footprint.
    pub base: CellCoord,
    /// Footprint rotation.
    pub rotation: Rotation,
    /// Remaining growth time of a sapling.
    pub growth_timer: Option<f32>,
    /// Production settings of a workshop.
    pub workshop: Option<Workshop>,
    /// Production job the tile is waiting on.
    pub current_job: Option<JobId>,
}

/// Persisted form of the whole world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Grid width in cells.
    pub columns: u32,
    /// Grid height in cells.
    pub rows: u32,
    /// Ticks processed before the snapshot was taken.
    pub tick_index: u64,
    /// Every placed tile, terrain included.
    pub tiles: Vec<TileRecord>,
    /// Colony inventory.
    pub inventory: Inventory,
    /// Registered jobs in claim order.
    pub jobs: JobQueue,
}

/// Reasons a snapshot cannot be restored.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    /// A record names a template that is not registered.
    #[error("tile template `{0}` is not registered")]
    UnknownTemplate(String),
    /// A record extends beyond the grid.
    #[error("tile based at {0:?} extends beyond the grid")]
    OutOfBounds(CellCoord),
    /// Two records claim the same cell and layer.
    #[error("two tiles occupy {layer:?} at {cell:?}")]
    Overlap {
        /// Contested cell.
        cell: CellCoord,
        /// Contested layer.
        layer: WorldLayer,
    },
    /// A cell has no terrain tile.
    #[error("cell {0:?} has no terrain")]
    MissingTerrain(CellCoord),
    /// A reference points at a job that is not registered.
    #[error("job {0:?} is referenced but not registered")]
    UnknownJob(JobId),
}

impl From<RestoreConflict> for SnapshotError {
    fn from(conflict: RestoreConflict) -> Self {
        match conflict {
            RestoreConflict::OutOfBounds(cell) => Self::OutOfBounds(cell),
            RestoreConflict::Overlap(cell, layer) => Self::Overlap { cell, layer },
        }
    }
}

impl World {
    /// Captures the logical state of the world.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        let tiles = self
            .grid
            .tiles()
            .map(|tile| TileRecord {
                template: tile.template().to_owned(),
                layer: tile.layer(),
                base: tile.base(),
                rotation: tile.footprint().rotation(),
                growth_timer: tile.behavior().growth().map(|growth| growth.timer),
                workshop: tile.behavior().workshop().copied(),
                current_job: tile.current_job(),
            })
            .collect();

        WorldSnapshot {
            columns: self.grid.columns(),
            rows: self.grid.rows(),
            tick_index: self.tick_index,
            tiles,
            inventory: self.inventory.clone(),
            jobs: self.jobs.clone(),
        }
    }

    /// Rebuilds a world from a snapshot using the standard template registry.
    ///
    /// Every tile goes through the grid's registration path again, so the
    /// reservation table, bed registry and update set are derived afresh and
    /// footprint uniqueness is verified before the world is handed out.
    pub fn restore(snapshot: WorldSnapshot) -> Result<World, SnapshotError> {
        Self::restore_with(snapshot, TemplateRegistry::standard())
    }

    /// Rebuilds a world from a snapshot using the provided templates.
    pub fn restore_with(
        snapshot: WorldSnapshot,
        templates: TemplateRegistry,
    ) -> Result<World, SnapshotError> {
        if let Some(job) = snapshot.jobs.find_dangling() {
            return Err(SnapshotError::UnknownJob(job));
        }

        let mut grid = WorldGrid::empty(snapshot.columns, snapshot.rows);
        for record in snapshot.tiles {
            let template = templates
                .get(&record.template)
                .ok_or_else(|| SnapshotError::UnknownTemplate(record.template.clone()))?;
            let template = if template.layer() == record.layer {
                template.clone()
            } else {
                template.on_layer(record.layer)
            };

            let mut tile = WorldGrid::instantiate(&template, record.base, record.rotation);
            if let (Some(timer), Some(growth)) =
                (record.growth_timer, tile.behavior_mut().growth_mut())
            {
                growth.timer = timer;
            }
            if let (Some(saved), Some(workshop)) =
                (record.workshop, tile.behavior_mut().workshop_mut())
            {
                *workshop = saved;
            }
            if let Some(job) = record.current_job {
                if snapshot.jobs.job(job).is_none() {
                    return Err(SnapshotError::UnknownJob(job));
                }
                tile.set_current_job(Some(job));
            }
            let _ = grid.restore(tile)?;
        }

        for row in 0..grid.rows() {
            for column in 0..grid.columns() {
                let cell = CellCoord::new(column, row);
                if grid.get(cell, WorldLayer::Terrain).is_none() {
                    return Err(SnapshotError::MissingTerrain(cell));
                }
            }
        }

        Ok(World::from_parts(
            grid,
            snapshot.inventory,
            snapshot.jobs,
            templates,
            snapshot.tick_index,
        ))
    }
}
