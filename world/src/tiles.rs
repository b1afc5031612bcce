//! Tile templates, the template registry and per-kind tile behaviour.
//!
//! Every placed tile carries a [`TileBehavior`]. The behaviour is a closed
//! enum whose variants mirror [`TileKind`] and hold the state a kind needs
//! (growth timers, workshop production settings). The grid dispatches on it
//! for validation, registration and ticking instead of branching on flags.

use std::collections::BTreeMap;

use colony_core::{
    CellCoord, CellRect, Footprint, PlacementError, ResourceKind, ResourceTable, Rotation,
    TileKind, WorldLayer,
};
use serde::{Deserialize, Serialize};

use crate::grid::WorldGrid;

/// Registry name of the default terrain.
pub const GRASS: &str = "grass";
/// Registry name of the reservation placeholder.
pub const RESERVED: &str = "reserved";

const SAPLING_GROWTH_SECONDS: f32 = 30.0;

/// Production settings of a crafting or harvesting table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workshop {
    /// Number of jobs still to schedule.
    pub job_count: u32,
    /// Keeps scheduling jobs regardless of `job_count`.
    pub continuous: bool,
}

impl Workshop {
    fn wants_job(&self) -> bool {
        self.continuous || self.job_count > 0
    }
}

/// Growth state of a sapling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Growth {
    /// Seconds left until the plant matures.
    pub timer: f32,
    /// Registry name of the tile installed on maturity.
    pub matured_form: String,
}

/// Behaviour variant attached to every tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TileBehavior {
    /// Natural ground.
    Terrain,
    /// Wall segment.
    Wall,
    /// Door between two walls.
    Door,
    /// Flooring.
    Floor,
    /// Sleeping spot.
    Bed,
    /// Tree.
    Tree,
    /// Rock.
    Rock,
    /// Reservation placeholder.
    Reserved,
    /// Plank workshop.
    CraftingTable(Workshop),
    /// Food workshop.
    HarvestingTable(Workshop),
    /// Growing plant.
    Sapling(Growth),
}

/// Work a tile asks the world to perform after a tick.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TickAction {
    /// Replace the tile with its matured form.
    Mature(String),
    /// Schedule a new production job.
    ScheduleJob,
}

impl TileBehavior {
    /// Kind tag matching the variant.
    #[must_use]
    pub const fn kind(&self) -> TileKind {
        match self {
            Self::Terrain => TileKind::Terrain,
            Self::Wall => TileKind::Wall,
            Self::Door => TileKind::Door,
            Self::Floor => TileKind::Floor,
            Self::Bed => TileKind::Bed,
            Self::Tree => TileKind::Tree,
            Self::Rock => TileKind::Rock,
            Self::Reserved => TileKind::Reserved,
            Self::CraftingTable(_) => TileKind::CraftingTable,
            Self::HarvestingTable(_) => TileKind::HarvestingTable,
            Self::Sapling(_) => TileKind::Sapling,
        }
    }

    /// Workshop settings, if the tile is a workshop.
    #[must_use]
    pub const fn workshop(&self) -> Option<&Workshop> {
        match self {
            Self::CraftingTable(workshop) | Self::HarvestingTable(workshop) => Some(workshop),
            _ => None,
        }
    }

    pub(crate) fn workshop_mut(&mut self) -> Option<&mut Workshop> {
        match self {
            Self::CraftingTable(workshop) | Self::HarvestingTable(workshop) => Some(workshop),
            _ => None,
        }
    }

    /// Growth state, if the tile is a sapling.
    #[must_use]
    pub const fn growth(&self) -> Option<&Growth> {
        match self {
            Self::Sapling(growth) => Some(growth),
            _ => None,
        }
    }

    pub(crate) fn growth_mut(&mut self) -> Option<&mut Growth> {
        match self {
            Self::Sapling(growth) => Some(growth),
            _ => None,
        }
    }

    /// Reports whether the tile belongs in the grid's update set.
    #[must_use]
    pub const fn requires_update(&self) -> bool {
        matches!(
            self,
            Self::Sapling(_) | Self::CraftingTable(_) | Self::HarvestingTable(_)
        )
    }

    /// Grid registries the tile joins on placement and leaves on removal.
    pub(crate) const fn registries(&self) -> Registries {
        Registries {
            reservation: matches!(self, Self::Reserved),
            update: self.requires_update(),
            bed: matches!(self, Self::Bed),
        }
    }

    /// Reports whether placement must respect `buildable` flags below it.
    ///
    /// Reservation markers sit on top of anything, including walls queued for
    /// demolition.
    #[must_use]
    pub const fn requires_buildable_ground(&self) -> bool {
        !matches!(self, Self::Reserved)
    }

    /// Kind-specific validity check run after the generic footprint checks.
    ///
    /// Returns the rotation the tile must be stored with.
    pub(crate) fn validate(
        &self,
        grid: &WorldGrid,
        region: CellRect,
        requested: Rotation,
    ) -> Result<Rotation, PlacementError> {
        match self {
            Self::Door => door_rotation(grid, region.origin()),
            _ if self.kind().requires_indoors() => {
                if region.cells().all(|cell| grid.is_inside(cell)) {
                    Ok(requested)
                } else {
                    Err(PlacementError::NotIndoors)
                }
            }
            _ => Ok(requested),
        }
    }

    /// Advances time-driven state and reports follow-up work.
    pub(crate) fn on_tick(&mut self, dt: f32, has_job: bool) -> Option<TickAction> {
        match self {
            Self::Sapling(growth) => {
                growth.timer -= dt;
                (growth.timer <= 0.0).then(|| TickAction::Mature(growth.matured_form.clone()))
            }
            Self::CraftingTable(workshop) | Self::HarvestingTable(workshop) => {
                (!has_job && workshop.wants_job()).then_some(TickAction::ScheduleJob)
            }
            _ => None,
        }
    }
}

fn door_rotation(grid: &WorldGrid, cell: CellCoord) -> Result<Rotation, PlacementError> {
    let wall_at = |dx: i32, dy: i32| {
        cell.offset(dx, dy)
            .and_then(|neighbor| grid.get(neighbor, WorldLayer::Structure))
            .is_some_and(|tile| tile.kind() == TileKind::Wall)
    };

    let north_south = wall_at(0, -1) && wall_at(0, 1);
    let east_west = wall_at(-1, 0) && wall_at(1, 0);

    match (north_south, east_west) {
        (true, false) => Ok(Rotation::Deg90),
        (false, true) => Ok(Rotation::Deg0),
        _ => Err(PlacementError::DoorNeedsWalls),
    }
}

/// Membership of a placed tile in the grid's side tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Registries {
    pub(crate) reservation: bool,
    pub(crate) update: bool,
    pub(crate) bed: bool,
}

/// Blueprint from which tile instances are created.
#[derive(Clone, Debug, PartialEq)]
pub struct TileTemplate {
    name: String,
    layer: WorldLayer,
    footprint: Footprint,
    movement_cost: f32,
    buildable: bool,
    build_cost: ResourceTable,
    build_time: f32,
    demolish_time: f32,
    yields: ResourceTable,
    behavior: TileBehavior,
}

impl TileTemplate {
    /// Creates a single-cell template with neutral defaults.
    #[must_use]
    pub fn new(name: &str, layer: WorldLayer, behavior: TileBehavior) -> Self {
        Self {
            name: name.to_owned(),
            layer,
            footprint: Footprint::UNIT,
            movement_cost: 1.0,
            buildable: false,
            build_cost: ResourceTable::new(),
            build_time: 1.0,
            demolish_time: 1.0,
            yields: ResourceTable::new(),
            behavior,
        }
    }

    /// Sets the unrotated footprint.
    #[must_use]
    pub fn footprint(mut self, width: u32, height: u32) -> Self {
        self.footprint = Footprint::new(width, height);
        self
    }

    /// Sets the movement cost multiplier; zero makes the tile impassable.
    #[must_use]
    pub fn movement_cost(mut self, cost: f32) -> Self {
        self.movement_cost = cost.max(0.0);
        self
    }

    /// Allows other layers to be built on the covered cells.
    #[must_use]
    pub fn buildable(mut self, buildable: bool) -> Self {
        self.buildable = buildable;
        self
    }

    /// Resources charged when a construction job is claimed.
    #[must_use]
    pub fn build_cost(mut self, cost: ResourceTable) -> Self {
        self.build_cost = cost;
        self
    }

    /// Seconds of work needed to construct and to demolish the tile.
    #[must_use]
    pub fn work_times(mut self, build: f32, demolish: f32) -> Self {
        self.build_time = build.max(0.0);
        self.demolish_time = demolish.max(0.0);
        self
    }

    /// Resources credited when the tile is removed.
    #[must_use]
    pub fn yields(mut self, yields: ResourceTable) -> Self {
        self.yields = yields;
        self
    }

    /// Copy of the template that lives on another layer.
    #[must_use]
    pub fn on_layer(&self, layer: WorldLayer) -> Self {
        let mut template = self.clone();
        template.layer = layer;
        template
    }

    /// Registry name of the template.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of tile produced by the template.
    #[must_use]
    pub const fn kind(&self) -> TileKind {
        self.behavior.kind()
    }

    /// Layer the tile occupies.
    #[must_use]
    pub const fn layer(&self) -> WorldLayer {
        self.layer
    }

    /// Unrotated footprint of the tile.
    #[must_use]
    pub const fn unrotated_footprint(&self) -> Footprint {
        self.footprint
    }

    /// Movement cost multiplier of the tile.
    #[must_use]
    pub const fn cost(&self) -> f32 {
        self.movement_cost
    }

    /// Whether other layers may be built on top of the tile.
    #[must_use]
    pub const fn is_buildable(&self) -> bool {
        self.buildable
    }

    /// Resources charged for construction.
    #[must_use]
    pub fn construction_cost(&self) -> &ResourceTable {
        &self.build_cost
    }

    /// Seconds of work needed to construct the tile.
    #[must_use]
    pub const fn build_time(&self) -> f32 {
        self.build_time
    }

    /// Seconds of work needed to demolish the tile.
    #[must_use]
    pub const fn demolish_time(&self) -> f32 {
        self.demolish_time
    }

    /// Resources credited when the tile is removed.
    #[must_use]
    pub fn removal_yield(&self) -> &ResourceTable {
        &self.yields
    }

    /// Initial behaviour state of a fresh instance.
    #[must_use]
    pub fn behavior(&self) -> &TileBehavior {
        &self.behavior
    }
}

/// Name-keyed collection of tile templates.
#[derive(Clone, Debug, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, TileTemplate>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every tile the colony knows how to build.
    #[must_use]
    pub fn standard() -> Self {
        let wood = |amount| ResourceTable::new().with(ResourceKind::Wood, amount);

        let mut registry = Self::new();
        for template in [
            TileTemplate::new(GRASS, WorldLayer::Terrain, TileBehavior::Terrain).buildable(true),
            TileTemplate::new("water", WorldLayer::Terrain, TileBehavior::Terrain)
                .movement_cost(0.0),
            TileTemplate::new("floor", WorldLayer::Floor, TileBehavior::Floor)
                .buildable(true)
                .work_times(1.0, 0.5),
            TileTemplate::new("wall", WorldLayer::Structure, TileBehavior::Wall)
                .movement_cost(0.0)
                .build_cost(wood(1))
                .work_times(2.0, 1.0)
                .yields(wood(1)),
            TileTemplate::new("door", WorldLayer::Structure, TileBehavior::Door)
                .movement_cost(1.5)
                .build_cost(wood(1))
                .work_times(2.0, 1.0),
            TileTemplate::new("bed", WorldLayer::Structure, TileBehavior::Bed)
                .footprint(1, 2)
                .build_cost(wood(2))
                .work_times(3.0, 1.5)
                .yields(wood(1)),
            TileTemplate::new("tree", WorldLayer::Structure, TileBehavior::Tree)
                .movement_cost(2.0)
                .work_times(1.0, 3.0)
                .yields(wood(3)),
            TileTemplate::new("rock", WorldLayer::Structure, TileBehavior::Rock)
                .movement_cost(0.0)
                .work_times(1.0, 4.0)
                .yields(ResourceTable::new().with(ResourceKind::Stone, 2)),
            TileTemplate::new(RESERVED, WorldLayer::Structure, TileBehavior::Reserved)
                .buildable(true),
            TileTemplate::new(
                "crafting_table",
                WorldLayer::Structure,
                TileBehavior::CraftingTable(Workshop::default()),
            )
            .footprint(2, 1)
            .build_cost(wood(3))
            .work_times(4.0, 2.0)
            .yields(wood(1)),
            TileTemplate::new(
                "harvesting_table",
                WorldLayer::Structure,
                TileBehavior::HarvestingTable(Workshop::default()),
            )
            .footprint(2, 1)
            .build_cost(wood(2).with(ResourceKind::Stone, 1))
            .work_times(4.0, 2.0)
            .yields(wood(1)),
            TileTemplate::new(
                "sapling",
                WorldLayer::Structure,
                TileBehavior::Sapling(Growth {
                    timer: SAPLING_GROWTH_SECONDS,
                    matured_form: "tree".to_owned(),
                }),
            )
            .work_times(1.0, 0.5),
        ] {
            registry.register(template);
        }
        registry
    }

    /// Adds or replaces a template.
    pub fn register(&mut self, template: TileTemplate) {
        let _ = self.templates.insert(template.name.clone(), template);
    }

    /// Looks up a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TileTemplate> {
        self.templates.get(name)
    }

    /// Iterates templates in name order.
    pub fn iter(&self) -> impl Iterator<Item = &TileTemplate> {
        self.templates.values()
    }
}
