#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the colony simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the simulation systems. Adapters submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! that presentation layers and systems react to. Everything in here is plain
//! data: coordinates, layers, footprints, resource tables and identifiers.

use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

/// Upper bound of an agent's energy reserve.
pub const MAX_ENERGY: f32 = 100.0;

/// Commands that express all permissible world mutations issued by collaborators.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Places a tile instantly, bypassing the job queue.
    PlaceTile {
        /// Registry name of the tile template to instantiate.
        template: String,
        /// Cell anchoring the footprint.
        base: CellCoord,
        /// Requested rotation of the footprint.
        rotation: Rotation,
    },
    /// Removes the tile occupying the provided cell and layer instantly.
    RemoveTile {
        /// Any cell covered by the tile's footprint.
        cell: CellCoord,
        /// Layer the tile lives on.
        layer: WorldLayer,
    },
    /// Replaces the terrain tile of a single cell.
    SetTerrain {
        /// Cell whose terrain changes.
        cell: CellCoord,
        /// Registry name of the terrain template.
        template: String,
    },
    /// Requests construction of a tile through the job queue.
    DesignateBuild {
        /// Registry name of the tile template to construct.
        template: String,
        /// Cell anchoring the footprint.
        base: CellCoord,
        /// Requested rotation of the footprint.
        rotation: Rotation,
    },
    /// Requests demolition of a tile through the job queue.
    DesignateDemolish {
        /// Any cell covered by the tile's footprint.
        cell: CellCoord,
        /// Layer the tile lives on.
        layer: WorldLayer,
    },
    /// Sets how many jobs a workshop tile should still schedule.
    SetWorkshopJobCount {
        /// Any cell covered by the workshop.
        cell: CellCoord,
        /// Remaining number of jobs.
        job_count: u32,
    },
    /// Toggles whether a workshop keeps scheduling jobs indefinitely.
    SetWorkshopContinuous {
        /// Any cell covered by the workshop.
        cell: CellCoord,
        /// Continuous production flag.
        continuous: bool,
    },
    /// Credits resources to the colony inventory.
    AddResources {
        /// Resources to credit.
        resources: ResourceTable,
    },
}

/// Events broadcast by the core after processing commands and ticks.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// A tile was installed on or removed from the provided cell.
    TileUpdated {
        /// Cell whose contents changed.
        cell: CellCoord,
        /// Layer that changed.
        layer: WorldLayer,
    },
    /// The walkable layout changed and the navigation graph is stale.
    LayoutChanged {
        /// Monotonic revision of the grid layout after the change.
        revision: u64,
    },
    /// A placement or designation request was rejected.
    PlacementRejected {
        /// Registry name of the requested template.
        template: String,
        /// Requested base cell.
        base: CellCoord,
        /// Reason the placement failed.
        reason: PlacementError,
    },
    /// A job entered the queue.
    JobCreated {
        /// Identifier assigned to the job.
        job: JobId,
        /// Kind of the job's first step.
        kind: JobStepKind,
        /// Target cell of the job's first step.
        cell: CellCoord,
        /// Visual indicator attached to the job; carries no behaviour.
        indicator: String,
    },
    /// A job step finished and the job moved on to its next step.
    JobStepCompleted {
        /// Job that progressed.
        job: JobId,
        /// Index of the step that finished.
        step: usize,
    },
    /// A job finished its final step and left the register.
    JobCompleted {
        /// Job that completed.
        job: JobId,
    },
    /// A workshop's job count or continuous flag changed.
    TileMetadataChanged {
        /// Workshop tile that changed.
        tile: TileId,
        /// Remaining job count.
        job_count: u32,
        /// Continuous production flag.
        continuous: bool,
    },
    /// An agent joined the colony.
    AgentCreated {
        /// State of the agent when it was created.
        agent: AgentSnapshot,
    },
    /// An agent was ticked.
    AgentUpdated {
        /// State of the agent after the tick.
        agent: AgentSnapshot,
    },
    /// A rebuilt navigation graph was published.
    NavigationRebuilt {
        /// Grid layout revision the graph was built from.
        revision: u64,
    },
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Number of king moves separating two cells.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.column()
            .abs_diff(other.column())
            .max(self.row().abs_diff(other.row()))
    }

    /// Straight-line distance between the centres of two cells.
    #[must_use]
    pub fn euclidean_distance(self, other: CellCoord) -> f32 {
        let dx = self.column().abs_diff(other.column()) as f32;
        let dy = self.row().abs_diff(other.row()) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Returns the cell shifted by the provided delta, if it stays non-negative.
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32) -> Option<CellCoord> {
        let column = self.column.checked_add_signed(dx)?;
        let row = self.row.checked_add_signed(dy)?;
        Some(CellCoord::new(column, row))
    }
}

/// Axis-aligned rectangle expressed in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    origin: CellCoord,
    size: CellRectSize,
}

impl CellRect {
    /// Constructs a rectangle from an origin cell and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: CellCoord, size: CellRectSize) -> Self {
        Self { origin, size }
    }

    /// Upper-left cell that anchors the rectangle.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole cells.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        self.size
    }

    /// Reports whether the rectangle covers the provided cell.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        let column = u64::from(cell.column());
        let row = u64::from(cell.row());
        let left = u64::from(self.origin.column());
        let top = u64::from(self.origin.row());
        column >= left
            && row >= top
            && column < left + u64::from(self.size.width())
            && row < top + u64::from(self.size.height())
    }

    /// Enumerates every covered cell in row-major order.
    ///
    /// Cells whose coordinates would overflow `u32` are skipped; callers
    /// checking bounds treat a short enumeration as out of bounds.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let origin = self.origin;
        let size = self.size;
        (0..size.height()).flat_map(move |dy| {
            (0..size.width()).filter_map(move |dx| {
                let column = origin.column().checked_add(dx)?;
                let row = origin.row().checked_add(dy)?;
                Some(CellCoord::new(column, row))
            })
        })
    }

    /// Number of cells covered by the rectangle.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.size.width()) * u64::from(self.size.height())
    }
}

/// Size of a [`CellRect`] measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRectSize {
    width: u32,
    height: u32,
}

impl CellRectSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of the rectangle in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the rectangle in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// Ordered categories stacked at every grid cell.
///
/// At most one tile instance may occupy a given (cell, layer) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorldLayer {
    /// Ground the colony stands on; exactly one tile per cell.
    Terrain,
    /// Constructed flooring.
    Floor,
    /// Walls, doors, furniture, workshops and vegetation.
    Structure,
    /// Demolition indicators.
    Designation,
}

impl WorldLayer {
    /// Every layer in stacking order.
    pub const ALL: [WorldLayer; 4] = [
        WorldLayer::Terrain,
        WorldLayer::Floor,
        WorldLayer::Structure,
        WorldLayer::Designation,
    ];

    /// Number of layers stacked at each cell.
    pub const COUNT: usize = 4;

    /// Position of the layer inside [`WorldLayer::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Terrain => 0,
            Self::Floor => 1,
            Self::Structure => 2,
            Self::Designation => 3,
        }
    }
}

/// Rotation of a footprint quantized to quarter turns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    /// No rotation.
    #[default]
    Deg0,
    /// A quarter turn clockwise.
    Deg90,
    /// A half turn.
    Deg180,
    /// Three quarter turns clockwise.
    Deg270,
}

impl Rotation {
    /// Reports whether the rotation exchanges width and height.
    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Unrotated dimensions of a tile plus its current rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    width: u32,
    height: u32,
    rotation: Rotation,
}

impl Footprint {
    /// Single-cell footprint.
    pub const UNIT: Footprint = Footprint::new(1, 1);

    /// Creates an unrotated footprint.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rotation: Rotation::Deg0,
        }
    }

    /// Returns the same footprint with a different rotation.
    #[must_use]
    pub const fn with_rotation(self, rotation: Rotation) -> Self {
        Self {
            width: self.width,
            height: self.height,
            rotation,
        }
    }

    /// Unrotated width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Unrotated height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Current rotation.
    #[must_use]
    pub const fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Rotation-adjusted size of the covered rectangle.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        if self.rotation.swaps_axes() {
            CellRectSize::new(self.height, self.width)
        } else {
            CellRectSize::new(self.width, self.height)
        }
    }

    /// Region covered when the footprint is anchored at `base`.
    #[must_use]
    pub const fn region(&self, base: CellCoord) -> CellRect {
        CellRect::from_origin_and_size(base, self.size())
    }
}

/// Resource categories tracked by the colony inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Logs gathered from trees.
    Wood,
    /// Stone quarried from rocks.
    Stone,
    /// Food produced by harvesting.
    Food,
    /// Planks crafted from wood.
    Planks,
}

/// Ordered table of resource amounts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceTable {
    amounts: BTreeMap<ResourceKind, u32>,
}

impl ResourceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table with `amount` of `kind` added.
    #[must_use]
    pub fn with(mut self, kind: ResourceKind, amount: u32) -> Self {
        self.add(kind, amount);
        self
    }

    /// Adds `amount` of `kind`, saturating at `u32::MAX`.
    pub fn add(&mut self, kind: ResourceKind, amount: u32) {
        if amount == 0 {
            return;
        }
        let entry = self.amounts.entry(kind).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Amount of `kind` stored in the table.
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> u32 {
        self.amounts.get(&kind).copied().unwrap_or(0)
    }

    /// Reports whether the table holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amounts.values().all(|amount| *amount == 0)
    }

    /// Iterates the non-zero entries in resource order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.amounts
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(kind, amount)| (*kind, *amount))
    }
}

/// Closed set of tile behaviours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileKind {
    /// Natural ground.
    Terrain,
    /// Impassable wall segment.
    Wall,
    /// Passable opening set between two walls.
    Door,
    /// Constructed flooring.
    Floor,
    /// Sleeping spot for agents.
    Bed,
    /// Tree yielding wood when felled.
    Tree,
    /// Rock yielding stone when quarried.
    Rock,
    /// Placeholder blocking a cell pending construction or demolition.
    Reserved,
    /// Workshop turning wood into planks.
    CraftingTable,
    /// Workshop producing food.
    HarvestingTable,
    /// Young plant that matures into another tile.
    Sapling,
}

impl TileKind {
    /// Reports whether the kind is a self-scheduling workshop.
    #[must_use]
    pub const fn is_workshop(self) -> bool {
        matches!(self, Self::CraftingTable | Self::HarvestingTable)
    }

    /// Reports whether the kind may only be placed on enclosed floor.
    #[must_use]
    pub const fn requires_indoors(self) -> bool {
        matches!(
            self,
            Self::Bed | Self::CraftingTable | Self::HarvestingTable
        )
    }

    /// Reports whether the kind stops an indoor flood fill.
    #[must_use]
    pub const fn encloses(self) -> bool {
        matches!(self, Self::Wall | Self::Door)
    }
}

/// Unique identifier assigned to a placed tile instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(u32);

impl TileId {
    /// Creates a new tile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(u32);

impl JobId {
    /// Creates a new job identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Kind of timed work a job step performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStepKind {
    /// Installs a tile.
    Build,
    /// Removes a tile.
    Demolish,
    /// Works a crafting station.
    Craft,
    /// Gathers produce.
    Harvest,
}

/// Reasons a placement request may be rejected by the grid.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error,
)]
pub enum PlacementError {
    /// No template is registered under the requested name.
    #[error("no tile template is registered under that name")]
    UnknownTemplate,
    /// The requested footprint extends beyond the grid.
    #[error("footprint extends beyond the grid")]
    OutOfBounds,
    /// A non-reserved tile already occupies the target layer.
    #[error("target layer is already occupied")]
    Occupied,
    /// A tile at one of the covered cells forbids building on it.
    #[error("a covered cell does not allow building")]
    NotBuildable,
    /// The tile must be placed on enclosed floor.
    #[error("tile must be placed indoors")]
    NotIndoors,
    /// Doors require walls on both sides along exactly one axis.
    #[error("door needs walls on both sides along exactly one axis")]
    DoorNeedsWalls,
    /// Terrain tiles are only changed through terrain replacement.
    #[error("terrain is replaced, never placed")]
    TerrainLocked,
    /// The target cell already has an outstanding reservation.
    #[error("target cell is reserved by an outstanding job")]
    Reserved,
    /// An identical job already targets the cell.
    #[error("an identical job already targets the cell")]
    DuplicateJob,
    /// There is no tile to act on.
    #[error("no tile occupies the target cell")]
    Missing,
}

/// Continuous position of an agent measured in cell units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate; integral values sit on cell centres.
    pub x: f32,
    /// Vertical coordinate; integral values sit on cell centres.
    pub y: f32,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Position at the centre of the provided cell.
    #[must_use]
    pub fn at_cell(cell: CellCoord) -> Self {
        Self::new(cell.column() as f32, cell.row() as f32)
    }

    /// Cell whose centre matches the position exactly.
    #[must_use]
    pub fn exact_cell(&self) -> Option<CellCoord> {
        let cell = self.nearest_cell()?;
        (Position::at_cell(cell) == *self).then_some(cell)
    }

    /// Cell whose centre is nearest to the position.
    #[must_use]
    pub fn nearest_cell(&self) -> Option<CellCoord> {
        let column = self.x.round();
        let row = self.y.round();
        if column < 0.0 || row < 0.0 || column > u32::MAX as f32 || row > u32::MAX as f32 {
            return None;
        }
        Some(CellCoord::new(column as u32, row as u32))
    }

    /// Distance to another position.
    #[must_use]
    pub fn distance(&self, other: Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Moves up to `max_distance` toward `target`, snapping when it is reached.
    #[must_use]
    pub fn step_toward(&self, target: Position, max_distance: f32) -> Position {
        let distance = self.distance(target);
        if distance <= max_distance || distance <= f32::EPSILON {
            return target;
        }
        let ratio = max_distance / distance;
        Position::new(
            self.x + (target.x - self.x) * ratio,
            self.y + (target.y - self.y) * ratio,
        )
    }
}

/// Externally visible activity of an agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentActivity {
    /// Holding no job.
    #[default]
    Idle,
    /// Polling the job queue.
    Seeking,
    /// Waiting for a path.
    Routing,
    /// Consuming path waypoints.
    Traveling,
    /// Applying time to the current job step.
    Working,
    /// Travelling to bed to recover energy.
    Sleeping,
    /// Recovering energy.
    Resting,
}

/// Immutable representation of a single agent used by events and queries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Identifier of the agent.
    pub id: AgentId,
    /// Continuous position of the agent.
    pub position: Position,
    /// Remaining energy in `0..=MAX_ENERGY`.
    pub energy: f32,
    /// Whether the agent must sleep before working again.
    pub needs_sleep: bool,
    /// Current activity.
    pub activity: AgentActivity,
    /// Job held by the agent, if any.
    pub job: Option<JobId>,
    /// Cell the agent is heading to, if any.
    pub target: Option<CellCoord>,
}

#[cfg(test)]
mod tests {
    use super::{
        CellCoord, CellRect, CellRectSize, Footprint, PlacementError, Position, ResourceKind,
        ResourceTable, Rotation, TileId, WorldLayer,
    };
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn chebyshev_distance_counts_king_moves() {
        let origin = CellCoord::new(0, 0);
        assert_eq!(origin.chebyshev_distance(CellCoord::new(3, 1)), 3);
        assert_eq!(origin.chebyshev_distance(CellCoord::new(2, 5)), 5);
    }

    #[test]
    fn offset_rejects_negative_coordinates() {
        let origin = CellCoord::new(0, 2);
        assert_eq!(origin.offset(-1, 0), None);
        assert_eq!(origin.offset(1, -1), Some(CellCoord::new(1, 1)));
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn tile_id_round_trips_through_bincode() {
        assert_round_trip(&TileId::new(42));
    }

    #[test]
    fn placement_error_round_trips_through_bincode() {
        assert_round_trip(&PlacementError::Occupied);
    }

    #[test]
    fn resource_table_round_trips_through_bincode() {
        let table = ResourceTable::new()
            .with(ResourceKind::Wood, 3)
            .with(ResourceKind::Food, 1);
        assert_round_trip(&table);
    }

    #[test]
    fn rotation_swaps_footprint_axes() {
        let footprint = Footprint::new(1, 2);
        assert_eq!(footprint.size(), CellRectSize::new(1, 2));
        let rotated = footprint.with_rotation(Rotation::Deg90);
        assert_eq!(rotated.size(), CellRectSize::new(2, 1));
        let flipped = footprint.with_rotation(Rotation::Deg180);
        assert_eq!(flipped.size(), CellRectSize::new(1, 2));
    }

    #[test]
    fn cell_rect_enumerates_row_major() {
        let rect = CellRect::from_origin_and_size(CellCoord::new(2, 3), CellRectSize::new(2, 2));
        let cells: Vec<_> = rect.cells().collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(2, 3),
                CellCoord::new(3, 3),
                CellCoord::new(2, 4),
                CellCoord::new(3, 4),
            ]
        );
        assert!(rect.contains(CellCoord::new(3, 4)));
        assert!(!rect.contains(CellCoord::new(4, 4)));
        assert_eq!(rect.area(), 4);
    }

    #[test]
    fn empty_resource_entries_are_ignored() {
        let table = ResourceTable::new().with(ResourceKind::Stone, 0);
        assert!(table.is_empty());
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn position_steps_and_snaps_to_cells() {
        let start = Position::at_cell(CellCoord::new(0, 0));
        let goal = Position::at_cell(CellCoord::new(2, 0));
        let halfway = start.step_toward(goal, 1.0);
        assert_eq!(halfway.exact_cell(), Some(CellCoord::new(1, 0)));
        let partial = start.step_toward(goal, 0.5);
        assert_eq!(partial.exact_cell(), None);
        assert_eq!(halfway.step_toward(goal, 5.0), goal);
    }

    #[test]
    fn layers_index_in_stacking_order() {
        for (index, layer) in WorldLayer::ALL.iter().enumerate() {
            assert_eq!(layer.index(), index);
        }
    }
}
