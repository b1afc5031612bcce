//! Multi-layer tile grid with footprint placement and reservation bookkeeping.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use colony_core::{
    CellCoord, CellRect, Event, Footprint, JobId, PlacementError, ResourceTable, Rotation,
    TileId, TileKind, WorldLayer,
};
use tracing::trace;

use crate::{
    inventory::Inventory,
    tiles::{TickAction, TileBehavior, TileTemplate},
};

const CARDINALS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// A placed tile instance. Every cell of its footprint refers to it.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldTile {
    id: TileId,
    template: String,
    layer: WorldLayer,
    base: CellCoord,
    footprint: Footprint,
    movement_cost: f32,
    buildable: bool,
    build_cost: ResourceTable,
    yields: ResourceTable,
    behavior: TileBehavior,
    current_job: Option<JobId>,
}

impl WorldTile {
    fn instantiate(id: TileId, template: &TileTemplate, base: CellCoord, rotation: Rotation) -> Self {
        Self {
            id,
            template: template.name().to_owned(),
            layer: template.layer(),
            base,
            footprint: template.unrotated_footprint().with_rotation(rotation),
            movement_cost: template.cost(),
            buildable: template.is_buildable(),
            build_cost: template.construction_cost().clone(),
            yields: template.removal_yield().clone(),
            behavior: template.behavior().clone(),
            current_job: None,
        }
    }

    /// Identifier of the instance.
    #[must_use]
    pub const fn id(&self) -> TileId {
        self.id
    }

    /// Registry name of the template the tile was created from.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Behaviour tag of the tile.
    #[must_use]
    pub const fn kind(&self) -> TileKind {
        self.behavior.kind()
    }

    /// Layer the tile occupies.
    #[must_use]
    pub const fn layer(&self) -> WorldLayer {
        self.layer
    }

    /// Origin cell of the footprint.
    #[must_use]
    pub const fn base(&self) -> CellCoord {
        self.base
    }

    /// Footprint including its rotation.
    #[must_use]
    pub const fn footprint(&self) -> Footprint {
        self.footprint
    }

    /// Cells covered by the tile.
    #[must_use]
    pub const fn region(&self) -> CellRect {
        self.footprint.region(self.base)
    }

    /// Movement cost multiplier; zero means impassable.
    #[must_use]
    pub const fn movement_cost(&self) -> f32 {
        self.movement_cost
    }

    /// Whether other layers may be built on the covered cells.
    #[must_use]
    pub const fn buildable(&self) -> bool {
        self.buildable
    }

    /// Resources that were charged to construct the tile.
    #[must_use]
    pub fn build_cost(&self) -> &ResourceTable {
        &self.build_cost
    }

    /// Resources credited when the tile is removed.
    #[must_use]
    pub fn yields(&self) -> &ResourceTable {
        &self.yields
    }

    /// Behaviour state of the tile.
    #[must_use]
    pub fn behavior(&self) -> &TileBehavior {
        &self.behavior
    }

    /// Production job currently scheduled by the tile.
    #[must_use]
    pub const fn current_job(&self) -> Option<JobId> {
        self.current_job
    }

    pub(crate) fn behavior_mut(&mut self) -> &mut TileBehavior {
        &mut self.behavior
    }

    pub(crate) fn set_current_job(&mut self, job: Option<JobId>) {
        self.current_job = job;
    }
}

/// Authoritative multi-layer tile grid.
///
/// Each (cell, layer) slot holds at most one [`TileId`]; multi-cell tiles are a
/// single instance referenced from every covered slot. Reservations, the bed
/// registry and the update set are derived indices that only `place`,
/// `remove` and restoration touch.
#[derive(Clone, Debug)]
pub struct WorldGrid {
    columns: u32,
    rows: u32,
    slots: Vec<[Option<TileId>; WorldLayer::COUNT]>,
    tiles: BTreeMap<TileId, WorldTile>,
    reservations: BTreeMap<(CellCoord, WorldLayer), TileId>,
    update_set: BTreeSet<TileId>,
    beds: BTreeSet<CellCoord>,
    next_tile_id: u32,
    layout_revision: u64,
}

impl WorldGrid {
    /// Creates a grid with `terrain` seeded into every cell.
    #[must_use]
    pub fn new(columns: u32, rows: u32, terrain: &TileTemplate) -> Self {
        let mut grid = Self::empty(columns, rows);
        for row in 0..rows {
            for column in 0..columns {
                let _ = grid.seed_terrain(CellCoord::new(column, row), terrain);
            }
        }
        grid
    }

    pub(crate) fn empty(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            slots: vec![[None; WorldLayer::COUNT]; capacity],
            tiles: BTreeMap::new(),
            reservations: BTreeMap::new(),
            update_set: BTreeSet::new(),
            beds: BTreeSet::new(),
            next_tile_id: 0,
            layout_revision: 0,
        }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Counter bumped on every structural change.
    #[must_use]
    pub const fn layout_revision(&self) -> u64 {
        self.layout_revision
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Tile occupying the provided cell and layer.
    #[must_use]
    pub fn get(&self, cell: CellCoord, layer: WorldLayer) -> Option<&WorldTile> {
        let id = self.slot(cell, layer)?;
        self.tiles.get(&id)
    }

    /// Tile with the provided identifier.
    #[must_use]
    pub fn tile(&self, id: TileId) -> Option<&WorldTile> {
        self.tiles.get(&id)
    }

    pub(crate) fn tile_mut(&mut self, id: TileId) -> Option<&mut WorldTile> {
        self.tiles.get_mut(&id)
    }

    /// Iterates every placed tile in identifier order.
    pub fn tiles(&self) -> impl Iterator<Item = &WorldTile> {
        self.tiles.values()
    }

    /// Iterates the tiles stacked at a cell in layer order.
    pub fn tiles_at(&self, cell: CellCoord) -> impl Iterator<Item = &WorldTile> {
        WorldLayer::ALL
            .into_iter()
            .filter_map(move |layer| self.get(cell, layer))
    }

    /// Reports whether every tile at the cell allows building on top of it.
    #[must_use]
    pub fn is_buildable(&self, cell: CellCoord) -> bool {
        self.in_bounds(cell) && self.tiles_at(cell).all(WorldTile::buildable)
    }

    /// Reports whether agents can stand on the cell.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.movement_cost(cell) > 0.0
    }

    /// Product of the movement multipliers of every tile at the cell.
    ///
    /// Out-of-bounds cells cost zero, which reads as impassable.
    #[must_use]
    pub fn movement_cost(&self, cell: CellCoord) -> f32 {
        if !self.in_bounds(cell) {
            return 0.0;
        }
        self.tiles_at(cell)
            .map(WorldTile::movement_cost)
            .product()
    }

    /// Reports whether an outstanding job reserved the cell and layer.
    #[must_use]
    pub fn is_reserved(&self, cell: CellCoord, layer: WorldLayer) -> bool {
        self.reservations.contains_key(&(cell, layer))
    }

    /// Base cells of every registered bed.
    #[must_use]
    pub fn beds(&self) -> &BTreeSet<CellCoord> {
        &self.beds
    }

    /// Reports whether the cell is enclosed floor.
    ///
    /// Floods outward through the four cardinal neighbours. Reaching the grid
    /// edge or a cell without real floor means the cell is outside; walls and
    /// doors stop the flood in their direction.
    #[must_use]
    pub fn is_inside(&self, start: CellCoord) -> bool {
        if !self.in_bounds(start) {
            return false;
        }

        let mut visited = BTreeSet::new();
        let mut frontier = VecDeque::new();
        let _ = visited.insert(start);
        frontier.push_back(start);

        while let Some(cell) = frontier.pop_front() {
            if self.encloses(cell) {
                continue;
            }
            if !self.has_floor(cell) {
                return false;
            }

            for (dx, dy) in CARDINALS {
                let Some(neighbor) = cell.offset(dx, dy).filter(|next| self.in_bounds(*next))
                else {
                    return false;
                };
                if visited.insert(neighbor) {
                    frontier.push_back(neighbor);
                }
            }
        }

        true
    }

    /// Validates a placement without mutating the grid.
    ///
    /// Reservation placeholders on the target layer are treated as absent,
    /// because a successful placement replaces them.
    pub fn check_placement(
        &self,
        base: CellCoord,
        template: &TileTemplate,
        rotation: Rotation,
    ) -> Result<Rotation, PlacementError> {
        if template.layer() == WorldLayer::Terrain {
            return Err(PlacementError::TerrainLocked);
        }

        let region = template.unrotated_footprint().with_rotation(rotation).region(base);
        let covered = region.cells().filter(|cell| self.in_bounds(*cell)).count();
        if region.area() == 0 || covered as u64 != region.area() {
            return Err(PlacementError::OutOfBounds);
        }

        let behavior = template.behavior();
        for cell in region.cells() {
            if let Some(existing) = self.get(cell, template.layer()) {
                if existing.kind() != TileKind::Reserved {
                    return Err(PlacementError::Occupied);
                }
            }
            if behavior.requires_buildable_ground()
                && !self.tiles_at(cell).all(WorldTile::buildable)
            {
                return Err(PlacementError::NotBuildable);
            }
        }

        behavior.validate(self, region, rotation)
    }

    /// Instantiates `template` at `base` if every covered cell accepts it.
    ///
    /// Reservation placeholders on the target layer are removed as part of a
    /// successful placement. A rejected placement leaves the grid untouched.
    pub fn place(
        &mut self,
        base: CellCoord,
        template: &TileTemplate,
        rotation: Rotation,
        out: &mut Vec<Event>,
    ) -> Result<TileId, PlacementError> {
        let rotation = match self.check_placement(base, template, rotation) {
            Ok(rotation) => rotation,
            Err(reason) => {
                trace!(template = template.name(), ?base, ?reason, "placement rejected");
                return Err(reason);
            }
        };

        let region = template.unrotated_footprint().with_rotation(rotation).region(base);
        let placeholders: BTreeSet<TileId> = region
            .cells()
            .filter_map(|cell| self.slot(cell, template.layer()))
            .collect();
        for placeholder in placeholders {
            let detached = self.detach(placeholder);
            self.announce(&detached, out);
        }

        let id = self.allocate_id();
        let tile = WorldTile::instantiate(id, template, base, rotation);
        self.attach(tile);
        if let Some(tile) = self.tiles.get(&id) {
            let placed = tile.clone();
            self.announce(&placed, out);
        }
        self.bump_revision(out);
        Ok(id)
    }

    /// Removes the tile covering `cell` on `layer` and credits its yield.
    ///
    /// The yield is collected once from the instance regardless of which
    /// covered cell triggered the removal. Terrain is never removed.
    pub fn remove(
        &mut self,
        cell: CellCoord,
        layer: WorldLayer,
        inventory: &mut Inventory,
        out: &mut Vec<Event>,
    ) -> Option<TileId> {
        if layer == WorldLayer::Terrain {
            return None;
        }
        let id = self.slot(cell, layer)?;
        let removed = self.detach(id);
        inventory.add(removed.yields());
        self.announce(&removed, out);
        self.bump_revision(out);
        Some(id)
    }

    /// Swaps the terrain tile of a single cell.
    pub fn set_terrain(
        &mut self,
        cell: CellCoord,
        terrain: &TileTemplate,
        out: &mut Vec<Event>,
    ) -> Result<TileId, PlacementError> {
        if terrain.layer() != WorldLayer::Terrain || terrain.unrotated_footprint() != Footprint::UNIT {
            return Err(PlacementError::TerrainLocked);
        }
        if !self.in_bounds(cell) {
            return Err(PlacementError::OutOfBounds);
        }
        if let Some(existing) = self.slot(cell, WorldLayer::Terrain) {
            let _ = self.detach(existing);
        }
        let id = self.seed_terrain(cell, terrain);
        out.push(Event::TileUpdated {
            cell,
            layer: WorldLayer::Terrain,
        });
        self.bump_revision(out);
        Ok(id)
    }

    /// Replaces a tile by another template at the same base, without yield.
    pub(crate) fn replace(
        &mut self,
        id: TileId,
        template: &TileTemplate,
        out: &mut Vec<Event>,
    ) -> Result<TileId, PlacementError> {
        let Some(tile) = self.tiles.get(&id) else {
            return Err(PlacementError::Missing);
        };
        let base = tile.base();
        let rotation = tile.footprint().rotation();
        let previous = self.detach(id);
        match self.place(base, template, rotation, out) {
            Ok(replacement) => {
                for cell in previous.region().cells() {
                    if self.slot(cell, previous.layer()).is_none() {
                        out.push(Event::TileUpdated {
                            cell,
                            layer: previous.layer(),
                        });
                    }
                }
                Ok(replacement)
            }
            Err(reason) => {
                self.attach(previous);
                Err(reason)
            }
        }
    }

    /// Re-inserts a restored tile, verifying that its footprint is free.
    pub(crate) fn restore(&mut self, mut tile: WorldTile) -> Result<TileId, RestoreConflict> {
        let region = tile.region();
        let covered = region.cells().filter(|cell| self.in_bounds(*cell)).count();
        if region.area() == 0 || covered as u64 != region.area() {
            return Err(RestoreConflict::OutOfBounds(tile.base()));
        }
        if let Some(cell) = region
            .cells()
            .find(|cell| self.slot(*cell, tile.layer()).is_some())
        {
            return Err(RestoreConflict::Overlap(cell, tile.layer()));
        }
        let id = self.allocate_id();
        tile.id = id;
        self.attach(tile);
        self.layout_revision = self.layout_revision.wrapping_add(1);
        Ok(id)
    }

    /// Builds a detached tile instance from a template, for restoration.
    pub(crate) fn instantiate(
        template: &TileTemplate,
        base: CellCoord,
        rotation: Rotation,
    ) -> WorldTile {
        WorldTile::instantiate(TileId::new(0), template, base, rotation)
    }

    /// Advances every tile in the update set and collects follow-up work.
    ///
    /// Actions are returned rather than executed so the update set is never
    /// mutated while it is being walked.
    pub(crate) fn advance_tiles(&mut self, dt: f32) -> Vec<(TileId, TickAction)> {
        let mut actions = Vec::new();
        for id in &self.update_set {
            let Some(tile) = self.tiles.get_mut(id) else {
                continue;
            };
            let has_job = tile.current_job.is_some();
            if let Some(action) = tile.behavior.on_tick(dt, has_job) {
                actions.push((*id, action));
            }
        }
        actions
    }

    fn seed_terrain(&mut self, cell: CellCoord, terrain: &TileTemplate) -> TileId {
        let id = self.allocate_id();
        self.attach(WorldTile::instantiate(id, terrain, cell, Rotation::Deg0));
        id
    }

    fn attach(&mut self, tile: WorldTile) {
        let id = tile.id;
        let layer = tile.layer;
        let registries = tile.behavior.registries();
        for cell in tile.region().cells() {
            if let Some(index) = self.index(cell) {
                self.slots[index][layer.index()] = Some(id);
            }
            if registries.reservation {
                let _ = self.reservations.insert((cell, layer), id);
            }
        }
        if registries.update {
            let _ = self.update_set.insert(id);
        }
        if registries.bed {
            let _ = self.beds.insert(tile.base);
        }
        let _ = self.tiles.insert(id, tile);
    }

    fn detach(&mut self, id: TileId) -> WorldTile {
        let Some(tile) = self.tiles.remove(&id) else {
            panic!("tile {} is referenced by the grid but not registered", id.get());
        };
        let layer = tile.layer;
        let registries = tile.behavior.registries();
        for cell in tile.region().cells() {
            let slot = self
                .index(cell)
                .and_then(|index| self.slots.get_mut(index))
                .map(|slots| &mut slots[layer.index()]);
            match slot {
                Some(slot) if *slot == Some(id) => *slot = None,
                _ => panic!(
                    "footprint of tile {} no longer matches the grid at {cell:?} on {layer:?}",
                    id.get()
                ),
            }
            if registries.reservation {
                let _ = self.reservations.remove(&(cell, layer));
            }
        }
        if registries.update {
            let _ = self.update_set.remove(&id);
        }
        if registries.bed {
            let _ = self.beds.remove(&tile.base);
        }
        tile
    }

    fn announce(&self, tile: &WorldTile, out: &mut Vec<Event>) {
        for cell in tile.region().cells() {
            out.push(Event::TileUpdated {
                cell,
                layer: tile.layer(),
            });
        }
    }

    fn bump_revision(&mut self, out: &mut Vec<Event>) {
        self.layout_revision = self.layout_revision.wrapping_add(1);
        out.push(Event::LayoutChanged {
            revision: self.layout_revision,
        });
    }

    fn allocate_id(&mut self) -> TileId {
        let id = TileId::new(self.next_tile_id);
        self.next_tile_id = self.next_tile_id.wrapping_add(1);
        id
    }

    fn has_floor(&self, cell: CellCoord) -> bool {
        self.get(cell, WorldLayer::Floor)
            .is_some_and(|tile| tile.kind() != TileKind::Reserved)
    }

    fn encloses(&self, cell: CellCoord) -> bool {
        self.get(cell, WorldLayer::Structure)
            .is_some_and(|tile| tile.kind().encloses())
    }

    fn slot(&self, cell: CellCoord, layer: WorldLayer) -> Option<TileId> {
        let index = self.index(cell)?;
        self.slots.get(index).and_then(|slots| slots[layer.index()])
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.in_bounds(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        Some(row * width + column)
    }
}

/// Reasons a restored tile cannot be re-inserted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RestoreConflict {
    OutOfBounds(CellCoord),
    Overlap(CellCoord, WorldLayer),
}
