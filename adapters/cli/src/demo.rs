//! Seeded starting layout for headless runs.

use colony_core::{
    CellCoord, CellRect, CellRectSize, Command, Event, ResourceKind, ResourceTable, Rotation,
    WorldLayer,
};
use colony_simulation::Colony;
use rand::Rng;
use tracing::debug;

/// Smallest grid the demo layout fits on.
pub(crate) const MIN_COLUMNS: u32 = 16;
/// Smallest grid the demo layout fits on.
pub(crate) const MIN_ROWS: u32 = 12;

const HUT_ORIGIN: CellCoord = CellCoord::new(1, 1);
const HUT_SIZE: CellRectSize = CellRectSize::new(6, 5);
const DOOR: CellCoord = CellCoord::new(6, 3);
const BED: CellCoord = CellCoord::new(2, 2);
const WORKSHOP: CellCoord = CellCoord::new(4, 2);
const WORKSHOP_JOBS: u32 = 3;
const SCATTER_DENSITY: u32 = 12;
const FELLED_TREES: usize = 3;

/// Builds the starting colony: a furnished hut, scattered trees and rocks,
/// a few orders for the workers and `agents` workers inside the hut.
pub(crate) fn populate<R: Rng>(colony: &mut Colony, rng: &mut R, agents: u32, out: &mut Vec<Event>) {
    colony.apply(
        Command::AddResources {
            resources: ResourceTable::new()
                .with(ResourceKind::Wood, 12)
                .with(ResourceKind::Stone, 4),
        },
        out,
    );

    let hut = CellRect::from_origin_and_size(HUT_ORIGIN, HUT_SIZE);
    build_hut(colony, hut, out);
    let trees = scatter(colony, rng, hut, out);

    for tree in trees.into_iter().take(FELLED_TREES) {
        colony.apply(
            Command::DesignateDemolish {
                cell: tree,
                layer: WorldLayer::Structure,
            },
            out,
        );
    }

    let columns = colony.config().columns;
    let rows = colony.config().rows;
    for column in (columns / 2)..(columns / 2 + 4) {
        designate(colony, "wall", CellCoord::new(column, rows - 3), out);
    }
    designate(colony, "floor", CellCoord::new(columns / 2, rows - 4), out);

    let interior: Vec<CellCoord> = hut
        .cells()
        .filter(|cell| !on_border(hut, *cell) && *cell != BED)
        .collect();
    for index in 0..agents {
        let cell = interior[index as usize % interior.len()];
        let _ = colony.spawn_agent(cell, out);
    }
}

fn build_hut(colony: &mut Colony, hut: CellRect, out: &mut Vec<Event>) {
    for cell in hut.cells() {
        if on_border(hut, cell) {
            if cell != DOOR {
                place(colony, "wall", cell, out);
            }
        } else {
            place(colony, "floor", cell, out);
        }
    }
    place(colony, "door", DOOR, out);
    place(colony, "bed", BED, out);
    place(colony, "crafting_table", WORKSHOP, out);
    colony.apply(
        Command::SetWorkshopJobCount {
            cell: WORKSHOP,
            job_count: WORKSHOP_JOBS,
        },
        out,
    );
}

/// Places trees and rocks away from the hut and returns the tree cells.
fn scatter<R: Rng>(
    colony: &mut Colony,
    rng: &mut R,
    hut: CellRect,
    out: &mut Vec<Event>,
) -> Vec<CellCoord> {
    let columns = colony.config().columns;
    let rows = colony.config().rows;
    let attempts = columns * rows / SCATTER_DENSITY;
    let keep_clear = CellRect::from_origin_and_size(
        CellCoord::new(0, 0),
        CellRectSize::new(hut.size().width() + 3, hut.size().height() + 3),
    );
    let orders_row = rows - 5;

    let mut trees = Vec::new();
    for _ in 0..attempts {
        let cell = CellCoord::new(rng.gen_range(0..columns), rng.gen_range(0..rows));
        if keep_clear.contains(cell) || cell.row() >= orders_row {
            continue;
        }
        let template = if rng.gen_bool(0.7) { "tree" } else { "rock" };
        let before = out.len();
        place(colony, template, cell, out);
        let placed = out[before..]
            .iter()
            .any(|event| matches!(event, Event::TileUpdated { .. }));
        if placed && template == "tree" {
            trees.push(cell);
        }
    }
    debug!(attempts, trees = trees.len(), "scattered terrain features");
    trees
}

fn place(colony: &mut Colony, template: &str, cell: CellCoord, out: &mut Vec<Event>) {
    colony.apply(
        Command::PlaceTile {
            template: template.to_owned(),
            base: cell,
            rotation: Rotation::Deg0,
        },
        out,
    );
}

fn designate(colony: &mut Colony, template: &str, cell: CellCoord, out: &mut Vec<Event>) {
    colony.apply(
        Command::DesignateBuild {
            template: template.to_owned(),
            base: cell,
            rotation: Rotation::Deg0,
        },
        out,
    );
}

fn on_border(rect: CellRect, cell: CellCoord) -> bool {
    let origin = rect.origin();
    let size = rect.size();
    cell.column() == origin.column()
        || cell.row() == origin.row()
        || cell.column() == origin.column() + size.width() - 1
        || cell.row() == origin.row() + size.height() - 1
}

#[cfg(test)]
mod tests {
    use colony_core::TileKind;
    use colony_simulation::ColonyConfig;
    use colony_system_navigation::Dispatch;
    use colony_world::query;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn demo(seed: u64) -> Colony {
        let config = ColonyConfig::new(24, 16).with_dispatch(Dispatch::Inline);
        let mut colony = Colony::new(config);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        populate(&mut colony, &mut rng, 3, &mut Vec::new());
        colony
    }

    #[test]
    fn hut_is_furnished_and_staffed() {
        let colony = demo(7);
        let grid = query::grid(colony.world());
        let kind = |cell: CellCoord| {
            grid.get(cell, WorldLayer::Structure)
                .map(|tile| tile.kind())
        };
        assert_eq!(kind(BED), Some(TileKind::Bed));
        assert_eq!(kind(DOOR), Some(TileKind::Door));
        assert_eq!(kind(WORKSHOP), Some(TileKind::CraftingTable));
        assert!(grid.beds().contains(&BED));
        assert_eq!(colony.agents().len(), 3);
        assert!(query::jobs(colony.world()).len() >= 5);
    }

    #[test]
    fn equal_seeds_produce_equal_layouts() {
        assert_eq!(demo(11).snapshot(), demo(11).snapshot());
    }
}
