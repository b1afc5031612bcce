//! Weighted navigation graph derived from a snapshot of cell costs.

use colony_core::CellCoord;
use colony_world::{query, World};

const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

/// Movement cost of every cell captured at one layout revision.
#[derive(Clone, Debug, PartialEq)]
pub struct CostField {
    columns: u32,
    rows: u32,
    revision: u64,
    costs: Vec<f32>,
}

impl CostField {
    /// Creates a field from row-major costs; missing entries read as impassable.
    #[must_use]
    pub fn new(columns: u32, rows: u32, revision: u64, mut costs: Vec<f32>) -> Self {
        let expected = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        costs.resize(expected, 0.0);
        Self {
            columns,
            rows,
            revision,
            costs,
        }
    }

    /// Uniform field, handy for open-ground layouts.
    #[must_use]
    pub fn uniform(columns: u32, rows: u32, cost: f32) -> Self {
        let count = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self::new(columns, rows, 0, vec![cost; count])
    }

    /// Captures the current costs of the world grid.
    #[must_use]
    pub fn capture(world: &World) -> Self {
        let grid = query::grid(world);
        Self::new(
            grid.columns(),
            grid.rows(),
            grid.layout_revision(),
            query::movement_costs(world),
        )
    }

    /// Returns the field with the cost of one cell replaced.
    #[must_use]
    pub fn with_cost(mut self, cell: CellCoord, cost: f32) -> Self {
        if let Some(index) = self.index(cell) {
            self.costs[index] = cost.max(0.0);
        }
        self
    }

    /// Layout revision the field was captured at.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Cost of the cell; zero when impassable or outside the field.
    #[must_use]
    pub fn cost(&self, cell: CellCoord) -> f32 {
        self.index(cell)
            .and_then(|index| self.costs.get(index).copied())
            .unwrap_or(0.0)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        Some(row * width + column)
    }
}

/// Directed edge to a neighbouring node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    /// Index of the destination node.
    pub to: usize,
    /// Geometric length of the step: 1 orthogonally, √2 diagonally.
    pub length: f32,
}

/// One node per grid cell with edges to up to eight neighbours.
///
/// Edges exist towards every in-bounds neighbour; whether a neighbour may be
/// entered is decided from its cost during the search, which lets a goal
/// cell be approached even when nobody may stand on it. Diagonal edges are
/// omitted when either orthogonal cell they cut across is impassable.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationGraph {
    field: CostField,
    edges: Vec<Vec<Edge>>,
}

impl NavigationGraph {
    /// Builds the whole graph from a cost snapshot.
    #[must_use]
    pub fn build(field: CostField) -> Self {
        let mut edges = Vec::with_capacity(field.costs.len());
        for row in 0..field.rows {
            for column in 0..field.columns {
                let cell = CellCoord::new(column, row);
                let neighbors = NEIGHBOR_OFFSETS
                    .iter()
                    .filter_map(|&(dx, dy)| {
                        let next = cell.offset(dx, dy)?;
                        let to = field.index(next)?;
                        let diagonal = dx != 0 && dy != 0;
                        if diagonal && !corner_is_open(&field, cell, dx, dy) {
                            return None;
                        }
                        let length = if diagonal { std::f32::consts::SQRT_2 } else { 1.0 };
                        Some(Edge { to, length })
                    })
                    .collect();
                edges.push(neighbors);
            }
        }
        Self { field, edges }
    }

    /// Graph with no nodes.
    #[must_use]
    pub fn empty() -> Self {
        Self::build(CostField::new(0, 0, 0, Vec::new()))
    }

    /// Layout revision the graph reflects.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.field.revision
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Node index of a cell.
    #[must_use]
    pub fn node(&self, cell: CellCoord) -> Option<usize> {
        self.field.index(cell)
    }

    /// Cell represented by a node.
    #[must_use]
    pub fn cell(&self, node: usize) -> Option<CellCoord> {
        let columns = usize::try_from(self.field.columns).ok()?;
        if columns == 0 || node >= self.edges.len() {
            return None;
        }
        let column = u32::try_from(node % columns).ok()?;
        let row = u32::try_from(node / columns).ok()?;
        Some(CellCoord::new(column, row))
    }

    /// Movement cost of the node; zero means impassable.
    #[must_use]
    pub fn cost(&self, node: usize) -> f32 {
        self.field.costs.get(node).copied().unwrap_or(0.0)
    }

    /// Movement cost of a cell; zero means impassable.
    #[must_use]
    pub fn cell_cost(&self, cell: CellCoord) -> f32 {
        self.field.cost(cell)
    }

    /// Outgoing edges of a node.
    #[must_use]
    pub fn edges(&self, node: usize) -> &[Edge] {
        self.edges.get(node).map_or(&[], Vec::as_slice)
    }
}

fn corner_is_open(field: &CostField, cell: CellCoord, dx: i32, dy: i32) -> bool {
    let horizontal = cell.offset(dx, 0).map_or(0.0, |side| field.cost(side));
    let vertical = cell.offset(0, dy).map_or(0.0, |side| field.cost(side));
    horizontal > 0.0 && vertical > 0.0
}
