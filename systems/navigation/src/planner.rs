//! A* search over a navigation graph snapshot.

use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
};

use colony_core::CellCoord;

use crate::graph::NavigationGraph;

#[derive(Clone, Copy, Debug)]
struct OpenEntry {
    f_score: f32,
    sequence: u64,
    node: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .total_cmp(&other.f_score)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// Finds the cheapest route from `start` to `goal`.
///
/// The returned waypoints exclude `start` and end with `goal`. An empty
/// route means the goal is unreachable, outside the graph, or equal to the
/// start. Entering a cell costs its movement multiplier times the step
/// length and the Euclidean heuristic never overestimates that, so on open
/// uniform ground the route has Chebyshev length. The goal itself is always
/// enterable. Among equal f-scores the earliest discovered node is expanded
/// first.
#[must_use]
pub fn find_path(graph: &NavigationGraph, start: CellCoord, goal: CellCoord) -> Vec<CellCoord> {
    let (Some(start_node), Some(goal_node)) = (graph.node(start), graph.node(goal)) else {
        return Vec::new();
    };
    if start_node == goal_node {
        return Vec::new();
    }

    let node_count = graph.len();
    let mut g_score = vec![f32::INFINITY; node_count];
    let mut came_from: Vec<Option<usize>> = vec![None; node_count];
    let mut closed = vec![false; node_count];
    let mut open = BinaryHeap::new();
    let mut sequence = 0_u64;

    g_score[start_node] = 0.0;
    open.push(Reverse(OpenEntry {
        f_score: start.euclidean_distance(goal),
        sequence,
        node: start_node,
    }));

    while let Some(Reverse(entry)) = open.pop() {
        let current = entry.node;
        if closed[current] {
            continue;
        }
        if current == goal_node {
            return reconstruct(graph, &came_from, goal_node);
        }
        closed[current] = true;

        for edge in graph.edges(current) {
            if closed[edge.to] {
                continue;
            }
            let multiplier = match graph.cost(edge.to) {
                cost if cost > 0.0 => cost,
                _ if edge.to == goal_node => 1.0,
                _ => continue,
            };
            let tentative = g_score[current] + multiplier * edge.length;
            if tentative >= g_score[edge.to] {
                continue;
            }
            g_score[edge.to] = tentative;
            came_from[edge.to] = Some(current);

            let Some(cell) = graph.cell(edge.to) else {
                continue;
            };
            sequence += 1;
            open.push(Reverse(OpenEntry {
                f_score: tentative + cell.euclidean_distance(goal),
                sequence,
                node: edge.to,
            }));
        }
    }

    Vec::new()
}

fn reconstruct(graph: &NavigationGraph, came_from: &[Option<usize>], goal: usize) -> Vec<CellCoord> {
    let mut path = Vec::new();
    let mut current = goal;
    while let Some(previous) = came_from[current] {
        if let Some(cell) = graph.cell(current) {
            path.push(cell);
        }
        current = previous;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CostField;

    fn open_graph(columns: u32, rows: u32) -> NavigationGraph {
        NavigationGraph::build(CostField::uniform(columns, rows, 1.0))
    }

    #[test]
    fn open_grid_paths_have_chebyshev_length() {
        let graph = open_graph(8, 8);
        let start = CellCoord::new(0, 0);
        for goal in [
            CellCoord::new(7, 7),
            CellCoord::new(5, 2),
            CellCoord::new(1, 6),
            CellCoord::new(7, 0),
        ] {
            let path = find_path(&graph, start, goal);
            assert_eq!(path.len() as u32, start.chebyshev_distance(goal), "goal {goal:?}");
            assert_eq!(path.last(), Some(&goal));
            let mut previous = start;
            for waypoint in &path {
                assert_eq!(previous.chebyshev_distance(*waypoint), 1);
                previous = *waypoint;
            }
        }
    }

    #[test]
    fn blocked_corridor_yields_empty_path() {
        let field = CostField::uniform(5, 1, 1.0).with_cost(CellCoord::new(2, 0), 0.0);
        let graph = NavigationGraph::build(field);
        assert!(find_path(&graph, CellCoord::new(0, 0), CellCoord::new(4, 0)).is_empty());
    }

    #[test]
    fn impassable_goal_is_still_reachable() {
        let field = CostField::uniform(5, 1, 1.0).with_cost(CellCoord::new(4, 0), 0.0);
        let graph = NavigationGraph::build(field);
        let path = find_path(&graph, CellCoord::new(0, 0), CellCoord::new(4, 0));
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn expensive_cells_are_avoided() {
        let field = CostField::uniform(3, 3, 1.0)
            .with_cost(CellCoord::new(1, 0), 10.0)
            .with_cost(CellCoord::new(1, 1), 10.0);
        let graph = NavigationGraph::build(field);
        let path = find_path(&graph, CellCoord::new(0, 0), CellCoord::new(2, 0));
        assert!(!path.contains(&CellCoord::new(1, 0)));
        assert!(!path.contains(&CellCoord::new(1, 1)));
        assert!(path.contains(&CellCoord::new(1, 2)));
    }

    #[test]
    fn degenerate_requests_yield_empty_paths() {
        let graph = open_graph(3, 3);
        assert!(find_path(&graph, CellCoord::new(1, 1), CellCoord::new(1, 1)).is_empty());
        assert!(find_path(&graph, CellCoord::new(0, 0), CellCoord::new(9, 9)).is_empty());
    }

    #[test]
    fn identical_requests_yield_identical_paths() {
        let graph = open_graph(10, 10);
        let first = find_path(&graph, CellCoord::new(0, 3), CellCoord::new(9, 5));
        let second = find_path(&graph, CellCoord::new(0, 3), CellCoord::new(9, 5));
        assert_eq!(first, second);
    }
}
