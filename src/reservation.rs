use std::collections::{HashMap, HashSet};

use crate::common::Path;
use crate::grid::Cell;

/// Space-time occupancy of already-committed agents, used by prioritized
/// planning. Sparse: transient vertices, directed edges keyed by departure
/// tick, and a parked-from map for indefinite goal parking. A per-cell
/// latest-tick index answers "anything after t" queries in O(1).
#[derive(Debug, Clone, Default)]
pub struct ReservationTable {
    vertices: HashSet<(Cell, usize)>,
    edges: HashSet<(Cell, Cell, usize)>,
    parked_from: HashMap<Cell, usize>,
    latest_tick: HashMap<Cell, usize>,
}

impl ReservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_vertex_reserved(&self, cell: Cell, tick: usize) -> bool {
        self.vertices.contains(&(cell, tick))
            || self.parked_from.get(&cell).is_some_and(|&from| tick >= from)
    }

    /// Whether the directed traversal `from -> to` departing at `tick` is
    /// already taken.
    pub fn is_edge_reserved(&self, from: Cell, to: Cell, tick: usize) -> bool {
        self.edges.contains(&(from, to, tick))
    }

    /// Whether any committed agent touches `cell` strictly after `tick`.
    /// A cell someone parks on is occupied at every later tick.
    pub fn is_reserved_after(&self, cell: Cell, tick: usize) -> bool {
        self.parked_from.contains_key(&cell)
            || self.latest_tick.get(&cell).is_some_and(|&latest| latest > tick)
    }

    /// Reserve every cell a path visits, every directed edge it traverses,
    /// and its goal cell from arrival onwards.
    pub fn commit_path(&mut self, path: &Path) {
        for (tick, &cell) in path.iter().enumerate() {
            self.vertices.insert((cell, tick));
            let latest = self.latest_tick.entry(cell).or_insert(tick);
            *latest = (*latest).max(tick);
        }

        for (tick, window) in path.windows(2).enumerate() {
            if let [from, to] = window {
                if from != to {
                    self.edges.insert((*from, *to, tick));
                }
            }
        }

        let goal = *path.last().expect("path is non-empty");
        self.parked_from.insert(goal, path.len() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_reserves_vertices_and_edges() {
        let mut table = ReservationTable::new();
        table.commit_path(&vec![(0, 0), (0, 1), (0, 2)]);

        assert!(table.is_vertex_reserved((0, 0), 0));
        assert!(table.is_vertex_reserved((0, 1), 1));
        assert!(!table.is_vertex_reserved((0, 1), 0));

        assert!(table.is_edge_reserved((0, 0), (0, 1), 0));
        assert!(table.is_edge_reserved((0, 1), (0, 2), 1));
        assert!(!table.is_edge_reserved((0, 1), (0, 0), 0));
    }

    #[test]
    fn test_goal_parking_is_indefinite() {
        let mut table = ReservationTable::new();
        table.commit_path(&vec![(0, 0), (0, 1), (0, 2)]);

        assert!(table.is_vertex_reserved((0, 2), 2));
        assert!(table.is_vertex_reserved((0, 2), 50));
        assert!(!table.is_vertex_reserved((0, 2), 1));
    }

    #[test]
    fn test_waits_do_not_reserve_edges() {
        let mut table = ReservationTable::new();
        table.commit_path(&vec![(0, 0), (0, 0), (0, 1)]);
        assert!(!table.is_edge_reserved((0, 0), (0, 0), 0));
        assert!(table.is_edge_reserved((0, 0), (0, 1), 1));
    }

    #[test]
    fn test_reserved_after() {
        let mut table = ReservationTable::new();
        table.commit_path(&vec![(0, 0), (0, 1), (0, 2)]);

        // (0,1) is crossed at t=1 and never again.
        assert!(table.is_reserved_after((0, 1), 0));
        assert!(!table.is_reserved_after((0, 1), 1));

        // The goal is parked on, so it is occupied at every later tick.
        assert!(table.is_reserved_after((0, 2), 100));
        assert!(!table.is_reserved_after((3, 3), 0));
    }
}
