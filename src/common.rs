use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::grid::{Cell, Grid};

/// A planning task: reach `goal` from `start`. Immutable for the duration
/// of a solve; `id` doubles as the index into path and constraint vectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub start: Cell,
    pub goal: Cell,
}

impl Agent {
    pub fn verify(&self, grid: &Grid) -> bool {
        grid.is_passable(self.start) && grid.is_passable(self.goal)
    }
}

/// Time-indexed route: `path[t]` is the agent's cell at tick `t`. Always
/// non-empty; the agent is parked on `path.last()` for every later tick.
pub type Path = Vec<Cell>;

/// Path cost: number of ticks to arrival.
pub fn path_cost(path: &Path) -> usize {
    path.len() - 1
}

/// Sum of per-agent arrival times. Parking beyond arrival is free.
pub fn sum_of_costs(paths: &[Arc<Path>]) -> usize {
    paths.iter().map(|p| path_cost(p)).sum()
}

/// Latest arrival tick across agents.
pub fn makespan(paths: &[Arc<Path>]) -> usize {
    paths.iter().map(|p| path_cost(p)).max().unwrap_or(0)
}

/// Agent position at `tick`, treating agents past their arrival as parked
/// on the goal.
pub fn position_at(path: &Path, tick: usize) -> Cell {
    *path.get(tick).unwrap_or_else(|| path.last().expect("path is non-empty"))
}

/// Check a finished plan against the per-path invariants: endpoints match
/// the agents, every step is adjacent or a wait, and no step visits a
/// blocked cell. Collision freedom is checked separately by conflict
/// detection.
pub fn verify_paths(grid: &Grid, agents: &[Agent], paths: &[Arc<Path>]) -> bool {
    if paths.len() != agents.len() {
        error!("incomplete plan: {} paths for {} agents", paths.len(), agents.len());
        return false;
    }

    for (path, agent) in paths.iter().zip(agents.iter()) {
        if path.first() != Some(&agent.start) || path.last() != Some(&agent.goal) {
            error!(
                "endpoints mismatch for agent {}: path {:?}..{:?}, agent {:?}..{:?}",
                agent.id,
                path.first(),
                path.last(),
                agent.start,
                agent.goal
            );
            return false;
        }

        for window in path.windows(2) {
            if let [from, to] = window {
                if !are_neighbors(*from, *to) {
                    error!("illegal step {from:?} -> {to:?} for agent {}", agent.id);
                    return false;
                }
            }
        }

        if path.iter().any(|&cell| !grid.is_passable(cell)) {
            error!("path of agent {} visits a blocked cell", agent.id);
            return false;
        }
    }

    true
}

fn are_neighbors(a: Cell, b: Cell) -> bool {
    (a.0 == b.0 && a.1.abs_diff(b.1) == 1) || (a.1 == b.1 && a.0.abs_diff(b.0) == 1) || a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc(path: Vec<Cell>) -> Arc<Path> {
        Arc::new(path)
    }

    #[test]
    fn test_costs() {
        let paths = vec![arc(vec![(0, 0), (0, 1), (0, 2)]), arc(vec![(4, 4)])];
        assert_eq!(sum_of_costs(&paths), 2);
        assert_eq!(makespan(&paths), 2);
    }

    #[test]
    fn test_position_at_parks_on_goal() {
        let path = vec![(0, 0), (0, 1)];
        assert_eq!(position_at(&path, 0), (0, 0));
        assert_eq!(position_at(&path, 1), (0, 1));
        assert_eq!(position_at(&path, 100), (0, 1));
    }

    #[test]
    fn test_verify_accepts_valid_plan() {
        let grid = Grid::open(5);
        let agents = vec![Agent { id: 0, start: (0, 0), goal: (0, 2) }];
        let paths = vec![arc(vec![(0, 0), (0, 1), (0, 2)])];
        assert!(verify_paths(&grid, &agents, &paths));
    }

    #[test]
    fn test_verify_rejects_teleport() {
        let grid = Grid::open(5);
        let agents = vec![Agent { id: 0, start: (0, 0), goal: (0, 2) }];
        let paths = vec![arc(vec![(0, 0), (0, 2)])];
        assert!(!verify_paths(&grid, &agents, &paths));
    }

    #[test]
    fn test_verify_rejects_blocked_cell() {
        let mut grid = Grid::open(5);
        grid.set_block((0, 1), true);
        let agents = vec![Agent { id: 0, start: (0, 0), goal: (0, 2) }];
        let paths = vec![arc(vec![(0, 0), (0, 1), (0, 2)])];
        assert!(!verify_paths(&grid, &agents, &paths));
    }

    #[test]
    fn test_verify_rejects_wrong_endpoints() {
        let grid = Grid::open(5);
        let agents = vec![Agent { id: 0, start: (0, 0), goal: (0, 2) }];
        let paths = vec![arc(vec![(0, 0), (0, 1)])];
        assert!(!verify_paths(&grid, &agents, &paths));
    }
}
