use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// Grid coordinate as (row, col), 0-based.
pub type Cell = (usize, usize);

/// Square occupancy grid. `blocks[r][c] == true` means the cell is
/// impassable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    size: usize,
    blocks: Vec<Vec<bool>>,
}

impl Grid {
    pub fn from_blocks(size: usize, blocks: Vec<Vec<bool>>) -> Result<Self> {
        if size == 0 {
            return Err(SolverError::InvalidInput("grid size must be positive".into()));
        }
        if blocks.len() != size || blocks.iter().any(|row| row.len() != size) {
            return Err(SolverError::InvalidInput(format!(
                "blocks matrix must be {size}x{size}"
            )));
        }
        Ok(Grid { size, blocks })
    }

    /// An empty (fully passable) grid.
    pub fn open(size: usize) -> Self {
        Grid {
            size,
            blocks: vec![vec![false; size]; size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn blocks(&self) -> &[Vec<bool>] {
        &self.blocks
    }

    pub fn set_block(&mut self, cell: Cell, blocked: bool) {
        self.blocks[cell.0][cell.1] = blocked;
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.0 < self.size && cell.1 < self.size
    }

    pub fn is_passable(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && !self.blocks[cell.0][cell.1]
    }

    /// Reachable cells in one tick: the four orthogonal neighbors plus the
    /// cell itself (wait), filtered to passable cells.
    pub fn neighbors(&self, cell: Cell) -> Vec<Cell> {
        let directions = [(-1, 0), (1, 0), (0, -1), (0, 1), (0, 0)];
        let mut neighbors = Vec::with_capacity(5);

        for &(dr, dc) in &directions {
            let r = cell.0 as i64 + dr;
            let c = cell.1 as i64 + dc;
            if r >= 0 && c >= 0 {
                let next = (r as usize, c as usize);
                if self.is_passable(next) {
                    neighbors.push(next);
                }
            }
        }

        neighbors
    }

    /// Orthogonal neighbors only, no wait.
    pub fn move_neighbors(&self, cell: Cell) -> Vec<Cell> {
        self.neighbors(cell)
            .into_iter()
            .filter(|&n| n != cell)
            .collect()
    }

    /// Passable cells in row-major order.
    pub fn free_cells(&self) -> Vec<Cell> {
        let mut cells = Vec::new();
        for r in 0..self.size {
            for c in 0..self.size {
                if !self.blocks[r][c] {
                    cells.push((r, c));
                }
            }
        }
        cells
    }

    /// Blocked cells within Manhattan distance `radius` of `cell`.
    pub fn blocked_within(&self, cell: Cell, radius: usize) -> usize {
        let mut count = 0;
        let r0 = cell.0.saturating_sub(radius);
        let c0 = cell.1.saturating_sub(radius);
        for r in r0..=(cell.0 + radius).min(self.size - 1) {
            for c in c0..=(cell.1 + radius).min(self.size - 1) {
                let dist = cell.0.abs_diff(r) + cell.1.abs_diff(c);
                if dist <= radius && self.blocks[r][c] {
                    count += 1;
                }
            }
        }
        count
    }
}

pub fn manhattan(a: Cell, b: Cell) -> usize {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_include_wait() {
        let grid = Grid::open(5);
        let neighbors = grid.neighbors((2, 2));
        assert_eq!(neighbors.len(), 5);
        assert!(neighbors.contains(&(2, 2)));
        assert!(neighbors.contains(&(1, 2)));
        assert!(neighbors.contains(&(3, 2)));
        assert!(neighbors.contains(&(2, 1)));
        assert!(neighbors.contains(&(2, 3)));
    }

    #[test]
    fn test_neighbors_clipped_at_border() {
        let grid = Grid::open(5);
        let neighbors = grid.neighbors((0, 0));
        assert_eq!(neighbors.len(), 3);
        assert!(neighbors.contains(&(0, 0)));
        assert!(neighbors.contains(&(0, 1)));
        assert!(neighbors.contains(&(1, 0)));
    }

    #[test]
    fn test_blocked_cells_are_not_neighbors() {
        let mut grid = Grid::open(5);
        grid.set_block((1, 2), true);
        let neighbors = grid.neighbors((2, 2));
        assert!(!neighbors.contains(&(1, 2)));
        assert_eq!(neighbors.len(), 4);
    }

    #[test]
    fn test_from_blocks_rejects_ragged_matrix() {
        let blocks = vec![vec![false; 5], vec![false; 4]];
        assert!(Grid::from_blocks(2, blocks).is_err());
    }

    #[test]
    fn test_manhattan() {
        assert_eq!(manhattan((0, 0), (3, 4)), 7);
        assert_eq!(manhattan((3, 4), (0, 0)), 7);
        assert_eq!(manhattan((2, 2), (2, 2)), 0);
    }

    #[test]
    fn test_blocked_within() {
        let mut grid = Grid::open(5);
        grid.set_block((0, 1), true);
        grid.set_block((1, 0), true);
        grid.set_block((4, 4), true);
        assert_eq!(grid.blocked_within((0, 0), 2), 2);
        assert_eq!(grid.blocked_within((4, 4), 0), 1);
    }
}
