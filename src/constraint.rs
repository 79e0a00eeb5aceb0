use std::collections::HashSet;

use crate::grid::Cell;

/// A single-agent prohibition produced by CBS branching. Constraints are
/// held in per-agent sets, so the record does not repeat the agent id.
///
/// Edge constraints carry the departure tick: the forbidden traversal is
/// `from -> to` between `tick` and `tick + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constraint {
    Vertex { cell: Cell, tick: usize },
    Edge { from: Cell, to: Cell, tick: usize },
}

impl Constraint {
    /// Whether the move `from -> to` departing at `depart` hits this
    /// constraint. A wait is a move with `from == to`.
    pub fn is_violated(&self, from: Cell, to: Cell, depart: usize) -> bool {
        match *self {
            Constraint::Vertex { cell, tick } => to == cell && depart + 1 == tick,
            Constraint::Edge { from: cf, to: ct, tick } => {
                from == cf && to == ct && depart == tick
            }
        }
    }
}

/// Latest tick at which a vertex constraint pins `goal`, if any. The
/// low-level search may only park on the goal after this tick.
pub fn latest_goal_constraint(constraints: &HashSet<Constraint>, goal: Cell) -> Option<usize> {
    constraints
        .iter()
        .filter_map(|c| match *c {
            Constraint::Vertex { cell, tick } if cell == goal => Some(tick),
            _ => None,
        })
        .max()
}
