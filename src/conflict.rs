use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::{position_at, Path};
use crate::grid::Cell;

/// A collision between two agents' paths.
///
/// Edge conflicts carry the departure tick: the swap happens while both
/// agents move between `t` and `t + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Conflict {
    Vertex {
        agents: (usize, usize),
        cell: Cell,
        t: usize,
    },
    Edge {
        agents: (usize, usize),
        from: Cell,
        to: Cell,
        t: usize,
    },
}

impl Conflict {
    pub fn tick(&self) -> usize {
        match self {
            Conflict::Vertex { t, .. } | Conflict::Edge { t, .. } => *t,
        }
    }

    pub fn agents(&self) -> (usize, usize) {
        match self {
            Conflict::Vertex { agents, .. } | Conflict::Edge { agents, .. } => *agents,
        }
    }

    fn key(&self) -> (usize, u8, Cell, Cell, usize, usize) {
        match *self {
            Conflict::Vertex { agents, cell, t } => (t, 0, cell, cell, agents.0, agents.1),
            Conflict::Edge { agents, from, to, t } => (t, 1, from, to, agents.0, agents.1),
        }
    }
}

// Conflicts order by tick first so that the minimum is the one CBS
// branches on.
impl Ord for Conflict {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Conflict {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Scan every agent pair for vertex and edge conflicts. Agents that have
/// arrived are treated as parked on their goal cell. The returned list is
/// sorted, so the first entry is the branching conflict.
pub fn detect_conflicts(paths: &[Arc<Path>]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for i in 0..paths.len() {
        for j in (i + 1)..paths.len() {
            let horizon = paths[i].len().max(paths[j].len());

            for t in 0..horizon {
                let pos_i = position_at(&paths[i], t);
                let pos_j = position_at(&paths[j], t);

                if pos_i == pos_j {
                    conflicts.push(Conflict::Vertex {
                        agents: (i, j),
                        cell: pos_i,
                        t,
                    });
                }

                if t + 1 < horizon {
                    let next_i = position_at(&paths[i], t + 1);
                    let next_j = position_at(&paths[j], t + 1);
                    if pos_i != next_i && pos_i == next_j && next_i == pos_j {
                        conflicts.push(Conflict::Edge {
                            agents: (i, j),
                            from: pos_i,
                            to: next_i,
                            t,
                        });
                    }
                }
            }
        }
    }

    conflicts.sort();
    debug!("detected conflicts: {conflicts:?}");
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc(path: Vec<Cell>) -> Arc<Path> {
        Arc::new(path)
    }

    #[test]
    fn test_no_conflicts_on_disjoint_paths() {
        let paths = vec![
            arc(vec![(0, 0), (0, 1), (0, 2)]),
            arc(vec![(2, 0), (2, 1), (2, 2)]),
        ];
        assert!(detect_conflicts(&paths).is_empty());
    }

    #[test]
    fn test_vertex_conflict_midway() {
        let paths = vec![
            arc(vec![(0, 0), (0, 1), (0, 2)]),
            arc(vec![(0, 2), (0, 1), (0, 0)]),
        ];
        let conflicts = detect_conflicts(&paths);
        assert_eq!(
            conflicts,
            vec![Conflict::Vertex { agents: (0, 1), cell: (0, 1), t: 1 }]
        );
    }

    #[test]
    fn test_edge_conflict_on_swap() {
        let paths = vec![
            arc(vec![(0, 0), (0, 1)]),
            arc(vec![(0, 1), (0, 0)]),
        ];
        let conflicts = detect_conflicts(&paths);
        assert_eq!(
            conflicts,
            vec![Conflict::Edge { agents: (0, 1), from: (0, 0), to: (0, 1), t: 0 }]
        );
    }

    #[test]
    fn test_parked_agent_still_occupies_goal() {
        // Agent 0 arrives at (0,2) at t=2 and parks; agent 1 drives over
        // that cell at t=3.
        let paths = vec![
            arc(vec![(0, 0), (0, 1), (0, 2)]),
            arc(vec![(3, 2), (2, 2), (1, 2), (0, 2), (0, 3)]),
        ];
        let conflicts = detect_conflicts(&paths);
        assert_eq!(
            conflicts,
            vec![Conflict::Vertex { agents: (0, 1), cell: (0, 2), t: 3 }]
        );
    }

    #[test]
    fn test_conflicts_sorted_by_tick() {
        let paths = vec![
            arc(vec![(0, 0), (0, 1), (0, 2), (0, 3)]),
            arc(vec![(1, 1), (0, 1), (0, 2), (0, 3)]),
        ];
        let conflicts = detect_conflicts(&paths);
        assert!(conflicts.len() >= 2);
        assert!(conflicts.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(conflicts[0].tick(), 1);
    }

    #[test]
    fn test_wire_shape() {
        let conflict = Conflict::Vertex { agents: (0, 1), cell: (2, 3), t: 4 };
        let json = serde_json::to_value(&conflict).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "vertex", "agents": [0, 1], "cell": [2, 3], "t": 4})
        );
    }
}
