use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::common::{path_cost, sum_of_costs, Agent, Path};
use crate::conflict::{detect_conflicts, Conflict};
use crate::constraint::Constraint;
use crate::error::Result;
use crate::grid::Grid;
use crate::solver::astar::{default_horizon, space_time_astar, SearchOutcome};
use crate::solver::{Failure, Limits, PlanResult, Solver};
use crate::stat::Stats;

/// One constraint-tree node: a set of per-agent prohibitions and the best
/// plan satisfying them. Constraint sets and unchanged paths are shared
/// with the parent; branching copies only the affected agent's set and
/// replaces only the affected agent's path.
struct CtNode {
    id: u64,
    constraints: Vec<Arc<HashSet<Constraint>>>,
    paths: Vec<Arc<Path>>,
    cost: usize,
    conflicts: Vec<Conflict>,
}

// Best-first order: cheapest plan, then fewest conflicts, then insertion
// order. The id is unique, so the order is total and runs are repeatable.
impl Ord for CtNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .cmp(&other.cost)
            .then_with(|| self.conflicts.len().cmp(&other.conflicts.len()))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for CtNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for CtNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CtNode {}

/// The two ways to resolve a conflict: forbid one side or the other.
fn branches(conflict: &Conflict) -> [(usize, Constraint); 2] {
    match *conflict {
        Conflict::Vertex { agents: (i, j), cell, t } => [
            (i, Constraint::Vertex { cell, tick: t }),
            (j, Constraint::Vertex { cell, tick: t }),
        ],
        Conflict::Edge { agents: (i, j), from, to, t } => [
            (i, Constraint::Edge { from, to, tick: t }),
            (j, Constraint::Edge { from: to, to: from, tick: t }),
        ],
    }
}

/// Conflict-Based Search: a best-first search over constraint sets whose
/// low level is single-agent space-time A*. Returns the optimal
/// sum-of-costs plan when the caps hold off.
pub struct CBS {
    agents: Vec<Agent>,
    grid: Grid,
    stats: Stats,
}

impl CBS {
    pub fn new(agents: Vec<Agent>, grid: &Grid) -> Self {
        CBS { agents, grid: grid.clone(), stats: Stats::default() }
    }

    fn finished(&mut self, started: Instant, node: CtNode, failure: Option<Failure>) -> PlanResult {
        self.stats.time_ms = started.elapsed().as_secs_f64() * 1e3;
        self.stats.log("cbs");
        PlanResult {
            paths: Some(node.paths),
            exploration: Vec::new(),
            conflicts: node.conflicts,
            stats: self.stats.clone(),
            failure,
        }
    }

    fn unsolved(&mut self, started: Instant, failure: Failure) -> PlanResult {
        self.stats.time_ms = started.elapsed().as_secs_f64() * 1e3;
        PlanResult {
            paths: None,
            exploration: Vec::new(),
            conflicts: Vec::new(),
            stats: self.stats.clone(),
            failure: Some(failure),
        }
    }
}

impl Solver for CBS {
    fn solve(&mut self, limits: &Limits) -> Result<PlanResult> {
        let started = Instant::now();

        let mut root_paths = Vec::with_capacity(self.agents.len());
        for agent in &self.agents {
            let horizon = default_horizon(&self.grid, agent);
            let run = space_time_astar(
                &self.grid,
                agent,
                None,
                None,
                horizon,
                limits,
                started,
                &mut self.stats,
            );
            match run.outcome {
                SearchOutcome::Found(path) => root_paths.push(Arc::new(path)),
                SearchOutcome::Exhausted => {
                    return Ok(self.unsolved(started, Failure::NoSolution))
                }
                SearchOutcome::Capped => return Ok(self.unsolved(started, Failure::Timeout)),
            }
        }

        let root = CtNode {
            id: 0,
            constraints: vec![Arc::new(HashSet::new()); self.agents.len()],
            cost: sum_of_costs(&root_paths),
            conflicts: detect_conflicts(&root_paths),
            paths: root_paths,
        };

        let mut open = BTreeSet::new();
        open.insert(root);
        let mut next_id: u64 = 1;

        while let Some(node) = open.pop_first() {
            self.stats.high_level_expansions += 1;

            if node.conflicts.is_empty() {
                return Ok(self.finished(started, node, None));
            }

            if limits.breached(started, self.stats.high_level_expansions) {
                // Caps hit: hand back the cheapest plan seen, warts and all.
                return Ok(self.finished(started, node, Some(Failure::Timeout)));
            }

            let conflict = node.conflicts[0].clone();
            debug!(
                "expand node {} (cost {}, {} conflicts), branching on {conflict:?}",
                node.id,
                node.cost,
                node.conflicts.len()
            );

            for (agent_id, constraint) in branches(&conflict) {
                let mut constraints = node.constraints.clone();
                Arc::make_mut(&mut constraints[agent_id]).insert(constraint);

                let agent = &self.agents[agent_id];
                let horizon = default_horizon(&self.grid, agent);
                let run = space_time_astar(
                    &self.grid,
                    agent,
                    None,
                    Some(&constraints[agent_id]),
                    horizon,
                    limits,
                    started,
                    &mut self.stats,
                );

                match run.outcome {
                    SearchOutcome::Found(path) => {
                        let mut paths = node.paths.clone();
                        let cost = node.cost - path_cost(&paths[agent_id]) + path_cost(&path);
                        paths[agent_id] = Arc::new(path);
                        let conflicts = detect_conflicts(&paths);
                        open.insert(CtNode { id: next_id, constraints, paths, cost, conflicts });
                        next_id += 1;
                    }
                    // No path satisfies the child's constraints.
                    SearchOutcome::Exhausted => {}
                    SearchOutcome::Capped => {
                        return Ok(self.finished(started, node, Some(Failure::Timeout)));
                    }
                }
            }
        }

        // The whole tree was exhausted without a collision-free plan.
        Ok(self.unsolved(started, Failure::NoSolution))
    }
}
