use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::Agent;
use crate::conflict::detect_conflicts;
use crate::error::{Result, SolverError};
use crate::grid::{manhattan, Grid};
use crate::reservation::ReservationTable;
use crate::solver::astar::{default_horizon, space_time_astar, SearchOutcome};
use crate::solver::{Failure, Limits, PlanResult, Solver};
use crate::stat::Stats;

/// Search window for counting obstacles around a start cell.
const CONSTRAINED_RADIUS: usize = 2;

/// Order in which the prioritized planner serves agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityPolicy {
    /// Longest Manhattan distance first; ties by ascending id.
    #[default]
    DistanceFirst,
    /// Most obstacles near the start first; ties by ascending id.
    ConstrainedFirst,
    /// Ascending id.
    IdOrder,
}

fn plan_order(grid: &Grid, agents: &[Agent], policy: PriorityPolicy) -> Vec<Agent> {
    let mut ordered = agents.to_vec();
    match policy {
        PriorityPolicy::DistanceFirst => {
            ordered.sort_by_key(|a| (Reverse(manhattan(a.start, a.goal)), a.id));
        }
        PriorityPolicy::ConstrainedFirst => {
            ordered.sort_by_key(|a| (Reverse(grid.blocked_within(a.start, CONSTRAINED_RADIUS)), a.id));
        }
        PriorityPolicy::IdOrder => {
            ordered.sort_by_key(|a| a.id);
        }
    }
    ordered
}

/// Prioritized planning: agents plan one at a time in priority order, each
/// against the reservations left behind by its predecessors. Greedy and
/// incomplete, but fast; a bad ordering can doom a solvable instance.
pub struct Cooperative {
    agents: Vec<Agent>,
    grid: Grid,
    policy: PriorityPolicy,
    stats: Stats,
}

impl Cooperative {
    pub fn new(agents: Vec<Agent>, grid: &Grid, policy: PriorityPolicy) -> Self {
        Cooperative { agents, grid: grid.clone(), policy, stats: Stats::default() }
    }
}

impl Solver for Cooperative {
    fn solve(&mut self, limits: &Limits) -> Result<PlanResult> {
        let started = Instant::now();
        let mut table = ReservationTable::new();
        let mut paths = vec![None; self.agents.len()];
        let mut exploration = vec![Vec::new(); self.agents.len()];
        let mut timed_out = false;

        for agent in plan_order(&self.grid, &self.agents, self.policy) {
            let horizon = default_horizon(&self.grid, &agent);
            let run = space_time_astar(
                &self.grid,
                &agent,
                Some(&table),
                None,
                horizon,
                limits,
                started,
                &mut self.stats,
            );
            exploration[agent.id] = run.exploration;

            match run.outcome {
                SearchOutcome::Found(path) => {
                    table.commit_path(&path);
                    paths[agent.id] = Some(Arc::new(path));
                }
                SearchOutcome::Exhausted => {
                    // The remaining agents still get their chance.
                    debug!("agent {} found no path under current reservations", agent.id);
                }
                SearchOutcome::Capped => {
                    timed_out = true;
                    break;
                }
            }
        }

        self.stats.time_ms = started.elapsed().as_secs_f64() * 1e3;

        if timed_out {
            return Ok(PlanResult {
                paths: None,
                exploration,
                conflicts: Vec::new(),
                stats: self.stats.clone(),
                failure: Some(Failure::Timeout),
            });
        }

        if paths.iter().any(|p| p.is_none()) {
            return Ok(PlanResult {
                paths: None,
                exploration,
                conflicts: Vec::new(),
                stats: self.stats.clone(),
                failure: Some(Failure::NoSolution),
            });
        }

        let paths: Vec<_> = paths.into_iter().map(|p| p.expect("checked above")).collect();

        // Reservations make collisions impossible; anything found here is
        // a bug in the table or the search.
        let conflicts = detect_conflicts(&paths);
        if !conflicts.is_empty() {
            return Err(SolverError::Internal(format!(
                "prioritized plan has {} conflicts, first: {:?}",
                conflicts.len(),
                conflicts[0]
            )));
        }

        self.stats.log("cooperative");
        Ok(PlanResult {
            paths: Some(paths),
            exploration,
            conflicts,
            stats: self.stats.clone(),
            failure: None,
        })
    }
}
