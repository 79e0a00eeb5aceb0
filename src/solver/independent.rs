use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::common::Agent;
use crate::conflict::detect_conflicts;
use crate::error::Result;
use crate::grid::Grid;
use crate::solver::astar::{default_horizon, space_time_astar, SearchOutcome};
use crate::solver::{Failure, Limits, PlanResult, Solver};
use crate::stat::Stats;

/// Baseline planner: every agent plans alone, nobody coordinates. The
/// resulting collisions are detected and reported, but they do not make
/// the solve unsuccessful; this planner exists to show what coordination
/// buys.
pub struct Independent {
    agents: Vec<Agent>,
    grid: Grid,
    stats: Stats,
}

impl Independent {
    pub fn new(agents: Vec<Agent>, grid: &Grid) -> Self {
        Independent { agents, grid: grid.clone(), stats: Stats::default() }
    }
}

impl Solver for Independent {
    fn solve(&mut self, limits: &Limits) -> Result<PlanResult> {
        let started = Instant::now();
        let mut paths = Vec::with_capacity(self.agents.len());
        let mut exploration = Vec::with_capacity(self.agents.len());

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
            exploration.push(run.exploration);

            let failure = match run.outcome {
                SearchOutcome::Found(path) => {
                    paths.push(Arc::new(path));
                    continue;
                }
                SearchOutcome::Exhausted => {
                    debug!("agent {} has no path", agent.id);
                    Failure::NoSolution
                }
                SearchOutcome::Capped => Failure::Timeout,
            };

            self.stats.time_ms = started.elapsed().as_secs_f64() * 1e3;
            return Ok(PlanResult {
                paths: None,
                exploration,
                conflicts: Vec::new(),
                stats: self.stats.clone(),
                failure: Some(failure),
            });
        }

        let conflicts = detect_conflicts(&paths);
        self.stats.time_ms = started.elapsed().as_secs_f64() * 1e3;
        self.stats.log("independent");

        Ok(PlanResult {
            paths: Some(paths),
            exploration,
            conflicts,
            stats: self.stats.clone(),
            failure: None,
        })
    }
}
