use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use good_lp::{constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel, Variable};
use tracing::{debug, info};

use crate::common::{Agent, Path};
use crate::error::{Result, SolverError};
use crate::grid::{manhattan, Cell, Grid};
use crate::solver::{Failure, Limits, PlanResult, Solver};
use crate::stat::Stats;

/// Time-expanded 0/1 flow formulation. One binary variable per
/// (agent, passable cell, tick); rows enforce single occupancy, motion
/// along the 4-neighborhood plus waiting, vertex exclusivity, and no edge
/// swaps. The objective counts ticks spent away from the goal, which is
/// exactly the sum of costs.
///
/// Only viable for small instances; the horizon starts at the sum of
/// Manhattan distances plus a pad and doubles on infeasibility.
pub struct MIP {
    agents: Vec<Agent>,
    grid: Grid,
    stats: Stats,
}

enum HorizonOutcome {
    Solved(Vec<Arc<Path>>),
    Infeasible,
    TimedOut,
}

impl MIP {
    pub fn new(agents: Vec<Agent>, grid: &Grid) -> Self {
        MIP { agents, grid: grid.clone(), stats: Stats::default() }
    }

    fn initial_horizon(&self) -> usize {
        let total: usize = self
            .agents
            .iter()
            .map(|a| manhattan(a.start, a.goal))
            .sum();
        (total + self.grid.size()).max(1)
    }

    fn horizon_cap(&self) -> usize {
        4 * self.grid.size() * self.grid.size()
    }

    fn solve_horizon(&mut self, horizon: usize, limits: &Limits, started: Instant) -> Result<HorizonOutcome> {
        let free = self.grid.free_cells();
        let index: HashMap<Cell, usize> = free.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        let num_agents = self.agents.len();

        let mut vars = variables!();
        // x[agent][cell][tick] = 1 iff the agent occupies the cell at the tick.
        let x: Vec<Vec<Vec<Variable>>> = (0..num_agents)
            .map(|_| {
                (0..free.len())
                    .map(|_| (0..=horizon).map(|_| vars.add(variable().binary())).collect())
                    .collect()
            })
            .collect();
        self.stats.low_level_expansions += num_agents * free.len() * (horizon + 1);

        let mut objective = Expression::default();
        for (i, agent) in self.agents.iter().enumerate() {
            let goal = index[&agent.goal];
            for (v, _) in free.iter().enumerate() {
                if v == goal {
                    continue;
                }
                for t in 0..=horizon {
                    objective = objective + x[i][v][t];
                }
            }
        }

        let mut rows = Vec::new();

        for (i, agent) in self.agents.iter().enumerate() {
            // Exactly one position per tick.
            for t in 0..=horizon {
                let occupancy = (0..free.len())
                    .fold(Expression::default(), |acc, v| acc + x[i][v][t]);
                rows.push(constraint!(occupancy == 1));
            }

            // Start and goal boundary conditions.
            let at_start = Expression::from(x[i][index[&agent.start]][0]);
            rows.push(constraint!(at_start == 1));
            let at_goal = Expression::from(x[i][index[&agent.goal]][horizon]);
            rows.push(constraint!(at_goal == 1));

            // Motion: a cell is only reachable from itself or a neighbor.
            for (v, &cell) in free.iter().enumerate() {
                for t in 0..horizon {
                    let sources = self
                        .grid
                        .neighbors(cell)
                        .into_iter()
                        .fold(Expression::default(), |acc, n| acc + x[i][index[&n]][t]);
                    let arrival = Expression::from(x[i][v][t + 1]);
                    rows.push(constraint!(arrival <= sources));
                }
            }
        }

        // At most one agent per cell per tick.
        if num_agents > 1 {
            for v in 0..free.len() {
                for t in 0..=horizon {
                    let load = (0..num_agents)
                        .fold(Expression::default(), |acc, i| acc + x[i][v][t]);
                    rows.push(constraint!(load <= 1));
                }
            }

            // No two agents may swap across an edge between consecutive ticks.
            for (u, &cell) in free.iter().enumerate() {
                for neighbor in self.grid.move_neighbors(cell) {
                    let v = index[&neighbor];
                    for i in 0..num_agents {
                        for j in (i + 1)..num_agents {
                            for t in 0..horizon {
                                let crossing = Expression::from(x[i][u][t])
                                    + x[i][v][t + 1]
                                    + x[j][v][t]
                                    + x[j][u][t + 1];
                                rows.push(constraint!(crossing <= 3));
                            }
                        }
                    }
                }
            }
        }

        let remaining = limits.max_wall.saturating_sub(started.elapsed());
        let mut model = vars.minimise(objective).using(good_lp::coin_cbc);
        model.set_parameter("logLevel", "0");
        model.set_parameter("sec", &format!("{}", remaining.as_secs_f64().max(0.01)));
        for row in rows {
            model = model.with(row);
        }

        match model.solve() {
            Ok(solution) => {
                let mut paths = Vec::with_capacity(num_agents);
                for (i, agent) in self.agents.iter().enumerate() {
                    let mut path: Path = Vec::with_capacity(horizon + 1);
                    for t in 0..=horizon {
                        let cell = free
                            .iter()
                            .enumerate()
                            .find(|&(v, _)| solution.value(x[i][v][t]) > 0.5)
                            .map(|(_, &c)| c)
                            .ok_or_else(|| {
                                SolverError::Internal(format!(
                                    "mip solution places agent {} nowhere at tick {t}",
                                    agent.id
                                ))
                            })?;
                        path.push(cell);
                    }
                    // The agent sits on its goal after arriving; drop the
                    // padded tail so the path ends at the arrival tick.
                    while path.len() > 1
                        && path[path.len() - 1] == agent.goal
                        && path[path.len() - 2] == agent.goal
                    {
                        path.pop();
                    }
                    paths.push(Arc::new(path));
                }
                Ok(HorizonOutcome::Solved(paths))
            }
            Err(ResolutionError::Infeasible) => Ok(HorizonOutcome::Infeasible),
            Err(err) => {
                debug!("mip backend stopped: {err:?}");
                Ok(HorizonOutcome::TimedOut)
            }
        }
    }
}

impl Solver for MIP {
    fn solve(&mut self, limits: &Limits) -> Result<PlanResult> {
        let started = Instant::now();
        let cap = self.horizon_cap();
        let bound: usize = self.agents.iter().map(|a| manhattan(a.start, a.goal)).sum();
        let mut horizon = self.initial_horizon();

        loop {
            info!("mip solve over horizon {horizon} (lower bound {bound})");
            match self.solve_horizon(horizon, limits, started)? {
                HorizonOutcome::Solved(paths) => {
                    self.stats.time_ms = started.elapsed().as_secs_f64() * 1e3;
                    self.stats.log("mip");
                    return Ok(PlanResult {
                        paths: Some(paths),
                        exploration: Vec::new(),
                        conflicts: Vec::new(),
                        stats: self.stats.clone(),
                        failure: None,
                    });
                }
                HorizonOutcome::Infeasible if horizon < cap => {
                    horizon = (horizon * 2).min(cap);
                }
                HorizonOutcome::Infeasible => {
                    self.stats.time_ms = started.elapsed().as_secs_f64() * 1e3;
                    return Ok(PlanResult {
                        paths: None,
                        exploration: Vec::new(),
                        conflicts: Vec::new(),
                        stats: self.stats.clone(),
                        failure: Some(Failure::NoSolution),
                    });
                }
                HorizonOutcome::TimedOut => {
                    self.stats.time_ms = started.elapsed().as_secs_f64() * 1e3;
                    return Ok(PlanResult {
                        paths: None,
                        exploration: Vec::new(),
                        conflicts: Vec::new(),
                        stats: self.stats.clone(),
                        failure: Some(Failure::Timeout),
                    });
                }
            }
        }
    }
}
