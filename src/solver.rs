mod astar;
mod cbs;
mod cooperative;
mod independent;
#[cfg(feature = "mip")]
mod mip;

pub use cbs::CBS;
pub use cooperative::{Cooperative, PriorityPolicy};
pub use independent::Independent;
#[cfg(feature = "mip")]
pub use mip::MIP;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::common::{makespan, sum_of_costs, verify_paths, Agent, Path};
use crate::conflict::Conflict;
use crate::error::{Result, SolverError};
use crate::grid::Grid;
use crate::request::{Algorithm, SolveMetrics, SolveRequest, SolveResponse};
use crate::stat::Stats;

/// Grid side bounds accepted on the solve surface.
pub const MIN_GRID_SIZE: usize = 5;
pub const MAX_GRID_SIZE: usize = 20;

/// Caps and cancellation shared by all planners. The cancel flag is
/// observed at the same granularity as the caps; there is no forced
/// termination.
#[derive(Debug, Clone)]
pub struct Limits {
    pub max_wall: Duration,
    pub max_expansions: usize,
    pub cancel: Arc<AtomicBool>,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_wall: Duration::from_secs(100),
            max_expansions: 1_000_000,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Limits {
    pub fn breached(&self, started: Instant, expansions: usize) -> bool {
        expansions >= self.max_expansions
            || started.elapsed() >= self.max_wall
            || self.cancel.load(Ordering::Relaxed)
    }
}

/// Why a planner came back without a successful plan. Neither is an
/// error: both are ordinary outcomes reported with `success = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    NoSolution,
    Timeout,
}

/// What a planner hands back. `paths[i]` belongs to agent id `i`. A capped
/// CBS run still carries the cheapest (conflicted) plan it saw.
#[derive(Debug, Clone)]
pub struct PlanResult {
    pub paths: Option<Vec<Arc<Path>>>,
    pub exploration: Vec<Vec<(usize, usize)>>,
    pub conflicts: Vec<Conflict>,
    pub stats: Stats,
    pub failure: Option<Failure>,
}

impl PlanResult {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }
}

/// The uniform planner contract: run to completion or to a cap.
pub trait Solver {
    fn solve(&mut self, limits: &Limits) -> Result<PlanResult>;
}

/// Solve a request with limits derived from it.
pub fn solve(request: &SolveRequest) -> Result<SolveResponse> {
    if !request.max_time.is_finite() || request.max_time < 0.0 {
        return Err(SolverError::InvalidInput(format!(
            "max_time {} is not a non-negative duration",
            request.max_time
        )));
    }
    let limits = Limits {
        max_wall: Duration::from_secs_f64(request.max_time),
        ..Limits::default()
    };
    solve_with_limits(request, &limits)
}

/// Solve a request under caller-supplied limits, e.g. to share a cancel
/// flag with the surrounding request handler.
pub fn solve_with_limits(request: &SolveRequest, limits: &Limits) -> Result<SolveResponse> {
    let (grid, agents) = validate(request)?;
    info!(
        "running {} for {} agents on a {}x{} grid",
        request.algorithm.name(),
        agents.len(),
        grid.size(),
        grid.size()
    );

    let result = match request.algorithm {
        Algorithm::Independent => Independent::new(agents.clone(), &grid).solve(limits)?,
        Algorithm::Cooperative => {
            Cooperative::new(agents.clone(), &grid, request.priority_policy).solve(limits)?
        }
        Algorithm::Cbs => CBS::new(agents.clone(), &grid).solve(limits)?,
        #[cfg(feature = "mip")]
        Algorithm::Mip => MIP::new(agents.clone(), &grid).solve(limits)?,
        #[cfg(not(feature = "mip"))]
        Algorithm::Mip => return Err(SolverError::MipUnavailable),
    };

    if result.success() {
        let paths = result
            .paths
            .as_ref()
            .ok_or_else(|| SolverError::Internal("successful result carries no paths".into()))?;
        if !verify_paths(&grid, &agents, paths) {
            return Err(SolverError::Internal(format!(
                "{} returned an invalid plan",
                request.algorithm.name()
            )));
        }
        if request.algorithm != Algorithm::Independent && !result.conflicts.is_empty() {
            return Err(SolverError::Internal(format!(
                "{} reported success with {} conflicts",
                request.algorithm.name(),
                result.conflicts.len()
            )));
        }
    }

    Ok(build_response(result))
}

fn validate(request: &SolveRequest) -> Result<(Grid, Vec<Agent>)> {
    if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&request.size) {
        return Err(SolverError::InvalidInput(format!(
            "grid size {} outside [{MIN_GRID_SIZE}, {MAX_GRID_SIZE}]",
            request.size
        )));
    }
    if !request.max_time.is_finite() || request.max_time < 0.0 {
        return Err(SolverError::InvalidInput(format!(
            "max_time {} is not a non-negative duration",
            request.max_time
        )));
    }

    let grid = Grid::from_blocks(request.size, request.blocks.clone())?;

    // paths[i] answers for agent id i, so ids must be exactly 0..n.
    let mut agents: Vec<Option<Agent>> = vec![None; request.agents.len()];
    for spec in &request.agents {
        let agent = Agent {
            id: spec.id,
            start: (spec.start[0], spec.start[1]),
            goal: (spec.goal[0], spec.goal[1]),
        };
        let slot = agents.get_mut(spec.id).ok_or_else(|| {
            SolverError::InvalidInput(format!(
                "agent id {} outside 0..{}",
                spec.id,
                request.agents.len()
            ))
        })?;
        if slot.is_some() {
            return Err(SolverError::InvalidInput(format!("duplicate agent id {}", spec.id)));
        }
        if !grid.in_bounds(agent.start) || !grid.in_bounds(agent.goal) {
            return Err(SolverError::InvalidInput(format!(
                "agent {} endpoints out of bounds",
                agent.id
            )));
        }
        if !agent.verify(&grid) {
            return Err(SolverError::InvalidInput(format!(
                "agent {} starts or ends on a blocked cell",
                agent.id
            )));
        }
        *slot = Some(agent);
    }
    let agents: Vec<Agent> = agents.into_iter().map(|a| a.expect("every id filled")).collect();

    let mut starts = HashSet::new();
    let mut goals = HashSet::new();
    for agent in &agents {
        if !starts.insert(agent.start) {
            return Err(SolverError::InvalidInput(format!(
                "agents share start cell {:?}",
                agent.start
            )));
        }
        if !goals.insert(agent.goal) {
            return Err(SolverError::InvalidInput(format!(
                "agents share goal cell {:?}",
                agent.goal
            )));
        }
    }

    Ok((grid, agents))
}

fn build_response(result: PlanResult) -> SolveResponse {
    let success = result.success();
    let paths: Option<Vec<Vec<[usize; 2]>>> = result.paths.as_ref().map(|paths| {
        paths
            .iter()
            .map(|p| p.iter().map(|&(r, c)| [r, c]).collect())
            .collect()
    });

    let (soc, span) = match &result.paths {
        Some(paths) => (sum_of_costs(paths), makespan(paths)),
        None => (0, 0),
    };

    SolveResponse {
        paths,
        exploration_orders: result
            .exploration
            .into_iter()
            .map(|cells| cells.into_iter().map(|(r, c)| [r, c]).collect())
            .collect(),
        metrics: SolveMetrics {
            success,
            sum_of_costs: soc,
            makespan: span,
            num_conflicts: result.conflicts.len(),
            explored_size: result.stats.explored(),
            time_taken_ms: result.stats.time_ms,
        },
        conflicts: result.conflicts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AgentSpec;

    fn request(size: usize, agents: Vec<AgentSpec>) -> SolveRequest {
        SolveRequest {
            blocks: vec![vec![false; size]; size],
            agents,
            size,
            algorithm: Algorithm::Cbs,
            max_time: 10.0,
            priority_policy: PriorityPolicy::default(),
        }
    }

    fn spec(id: usize, start: [usize; 2], goal: [usize; 2]) -> AgentSpec {
        AgentSpec { id, start, goal }
    }

    #[test]
    fn test_rejects_undersized_grid() {
        let req = request(3, vec![spec(0, [0, 0], [1, 1])]);
        assert!(matches!(solve(&req), Err(SolverError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let req = request(5, vec![spec(0, [0, 0], [1, 1]), spec(0, [2, 2], [3, 3])]);
        assert!(matches!(solve(&req), Err(SolverError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_gapped_ids() {
        let req = request(5, vec![spec(0, [0, 0], [1, 1]), spec(2, [2, 2], [3, 3])]);
        assert!(matches!(solve(&req), Err(SolverError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_out_of_bounds_goal() {
        let req = request(5, vec![spec(0, [0, 0], [5, 0])]);
        assert!(matches!(solve(&req), Err(SolverError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_blocked_start() {
        let mut req = request(5, vec![spec(0, [0, 0], [4, 4])]);
        req.blocks[0][0] = true;
        assert!(matches!(solve(&req), Err(SolverError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_shared_start_cell() {
        let req = request(5, vec![spec(0, [0, 0], [1, 1]), spec(1, [0, 0], [3, 3])]);
        assert!(matches!(solve(&req), Err(SolverError::InvalidInput(_))));
    }

    #[test]
    fn test_start_equals_goal_yields_trivial_path() {
        let req = request(5, vec![spec(0, [2, 2], [2, 2])]);
        let response = solve(&req).unwrap();
        assert!(response.metrics.success);
        assert_eq!(response.paths, Some(vec![vec![[2, 2]]]));
        assert_eq!(response.metrics.sum_of_costs, 0);
        assert_eq!(response.metrics.makespan, 0);
    }

    #[cfg(not(feature = "mip"))]
    #[test]
    fn test_mip_unavailable_without_backend() {
        let mut req = request(5, vec![spec(0, [0, 0], [4, 4])]);
        req.algorithm = Algorithm::Mip;
        assert!(matches!(solve(&req), Err(SolverError::MipUnavailable)));
    }
}
