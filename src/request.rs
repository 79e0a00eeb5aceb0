use serde::{Deserialize, Serialize};

use crate::conflict::Conflict;
use crate::solver::PriorityPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Independent,
    Cooperative,
    Cbs,
    Mip,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Independent => "independent",
            Algorithm::Cooperative => "cooperative",
            Algorithm::Cbs => "cbs",
            Algorithm::Mip => "mip",
        }
    }
}

fn default_max_time() -> f64 {
    100.0
}

/// One agent as it appears on the wire: coordinates as `[row, col]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: usize,
    pub start: [usize; 2],
    pub goal: [usize; 2],
}

/// A solve request: the grid, the agents, the algorithm, and the caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRequest {
    pub blocks: Vec<Vec<bool>>,
    pub agents: Vec<AgentSpec>,
    pub size: usize,
    pub algorithm: Algorithm,
    /// Wall-clock budget in seconds.
    #[serde(default = "default_max_time")]
    pub max_time: f64,
    /// Agent ordering for the cooperative planner; ignored elsewhere.
    #[serde(default)]
    pub priority_policy: PriorityPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveMetrics {
    pub success: bool,
    pub sum_of_costs: usize,
    pub makespan: usize,
    pub num_conflicts: usize,
    pub explored_size: usize,
    pub time_taken_ms: f64,
}

/// The uniform result envelope. `paths[i]` belongs to the agent with id
/// `i`; `paths` is null when the solve failed outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveResponse {
    pub paths: Option<Vec<Vec<[usize; 2]>>>,
    pub exploration_orders: Vec<Vec<[usize; 2]>>,
    pub metrics: SolveMetrics,
    pub conflicts: Vec<Conflict>,
}
