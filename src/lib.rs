//! Multi-agent pathfinding (MAPF) on square grids.
//!
//! Agents move in discrete ticks over a 4-connected grid and must never
//! share a cell or swap across an edge. Four planners share one data
//! model: an uncoordinated per-agent baseline, prioritized planning over
//! a reservation table, Conflict-Based Search, and (behind the `mip`
//! feature) a time-expanded integer program. The [`solver::solve`] façade
//! dispatches by algorithm name and returns a uniform result envelope.

pub mod common;
pub mod conflict;
pub mod constraint;
pub mod error;
pub mod grid;
pub mod request;
pub mod reservation;
pub mod scenario;
pub mod solver;
pub mod stat;

pub use common::{Agent, Path};
pub use conflict::{detect_conflicts, Conflict};
pub use constraint::Constraint;
pub use error::SolverError;
pub use grid::{Cell, Grid};
pub use request::{Algorithm, SolveRequest, SolveResponse};
pub use reservation::ReservationTable;
pub use solver::{solve, solve_with_limits, Failure, Limits, PlanResult, PriorityPolicy, Solver};
