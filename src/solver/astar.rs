use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Instant;

use tracing::{instrument, trace};

use crate::common::{Agent, Path};
use crate::constraint::{latest_goal_constraint, Constraint};
use crate::grid::{manhattan, Cell, Grid};
use crate::reservation::ReservationTable;
use crate::solver::Limits;
use crate::stat::Stats;

/// How often the caps are polled, in expansions.
const CAP_CHECK_INTERVAL: usize = 1024;

pub(crate) enum SearchOutcome {
    Found(Path),
    /// The open list emptied: no path within the horizon.
    Exhausted,
    /// A wall-time, expansion, or cancellation cap tripped mid-search.
    Capped,
}

pub(crate) struct SearchRun {
    pub(crate) outcome: SearchOutcome,
    /// Cells in expansion order, for visualization.
    pub(crate) exploration: Vec<Cell>,
}

/// Tick horizon for a single-agent search: generous enough that any
/// reachable goal is reachable within it, even under detours forced by
/// reservations or constraints.
pub(crate) fn default_horizon(grid: &Grid, agent: &Agent) -> usize {
    let n = grid.size();
    (2 * n * n).max(manhattan(agent.start, agent.goal) + 2 * n)
}

#[derive(Clone, PartialEq, Eq, Debug)]
struct OpenNode {
    f: usize,
    h: usize,
    g: usize,
    seq: u64,
    cell: Cell,
}

// (f, h, g, insertion counter): the counter makes the order total, so two
// runs over the same input pop nodes identically.
impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f
            .cmp(&other.f)
            .then_with(|| self.h.cmp(&other.h))
            .then_with(|| self.g.cmp(&other.g))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

type Trace = HashMap<(Cell, usize), (Cell, usize)>;

fn construct_path(trace: &Trace, mut current: (Cell, usize)) -> Path {
    let mut path = vec![current.0];
    while let Some(&(cell, tick)) = trace.get(&current) {
        path.push(cell);
        current = (cell, tick);
    }
    path.reverse();
    path
}

/// Single-agent shortest path in (row, col, tick) space. Honors grid
/// blocks, the reservation table of already-committed agents, and the
/// constraint set handed down by CBS. Cost is uniform, so `g` equals the
/// tick.
///
/// The goal test also requires that parking is safe: no vertex constraint
/// and no reservation may touch the goal cell after the arrival tick.
#[instrument(skip_all, name = "space_time_astar", fields(agent = agent.id), level = "debug")]
pub(crate) fn space_time_astar(
    grid: &Grid,
    agent: &Agent,
    reservations: Option<&ReservationTable>,
    constraints: Option<&HashSet<Constraint>>,
    horizon: usize,
    limits: &Limits,
    started: Instant,
    stats: &mut Stats,
) -> SearchRun {
    let mut open = BTreeSet::new();
    let mut visited: HashSet<(Cell, usize)> = HashSet::new();
    let mut trace: Trace = HashMap::new();
    let mut exploration = Vec::new();
    let mut seq: u64 = 0;
    let mut expanded: usize = 0;

    let goal_blocked_until = constraints.and_then(|c| latest_goal_constraint(c, agent.goal));
    let parking_is_safe = |tick: usize| {
        goal_blocked_until.is_none_or(|latest| tick >= latest)
            && reservations.is_none_or(|r| !r.is_reserved_after(agent.goal, tick))
    };

    let start_h = manhattan(agent.start, agent.goal);
    open.insert(OpenNode { f: start_h, h: start_h, g: 0, seq, cell: agent.start });
    seq += 1;
    visited.insert((agent.start, 0));

    while let Some(node) = open.pop_first() {
        trace!("expand {node:?}");
        stats.low_level_expansions += 1;
        expanded += 1;
        exploration.push(node.cell);

        if expanded % CAP_CHECK_INTERVAL == 0 && limits.breached(started, stats.low_level_expansions)
        {
            return SearchRun { outcome: SearchOutcome::Capped, exploration };
        }

        if node.cell == agent.goal && parking_is_safe(node.g) {
            let path = construct_path(&trace, (node.cell, node.g));
            return SearchRun { outcome: SearchOutcome::Found(path), exploration };
        }

        if node.g >= horizon {
            continue;
        }
        let next_g = node.g + 1;

        for &next in &grid.neighbors(node.cell) {
            if visited.contains(&(next, next_g)) {
                continue;
            }

            if constraints
                .is_some_and(|c| c.iter().any(|con| con.is_violated(node.cell, next, node.g)))
            {
                continue;
            }

            if let Some(table) = reservations {
                if table.is_vertex_reserved(next, next_g) {
                    continue;
                }
                // An already-committed agent crossing the other way.
                if table.is_edge_reserved(next, node.cell, node.g) {
                    continue;
                }
            }

            let h = manhattan(next, agent.goal);
            open.insert(OpenNode { f: next_g + h, h, g: next_g, seq, cell: next });
            seq += 1;
            visited.insert((next, next_g));
            trace.insert((next, next_g), (node.cell, node.g));
            stats.peak_open_size = stats.peak_open_size.max(open.len());
        }
    }

    SearchRun { outcome: SearchOutcome::Exhausted, exploration }
}
