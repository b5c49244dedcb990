//! The assignment solver: Check the problem, build the utility matrix, let an exact solving engine calculate an optimal
//! assignment and verify the engine's result before handing it out.
//!
//! The solving engine is exchangeable via the `SolvingEngine` trait. Two exact engines are provided: the hungarian
//! method on slot-expanded topics (default) and a parallel branch and bound search. The engine runs on its own thread,
//! so the caller can give up waiting after a timeout. In that case, the engine is told to stop via its cancel flag.

use super::hungarian::hungarian_algorithm;
use super::matrix::{build_utility_matrix, expand_columns, SlotMap, UtilityMatrix};
use super::{check_balance, verify, Assignment, RankWeights, Score, Student, Topic};
use super::{AssignmentError, EngineError};
use log::{debug, info, warn};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(test)]
mod tests;

/// The optimization problem as passed to a solving engine: Maximize the sum of utilities, such that every row
/// (student) is assigned to exactly one column (topic) and every column t is assigned exactly `capacities[t]` times.
#[derive(Clone, Debug)]
pub struct EngineProblem {
    /// students × topics utility matrix
    pub utilities: UtilityMatrix,
    /// Capacity of each topic
    pub capacities: Vec<usize>,
}

/// Flag to tell a running engine that nobody waits for its result anymore
pub type CancelFlag = Arc<AtomicBool>;

/// An exact solving engine for the balanced assignment problem.
///
/// Implementations must either return a complete optimal assignment or a definitive failure, never a partial or
/// approximate result.
pub trait SolvingEngine: Send + Sync {
    /// Human readable name of the engine for log output
    fn name(&self) -> &str;

    /// Calculate an optimal assignment (topic index for each student).
    ///
    /// Long running engines should check `cancel` regularly and return `EngineError::Cancelled` as soon as it is set.
    fn solve(&self, problem: &EngineProblem, cancel: &CancelFlag) -> Result<Assignment, EngineError>;
}

/// Hungarian method on the students × topic slots matrix
#[derive(Clone, Copy, Debug, Default)]
pub struct HungarianEngine;

impl SolvingEngine for HungarianEngine {
    fn name(&self) -> &str {
        "hungarian"
    }

    fn solve(&self, problem: &EngineProblem, cancel: &CancelFlag) -> Result<Assignment, EngineError> {
        let slots = SlotMap::new(&problem.capacities);
        if slots.len() != problem.utilities.nrows() {
            return Err(EngineError::Infeasible);
        }
        let adjacency_matrix = expand_columns(&problem.utilities, &slots);
        let (matching, score) =
            hungarian_algorithm(&adjacency_matrix, cancel).ok_or(EngineError::Cancelled)?;
        debug!("Hungarian method found matching with score {}", score);

        // Convert topic slot matching to topic assignment
        Ok(matching.iter().map(|slot| slots.slot_topic[*slot]).collect())
    }
}

/// Parallel branch and bound search over the students' topics
#[derive(Clone, Copy, Debug)]
pub struct BranchAndBoundEngine {
    pub num_threads: u32,
}

impl SolvingEngine for BranchAndBoundEngine {
    fn name(&self) -> &str {
        "branch-and-bound"
    }

    fn solve(&self, problem: &EngineProblem, cancel: &CancelFlag) -> Result<Assignment, EngineError> {
        let (result, statistics) = super::bnb::solve(
            Arc::new(problem.clone()),
            self.num_threads,
            cancel.clone(),
        );
        info!(
            "Branch and bound evaluated {} nodes ({} bounded, {} improvements)",
            statistics.num_nodes, statistics.num_bounded, statistics.num_improvements
        );
        if statistics.cancelled {
            return Err(EngineError::Cancelled);
        }
        match result {
            Some((assignment, _score)) => Ok(assignment),
            None => Err(EngineError::Infeasible),
        }
    }
}

/// Selection of the built-in solving engines
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineKind {
    Hungarian,
    BranchAndBound,
}

impl EngineKind {
    /// Create the engine with the given number of worker threads (if the engine uses threads at all)
    pub fn create(self, num_threads: u32) -> Arc<dyn SolvingEngine> {
        match self {
            EngineKind::Hungarian => Arc::new(HungarianEngine),
            EngineKind::BranchAndBound => Arc::new(BranchAndBoundEngine { num_threads }),
        }
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hungarian" => Ok(EngineKind::Hungarian),
            "bab" | "branch-and-bound" => Ok(EngineKind::BranchAndBound),
            _ => Err(format!("Unknown solving engine '{}'", s)),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Hungarian => write!(f, "hungarian"),
            EngineKind::BranchAndBound => write!(f, "bab"),
        }
    }
}

/// Options of the solving process
#[derive(Clone, Debug)]
pub struct SolverOptions {
    pub engine: EngineKind,
    /// Maximum time to wait for the solving engine. None means waiting forever.
    pub timeout: Option<Duration>,
    /// Number of worker threads for engines which support parallel execution
    pub num_threads: u32,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            engine: EngineKind::Hungarian,
            timeout: None,
            num_threads: 1,
        }
    }
}

/// A verified optimal assignment with its total utility
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    pub assignment: Assignment,
    pub score: Score,
}

/// Main method of the module to solve a topic assignment problem with the engine selected in the options.
///
/// # Errors
///
/// * `InfeasibleByConstruction`, if the topics' capacities do not sum up to the number of students
/// * `MalformedPreference`, if the preferences do not fit the topics or rank weights
/// * `SolverUnavailable`, `Infeasible`, `Unbounded`, if the engine does not deliver an assignment
/// * `AssignmentCapacityViolated`, `AssignmentIncomplete`, if the engine's assignment does not pass the verification
pub fn solve(
    topics: &[Topic],
    students: &[Student],
    weights: &RankWeights,
    options: &SolverOptions,
) -> Result<Solution, AssignmentError> {
    let engine = options.engine.create(options.num_threads);
    solve_with_engine(topics, students, weights, engine, options.timeout)
}

/// Solve a topic assignment problem with the given solving engine.
pub fn solve_with_engine(
    topics: &[Topic],
    students: &[Student],
    weights: &RankWeights,
    engine: Arc<dyn SolvingEngine>,
    timeout: Option<Duration>,
) -> Result<Solution, AssignmentError> {
    check_balance(topics, students)?;
    let utilities = build_utility_matrix(topics, students, weights)?;
    info!(
        "Solving assignment of {} topics to {} students with engine {}",
        topics.len(),
        students.len(),
        engine.name()
    );

    let problem = EngineProblem {
        utilities,
        capacities: topics.iter().map(|t| t.capacity).collect(),
    };
    let start = Instant::now();
    let (assignment, problem) = run_engine(engine, problem, timeout)?;
    debug!("Solving engine finished after {:?}", start.elapsed());

    verify::verify(topics, students.len(), &assignment).into_result()?;

    let score = super::score::assignment_score(&problem.utilities, &assignment);
    info!("Found verified assignment with total utility {}", score);
    Ok(Solution { assignment, score })
}

/// Run the engine on a separate thread and wait for its result (at most `timeout`, if given). The problem is handed
/// back together with the result. When the timeout expires, the engine's cancel flag is set.
fn run_engine(
    engine: Arc<dyn SolvingEngine>,
    problem: EngineProblem,
    timeout: Option<Duration>,
) -> Result<(Assignment, EngineProblem), AssignmentError> {
    let name = engine.name().to_owned();
    let cancel: CancelFlag = Arc::new(AtomicBool::new(false));
    let engine_cancel = cancel.clone();
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name(format!("engine-{}", name))
        .spawn(move || {
            let result = engine.solve(&problem, &engine_cancel);
            // The receiver may have given up already
            let _ = sender.send(result.map(|assignment| (assignment, problem)));
        })
        .map_err(|e| {
            AssignmentError::SolverUnavailable(format!("Could not start engine {}: {}", name, e))
        })?;

    let result = match timeout {
        Some(timeout) => receiver.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => {
                cancel.store(true, Ordering::SeqCst);
                warn!("Engine {} timed out, cancelling it", name);
                AssignmentError::SolverUnavailable(format!(
                    "Engine {} did not finish within {:?}",
                    name, timeout
                ))
            }
            RecvTimeoutError::Disconnected => engine_crashed(&name),
        })?,
        None => receiver.recv().map_err(|_| engine_crashed(&name))?,
    };
    result.map_err(AssignmentError::from)
}

fn engine_crashed(name: &str) -> AssignmentError {
    AssignmentError::SolverUnavailable(format!("Engine {} terminated abnormally", name))
}
