//! Error types of the assignment pipeline.

use std::fmt;

/// Everything that can go wrong between reading the preferences and handing out a verified
/// assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    /// A student's preference list references an invalid topic, names a topic twice or is longer
    /// than the list of rank weights.
    MalformedPreference { student: String, reason: String },
    /// The sum of all topic capacities differs from the number of students. No assignment can
    /// exist, so the solving engine is not even asked.
    InfeasibleByConstruction { capacity: usize, students: usize },
    /// The solving engine could not be run, crashed or exceeded the time limit.
    SolverUnavailable(String),
    /// The solving engine proved that no valid assignment exists.
    Infeasible,
    /// The solving engine reported an unbounded objective.
    Unbounded,
    /// The listed students (indexes) are not assigned to exactly one topic.
    AssignmentIncomplete { students: Vec<usize> },
    /// A topic did not get exactly as many students as its capacity.
    AssignmentCapacityViolated {
        topic: usize,
        expected: usize,
        actual: usize,
    },
}

impl AssignmentError {
    /// Fatal errors indicate a defect of the solver or the validation. No result must be reported
    /// and the process has to exit with failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AssignmentError::AssignmentCapacityViolated { .. })
    }
}

impl fmt::Display for AssignmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentError::MalformedPreference { student, reason } => {
                write!(f, "Malformed preferences of student '{}': {}", student, reason)
            }
            AssignmentError::InfeasibleByConstruction { capacity, students } => write!(
                f,
                "Number of all topic places ({}) does not match number of students ({})",
                capacity, students
            ),
            AssignmentError::SolverUnavailable(reason) => {
                write!(f, "Solving engine unavailable: {}", reason)
            }
            AssignmentError::Infeasible => write!(f, "Problem is infeasible"),
            AssignmentError::Unbounded => write!(f, "Problem is unbounded"),
            AssignmentError::AssignmentIncomplete { students } => write!(
                f,
                "Assignment is incomplete: {} student(s) without exactly one topic ({:?})",
                students.len(),
                students
            ),
            AssignmentError::AssignmentCapacityViolated {
                topic,
                expected,
                actual,
            } => write!(
                f,
                "Topic {} has {} assigned students instead of {}",
                topic, actual, expected
            ),
        }
    }
}

impl std::error::Error for AssignmentError {}

/// Definitive failure classification of a solving engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    Infeasible,
    Unbounded,
    /// The engine stopped because its caller gave up waiting. No (partial) result is available.
    Cancelled,
    /// Any other failure of the engine. No (partial) result is available.
    Failed(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Infeasible => write!(f, "infeasible"),
            EngineError::Unbounded => write!(f, "unbounded"),
            EngineError::Cancelled => write!(f, "cancelled"),
            EngineError::Failed(reason) => write!(f, "engine failure: {}", reason),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<EngineError> for AssignmentError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Infeasible => AssignmentError::Infeasible,
            EngineError::Unbounded => AssignmentError::Unbounded,
            EngineError::Cancelled => {
                AssignmentError::SolverUnavailable("engine was cancelled".to_owned())
            }
            EngineError::Failed(reason) => AssignmentError::SolverUnavailable(reason),
        }
    }
}
