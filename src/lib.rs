//! Optimal assignment of topics to students.
//!
//! Every student ranks some of the topics. Each rank position is worth a fixed utility (the rank
//! weights). This crate searches an assignment which gives every student exactly one topic, fills
//! every topic exactly up to its capacity and maximizes the summed utility of all students.
//!
//! The pipeline consists of the cost matrix builder (`matrix`), an exact solving engine
//! (`hungarian` or `bnb`, selected in `solver`) and the verifier (`verify`), which checks every
//! assignment before it is handed out.

mod bab;
mod bnb;
pub mod error;
mod hungarian;
pub mod io;
pub mod matrix;
pub mod score;
pub mod solver;
pub mod verify;

use serde::{Deserialize, Serialize};

pub use error::{AssignmentError, EngineError};
pub use solver::{solve, EngineKind, Solution, SolverOptions};

/// Type of a single utility value (rank weight / utility matrix entry)
pub type Utility = u32;

/// Type of the total utility of an assignment (target function value)
pub type Score = u64;

/// Representation of a topic, which can be given to `capacity` students
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Topic {
    /// id/index of the Topic in the list of topics
    #[serde(skip)]
    pub index: usize,
    /// Topic's name. Mainly used for info/debug output
    pub name: String,
    /// Number of students, who must get this topic
    pub capacity: usize,
}

/// Representation of a student's data
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Student {
    /// id/index of the Student in the list of students
    #[serde(skip)]
    pub index: usize,
    /// Student's name. Must be unique.
    pub name: String,
    /// Preferred topics as indexes into the list of topics, best choice first
    pub preferences: Vec<usize>,
}

/// Utility values of the ranks: Entry k is awarded to a student who gets their (k+1)-th choice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankWeights(pub Vec<Utility>);

impl RankWeights {
    /// Utility of the given (0-based) rank position, if the weights cover it
    pub fn get(&self, rank: usize) -> Option<Utility> {
        self.0.get(rank).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of the assignment: The topic index for every student (in the order of the students).
pub type Assignment = Vec<usize>;

/// Total number of topic slots, i.e. the sum of all topics' capacities
pub fn total_capacity(topics: &[Topic]) -> usize {
    topics.iter().map(|t| t.capacity).sum()
}

/// Check the balance invariant: There must be exactly one topic slot per student.
pub fn check_balance(topics: &[Topic], students: &[Student]) -> Result<(), AssignmentError> {
    let capacity = total_capacity(topics);
    if capacity != students.len() {
        return Err(AssignmentError::InfeasibleByConstruction {
            capacity,
            students: students.len(),
        });
    }
    Ok(())
}

/// Testing helper: Check that indexes and references of the given students and topics are
/// consistent.
#[cfg(test)]
pub fn assert_data_consitency(students: &[Student], topics: &[Topic]) {
    for (i, t) in topics.iter().enumerate() {
        assert_eq!(i, t.index, "Index of {}. topic is {}", i, t.index);
        assert!(t.capacity >= 1, "Topic {} has no capacity", i);
    }
    for (i, s) in students.iter().enumerate() {
        assert_eq!(i, s.index, "Index of {}. student is {}", i, s.index);
        for t in s.preferences.iter() {
            assert!(
                *t < topics.len(),
                "Preference {} of student {} is not a valid topic index",
                t,
                i
            );
        }
    }
}
