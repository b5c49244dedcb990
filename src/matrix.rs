//! Construction of the utility matrix from the students' ranked preferences.
//!
//! The utility matrix has one row per student and one column per topic. Topics with a capacity
//! greater than one can be expanded into multiple identical columns ("topic slots") to turn the
//! problem into a square one-to-one assignment problem (see `SlotMap`).

use super::{AssignmentError, RankWeights, Student, Topic, Utility};

/// Dense utility matrix: `matrix[[s, t]]` is the utility of giving topic (or slot) t to student s.
pub type UtilityMatrix = ndarray::Array2<Utility>;

/// Build the students × topics utility matrix.
///
/// Entry (s, t) is the rank weight of the position of topic t in student s's preference list or
/// zero, if the student did not choose topic t.
///
/// # Errors
///
/// Fails with `MalformedPreference`, if any preference is not a valid topic index, a topic is
/// listed twice by the same student, or a student ranks more topics than rank weights are given.
pub fn build_utility_matrix(
    topics: &[Topic],
    students: &[Student],
    weights: &RankWeights,
) -> Result<UtilityMatrix, AssignmentError> {
    let mut matrix = UtilityMatrix::zeros([students.len(), topics.len()]);
    for (s, student) in students.iter().enumerate() {
        for (rank, t) in student.preferences.iter().enumerate() {
            if *t >= topics.len() {
                return Err(malformed(
                    student,
                    format!(
                        "topic {} does not exist (only {} topics given)",
                        t + 1,
                        topics.len()
                    ),
                ));
            }
            if student.preferences[..rank].contains(t) {
                return Err(malformed(
                    student,
                    format!("topic {} is chosen more than once", t + 1),
                ));
            }
            let weight = weights.get(rank).ok_or_else(|| {
                malformed(
                    student,
                    format!(
                        "choice {} has no rank weight (only {} weights given)",
                        rank + 1,
                        weights.len()
                    ),
                )
            })?;
            matrix[[s, *t]] = weight;
        }
    }
    Ok(matrix)
}

fn malformed(student: &Student, reason: String) -> AssignmentError {
    AssignmentError::MalformedPreference {
        student: student.name.clone(),
        reason,
    }
}

/// Mapping between topics and their slots (one slot per unit of capacity)
#[derive(Debug, Clone)]
pub struct SlotMap {
    /// Maps each slot to the index of the topic it belongs to
    pub slot_topic: Vec<usize>,
}

impl SlotMap {
    pub fn new(capacities: &[usize]) -> SlotMap {
        let mut slot_topic = Vec::with_capacity(capacities.iter().sum());
        for (t, capacity) in capacities.iter().enumerate() {
            slot_topic.extend(std::iter::repeat(t).take(*capacity));
        }
        SlotMap { slot_topic }
    }

    /// Total number of slots
    pub fn len(&self) -> usize {
        self.slot_topic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slot_topic.is_empty()
    }
}

/// Expand the students × topics matrix into a students × slots matrix, where each slot column
/// is a copy of its topic's column.
pub fn expand_columns(matrix: &UtilityMatrix, slots: &SlotMap) -> UtilityMatrix {
    let mut expanded = UtilityMatrix::zeros([matrix.nrows(), slots.len()]);
    for (j, t) in slots.slot_topic.iter().enumerate() {
        expanded.column_mut(j).assign(&matrix.column(*t));
    }
    expanded
}
