//! Verification of (calculated or externally provided) assignments against the hard constraints of the problem:
//!
//! 1. Every student is assigned to exactly one topic.
//! 2. Every topic is assigned to exactly as many students as its capacity.
//!
//! Both checks are always executed completely, so all violations can be reported. The verifier never repairs an
//! assignment.

use super::{Assignment, AssignmentError, Topic};
use log::{error, warn};

/// A topic with a wrong number of assigned students
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapacityViolation {
    pub topic: usize,
    pub expected: usize,
    pub actual: usize,
}

/// Result of the verification of an assignment
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Verification {
    /// Indexes of students, which are not assigned to exactly one valid topic
    pub incomplete_students: Vec<usize>,
    /// Topics with a wrong number of students
    pub capacity_violations: Vec<CapacityViolation>,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        self.incomplete_students.is_empty() && self.capacity_violations.is_empty()
    }

    /// Convert into a Result, reporting the most severe finding: Capacity violations are fatal and take precedence over
    /// incomplete student assignments.
    pub fn into_result(self) -> Result<(), AssignmentError> {
        if let Some(v) = self.capacity_violations.into_iter().next() {
            return Err(AssignmentError::AssignmentCapacityViolated {
                topic: v.topic,
                expected: v.expected,
                actual: v.actual,
            });
        }
        if !self.incomplete_students.is_empty() {
            return Err(AssignmentError::AssignmentIncomplete {
                students: self.incomplete_students,
            });
        }
        Ok(())
    }
}

/// Verify an assignment, given as the topic index for each student.
///
/// Missing entries (assignment shorter than the list of students), surplus entries and entries with an invalid topic
/// index count as incomplete students. Only valid entries are counted for the topics' sizes.
pub fn verify(topics: &[Topic], num_students: usize, assignment: &Assignment) -> Verification {
    let mut incomplete_students: Vec<usize> = (assignment.len()..num_students).collect();
    let mut topic_size = vec![0usize; topics.len()];
    for (s, t) in assignment.iter().enumerate() {
        if s >= num_students || *t >= topics.len() {
            incomplete_students.push(s);
        } else {
            topic_size[*t] += 1;
        }
    }
    incomplete_students.sort_unstable();

    report(check_topic_sizes(topics, &topic_size), incomplete_students)
}

/// Verify an assignment given as a 0/1 selection matrix (students × topics), as produced by an external optimization
/// engine. Returns the verification result and the converted assignment, if every student has exactly one topic.
///
/// Columns beyond the number of topics do not represent valid topics; selections in them count as invalid.
pub fn verify_selection(
    topics: &[Topic],
    selection: &ndarray::Array2<bool>,
) -> (Verification, Option<Assignment>) {
    let mut incomplete_students = Vec::new();
    let mut topic_size = vec![0usize; topics.len()];
    let mut assignment = Assignment::with_capacity(selection.nrows());
    for (s, row) in selection.outer_iter().enumerate() {
        let chosen: Vec<usize> = row
            .iter()
            .enumerate()
            .filter(|(_, x)| **x)
            .map(|(t, _)| t)
            .collect();
        for t in chosen.iter().filter(|t| **t < topics.len()) {
            topic_size[*t] += 1;
        }
        match chosen.as_slice() {
            [t] if *t < topics.len() => assignment.push(*t),
            _ => incomplete_students.push(s),
        }
    }

    let complete = incomplete_students.is_empty();
    let verification = report(check_topic_sizes(topics, &topic_size), incomplete_students);
    (verification, if complete { Some(assignment) } else { None })
}

/// An assignment to be verified, in one of the representations the verifier understands
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Candidate {
    /// Topic index for each student
    Assignment(Assignment),
    /// 0/1 selection matrix (students × topics)
    Selection(ndarray::Array2<bool>),
}

/// Verify an assignment in any representation for the given number of students. Returns the verification result and the
/// assignment (topic index for each student), if every student has exactly one topic.
///
/// Missing and surplus rows of a selection matrix count as incomplete students, like missing and surplus entries of a
/// dense assignment.
pub fn verify_candidate(
    topics: &[Topic],
    num_students: usize,
    candidate: &Candidate,
) -> (Verification, Option<Assignment>) {
    match candidate {
        Candidate::Assignment(assignment) => {
            let verification = verify(topics, num_students, assignment);
            let complete = verification.incomplete_students.is_empty();
            (verification, if complete { Some(assignment.clone()) } else { None })
        }
        Candidate::Selection(selection) => {
            let num_rows = selection.nrows();
            if num_rows == num_students {
                return verify_selection(topics, selection);
            }
            let rows = selection
                .slice(ndarray::s![..num_rows.min(num_students), ..])
                .to_owned();
            let (mut verification, _) = verify_selection(topics, &rows);
            for s in num_rows.min(num_students)..num_rows.max(num_students) {
                warn!("Student {} is not assigned to exactly one topic", s);
                verification.incomplete_students.push(s);
            }
            (verification, None)
        }
    }
}

fn check_topic_sizes(topics: &[Topic], topic_size: &[usize]) -> Vec<CapacityViolation> {
    topics
        .iter()
        .zip(topic_size)
        .enumerate()
        .filter(|(_, (topic, size))| topic.capacity != **size)
        .map(|(t, (topic, size))| CapacityViolation {
            topic: t,
            expected: topic.capacity,
            actual: *size,
        })
        .collect()
}

fn report(capacity_violations: Vec<CapacityViolation>, incomplete_students: Vec<usize>) -> Verification {
    for s in incomplete_students.iter() {
        warn!("Student {} is not assigned to exactly one topic", s);
    }
    for v in capacity_violations.iter() {
        error!(
            "Topic {} has {} assigned students, but its capacity is {}",
            v.topic, v.actual, v.expected
        );
    }
    Verification {
        incomplete_students,
        capacity_violations,
    }
}
