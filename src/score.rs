//! Scores and quality figures of assignments, mainly for the result report.

use super::matrix::UtilityMatrix;
use super::{Assignment, Score, Student};

/// Total utility of the given assignment
pub fn assignment_score(utilities: &UtilityMatrix, assignment: &Assignment) -> Score {
    assignment
        .iter()
        .enumerate()
        .map(|(s, t)| utilities[[s, *t]] as Score)
        .sum()
}

/// Calculate a simple upper bound for the solution score of the given problem, assuming all students can get their
/// best choice.
pub fn theoretical_max_score(utilities: &UtilityMatrix) -> Score {
    utilities
        .outer_iter()
        .map(|row| row.iter().copied().max().unwrap_or(0) as Score)
        .sum()
}

/// Calculate a comparable solution quality (invariant to number of students and rank weights): The ratio of the
/// achieved score to the theoretical maximum score. 1.0 means every student got their best choice.
pub fn solution_quality(score: Score, max_score: Score) -> f32 {
    if max_score == 0 {
        1.0
    } else {
        score as f32 / max_score as f32
    }
}

/// Number of students per assigned choice rank
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankHistogram {
    /// Entry k is the number of students who got their (k+1)-th choice
    pub per_rank: Vec<usize>,
    /// Number of students who got a topic they did not choose at all
    pub unchosen: usize,
}

/// Count, how many students got their first, second, ... choice
pub fn rank_histogram(students: &[Student], assignment: &Assignment) -> RankHistogram {
    let max_rank = students.iter().map(|s| s.preferences.len()).max().unwrap_or(0);
    let mut histogram = RankHistogram {
        per_rank: vec![0; max_rank],
        unchosen: 0,
    };
    for (student, topic) in students.iter().zip(assignment) {
        match student.preferences.iter().position(|t| t == topic) {
            Some(rank) => histogram.per_rank[rank] += 1,
            None => histogram.unchosen += 1,
        }
    }
    histogram
}
