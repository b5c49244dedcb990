//! Reading the problem data and presenting the results.

pub mod lines;
pub mod simple;

use super::score::{rank_histogram, solution_quality};
use super::{Assignment, Score, Student, Topic};
use std::fmt::Write;

/// Format the calculated topic assignment into a human readable String (e.g. to print it to
/// stdout).
///
/// The output format will look like
/// ```text
/// ===== Topic name =====
/// Anton Administrator (choice 1)
/// Bertalotta Beispiel (not chosen)
///
/// ===== Another topic name =====
/// …
/// ```
pub fn format_assignment(assignment: &Assignment, topics: &[Topic], students: &[Student]) -> String {
    let mut result = String::new();
    for t in topics.iter() {
        write!(result, "\n===== {} =====\n", t.name).unwrap();
        for (s, at) in assignment.iter().enumerate() {
            if *at == t.index {
                let student = &students[s];
                let choice = match student.preferences.iter().position(|p| *p == t.index) {
                    Some(rank) => format!("choice {}", rank + 1),
                    None => "not chosen".to_owned(),
                };
                writeln!(result, "{} ({})", student.name, choice).unwrap();
            }
        }
    }
    result
}

/// Format a short summary of the assignment's quality: total score, quality and the number of
/// students per choice rank.
pub fn format_summary(
    assignment: &Assignment,
    students: &[Student],
    score: Score,
    max_score: Score,
) -> String {
    let histogram = rank_histogram(students, assignment);
    let mut result = format!(
        "Total utility: {} of max. {} (quality {:.3})\n",
        score,
        max_score,
        solution_quality(score, max_score)
    );
    for (rank, count) in histogram.per_rank.iter().enumerate() {
        writeln!(result, "Choice {}: {} students", rank + 1, count).unwrap();
    }
    writeln!(result, "Not chosen: {} students", histogram.unchosen).unwrap();
    result
}
