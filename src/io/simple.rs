use crate::verify::Candidate;
use crate::{RankWeights, Solution, Student, Topic};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;

#[derive(Deserialize)]
struct InputData {
    topics: Vec<Topic>,
    students: Vec<Student>,
    weights: RankWeights,
}

/// Read the lists of topics and students and the rank weights from the simple JSON representation
/// (canonical serde_json serialization of `Topic`, `Student` and `RankWeights` objects). Student
/// preferences are 0-based indexes into the list of topics.
///
/// Topics without places and duplicate student names are rejected.
pub fn read<R: std::io::Read>(
    reader: R,
) -> Result<(Vec<Topic>, Vec<Student>, RankWeights), String> {
    let data: InputData = serde_json::from_reader(reader).map_err(|err| err.to_string())?;

    let mut topics = data.topics;
    for (i, t) in topics.iter_mut().enumerate() {
        if t.capacity == 0 {
            return Err(format!("Topic '{}' has no places", t.name));
        }
        t.index = i;
    }
    let mut students = data.students;
    let mut names = HashSet::new();
    for (i, s) in students.iter_mut().enumerate() {
        if !names.insert(s.name.clone()) {
            return Err(format!("Student '{}' is listed more than once", s.name));
        }
        s.index = i;
    }

    Ok((topics, students, data.weights))
}

#[derive(Deserialize)]
struct ResultData {
    assignment: Option<Vec<usize>>,
    selection: Option<Vec<Vec<u8>>>,
}

/// Read an assignment to be verified. The JSON object must contain either an `assignment` (list of
/// 0-based topic indexes, as written by `write`) or a `selection` (0/1 matrix with one row per
/// student and one column per topic, as produced by external optimization tools).
pub fn read_result<R: std::io::Read>(reader: R) -> Result<Candidate, String> {
    let data: ResultData = serde_json::from_reader(reader).map_err(|err| err.to_string())?;
    match (data.assignment, data.selection) {
        (Some(assignment), None) => Ok(Candidate::Assignment(assignment)),
        (None, Some(rows)) => {
            let num_columns = rows.first().map(|row| row.len()).unwrap_or(0);
            for (s, row) in rows.iter().enumerate() {
                if row.len() != num_columns {
                    return Err(format!(
                        "Row {} of the selection has {} entries instead of {}",
                        s,
                        row.len(),
                        num_columns
                    ));
                }
                if let Some(x) = row.iter().find(|x| **x > 1) {
                    return Err(format!("Invalid selection value {} in row {}", x, s));
                }
            }
            let selection =
                ndarray::Array2::from_shape_fn([rows.len(), num_columns], |(s, t)| rows[s][t] == 1);
            Ok(Candidate::Selection(selection))
        }
        _ => Err("Expected exactly one of 'assignment' or 'selection'".to_owned()),
    }
}

/// Write the calculated topic assignment as simple JSON representation to a Writer (e.g. an
/// output file).
pub fn write<W: std::io::Write>(writer: W, solution: &Solution) -> Result<(), String> {
    let data = json!({
        "format": "X-topicassignment-simple",
        "version": "1.0",
        "assignment": solution.assignment,
        "score": solution.score,
    });
    serde_json::to_writer(writer, &data).map_err(|e| format!("{}", e))?;

    Ok(())
}

/// Write the problem data to the simple JSON representation, e.g. to convert line-oriented input
/// files.
pub fn write_input_data<W: std::io::Write>(
    writer: W,
    topics: &[Topic],
    students: &[Student],
    weights: &RankWeights,
) -> Result<(), String> {
    let data = json!({
        "format": "X-topicdata-simple",
        "version": "1.0",
        "topics": topics,
        "students": students,
        "weights": weights,
    });
    serde_json::to_writer(writer, &data).map_err(|e| format!("{}", e))?;

    Ok(())
}
