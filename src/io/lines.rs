//! Reading the problem data from simple line-oriented text files:
//!
//! * topics file: each non-empty line contains the name of a topic. If the same name occurs on
//!   multiple lines, the topic can be given to that many students.
//! * student preferences file: each line contains the name of a student (without spaces),
//!   followed by the topic numbers (starting at 1 for the first topic in the topics file) ordered
//!   by preference, e.g. `Benjamin 3 2 4`.
//! * rank weights file: whitespace separated numbers. The n-th number is the utility of getting
//!   one's n-th choice.

use crate::{RankWeights, Student, Topic, Utility};
use std::collections::HashSet;
use std::io::BufRead;

use log::debug;

/// Read the list of topics. Repeated topic names increase the capacity of the topic, which keeps
/// the position of its first occurrence.
pub fn read_topics<R: BufRead>(reader: R) -> Result<Vec<Topic>, String> {
    let mut topics: Vec<Topic> = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| e.to_string())?;
        let name = line.trim_end();
        if name.is_empty() {
            continue;
        }
        match topics.iter().position(|t| t.name == name) {
            Some(i) => topics[i].capacity += 1,
            None => topics.push(Topic {
                index: topics.len(),
                name: name.to_owned(),
                capacity: 1,
            }),
        }
    }
    debug!("Read {} distinct topics", topics.len());
    Ok(topics)
}

/// Read the students' names and preferences. The 1-based topic numbers of the file are converted
/// to topic indexes.
///
/// # Errors
///
/// Fails with an error message including the line number, if a topic number is not a positive
/// integer or a student name occurs twice.
pub fn read_students<R: BufRead>(reader: R) -> Result<Vec<Student>, String> {
    let mut students: Vec<Student> = Vec::new();
    let mut names = HashSet::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| e.to_string())?;
        let mut tokens = line.split_whitespace();
        let name = match tokens.next() {
            Some(name) => name,
            None => continue,
        };
        let preferences = tokens
            .map(|token| match token.parse::<usize>() {
                Ok(0) | Err(_) => Err(format!(
                    "Parsing error in student preference file at line {}: '{}' is no valid \
                     topic number",
                    i + 1,
                    token
                )),
                Ok(number) => Ok(number - 1),
            })
            .collect::<Result<Vec<usize>, String>>()?;
        if !names.insert(name.to_owned()) {
            return Err(format!(
                "Parsing error in student preference file at line {}: Student '{}' is listed \
                 more than once",
                i + 1,
                name
            ));
        }
        students.push(Student {
            index: students.len(),
            name: name.to_owned(),
            preferences,
        });
    }
    debug!("Read preferences of {} students", students.len());
    Ok(students)
}

/// Read the rank weights.
pub fn read_weights<R: std::io::Read>(mut reader: R) -> Result<RankWeights, String> {
    let mut data = String::new();
    reader
        .read_to_string(&mut data)
        .map_err(|e| e.to_string())?;
    data.split_whitespace()
        .enumerate()
        .map(|(i, token)| {
            token.parse::<Utility>().map_err(|e| {
                format!(
                    "Parsing error in rank weights file at entry {} ('{}'): {}",
                    i + 1,
                    token,
                    e
                )
            })
        })
        .collect::<Result<Vec<Utility>, String>>()
        .map(RankWeights)
}
