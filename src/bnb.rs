//! A specialization of the generic branch and bound algorithm from `bab` for the topic assignment problem.
//!
//! Each subproblem fixes the topics of the first k students. Branches are created by giving the next student each of
//! the topics with free places left. The score of a subproblem, which is used for bounding, is an upper bound: the
//! utility of the fixed students plus, for every remaining student, the best utility of any topic with free places.

use super::bab::NodeResult::{self, Feasible, Infeasible, NoSolution};
use super::bab::Statistics;
use super::solver::EngineProblem;
use super::{Assignment, Score};
use log::debug;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Solve the given problem exactly using the parallel branch and bound algorithm.
///
/// Returns the best assignment with its score (or None, if no complete assignment exists) and the statistics of the
/// branch and bound run. If the search is aborted via `cancel`, the statistics tell so and the assignment (if any) is
/// not necessarily optimal.
pub fn solve(
    problem: Arc<EngineProblem>,
    num_threads: u32,
    cancel: Arc<AtomicBool>,
) -> (Option<(Assignment, Score)>, Statistics) {
    let base_node = BnbNode {
        fixed_topics: Vec::new(),
        free_places: problem.capacities.clone(),
        score: 0,
    };
    super::bab::solve(
        move |node| run_bnb_node(&*problem, node),
        base_node,
        num_threads,
        cancel,
    )
}

/// Parameter set for one subproblem of the Branch and Bound algorithm
#[derive(Clone, Debug)]
struct BnbNode {
    /// Topics of the first students (in order of the students)
    fixed_topics: Vec<usize>,
    /// Number of places of each topic, which are not yet given to a student
    free_places: Vec<usize>,
    /// Total utility of the fixed students
    score: Score,
}

// As we want to do a pseudo depth-first search, nodes are ordered by their depth in the Branch and Bound tree. Nodes of
// the same depth are ordered by their current score to find good feasible solutions first.
impl Ord for BnbNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.fixed_topics
            .len()
            .cmp(&other.fixed_topics.len())
            .then(self.score.cmp(&other.score))
    }
}

impl PartialOrd for BnbNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for BnbNode {}

impl PartialEq for BnbNode {
    fn eq(&self, other: &Self) -> bool {
        self.fixed_topics.len() == other.fixed_topics.len() && self.score == other.score
    }
}

/// Solver for a single branch and bound node/subproblem.
fn run_bnb_node(problem: &EngineProblem, node: BnbNode) -> NodeResult<BnbNode, Assignment, Score> {
    let num_students = problem.utilities.nrows();
    let next_student = node.fixed_topics.len();
    let remaining_students = num_students - next_student;

    // Every remaining student needs one of the free places and every free place must be taken
    if node.free_places.iter().sum::<usize>() != remaining_students {
        debug!("Skipping this branch, since free places do not match remaining students");
        return NoSolution;
    }

    if remaining_students == 0 {
        return Feasible(node.fixed_topics, node.score);
    }

    let bound = node.score + optimistic_score(problem, &node.free_places, next_student);

    let mut branches = Vec::new();
    for (topic, free) in node.free_places.iter().enumerate() {
        if *free == 0 {
            continue;
        }
        let mut new_node = node.clone();
        new_node.fixed_topics.push(topic);
        new_node.free_places[topic] -= 1;
        new_node.score += problem.utilities[[next_student, topic]] as Score;
        branches.push(new_node);
    }

    Infeasible(branches, bound)
}

/// Upper bound for the utility of the students starting from `first_student`, given the free places of each topic:
/// Each student gets their best topic among the ones with free places left, ignoring the capacities otherwise.
fn optimistic_score(problem: &EngineProblem, free_places: &[usize], first_student: usize) -> Score {
    (first_student..problem.utilities.nrows())
        .map(|s| {
            free_places
                .iter()
                .enumerate()
                .filter(|(_, free)| **free > 0)
                .map(|(t, _)| problem.utilities[[s, t]] as Score)
                .max()
                .unwrap_or(0)
        })
        .sum()
}
