use super::{
    solve, solve_with_engine, BranchAndBoundEngine, CancelFlag, EngineKind, EngineProblem,
    HungarianEngine, SolverOptions, SolvingEngine,
};
use crate::test_util::{students, topics, weights};
use crate::{Assignment, AssignmentError, EngineError, RankWeights, Score, Student, Topic};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Engine mock, which counts its invocations and returns a fixed result
struct FixedEngine {
    result: Result<Assignment, EngineError>,
    calls: AtomicUsize,
}

impl FixedEngine {
    fn new(result: Result<Assignment, EngineError>) -> Arc<FixedEngine> {
        Arc::new(FixedEngine {
            result,
            calls: AtomicUsize::new(0),
        })
    }
}

impl SolvingEngine for FixedEngine {
    fn name(&self) -> &str {
        "fixed"
    }

    fn solve(&self, _problem: &EngineProblem, _cancel: &CancelFlag) -> Result<Assignment, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

struct SlowEngine;

impl SolvingEngine for SlowEngine {
    fn name(&self) -> &str {
        "slow"
    }

    fn solve(&self, problem: &EngineProblem, cancel: &CancelFlag) -> Result<Assignment, EngineError> {
        std::thread::sleep(Duration::from_millis(500));
        HungarianEngine.solve(problem, cancel)
    }
}

/// Engine, which never finishes on its own, but stops as soon as it is cancelled
struct EndlessEngine {
    stopped: Arc<AtomicBool>,
}

impl SolvingEngine for EndlessEngine {
    fn name(&self) -> &str {
        "endless"
    }

    fn solve(&self, _problem: &EngineProblem, cancel: &CancelFlag) -> Result<Assignment, EngineError> {
        while !cancel.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }
        self.stopped.store(true, Ordering::SeqCst);
        Err(EngineError::Cancelled)
    }
}

struct PanickingEngine;

impl SolvingEngine for PanickingEngine {
    fn name(&self) -> &str {
        "panicking"
    }

    fn solve(&self, _problem: &EngineProblem, _cancel: &CancelFlag) -> Result<Assignment, EngineError> {
        panic!("Engine defect");
    }
}

/// Best total utility of all feasible assignments, found by enumerating them
fn brute_force_score(topics: &[Topic], students: &[Student], weights: &RankWeights) -> Score {
    fn rec(
        s: usize,
        free: &mut Vec<usize>,
        students: &[Student],
        weights: &RankWeights,
    ) -> Option<Score> {
        if s == students.len() {
            return Some(0);
        }
        let mut best = None;
        for t in 0..free.len() {
            if free[t] == 0 {
                continue;
            }
            free[t] -= 1;
            let utility = students[s]
                .preferences
                .iter()
                .position(|p| *p == t)
                .map(|rank| weights.0[rank] as Score)
                .unwrap_or(0);
            if let Some(rest) = rec(s + 1, free, students, weights) {
                best = Some(best.map_or(utility + rest, |b: Score| b.max(utility + rest)));
            }
            free[t] += 1;
        }
        best
    }
    let mut free: Vec<usize> = topics.iter().map(|t| t.capacity).collect();
    rec(0, &mut free, students, weights).expect("Problem must be feasible")
}

/// Testing helper function to check correctness of a solution: Every student has a valid topic and all topics are
/// exactly filled.
fn check_assignment(topics: &[Topic], students: &[Student], assignment: &Assignment) {
    assert_eq!(assignment.len(), students.len());
    let mut topic_size = vec![0usize; topics.len()];
    for t in assignment.iter() {
        topic_size[*t] += 1;
    }
    for (t, topic) in topics.iter().enumerate() {
        assert_eq!(
            topic_size[t], topic.capacity,
            "Topic {} has {} students, but capacity {}",
            t, topic_size[t], topic.capacity
        );
    }
}

fn all_options() -> Vec<SolverOptions> {
    vec![
        SolverOptions::default(),
        SolverOptions {
            engine: EngineKind::BranchAndBound,
            timeout: None,
            num_threads: 1,
        },
        SolverOptions {
            engine: EngineKind::BranchAndBound,
            timeout: Some(Duration::from_secs(60)),
            num_threads: 4,
        },
    ]
}

#[test]
fn two_students_two_topics() {
    let t = topics(&[1, 1]);
    let s = students(&[&[0, 1], &[1, 0]]);
    let w = weights(&[2, 1]);
    for options in all_options() {
        let solution = solve(&t, &s, &w, &options).unwrap();
        assert_eq!(solution.score, 4, "Engine {}", options.engine);
        assert_eq!(solution.assignment, vec![0, 1]);
    }
}

#[test]
fn unbalanced_problem_is_not_solved() {
    let t = topics(&[1, 1]);
    let s = students(&[&[0], &[1], &[0, 1]]);
    let w = weights(&[2, 1]);
    let engine = FixedEngine::new(Ok(vec![0, 1, 0]));
    let result = solve_with_engine(&t, &s, &w, engine.clone(), None);
    assert_eq!(
        result,
        Err(AssignmentError::InfeasibleByConstruction {
            capacity: 2,
            students: 3
        })
    );
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);

    for options in all_options() {
        assert!(matches!(
            solve(&t, &s, &w, &options),
            Err(AssignmentError::InfeasibleByConstruction { .. })
        ));
    }
}

#[test]
fn malformed_preferences_are_not_solved() {
    let t = topics(&[1, 1]);
    let s = students(&[&[0, 1], &[1, 0]]);
    let engine = FixedEngine::new(Ok(vec![0, 1]));
    let result = solve_with_engine(&t, &s, &weights(&[2]), engine.clone(), None);
    assert!(matches!(
        result,
        Err(AssignmentError::MalformedPreference { .. })
    ));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn engine_errors_are_passed() {
    let t = topics(&[1, 1]);
    let s = students(&[&[0], &[1]]);
    let w = weights(&[1]);

    let result = solve_with_engine(&t, &s, &w, FixedEngine::new(Err(EngineError::Infeasible)), None);
    assert_eq!(result, Err(AssignmentError::Infeasible));
    let result = solve_with_engine(&t, &s, &w, FixedEngine::new(Err(EngineError::Unbounded)), None);
    assert_eq!(result, Err(AssignmentError::Unbounded));
    let result = solve_with_engine(
        &t,
        &s,
        &w,
        FixedEngine::new(Err(EngineError::Failed("not installed".to_owned()))),
        None,
    );
    assert!(matches!(result, Err(AssignmentError::SolverUnavailable(_))));
}

#[test]
fn defective_engine_results_are_rejected() {
    let t = topics(&[1, 1]);
    let s = students(&[&[0], &[1]]);
    let w = weights(&[1]);

    let result = solve_with_engine(&t, &s, &w, FixedEngine::new(Ok(vec![0, 0])), None);
    match result {
        Err(e) => assert!(e.is_fatal(), "Expected fatal error, got {}", e),
        Ok(x) => panic!("Expected capacity violation, got {:?}", x),
    }

    let result = solve_with_engine(&t, &s, &w, FixedEngine::new(Ok(vec![0, 1, 1])), None);
    assert_eq!(
        result,
        Err(AssignmentError::AssignmentIncomplete { students: vec![2] })
    );
}

#[test]
fn engine_timeout() {
    let t = topics(&[1, 1]);
    let s = students(&[&[0], &[1]]);
    let w = weights(&[1]);
    let result = solve_with_engine(
        &t,
        &s,
        &w,
        Arc::new(SlowEngine),
        Some(Duration::from_millis(10)),
    );
    assert!(matches!(result, Err(AssignmentError::SolverUnavailable(_))));

    let result = solve_with_engine(&t, &s, &w, Arc::new(SlowEngine), Some(Duration::from_secs(30)));
    assert_eq!(result.map(|solution| solution.score), Ok(2));
}

#[test]
fn engine_is_cancelled_after_timeout() {
    let t = topics(&[1, 1]);
    let s = students(&[&[0], &[1]]);
    let w = weights(&[1]);
    let stopped = Arc::new(AtomicBool::new(false));
    let engine = Arc::new(EndlessEngine {
        stopped: stopped.clone(),
    });
    let result = solve_with_engine(&t, &s, &w, engine, Some(Duration::from_millis(20)));
    assert!(matches!(result, Err(AssignmentError::SolverUnavailable(_))));

    let deadline = Instant::now() + Duration::from_secs(10);
    while !stopped.load(Ordering::SeqCst) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(
        stopped.load(Ordering::SeqCst),
        "Engine thread is still running after the timeout"
    );
}

#[test]
fn cancelled_engines_stop() {
    let problem = EngineProblem {
        utilities: ndarray::array![[2, 1], [1, 2]],
        capacities: vec![1, 1],
    };
    let cancel: CancelFlag = Arc::new(AtomicBool::new(true));
    assert_eq!(
        HungarianEngine.solve(&problem, &cancel),
        Err(EngineError::Cancelled)
    );
    for num_threads in [1, 3].iter() {
        let engine = BranchAndBoundEngine {
            num_threads: *num_threads,
        };
        assert_eq!(
            engine.solve(&problem, &cancel),
            Err(EngineError::Cancelled)
        );
    }
}

#[test]
fn engine_crash() {
    let t = topics(&[1, 1]);
    let s = students(&[&[0], &[1]]);
    let w = weights(&[1]);
    let result = solve_with_engine(&t, &s, &w, Arc::new(PanickingEngine), None);
    assert!(matches!(result, Err(AssignmentError::SolverUnavailable(_))));
}

#[test]
fn duplicate_topic_places() {
    // Topic 0 is wanted by everyone, but has only two places.
    let t = topics(&[2, 1, 1]);
    let s = students(&[&[0, 1], &[0, 2], &[0, 1], &[0]]);
    let w = weights(&[10, 5]);
    for options in all_options() {
        let solution = solve(&t, &s, &w, &options).unwrap();
        check_assignment(&t, &s, &solution.assignment);
        assert_eq!(solution.score, 10 + 10 + 5 + 5, "Engine {}", options.engine);
        // Student 3 would get nothing else than topic 0
        assert_eq!(solution.assignment[3], 0);
    }
}

#[test]
fn unchosen_topics_can_be_assigned() {
    let t = topics(&[1, 1, 1]);
    let s = students(&[&[0], &[0], &[]]);
    let w = weights(&[1]);
    for options in all_options() {
        let solution = solve(&t, &s, &w, &options).unwrap();
        check_assignment(&t, &s, &solution.assignment);
        assert_eq!(solution.score, 1);
    }
}

#[test]
fn empty_problem() {
    let solution = solve(&[], &[], &weights(&[]), &SolverOptions::default()).unwrap();
    assert!(solution.assignment.is_empty());
    assert_eq!(solution.score, 0);
}

#[test]
fn optimal_compared_to_brute_force() {
    let mut seed: u64 = 42;
    let mut random = |n: usize| {
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((seed >> 33) as usize) % n
    };

    for _ in 0..25 {
        // Random capacities for 1-4 topics with 1-3 places each, at most 7 students
        let num_topics = 1 + random(4);
        let mut capacities: Vec<usize> = (0..num_topics).map(|_| 1 + random(3)).collect();
        while capacities.iter().sum::<usize>() > 7 {
            let last = capacities.len() - 1;
            if capacities[last] > 1 {
                capacities[last] -= 1;
            } else {
                capacities.pop();
            }
        }
        let num_topics = capacities.len();
        let t = topics(&capacities);
        let num_students: usize = capacities.iter().sum();

        let preferences: Vec<Vec<usize>> = (0..num_students)
            .map(|_| {
                let mut p: Vec<usize> = Vec::new();
                for _ in 0..random(num_topics + 1) {
                    let topic = random(num_topics);
                    if !p.contains(&topic) {
                        p.push(topic);
                    }
                }
                p
            })
            .collect();
        let preference_slices: Vec<&[usize]> = preferences.iter().map(|p| &p[..]).collect();
        let s = students(&preference_slices);
        let w = weights(&[9, 4, 2, 1]);

        let expected = brute_force_score(&t, &s, &w);
        for options in all_options() {
            let solution = solve(&t, &s, &w, &options).unwrap();
            check_assignment(&t, &s, &solution.assignment);
            assert_eq!(
                solution.score, expected,
                "Engine {} not optimal for capacities {:?} and preferences {:?}",
                options.engine, capacities, preferences
            );
        }
    }
}

#[test]
fn larger_problem_engines_agree() {
    const NUM_TOPICS: usize = 6;
    const PLACES_PER_TOPIC: usize = 2;

    let t = topics(&[PLACES_PER_TOPIC; NUM_TOPICS]);
    let preferences: Vec<Vec<usize>> = (0..NUM_TOPICS * PLACES_PER_TOPIC)
        .map(|p| (0..3).map(|i| (p / 3 + i) % NUM_TOPICS).collect())
        .collect();
    let preference_slices: Vec<&[usize]> = preferences.iter().map(|p| &p[..]).collect();
    let s = students(&preference_slices);
    let w = weights(&[3, 2, 1]);

    let hungarian = solve(&t, &s, &w, &SolverOptions::default()).unwrap();
    let bab = solve(
        &t,
        &s,
        &w,
        &SolverOptions {
            engine: EngineKind::BranchAndBound,
            timeout: None,
            num_threads: 4,
        },
    )
    .unwrap();
    check_assignment(&t, &s, &hungarian.assignment);
    check_assignment(&t, &s, &bab.assignment);
    assert_eq!(hungarian.score, bab.score);
    assert!(hungarian.score > 0);
}

#[test]
fn branch_and_bound_engine_directly() {
    let problem = EngineProblem {
        utilities: ndarray::array![[2, 1], [1, 2]],
        capacities: vec![1, 1],
    };
    let engine = BranchAndBoundEngine { num_threads: 1 };
    let cancel: CancelFlag = Arc::new(AtomicBool::new(false));
    assert_eq!(engine.solve(&problem, &cancel), Ok(vec![0, 1]));

    let unbalanced = EngineProblem {
        utilities: ndarray::array![[2, 1], [1, 2]],
        capacities: vec![2, 1],
    };
    assert_eq!(
        engine.solve(&unbalanced, &cancel),
        Err(EngineError::Infeasible)
    );
    assert_eq!(
        HungarianEngine.solve(&unbalanced, &cancel),
        Err(EngineError::Infeasible)
    );
}

#[test]
fn engine_kind_parsing() {
    assert_eq!("hungarian".parse::<EngineKind>(), Ok(EngineKind::Hungarian));
    assert_eq!("bab".parse::<EngineKind>(), Ok(EngineKind::BranchAndBound));
    assert_eq!(
        "branch-and-bound".parse::<EngineKind>(),
        Ok(EngineKind::BranchAndBound)
    );
    assert!("simplex".parse::<EngineKind>().is_err());
    assert_eq!(EngineKind::BranchAndBound.to_string(), "bab");
}
