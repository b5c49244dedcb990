//! This module provides a generic implementation of the branch and bound algorithm using a parallel pseudo-depth-first
//! search.
//!
//! The basic idea is to spawn a number of worker threads to solve the subproblems in parallel. The pending subproblems
//! (nodes in the Branch and Bound tree) are stored on a heap (priority queue), ordered by their depth in the tree. This
//! way, the worker threads can work in parallel, while preferring to dig into the depth of the Branch and Bound tree,
//! which will give good lower bounds for bounding the branches sooner.
//!
//! The best feasible solution, found so far, is kept with the subproblem queue in a shared data structure. Its score is
//! used as a lower bound for branches' scores.
//!
//! The worker threads are stopped, as soon as no pending subproblems are left *and* no thread is still busy (and could
//! produce new pending subproblems). They also stop, when the shared cancel flag is set; in that case, the best
//! solution found so far is not necessarily optimal.

use log::debug;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

/// Struct to hold the synchronization information for the parallel execution. It contains a mutex-ed SharedState object
/// And a Condvar to allow worker threads to sleep-wait for new subproblems to solve.
struct BranchAndBound<SubProblem: Ord + Send, Solution: Send, Score> {
    shared_state: Mutex<SharedState<SubProblem, Solution, Score>>,
    condvar: Condvar,
    /// Set from outside to abort the search
    cancel: Arc<AtomicBool>,
}

/// The shared state of the worker threads of the parallel branch and bound execution
struct SharedState<SubProblem: Ord, Solution, Score> {
    /// The prioritized queue of pending subproblems
    pending_nodes: BinaryHeap<SubProblem>,
    /// The number of currently busy worker threads. It is used to determine the end of execution (no pending problems
    /// and no busy workers left)
    busy_threads: u32,
    /// The best solution, found so far, together with its score
    best: Option<(Solution, Score)>,
    statistics: Statistics,
}

/// Counters of the Branch and Bound execution, mainly for debug output
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Number of solved subproblems
    pub num_nodes: u64,
    /// Number of subproblems without any solution
    pub num_no_solution: u64,
    /// Number of branches, which were not followed, as their score was not better than the best feasible solution
    pub num_bounded: u64,
    /// Number of times, a better feasible solution was found
    pub num_improvements: u64,
    /// The search was aborted via the cancel flag before all branches were evaluated
    pub cancelled: bool,
}

/// Result type for solving a single branch and bound node.
#[derive(Debug)]
pub enum NodeResult<SubProblem, Solution, Score> {
    /// No solution at all (subproblem was infeasible)
    NoSolution,
    /// An infeasible solution for the main problem with an iterable of more restricted SubProblems ("branches") to try
    /// and the solution's score to bound the branches by comparing the solution with the current best solution.
    Infeasible(Vec<SubProblem>, Score),
    /// A feasible solution for the main problem (including the solution's score to compare to other solutions)
    Feasible(Solution, Score),
}

impl<SubProblem: Ord, Solution, Score: PartialOrd> SharedState<SubProblem, Solution, Score> {
    /// Check if the given score is better than the best feasible solution, found so far
    fn improves(&self, score: &Score) -> bool {
        match &self.best {
            None => true,
            Some((_, best_score)) => score > best_score,
        }
    }
}

/// Main function of this module to solve a generic problem by doing pseudo-depth-first parallel branch and bound
/// optimization.
/// This function takes a callback function, which is executed for each single node in the branch and bound tree and
/// returns either a feasible solution to be considered for the result or a `Vec` of new subproblems to try (see
/// `NodeResult` type). When all branches of the branch and bound tree are evaluated (or bound), the best result is
/// returned. It may be possible, that no result is found at all.
///
/// The score of an infeasible node must be an upper bound for the scores of all feasible solutions in its subtree.
///
/// Setting `cancel` makes all worker threads drop the pending subproblems and exit after their current node. This
/// function returns as soon as all workers have exited, with `Statistics::cancelled` set.
pub fn solve<
    SubProblem: 'static + Ord + Send,
    Solution: 'static + Send,
    Score: 'static + PartialOrd + Send + Copy,
    F: 'static,
>(
    node_solver: F,
    base_problem: SubProblem,
    num_threads: u32,
    cancel: Arc<AtomicBool>,
) -> (Option<(Solution, Score)>, Statistics)
where
    F: (Fn(SubProblem) -> NodeResult<SubProblem, Solution, Score>) + Send + Sync,
{
    // Create shared data structure with base problem
    let mut pending_nodes = BinaryHeap::<SubProblem>::new();
    pending_nodes.push(base_problem);
    let bab = Arc::new(BranchAndBound {
        shared_state: Mutex::new(SharedState {
            pending_nodes,
            busy_threads: 0,
            best: None,
            statistics: Statistics::default(),
        }),
        condvar: Condvar::new(),
        cancel,
    });

    // Spawn worker threads
    let mut workers = Vec::<thread::JoinHandle<()>>::new();
    let node_solver = Arc::new(node_solver);
    for _i in 0..num_threads.max(1) {
        let bab_clone = bab.clone();
        let node_solver_clone = node_solver.clone();
        workers.push(thread::spawn(move || worker(bab_clone, node_solver_clone)));
    }

    // Wait for worker threads to finish
    for worker in workers {
        worker.join().unwrap();
    }

    // Unwrap and return result
    let mut shared_state = bab.shared_state.lock().unwrap();
    if bab.cancel.load(Ordering::SeqCst) {
        shared_state.statistics.cancelled = true;
    }
    debug!("Branch and bound finished: {:?}", shared_state.statistics);
    (shared_state.best.take(), shared_state.statistics.clone())
}

/// Worker thread entry point for the parallel branch and bound solving
fn worker<SubProblem: Ord + Send, Solution: Send, Score: PartialOrd, F>(
    bab: Arc<BranchAndBound<SubProblem, Solution, Score>>,
    node_solver: Arc<F>,
) where
    F: Fn(SubProblem) -> NodeResult<SubProblem, Solution, Score>,
{
    let mut shared_state = bab.shared_state.lock().unwrap();
    loop {
        // Drop all pending work and wake up the waiting workers, so they notice the cancellation as well
        if bab.cancel.load(Ordering::SeqCst) {
            shared_state.pending_nodes.clear();
            bab.condvar.notify_all();
            break;
        }

        // In case of pending subproblems, get one and solve it
        if let Some(subproblem) = shared_state.pending_nodes.pop() {
            shared_state.busy_threads += 1;

            // Unlock shared_state and solve subproblem
            std::mem::drop(shared_state);
            let result = node_solver(subproblem);

            // Reacquire shared_state lock and interpret subproblem result
            shared_state = bab.shared_state.lock().unwrap();
            shared_state.busy_threads -= 1;
            shared_state.statistics.num_nodes += 1;
            match result {
                NodeResult::NoSolution => {
                    shared_state.statistics.num_no_solution += 1;
                }

                NodeResult::Feasible(solution, score) => {
                    if shared_state.improves(&score) {
                        debug!("Wow, this is the best solution, we found so far. Let's store it.");
                        shared_state.best = Some((solution, score));
                        shared_state.statistics.num_improvements += 1;
                    }
                }

                NodeResult::Infeasible(new_problems, score) => {
                    // Only consider more restricted new_problems, if solution is better then best solution known so
                    // far. I.e. bound branch if score is worse then best known feasible solution
                    if shared_state.improves(&score) {
                        for (i, new_problem) in new_problems.into_iter().enumerate() {
                            shared_state.pending_nodes.push(new_problem);
                            // Wake up n-1 other threads to solve the new subproblems
                            if i != 0 {
                                bab.condvar.notify_one();
                            }
                        }
                    } else {
                        shared_state.statistics.num_bounded += 1;
                    }
                }
            }

            // check if we are finished, awake other threads and exit
            if shared_state.pending_nodes.is_empty() && shared_state.busy_threads == 0 {
                bab.condvar.notify_all();
                break;
            }

        // Otherwise wait for new subproblems
        } else if shared_state.busy_threads > 0 {
            // Wait for notification by other threads. CondVar.wait() automatically handels the mutex unlock and re-lock
            // for us.
            shared_state = bab.condvar.wait(shared_state).unwrap();

        // If no work is left to do, exit
        } else {
            break;
        }
    }
}
