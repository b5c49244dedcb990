//! Implementation of the hungarian method (Kuhn-Munkres algorithm with potentials) to calculate a
//! maximum weight perfect matching in a weighted bipartite graph.

use super::{Score, Utility};
use std::sync::atomic::{AtomicBool, Ordering};

/// Return type of the hungarian algorithm. Represents a mapping of rows to columns (i.e. students
/// to topic slots) by storing the matched column index for each row.
pub type Matching = ndarray::Array1<usize>;

/// Type to use as edge weights in the adjacency matrix.
pub type EdgeWeight = Utility;

/// Calculate a matching of all rows of the adjacency matrix to distinct columns, which maximizes
/// the sum of the matched edges' weights.
///
/// The adjacency matrix must not have more rows than columns. Columns which are not matched
/// simply stay unused; for a square matrix the matching is perfect.
///
/// Internally, the maximization is transformed into the usual minimization problem by using
/// `max_weight - weight` as cost of each edge. The algorithm adds the rows one after another,
/// each time searching a shortest augmenting path (Dijkstra-like, on reduced costs) and keeps dual
/// potentials for rows and columns, resulting in an O(n²·m) runtime.
///
/// The `cancel` flag is checked before each row is added. Returns the matching and its total weight, or None if the
/// calculation was cancelled.
pub fn hungarian_algorithm(
    adjacency_matrix: &ndarray::Array2<EdgeWeight>,
    cancel: &AtomicBool,
) -> Option<(Matching, Score)> {
    let (n, m) = adjacency_matrix.dim();
    assert!(
        n <= m,
        "Adjacency matrix must not have more rows ({}) than columns ({})",
        n,
        m
    );
    if n == 0 {
        return Some((Matching::zeros([0]), 0));
    }

    let max_weight = adjacency_matrix.iter().copied().max().unwrap_or(0) as i64;
    let cost = |x: usize, y: usize| max_weight - adjacency_matrix[[x, y]] as i64;

    // All arrays use 1-based row/column numbers. Column 0 is a virtual column used as the root of
    // each augmenting path search and row 0 means "unmatched".
    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; m + 1];
    // Row matched to each column
    let mut p = vec![0usize; m + 1];
    // Predecessor column on the current augmenting path
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![i64::MAX; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = i64::MAX;
            let mut j1 = 0usize;
            for j in 1..=m {
                if !used[j] {
                    let cur = cost(i0 - 1, j - 1) - u[i0] - v[j];
                    if cur < minv[j] {
                        minv[j] = cur;
                        way[j] = j0;
                    }
                    if minv[j] < delta {
                        delta = minv[j];
                        j1 = j;
                    }
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        // Augment along the path back to the root
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut matching = Matching::zeros([n]);
    let mut score: Score = 0;
    for j in 1..=m {
        if p[j] != 0 {
            matching[p[j] - 1] = j - 1;
            score += adjacency_matrix[[p[j] - 1, j - 1]] as Score;
        }
    }
    Some((matching, score))
}
