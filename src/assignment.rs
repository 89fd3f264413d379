use nalgebra::DMatrix;
use noisy_float::prelude::{n64, N64};

/// Result of [linear_assignment].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assignment {
    /// Matched `(row, col)` pairs, sorted by row.
    pub matches: Vec<(usize, usize)>,
    pub unmatched_rows: Vec<usize>,
    pub unmatched_cols: Vec<usize>,
}

/// Optimal one-to-one matching between the rows and columns of `cost`.
///
/// Only pairs whose cost is strictly below `max_cost` can be matched. Among
/// those, the matching maximizes `Σ (max_cost - cost)`, so leaving a row or a
/// column unmatched is never cheaper than a pair below the ceiling. Non-finite
/// costs are never matched.
///
/// The problem is solved exactly with the Hungarian method on a square matrix
/// padded with `max_cost`. Rows are inserted in order and ties go to the lowest
/// column, so identical inputs always give identical matchings.
pub fn linear_assignment(cost: &DMatrix<f64>, max_cost: f64) -> Assignment {
    let (num_rows, num_cols) = cost.shape();
    let unmatched = || Assignment {
        matches: vec![],
        unmatched_rows: (0..num_rows).collect(),
        unmatched_cols: (0..num_cols).collect(),
    };

    if num_rows == 0 || num_cols == 0 || !(max_cost > 0.0) || !max_cost.is_finite() {
        return unmatched();
    }

    let is_admissible = |row: usize, col: usize| {
        let value = cost[(row, col)];
        value.is_finite() && value < max_cost
    };

    let size = num_rows.max(num_cols);
    let padded = DMatrix::from_fn(size, size, |row, col| {
        if row < num_rows && col < num_cols && is_admissible(row, col) {
            n64(cost[(row, col)])
        } else {
            n64(max_cost)
        }
    });

    let row_to_col = hungarian(&padded);

    let mut assignment = Assignment::default();
    let mut col_matched = vec![false; num_cols];
    for (row, &col) in row_to_col.iter().enumerate().take(num_rows) {
        if col < num_cols && is_admissible(row, col) {
            assignment.matches.push((row, col));
            col_matched[col] = true;
        } else {
            assignment.unmatched_rows.push(row);
        }
    }
    assignment.unmatched_cols = (0..num_cols).filter(|&col| !col_matched[col]).collect();

    assignment
}

/// Shortest augmenting path Hungarian method on a square matrix.
///
/// Returns the column assigned to each row.
fn hungarian(cost: &DMatrix<N64>) -> Vec<usize> {
    let n = cost.nrows();
    let zero = n64(0.0);
    let infinity = n64(f64::INFINITY);

    // Potentials and matchings are 1-based; index 0 is a virtual column.
    let mut u = vec![zero; n + 1];
    let mut v = vec![zero; n + 1];
    // col_owner[j] is the row assigned to column j, 0 when free.
    let mut col_owner = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        col_owner[0] = row;
        let mut j0 = 0;
        let mut minv = vec![infinity; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = col_owner[j0];
            let mut delta = infinity;
            let mut j1 = 0;

            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let reduced = cost[(i0 - 1, j - 1)] - u[i0] - v[j];
                if reduced < minv[j] {
                    minv[j] = reduced;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=n {
                if used[j] {
                    u[col_owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if col_owner[j0] == 0 {
                break;
            }
        }

        // Flip the augmenting path back to the virtual column.
        loop {
            let j1 = way[j0];
            col_owner[j0] = col_owner[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut row_to_col = vec![0; n];
    for j in 1..=n {
        row_to_col[col_owner[j] - 1] = j - 1;
    }
    row_to_col
}
