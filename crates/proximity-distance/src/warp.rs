//! Warping-path kernels: DTW and its weighted variant share one rolling buffer.

use crate::window::WarpingWindow;

/// Logistic weights for WDTW, indexed by the phase difference `|i - j|`.
///
/// `w(k) = 1 / (1 + exp(-g * (k - L/2)))`.
#[must_use]
pub fn wdtw_weights(length: usize, g: f64) -> Vec<f64> {
    let half = length as f64 / 2.0;
    (0..length)
        .map(|k| 1.0 / (1.0 + (-g * (k as f64 - half)).exp()))
        .collect()
}

/// Accumulated squared alignment cost between `a` and `b`.
///
/// Each cell costs `(a[i] - b[j])^2`, scaled by `weights[|i - j|]` when
/// weights are given. Returns the raw cost at `(n-1, m-1)`; callers apply
/// the final transform (square root for DTW, none for WDTW).
///
/// Each row buffer has `bw + 2` slots. Index 0 and index `bw + 1` are INF
/// sentinels; active columns occupy `1..=bw`. For column `j` of row `i`, the
/// cell above sits at `j - prev_start + 1` in `prev` and the diagonal at
/// `j - prev_start`.
///
/// When `cutoff` is `Some(c)` (in raw cost units), returns `f64::INFINITY`
/// as soon as the minimum of a non-final row exceeds `c`, or when the final
/// cell does.
pub(crate) fn warp_cost(
    a: &[f64],
    b: &[f64],
    window: WarpingWindow,
    weights: Option<&[f64]>,
    cutoff: Option<f64>,
) -> f64 {
    let n = a.len();
    let m = b.len();

    let bw = window.band_width(m);
    let buf_width = bw + 2;

    let mut prev = vec![f64::INFINITY; buf_width];
    let mut curr = vec![f64::INFINITY; buf_width];
    let mut prev_start: usize = 0;

    for i in 0..n {
        curr.fill(f64::INFINITY);

        let cols = window.column_range(i, m);
        let curr_start = cols.start;
        let mut row_min = f64::INFINITY;

        for j in cols {
            let sq = (a[i] - b[j]).powi(2);
            let cost = match weights {
                Some(w) => w[i.abs_diff(j).min(w.len() - 1)] * sq,
                None => sq,
            };
            let cj = j - curr_start + 1;

            if i == 0 && j == 0 {
                curr[cj] = cost;
                row_min = row_min.min(cost);
                continue;
            }

            let left = if j > curr_start { curr[cj - 1] } else { f64::INFINITY };

            let above = if i > 0 {
                let pj = j.wrapping_sub(prev_start).wrapping_add(1);
                if pj < buf_width { prev[pj] } else { f64::INFINITY }
            } else {
                f64::INFINITY
            };

            let diag = if i > 0 && j > 0 {
                let pj = (j - 1).wrapping_sub(prev_start).wrapping_add(1);
                if pj < buf_width { prev[pj] } else { f64::INFINITY }
            } else {
                f64::INFINITY
            };

            let val = cost + left.min(above).min(diag);
            curr[cj] = val;
            row_min = row_min.min(val);
        }

        // Every path crosses each row once, so a row minimum above the cutoff
        // bounds the final cost. The last row is checked at its final cell.
        if let Some(c) = cutoff
            && i < n - 1
            && row_min > c
        {
            return f64::INFINITY;
        }

        prev_start = curr_start;
        std::mem::swap(&mut prev, &mut curr);
    }

    let last = window.column_range(n - 1, m);
    if !last.contains(&(m - 1)) {
        return f64::INFINITY;
    }
    let total = prev[(m - 1) - last.start + 1];

    match cutoff {
        Some(c) if total > c => f64::INFINITY,
        _ => total,
    }
}

/// Sum of squared pointwise differences, abandoning once it exceeds `cutoff`.
pub(crate) fn squared_euclidean(a: &[f64], b: &[f64], cutoff: Option<f64>) -> f64 {
    let limit = cutoff.unwrap_or(f64::INFINITY);
    let mut total = 0.0;
    for (x, y) in a.iter().zip(b) {
        total += (x - y).powi(2);
        if total > limit {
            return f64::INFINITY;
        }
    }
    total
}
