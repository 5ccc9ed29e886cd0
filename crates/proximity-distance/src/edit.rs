//! Edit-distance kernels: ERP, LCSS, MSM and TWE.
//!
//! Each kernel fills a full `(n+1) x (m+1)` or `n x m` dynamic-programming
//! table and returns the raw measure value for two equal-length series.

use crate::window::WarpingWindow;

/// Edit distance with real penalty.
///
/// Gaps are charged `(x - g)^2`, matches `(a[i] - b[j])^2`; cells outside
/// `window` are unreachable. Returns the square root of the accumulated cost.
pub(crate) fn erp(a: &[f64], b: &[f64], g: f64, window: WarpingWindow) -> f64 {
    let n = a.len();
    let m = b.len();
    let width = m + 1;
    let mut d = vec![f64::INFINITY; (n + 1) * width];

    d[0] = 0.0;
    for i in 1..=n {
        d[i * width] = d[(i - 1) * width] + (a[i - 1] - g).powi(2);
    }
    for j in 1..=m {
        d[j] = d[j - 1] + (b[j - 1] - g).powi(2);
    }

    for i in 1..=n {
        for j in window.column_range(i - 1, m) {
            let j = j + 1;
            let matched = d[(i - 1) * width + j - 1] + (a[i - 1] - b[j - 1]).powi(2);
            let gap_a = d[(i - 1) * width + j] + (a[i - 1] - g).powi(2);
            let gap_b = d[i * width + j - 1] + (b[j - 1] - g).powi(2);
            d[i * width + j] = matched.min(gap_a).min(gap_b);
        }
    }

    d[n * width + m].sqrt()
}

/// Longest common subsequence distance, `1 - lcss / n`.
///
/// Two points match when `|a[i] - b[j]| <= epsilon` and `(i, j)` lies inside
/// `window`.
pub(crate) fn lcss(a: &[f64], b: &[f64], epsilon: f64, window: WarpingWindow) -> f64 {
    let n = a.len();
    let m = b.len();
    let width = m + 1;
    let mut t = vec![0u32; (n + 1) * width];

    for i in 0..n {
        for j in window.column_range(i, m) {
            let here = (i + 1) * width + j + 1;
            t[here] = if (a[i] - b[j]).abs() <= epsilon {
                t[i * width + j] + 1
            } else {
                t[i * width + j + 1].max(t[(i + 1) * width + j])
            };
        }
    }

    let best = t[n * width + 1..=n * width + m].iter().copied().max().unwrap_or(0);
    1.0 - f64::from(best) / n as f64
}

/// Move-split-merge distance with split/merge penalty `c`.
pub(crate) fn msm(a: &[f64], b: &[f64], c: f64) -> f64 {
    let n = a.len();
    let m = b.len();
    let mut cost = vec![0.0; n * m];

    cost[0] = (a[0] - b[0]).abs();
    for i in 1..n {
        cost[i * m] = cost[(i - 1) * m] + split_merge_cost(a[i], a[i - 1], b[0], c);
    }
    for j in 1..m {
        cost[j] = cost[j - 1] + split_merge_cost(b[j], a[0], b[j - 1], c);
    }

    for i in 1..n {
        for j in 1..m {
            let moved = cost[(i - 1) * m + j - 1] + (a[i] - b[j]).abs();
            let split = cost[(i - 1) * m + j] + split_merge_cost(a[i], a[i - 1], b[j], c);
            let merge = cost[i * m + j - 1] + split_merge_cost(b[j], a[i], b[j - 1], c);
            cost[i * m + j] = moved.min(split).min(merge);
        }
    }

    cost[n * m - 1]
}

/// Penalty for inserting `point` between neighbours `x` and `y`.
fn split_merge_cost(point: f64, x: f64, y: f64, c: f64) -> f64 {
    if (x <= point && point <= y) || (y <= point && point <= x) {
        c
    } else {
        c + (point - x).abs().min((point - y).abs())
    }
}

/// Time warp edit distance with stiffness `nu` and edit penalty `lambda`.
///
/// Timestamps are the 1-based sample positions.
pub(crate) fn twe(a: &[f64], b: &[f64], nu: f64, lambda: f64) -> f64 {
    let n = a.len();
    let m = b.len();
    let width = m + 1;
    let mut d = vec![0.0; (n + 1) * width];

    // Deletion costs: squared step from the previous sample (or from 0).
    let step = |s: &[f64], k: usize| -> f64 {
        if k > 1 { (s[k - 2] - s[k - 1]).powi(2) } else { s[k - 1].powi(2) }
    };

    for i in 1..=n {
        d[i * width] = d[(i - 1) * width] + step(a, i);
    }
    for j in 1..=m {
        d[j] = d[j - 1] + step(b, j);
    }

    for i in 1..=n {
        for j in 1..=m {
            let mut matched = (a[i - 1] - b[j - 1]).powi(2);
            let mut htrans = (i as f64 - j as f64).abs();
            if i > 1 && j > 1 {
                matched += (a[i - 2] - b[j - 2]).powi(2);
                htrans += ((i - 1) as f64 - (j - 1) as f64).abs();
            }
            let via_match = d[(i - 1) * width + j - 1] + nu * htrans + matched;

            let t_a = if i > 1 { 1.0 } else { i as f64 };
            let via_del_a = step(a, i) + d[(i - 1) * width + j] + lambda + nu * t_a;

            let t_b = if j > 1 { 1.0 } else { j as f64 };
            let via_del_b = step(b, j) + d[i * width + j - 1] + lambda + nu * t_b;

            d[i * width + j] = via_match.min(via_del_a).min(via_del_b);
        }
    }

    d[n * width + m]
}
