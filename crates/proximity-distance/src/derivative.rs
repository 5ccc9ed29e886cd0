//! Keogh-Pazzani derivative transform used by the DDTW and WDDTW measures.

/// Compute the first derivative of `values`, preserving length.
///
/// Interior points use `d[i] = ((x[i] - x[i-1]) + (x[i+1] - x[i-1]) / 2) / 2`.
/// The first and last entries copy their neighbours so both series in a
/// comparison keep equal length. Series shorter than 3 have no interior and
/// map to all zeros.
#[must_use]
pub fn derivative(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 3 {
        return vec![0.0; n];
    }

    let mut out = vec![0.0; n];
    for i in 1..n - 1 {
        out[i] = ((values[i] - values[i - 1]) + (values[i + 1] - values[i - 1]) / 2.0) / 2.0;
    }
    out[0] = out[1];
    out[n - 1] = out[n - 2];
    out
}
