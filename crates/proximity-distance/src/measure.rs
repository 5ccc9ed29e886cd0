//! The elastic distance family: a closed set of measures, each with its own
//! randomly sampled parameters.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use tracing::trace;

use crate::derivative::derivative;
use crate::distance::Distance;
use crate::edit;
use crate::error::DistanceError;
use crate::series::TimeSeriesView;
use crate::stats::SeriesStats;
use crate::warp::{self, wdtw_weights};
use crate::window::WarpingWindow;

/// Split/merge penalties drawn for MSM: 25 evenly spaced values per decade
/// from 0.01 to 100.
pub const MSM_COSTS: [f64; 100] = [
    0.01, 0.01375, 0.0175, 0.02125, 0.025, 0.02875, 0.0325, 0.03625, 0.04, 0.04375, 0.0475,
    0.05125, 0.055, 0.05875, 0.0625, 0.06625, 0.07, 0.07375, 0.0775, 0.08125, 0.085, 0.08875,
    0.0925, 0.09625, 0.1, 0.136, 0.172, 0.208, 0.244, 0.28, 0.316, 0.352, 0.388, 0.424, 0.46,
    0.496, 0.532, 0.568, 0.604, 0.64, 0.676, 0.712, 0.748, 0.784, 0.82, 0.856, 0.892, 0.928,
    0.964, 1.0, 1.36, 1.72, 2.08, 2.44, 2.8, 3.16, 3.52, 3.88, 4.24, 4.6, 4.96, 5.32, 5.68, 6.04,
    6.4, 6.76, 7.12, 7.48, 7.84, 8.2, 8.56, 8.92, 9.28, 9.64, 10.0, 13.6, 17.2, 20.8, 24.4, 28.0,
    31.6, 35.2, 38.8, 42.4, 46.0, 49.6, 53.2, 56.8, 60.4, 64.0, 67.6, 71.2, 74.8, 78.4, 82.0, 85.6,
    89.2, 92.8, 96.4, 100.0,
];

/// TWE stiffness values.
pub const TWE_NU: [f64; 10] = [0.00001, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0];

/// TWE edit penalties.
pub const TWE_LAMBDA: [f64; 10] = [
    0.0,
    0.011111111,
    0.022222222,
    0.033333333,
    0.044444444,
    0.055555556,
    0.066666667,
    0.077777778,
    0.088888889,
    0.1,
];

/// How exact distance ties between exemplars are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TieBreak {
    /// Pick uniformly among all tied exemplars.
    #[default]
    Random,
    /// Pick the lowest tied index.
    First,
}

/// Fieldless tag naming a measure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum MeasureKind {
    Euclidean,
    Dtw,
    FullDtw,
    Ddtw,
    FullDdtw,
    Wdtw,
    Wddtw,
    Lcss,
    Erp,
    Msm,
    Twe,
}

impl MeasureKind {
    /// Every family, in a fixed order.
    pub const ALL: [Self; 11] = [
        Self::Euclidean,
        Self::Dtw,
        Self::FullDtw,
        Self::Ddtw,
        Self::FullDdtw,
        Self::Wdtw,
        Self::Wddtw,
        Self::Lcss,
        Self::Erp,
        Self::Msm,
        Self::Twe,
    ];

    /// Short lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Dtw => "dtw",
            Self::FullDtw => "dtw-full",
            Self::Ddtw => "ddtw",
            Self::FullDdtw => "ddtw-full",
            Self::Wdtw => "wdtw",
            Self::Wddtw => "wddtw",
            Self::Lcss => "lcss",
            Self::Erp => "erp",
            Self::Msm => "msm",
            Self::Twe => "twe",
        }
    }
}

impl fmt::Display for MeasureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MeasureKind {
    type Err = DistanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .ok_or(DistanceError::UnknownMeasure { name: s.to_string() })
    }
}

/// Warping window for DTW and DDTW.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DtwParams {
    pub window: WarpingWindow,
}

/// Logistic weight penalty for WDTW and WDDTW.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WdtwParams {
    pub g: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LcssParams {
    pub epsilon: f64,
    pub window: WarpingWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErpParams {
    pub g: f64,
    pub window: WarpingWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MsmParams {
    pub cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TweParams {
    pub nu: f64,
    pub lambda: f64,
}

/// A distance measure together with its current parameters.
///
/// Construct with [`DistanceMeasure::new`], then call
/// [`sample_parameters`](Self::sample_parameters) before every use at a new
/// split so each candidate explores a different point of parameter space.
///
/// # Defaults
///
/// | Family | Parameters |
/// |---|---|
/// | DTW, DDTW | full window |
/// | WDTW, WDDTW | `g = 0.05` |
/// | LCSS | `epsilon = 0.01`, full window |
/// | ERP | `g = 0`, full window |
/// | MSM | `cost = 1` |
/// | TWE | `nu = 1`, `lambda = 1` |
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DistanceMeasure {
    Euclidean,
    Dtw(DtwParams),
    FullDtw,
    Ddtw(DtwParams),
    FullDdtw,
    Wdtw(WdtwParams),
    Wddtw(WdtwParams),
    Lcss(LcssParams),
    Erp(ErpParams),
    Msm(MsmParams),
    Twe(TweParams),
}

impl DistanceMeasure {
    /// Create a measure of the given family with default parameters.
    #[must_use]
    pub fn new(kind: MeasureKind) -> Self {
        match kind {
            MeasureKind::Euclidean => Self::Euclidean,
            MeasureKind::Dtw => Self::Dtw(DtwParams::default()),
            MeasureKind::FullDtw => Self::FullDtw,
            MeasureKind::Ddtw => Self::Ddtw(DtwParams::default()),
            MeasureKind::FullDdtw => Self::FullDdtw,
            MeasureKind::Wdtw => Self::Wdtw(WdtwParams { g: 0.05 }),
            MeasureKind::Wddtw => Self::Wddtw(WdtwParams { g: 0.05 }),
            MeasureKind::Lcss => Self::Lcss(LcssParams {
                epsilon: 0.01,
                window: WarpingWindow::Full,
            }),
            MeasureKind::Erp => Self::Erp(ErpParams {
                g: 0.0,
                window: WarpingWindow::Full,
            }),
            MeasureKind::Msm => Self::Msm(MsmParams { cost: 1.0 }),
            MeasureKind::Twe => Self::Twe(TweParams { nu: 1.0, lambda: 1.0 }),
        }
    }

    /// Return the family tag.
    #[must_use]
    pub fn kind(&self) -> MeasureKind {
        match self {
            Self::Euclidean => MeasureKind::Euclidean,
            Self::Dtw(_) => MeasureKind::Dtw,
            Self::FullDtw => MeasureKind::FullDtw,
            Self::Ddtw(_) => MeasureKind::Ddtw,
            Self::FullDdtw => MeasureKind::FullDdtw,
            Self::Wdtw(_) => MeasureKind::Wdtw,
            Self::Wddtw(_) => MeasureKind::Wddtw,
            Self::Lcss(_) => MeasureKind::Lcss,
            Self::Erp(_) => MeasureKind::Erp,
            Self::Msm(_) => MeasureKind::Msm,
            Self::Twe(_) => MeasureKind::Twe,
        }
    }

    /// Re-draw this measure's parameters.
    ///
    /// | Family | Draw |
    /// |---|---|
    /// | DTW, DDTW | radius ~ U{0..=(L+1)/4} |
    /// | WDTW, WDDTW | `g` ~ U[0, 1) |
    /// | LCSS | `epsilon` ~ U[σ/5, σ), radius ~ U{0..=(L+1)/4} |
    /// | ERP | `g` ~ U[σ/5, σ), radius ~ U{0..=(L+1)/4} |
    /// | MSM | `cost` from [`MSM_COSTS`] |
    /// | TWE | `nu` from [`TWE_NU`], `lambda` from [`TWE_LAMBDA`] |
    ///
    /// Euclidean and the full-window variants have nothing to draw. The
    /// sequence of draws depends only on the family and `rng`, so a fixed
    /// seed reproduces the same parameters.
    pub fn sample_parameters<R: Rng + ?Sized>(&mut self, stats: &SeriesStats, rng: &mut R) {
        let max_window = stats.max_window();
        let sigma = stats.std_dev;

        match self {
            Self::Euclidean | Self::FullDtw | Self::FullDdtw => {}
            Self::Dtw(p) | Self::Ddtw(p) => {
                p.window = WarpingWindow::Radius(rng.gen_range(0..=max_window));
            }
            Self::Wdtw(p) | Self::Wddtw(p) => {
                p.g = rng.r#gen::<f64>();
            }
            Self::Lcss(p) => {
                p.epsilon = uniform_between(rng, sigma / 5.0, sigma);
                p.window = WarpingWindow::Radius(rng.gen_range(0..=max_window));
            }
            Self::Erp(p) => {
                p.g = uniform_between(rng, sigma / 5.0, sigma);
                p.window = WarpingWindow::Radius(rng.gen_range(0..=max_window));
            }
            Self::Msm(p) => {
                p.cost = MSM_COSTS[rng.gen_range(0..MSM_COSTS.len())];
            }
            Self::Twe(p) => {
                p.nu = TWE_NU[rng.gen_range(0..TWE_NU.len())];
                p.lambda = TWE_LAMBDA[rng.gen_range(0..TWE_LAMBDA.len())];
            }
        }
        trace!(measure = %self, "sampled parameters");
    }

    /// Compute the distance between two equal-length series.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DistanceError::LengthMismatch`] | `a.len() != b.len()` |
    pub fn distance(
        &self,
        a: TimeSeriesView<'_>,
        b: TimeSeriesView<'_>,
    ) -> Result<Distance, DistanceError> {
        check_lengths(a, b)?;
        Ok(Distance::new(self.finish(self.score(a.as_slice(), b.as_slice(), None))))
    }

    /// Compute the distance, abandoning early once it provably exceeds `cutoff`.
    ///
    /// Returns [`Distance::INFINITY`] when abandoned. A finite result always
    /// equals [`distance`](Self::distance). Only the lock-step and warping
    /// families abandon; edit-distance families are always computed in full.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DistanceError::LengthMismatch`] | `a.len() != b.len()` |
    pub fn distance_with_cutoff(
        &self,
        a: TimeSeriesView<'_>,
        b: TimeSeriesView<'_>,
        cutoff: f64,
    ) -> Result<Distance, DistanceError> {
        check_lengths(a, b)?;
        let score = self.score(a.as_slice(), b.as_slice(), Some(self.to_score(cutoff)));
        if score.is_infinite() {
            return Ok(Distance::INFINITY);
        }
        Ok(Distance::new(self.finish(score)))
    }

    /// Return the index of the exemplar nearest to `query`.
    ///
    /// Exact ties are resolved by `tie_break`. With [`TieBreak::Random`] each
    /// tied exemplar is equally likely; `rng` is consulted only when a tie
    /// actually occurs.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DistanceError::NoExemplars`] | `exemplars` is empty |
    /// | [`DistanceError::LengthMismatch`] | An exemplar's length differs from `query` |
    pub fn nearest_of<'e, I, R>(
        &self,
        query: TimeSeriesView<'_>,
        exemplars: I,
        tie_break: TieBreak,
        rng: &mut R,
    ) -> Result<usize, DistanceError>
    where
        I: IntoIterator<Item = TimeSeriesView<'e>>,
        R: Rng + ?Sized,
    {
        let mut best: Option<(usize, f64)> = None;
        let mut n_tied = 0u32;

        for (idx, exemplar) in exemplars.into_iter().enumerate() {
            check_lengths(query, exemplar)?;
            let cutoff = best.map(|(_, s)| s);
            let score = self.score(query.as_slice(), exemplar.as_slice(), cutoff);

            match best {
                None => {
                    best = Some((idx, score));
                    n_tied = 1;
                }
                Some((_, best_score)) if score < best_score => {
                    best = Some((idx, score));
                    n_tied = 1;
                }
                Some((_, best_score)) if score == best_score => {
                    n_tied += 1;
                    // Reservoir sampling keeps each tied index with probability 1/n_tied.
                    if tie_break == TieBreak::Random && rng.gen_range(0..n_tied) == 0 {
                        best = Some((idx, score));
                    }
                }
                Some(_) => {}
            }
        }

        best.map(|(idx, _)| idx).ok_or(DistanceError::NoExemplars)
    }

    /// Human-readable family name and parameters.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Euclidean => "Euclidean".to_string(),
            Self::Dtw(p) => format!("DTW(window={})", p.window),
            Self::FullDtw => "DTW(window=full)".to_string(),
            Self::Ddtw(p) => format!("DDTW(window={})", p.window),
            Self::FullDdtw => "DDTW(window=full)".to_string(),
            Self::Wdtw(p) => format!("WDTW(g={:.4})", p.g),
            Self::Wddtw(p) => format!("WDDTW(g={:.4})", p.g),
            Self::Lcss(p) => format!("LCSS(epsilon={:.4}, window={})", p.epsilon, p.window),
            Self::Erp(p) => format!("ERP(g={:.4}, window={})", p.g, p.window),
            Self::Msm(p) => format!("MSM(cost={})", p.cost),
            Self::Twe(p) => format!("TWE(nu={}, lambda={})", p.nu, p.lambda),
        }
    }

    /// Raw comparable score. Monotone in the final distance, so comparisons
    /// and cutoffs can skip the final transform.
    fn score(&self, a: &[f64], b: &[f64], cutoff: Option<f64>) -> f64 {
        match self {
            Self::Euclidean => warp::squared_euclidean(a, b, cutoff),
            Self::Dtw(p) => warp::warp_cost(a, b, p.window, None, cutoff),
            Self::FullDtw => warp::warp_cost(a, b, WarpingWindow::Full, None, cutoff),
            Self::Ddtw(p) => {
                warp::warp_cost(&derivative(a), &derivative(b), p.window, None, cutoff)
            }
            Self::FullDdtw => {
                warp::warp_cost(&derivative(a), &derivative(b), WarpingWindow::Full, None, cutoff)
            }
            Self::Wdtw(p) => {
                let w = wdtw_weights(a.len(), p.g);
                warp::warp_cost(a, b, WarpingWindow::Full, Some(&w), cutoff)
            }
            Self::Wddtw(p) => {
                let w = wdtw_weights(a.len(), p.g);
                warp::warp_cost(&derivative(a), &derivative(b), WarpingWindow::Full, Some(&w), cutoff)
            }
            Self::Lcss(p) => edit::lcss(a, b, p.epsilon, p.window),
            Self::Erp(p) => edit::erp(a, b, p.g, p.window),
            Self::Msm(p) => edit::msm(a, b, p.cost),
            Self::Twe(p) => edit::twe(a, b, p.nu, p.lambda),
        }
    }

    /// Map a score to the reported distance.
    fn finish(&self, score: f64) -> f64 {
        match self {
            Self::Euclidean | Self::Dtw(_) | Self::FullDtw | Self::Ddtw(_) | Self::FullDdtw => {
                score.sqrt()
            }
            _ => score,
        }
    }

    /// Map a distance-space cutoff into score space.
    fn to_score(&self, cutoff: f64) -> f64 {
        match self {
            Self::Euclidean | Self::Dtw(_) | Self::FullDtw | Self::Ddtw(_) | Self::FullDdtw => {
                cutoff * cutoff
            }
            _ => cutoff,
        }
    }
}

impl fmt::Display for DistanceMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

fn check_lengths(a: TimeSeriesView<'_>, b: TimeSeriesView<'_>) -> Result<(), DistanceError> {
    if a.len() == b.len() {
        Ok(())
    } else {
        Err(DistanceError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        })
    }
}

/// Draw from `[lo, hi)`, or return `lo` when the range is empty.
fn uniform_between<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo { rng.gen_range(lo..hi) } else { lo }
}
