//! Elastic distance measures for time series classification.
//!
//! Pure math library, zero I/O. Provides validated series types, a closed
//! family of lock-step and elastic distance measures (Euclidean, DTW, DDTW,
//! WDTW, WDDTW, LCSS, ERP, MSM, TWE) with randomized parameter sampling, and
//! nearest-exemplar queries with configurable tie breaking.

mod derivative;
mod distance;
mod edit;
mod error;
mod measure;
mod series;
mod stats;
mod warp;
mod window;

pub use derivative::derivative;
pub use distance::Distance;
pub use error::DistanceError;
pub use measure::{
    DistanceMeasure, DtwParams, ErpParams, LcssParams, MSM_COSTS, MeasureKind, MsmParams,
    TWE_LAMBDA, TWE_NU, TieBreak, TweParams, WdtwParams,
};
pub use series::{TimeSeries, TimeSeriesView};
pub use stats::SeriesStats;
pub use warp::wdtw_weights;
pub use window::WarpingWindow;
