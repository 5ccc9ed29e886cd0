//! Accuracy regression tests for proximity-distance.
//!
//! Reference values are either hand-derived or were captured from the
//! implementation and are hardcoded to catch regressions.

use proximity_distance::{
    DistanceMeasure, DtwParams, ErpParams, LcssParams, MeasureKind, MsmParams, SeriesStats,
    TieBreak, TimeSeries, TweParams, WarpingWindow, WdtwParams,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

fn ts(values: Vec<f64>) -> TimeSeries {
    TimeSeries::new(values).expect("valid test series")
}

fn dist(m: &DistanceMeasure, a: &TimeSeries, b: &TimeSeries) -> f64 {
    m.distance(a.as_view(), b.as_view()).unwrap().value()
}

// ---------------------------------------------------------------------------
// a) full DTW matches known values
// ---------------------------------------------------------------------------

#[test]
fn full_dtw_matches_known_values() {
    let cases: Vec<(TimeSeries, TimeSeries, f64)> = vec![
        (ts(vec![0.0, 0.0, 0.0]), ts(vec![1.0, 1.0, 1.0]), 1.7320508075688772),
        (ts(vec![0.0, 1.0, 0.0]), ts(vec![0.0, 0.0, 0.0]), 1.0),
        (ts(vec![1.0, 2.0, 3.0, 4.0]), ts(vec![1.0, 2.0, 3.0, 4.0]), 0.0),
        (ts(vec![1.0, 2.0, 3.0]), ts(vec![3.0, 2.0, 1.0]), 2.8284271247461903),
        (ts(vec![1.0]), ts(vec![5.0]), 4.0),
        (ts(vec![0.0, 0.0, 1.0]), ts(vec![1.0, 0.0, 0.0]), 1.4142135623730951),
        (ts(vec![10.0, 10.0, 10.0]), ts(vec![10.1, 9.9, 10.0]), 0.14142135623730953),
    ];

    let dtw = DistanceMeasure::FullDtw;
    for (i, (a, b, expected)) in cases.iter().enumerate() {
        let got = dist(&dtw, a, b);
        assert!(
            (got - expected).abs() < 1e-10,
            "case {i}: got {got:.15}, expected {expected:.15}"
        );
    }
}

// ---------------------------------------------------------------------------
// b) windowed measures never beat their unconstrained counterpart
// ---------------------------------------------------------------------------

#[test]
fn banded_distances_geq_full() {
    let pairs = vec![
        (ts(vec![0.0, 1.0, 2.0, 3.0]), ts(vec![3.0, 2.0, 1.0, 0.0])),
        (ts(vec![1.0, 5.0, 1.0, 5.0, 1.0]), ts(vec![5.0, 1.0, 5.0, 1.0, 5.0])),
        (ts(vec![0.0, 0.0, 0.0, 1.0]), ts(vec![1.0, 0.0, 0.0, 0.0])),
        (ts(vec![10.0, 0.0, 10.0]), ts(vec![0.0, 10.0, 0.0])),
    ];

    let band = WarpingWindow::Radius(1);
    for (a, b) in &pairs {
        let full = dist(&DistanceMeasure::FullDtw, a, b);
        let banded = dist(&DistanceMeasure::Dtw(DtwParams { window: band }), a, b);
        assert!(banded >= full - 1e-10, "dtw band {banded} < full {full}");

        let erp_full = dist(
            &DistanceMeasure::Erp(ErpParams { g: 0.0, window: WarpingWindow::Full }),
            a,
            b,
        );
        let erp_band = dist(&DistanceMeasure::Erp(ErpParams { g: 0.0, window: band }), a, b);
        assert!(erp_band >= erp_full - 1e-10);
    }
}

// ---------------------------------------------------------------------------
// c) radius zero collapses DTW to Euclidean
// ---------------------------------------------------------------------------

#[test]
fn zero_radius_dtw_equals_euclidean() {
    let a = ts(vec![0.3, 1.7, -2.0, 4.4, 0.0, 1.1]);
    let b = ts(vec![1.0, -0.5, 2.5, 0.0, 3.3, -1.0]);
    let zero = DistanceMeasure::Dtw(DtwParams { window: WarpingWindow::Radius(0) });
    let d_dtw = dist(&zero, &a, &b);
    let d_euc = dist(&DistanceMeasure::Euclidean, &a, &b);
    assert!((d_dtw - d_euc).abs() < 1e-10);
}

// ---------------------------------------------------------------------------
// d) derivative measures ignore constant offsets
// ---------------------------------------------------------------------------

#[test]
fn derivative_measures_ignore_offset() {
    let a = ts(vec![0.0, 1.0, 3.0, 2.0, 5.0, 4.0]);
    let shifted = ts(a.as_ref().iter().map(|v| v + 10.0).collect());
    assert!(dist(&DistanceMeasure::FullDdtw, &a, &shifted) < 1e-10);
    assert!(dist(&DistanceMeasure::Wddtw(WdtwParams { g: 0.3 }), &a, &shifted) < 1e-10);
    assert!(dist(&DistanceMeasure::FullDtw, &a, &shifted) > 1.0);
}

// ---------------------------------------------------------------------------
// e) edit-distance families on small hand-checked inputs
// ---------------------------------------------------------------------------

#[test]
fn edit_family_known_values() {
    let a = ts(vec![0.0, 0.0]);
    let b = ts(vec![1.0, 1.0]);

    // LCSS: nothing matches at epsilon 0.5, everything at 1.0.
    let strict = DistanceMeasure::Lcss(LcssParams { epsilon: 0.5, window: WarpingWindow::Full });
    let loose = DistanceMeasure::Lcss(LcssParams { epsilon: 1.0, window: WarpingWindow::Full });
    assert_eq!(dist(&strict, &a, &b), 1.0);
    assert_eq!(dist(&loose, &a, &b), 0.0);

    // MSM: two moves of cost 1 each.
    let msm = DistanceMeasure::Msm(MsmParams { cost: 5.0 });
    assert!((dist(&msm, &a, &b) - 2.0).abs() < 1e-12);

    // ERP with g = 0: diagonal match costs 1 + 1.
    let erp = DistanceMeasure::Erp(ErpParams { g: 0.0, window: WarpingWindow::Full });
    assert!((dist(&erp, &a, &b) - 2.0_f64.sqrt()).abs() < 1e-12);

    // TWE with zero stiffness reduces to matching both points: 1 + (1 + 1).
    let twe = DistanceMeasure::Twe(TweParams { nu: 0.0, lambda: 10.0 });
    assert!((dist(&twe, &a, &b) - 3.0).abs() < 1e-12);
}

// ---------------------------------------------------------------------------
// f) cutoff never changes a result it does not abandon
// ---------------------------------------------------------------------------

#[test]
fn cutoff_consistent_with_distance_for_every_family() {
    let a = ts(vec![1.0, 3.0, 2.0, 5.0, 4.0, 0.5, 2.5]);
    let b = ts(vec![2.0, 1.0, 4.0, 3.0, 6.0, 1.5, 0.0]);
    let stats = SeriesStats::from_views([a.as_view(), b.as_view()]).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for kind in MeasureKind::ALL {
        let mut m = DistanceMeasure::new(kind);
        m.sample_parameters(&stats, &mut rng);
        let exact = dist(&m, &a, &b);
        let generous = m
            .distance_with_cutoff(a.as_view(), b.as_view(), exact + 1.0)
            .unwrap()
            .value();
        assert!((exact - generous).abs() < 1e-10, "{m}: {exact} vs {generous}");
    }
}

// ---------------------------------------------------------------------------
// g) nearest-exemplar routing on well separated classes
// ---------------------------------------------------------------------------

#[test]
fn nearest_of_routes_to_matching_shape() {
    let rising = ts((0..16).map(|i| i as f64).collect());
    let falling = ts((0..16).map(|i| 15.0 - i as f64).collect());
    let query = ts((0..16).map(|i| i as f64 + 0.3).collect());
    let stats = SeriesStats::from_views([rising.as_view(), falling.as_view()]).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    for kind in MeasureKind::ALL {
        let mut m = DistanceMeasure::new(kind);
        m.sample_parameters(&stats, &mut rng);
        let idx = m
            .nearest_of(
                query.as_view(),
                [falling.as_view(), rising.as_view()],
                TieBreak::First,
                &mut rng,
            )
            .unwrap();
        assert_eq!(idx, 1, "{m} routed the rising query to the falling exemplar");
    }
}
