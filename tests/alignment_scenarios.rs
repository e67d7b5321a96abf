/// Integration tests for the four aligners through the public API
///
/// These tests verify:
/// 1. Daily weather lands in (month, day, grid, variable) with a 28-day axis
/// 2. Monthly buckets land in (bucket, month, flattened-variable)
/// 3. Imagery (time, grid) flattening survives an identity transform
/// 4. Yield values are log-transformed, never NaN
/// 5. Geographic code padding is idempotent
///
/// Run with: cargo test --test alignment_scenarios

use cropnet_align::align::imagery::{flatten_time_grid, restore_time_grid};
use cropnet_align::model::pad_code;
use cropnet_align::{
    AlignError, DailyWeatherAligner, DateOrder, GeoKey, GridCell, ImageryAligner, MemoryImageryStore,
    MonthlyWeatherAligner, RawRecord, RawRecordTable, TemporalGranularity, YieldAligner,
};

use approx::assert_relative_eq;
use ndarray::{Array, Array4, ArrayD, IxDyn};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn daily_row(fips: &str, month: u8, day: u8, grid: &str, values: &[f64]) -> RawRecord {
    RawRecord {
        geo_key: GeoKey::new(fips),
        granularity: TemporalGranularity::Daily,
        month: Some(month),
        day: Some(day),
        grid: Some(GridCell::new(grid)),
        values: values.iter().map(|v| Some(*v)).collect(),
    }
}

/// Columns [T, P]. T encodes (grid, day); P encodes the day alone.
fn daily_table(fips: &str, month: u8, grids: &[&str], days: u8) -> RawRecordTable {
    let mut table = RawRecordTable::new(vec!["T".to_string(), "P".to_string()]);
    // Insert days in reverse so ordering comes from the aligner, not the input
    for day in (1..=days).rev() {
        for (g, grid) in grids.iter().enumerate() {
            let t = 100.0 * (g as f64 + 1.0) + day as f64;
            table
                .push(daily_row(fips, month, day, grid, &[t, day as f64 / 10.0]))
                .unwrap();
        }
    }
    table
}

// ---------------------------------------------------------------------------
// Daily Weather
// ---------------------------------------------------------------------------

#[test]
fn test_daily_scenario_two_grids_two_variables() {
    let table = daily_table("06037", 1, &["A", "B"], 28);
    let out = DailyWeatherAligner
        .align(&table, &GeoKey::new("06037"), &["T", "P"])
        .unwrap();

    assert_eq!(out.shape(), &[1, 28, 2, 2]);
    // grid A, day 1, in caller order [T, P]
    assert_eq!(out[[0, 0, 0, 0]], 101.0);
    assert_relative_eq!(out[[0, 0, 0, 1]], 0.1);
    // grid B, day 28
    assert_eq!(out[[0, 27, 1, 0]], 228.0);
}

#[test]
fn test_daily_variable_order_follows_caller() {
    let table = daily_table("06037", 1, &["A"], 28);
    let out = DailyWeatherAligner
        .align(&table, &GeoKey::new("06037"), &["P", "T"])
        .unwrap();
    assert_relative_eq!(out[[0, 0, 0, 0]], 0.1);
    assert_eq!(out[[0, 0, 0, 1]], 101.0);
}

#[test]
fn test_daily_day_axis_is_28_for_every_month_length() {
    for days in [28u8, 29, 30, 31] {
        let table = daily_table("19153", 3, &["1", "2"], days);
        let out = DailyWeatherAligner
            .align(&table, &GeoKey::new("19153"), &["T"])
            .unwrap();
        assert_eq!(out.shape(), &[1, 28, 2, 1], "month with {} days", days);
        assert_eq!(out[[0, 27, 0, 0]], 128.0);
    }
}

#[test]
fn test_daily_ragged_grid_is_shape_mismatch() {
    let mut table = daily_table("19153", 6, &["1"], 28);
    for day in 1..=27 {
        table.push(daily_row("19153", 6, day, "2", &[0.0, 0.0])).unwrap();
    }
    let err = DailyWeatherAligner
        .align(&table, &GeoKey::new("19153"), &["T"])
        .unwrap_err();
    assert!(matches!(err, AlignError::ShapeMismatch { .. }));
}

#[test]
fn test_daily_unknown_variable_is_missing_variable() {
    let table = daily_table("19153", 6, &["1"], 28);
    let err = DailyWeatherAligner
        .align(&table, &GeoKey::new("19153"), &["Wind Gust (m s**-1)"])
        .unwrap_err();
    assert!(matches!(err, AlignError::MissingVariable { ref variable } if variable == "Wind Gust (m s**-1)"));
}

#[test]
fn test_daily_other_county_is_key_not_found() {
    let table = daily_table("19153", 6, &["1"], 28);
    let err = DailyWeatherAligner
        .align(&table, &GeoKey::new("06037"), &["T"])
        .unwrap_err();
    assert!(matches!(err, AlignError::KeyNotFound { .. }));
}

// ---------------------------------------------------------------------------
// Monthly Weather
// ---------------------------------------------------------------------------

#[test]
fn test_monthly_scenario_one_bucket_twelve_months() {
    let mut table = RawRecordTable::new(vec!["T".to_string(), "P".to_string()]);
    for month in 1..=12u8 {
        table
            .push(RawRecord {
                geo_key: GeoKey::new("06037"),
                granularity: TemporalGranularity::Monthly,
                month: Some(month),
                day: None,
                grid: None,
                values: vec![Some(month as f64), Some(-(month as f64))],
            })
            .unwrap();
    }

    let out = MonthlyWeatherAligner
        .align(&[table], &GeoKey::new("06037"), &["T", "P"])
        .unwrap();
    assert_eq!(out.shape(), &[1, 12, 2]);
    assert_eq!(out[[0, 11, 0]], 12.0);
    assert_eq!(out[[0, 11, 1]], -12.0);
}

// ---------------------------------------------------------------------------
// Imagery
// ---------------------------------------------------------------------------

#[test]
fn test_imagery_identity_transform_keeps_tensor() {
    let key = GeoKey::new("19153");
    let mut store = MemoryImageryStore::new("q2.h5");
    for (i, date) in ["2022-04-01", "2022-05-01", "2022-06-01"].iter().enumerate() {
        let grid = Array::from_shape_fn(IxDyn(&[2, 4, 4, 3]), |ix| (i * 1000 + ix[0] * 100 + ix[3]) as f32);
        store.insert(&key, date, grid);
    }

    let plain = ImageryAligner
        .align(&[store.clone()], &key, &DateOrder::Native, None)
        .unwrap();
    let identity = |tiles: Array4<f32>| tiles;
    let transformed = ImageryAligner
        .align(&[store], &key, &DateOrder::Native, Some(&identity))
        .unwrap();

    assert_eq!(plain.shape(), &[3, 2, 3, 4, 4]);
    assert_eq!(plain, transformed);
}

#[test]
fn test_imagery_transform_may_resize_tiles() {
    let key = GeoKey::new("19153");
    let mut store = MemoryImageryStore::new("q2.h5");
    store.insert(&key, "2022-06-01", ArrayD::ones(IxDyn(&[2, 4, 4, 3])));

    let downsample = |tiles: Array4<f32>| tiles.slice(ndarray::s![.., .., ..;2, ..;2]).to_owned();
    let out = ImageryAligner
        .align(&[store], &key, &DateOrder::Native, Some(&downsample))
        .unwrap();
    assert_eq!(out.shape(), &[1, 2, 3, 2, 2]);
}

proptest! {
    #[test]
    fn prop_flatten_restore_round_trip(
        t in 1usize..4, g in 1usize..4, c in 1usize..4, h in 1usize..5, w in 1usize..5,
    ) {
        let tiles = Array::from_shape_fn((t, g, c, h, w), |(a, b, cc, d, e)| {
            (a * 10_000 + b * 1000 + cc * 100 + d * 10 + e) as f32
        });
        let flat = flatten_time_grid(tiles.clone()).unwrap();
        prop_assert_eq!(flat.dim(), (t * g, c, h, w));
        let restored = restore_time_grid(flat, t, g).unwrap();
        prop_assert_eq!(restored, tiles);
    }
}

// ---------------------------------------------------------------------------
// Yield
// ---------------------------------------------------------------------------

fn yield_table(value: f64) -> RawRecordTable {
    let mut table = RawRecordTable::new(vec!["YIELD, MEASURED IN BU / ACRE".to_string()]);
    table
        .push(RawRecord {
            geo_key: GeoKey::from_parts("6", "37"),
            granularity: TemporalGranularity::Yearly,
            month: None,
            day: None,
            grid: None,
            values: vec![Some(value)],
        })
        .unwrap();
    table
}

proptest! {
    #[test]
    fn prop_yield_is_natural_log(v in 1e-3f64..1e7) {
        let out = YieldAligner
            .align(&yield_table(v), "06", "037", &["YIELD, MEASURED IN BU / ACRE"])
            .unwrap();
        prop_assert!(out[0].is_finite());
        prop_assert!((out[0] - (v as f32).ln()).abs() < 1e-4);
    }

    #[test]
    fn prop_non_positive_yield_is_invalid_domain(v in -1e7f64..=0.0) {
        let err = YieldAligner
            .align(&yield_table(v), "6", "37", &["YIELD, MEASURED IN BU / ACRE"])
            .unwrap_err();
        let is_invalid_domain = matches!(err, AlignError::InvalidDomain { .. });
        prop_assert!(is_invalid_domain);
    }
}

// ---------------------------------------------------------------------------
// Code Padding
// ---------------------------------------------------------------------------

#[test]
fn test_pad_examples() {
    assert_eq!(pad_code("3", 3), "003");
    assert_eq!(pad_code("003", 3), "003");
    assert_eq!(GeoKey::new("6037").as_str(), "06037");
}

proptest! {
    #[test]
    fn prop_pad_is_idempotent(code in "[0-9]{1,5}", width in 1usize..6) {
        let once = pad_code(&code, width);
        prop_assert_eq!(pad_code(&once, width), once.clone());
        prop_assert!(once.len() >= width);
    }
}
