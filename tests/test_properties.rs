//! Property-based tests for the elementary transforms.
//!
//! These tests verify invariants that must hold for all inputs.

use polars::prelude::*;
use proptest::prelude::*;
use serde_json::json;
use tabprep::preprocessing::{Binner, BinningStrategy, FeatureClipper, Scaler, ScalerType};
use tabprep::prelude::*;

// ============================================================================
// Proptest Strategies
// ============================================================================

/// A finite value in a plausible feature range.
fn valid_value() -> impl Strategy<Value = f64> {
    (-1_000.0f64..1_000.0).prop_filter("must be finite", |x| x.is_finite())
}

/// A column of finite values.
fn valid_column(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(valid_value(), min_len..=max_len)
}

fn binning_strategy() -> impl Strategy<Value = BinningStrategy> {
    prop_oneof![
        Just(BinningStrategy::Uniform),
        Just(BinningStrategy::Quantile),
        Just(BinningStrategy::KMeans),
    ]
}

fn column_df(values: &[f64]) -> DataFrame {
    df!("x" => values).unwrap()
}

fn output(df: &DataFrame) -> Vec<f64> {
    df.column("x").unwrap().f64().unwrap().into_iter().flatten().collect()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_clip_output_within_limits(values in valid_column(1, 50), a in valid_value(), b in valid_value()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let mut clipper = FeatureClipper::new(Some(low), Some(high)).unwrap();
        let result = clipper.fit_transform(&column_df(&values)).unwrap();

        for v in output(&result) {
            prop_assert!(v >= low && v <= high, "{} outside [{}, {}]", v, low, high);
        }
    }

    #[test]
    fn prop_min_max_output_in_unit_range(values in valid_column(1, 50)) {
        let mut scaler = Scaler::new(ScalerType::MinMax);
        let result = scaler.fit_transform(&column_df(&values)).unwrap();

        for v in output(&result) {
            prop_assert!((-1e-12..=1.0 + 1e-12).contains(&v), "{} outside [0, 1]", v);
        }
    }

    #[test]
    fn prop_binner_outputs_come_from_value_map(
        train in valid_column(1, 60),
        test in valid_column(1, 20),
        strategy in binning_strategy(),
        n_bins in 2usize..8,
    ) {
        let mut binner = Binner::new(strategy, n_bins).unwrap();
        binner.fit(&column_df(&train)).unwrap();

        let bins = binner.column_bins("x").unwrap();
        prop_assert!(bins.value_map().len() <= n_bins);

        let allowed: Vec<f64> = bins.value_map().values().copied().collect();
        for df in [column_df(&train), column_df(&test)] {
            for v in output(&binner.transform(&df).unwrap()) {
                prop_assert!(allowed.contains(&v), "{} not in {:?}", v, allowed);
            }
        }
    }

    #[test]
    fn prop_integer_output_is_rounded(values in valid_column(1, 30), weight in 0.01f64..10.0) {
        let features = vec![FeatureConfig::new("x", FeatureType::Int64).with_step("weight", json!(weight))];
        let df = column_df(&values);

        let result = PreProcessor::new(features).fit_transform(&df, None).unwrap();
        let ints: Vec<i64> = result.column("x").unwrap().i64().unwrap().into_iter().flatten().collect();

        prop_assert_eq!(ints.len(), values.len());
        for (int, v) in ints.iter().zip(&values) {
            prop_assert_eq!(*int, (v * weight).round_ties_even() as i64);
        }
    }

    #[test]
    fn prop_fit_transform_equals_fit_then_transform(values in valid_column(2, 40), strategy in binning_strategy()) {
        let features = vec![FeatureConfig::new("x", FeatureType::Float64)
            .with_step("scaler", "standard")
            .with_step("discretizer", format!("{}:3", match strategy {
                BinningStrategy::Uniform => "uniform",
                BinningStrategy::Quantile => "quantile",
                BinningStrategy::KMeans => "kmeans",
            }))];
        let df = column_df(&values);

        let combined = PreProcessor::new(features.clone()).fit_transform(&df, None).unwrap();
        let mut preprocessor = PreProcessor::new(features);
        preprocessor.fit(&df, None).unwrap();
        let separate = preprocessor.transform(&df).unwrap();

        prop_assert!(combined.equals_missing(&separate));
    }
}
