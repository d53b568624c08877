//! Property tests for calibration strategies
//!
//! Every strategy must be bounded, complementary, monotonic and must take
//! its decision from the display probability.

use proptest::prelude::*;
use toxiscan_classifiers::{
    CalibrationStrategy, Identity, LinearAmplify, RangeStretch, SigmoidAmplify, SqrtAmplify,
};

fn strategies() -> Vec<Box<dyn CalibrationStrategy>> {
    vec![
        Box::new(RangeStretch::default()),
        Box::new(RangeStretch::new(0.30, 0.70).unwrap()),
        Box::new(Identity),
        Box::new(LinearAmplify::default()),
        Box::new(SqrtAmplify),
        Box::new(SigmoidAmplify::default()),
    ]
}

proptest! {
    #[test]
    fn display_is_bounded_and_complementary(raw in 0.0f64..=1.0) {
        for strategy in strategies() {
            let d = strategy.decide(raw).unwrap();
            prop_assert!((0.0..=1.0).contains(&d.display_probability), "{}", strategy.name());
            prop_assert!((d.display_probability + d.complement_probability - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn decision_matches_display(raw in 0.0f64..=1.0) {
        for strategy in strategies() {
            let d = strategy.decide(raw).unwrap();
            prop_assert_eq!(d.is_toxic, d.display_probability > 0.5, "{}", strategy.name());
        }
    }

    #[test]
    fn confidence_is_at_least_half(raw in 0.0f64..=1.0) {
        for strategy in strategies() {
            let d = strategy.decide(raw).unwrap();
            prop_assert!(d.confidence >= 0.5 && d.confidence <= 1.0, "{}", strategy.name());
            prop_assert_eq!(d.confidence, d.display_probability.max(d.complement_probability));
        }
    }

    #[test]
    fn display_is_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        for strategy in strategies() {
            let d_low = strategy.decide(low).unwrap();
            let d_high = strategy.decide(high).unwrap();
            prop_assert!(
                d_low.display_probability <= d_high.display_probability,
                "{}: decide({}) = {} > decide({}) = {}",
                strategy.name(), low, d_low.display_probability, high, d_high.display_probability
            );
        }
    }

    #[test]
    fn range_stretch_bands(raw in 0.0f64..=1.0) {
        let strategy = RangeStretch::default();
        let display = strategy.decide(raw).unwrap().display_probability;
        if raw < RangeStretch::DEFAULT_LOW {
            prop_assert!((0.10..0.20 + 1e-12).contains(&display));
        } else if raw > RangeStretch::DEFAULT_HIGH {
            prop_assert!(display >= 0.80 && display <= 0.90);
        } else {
            prop_assert!(display >= 0.20 - 1e-12 && display <= 0.80 + 1e-12);
        }
    }

    #[test]
    fn out_of_range_input_rejected(raw in prop_oneof![-1000.0f64..-1e-9, 1.0f64 + 1e-9..1000.0]) {
        for strategy in strategies() {
            prop_assert!(strategy.decide(raw).is_err());
        }
    }
}

#[test]
fn literal_boundary_scenarios() {
    let strategy = RangeStretch::default();

    let d = strategy.decide(0.44).unwrap();
    assert!((d.display_probability - 0.20).abs() < 1e-9);
    assert!(!d.is_toxic);

    let d = strategy.decide(0.48).unwrap();
    assert!((d.display_probability - 0.80).abs() < 1e-9);
    assert!(d.is_toxic);

    let d = strategy.decide(0.46).unwrap();
    assert!((d.display_probability - 0.50).abs() < 1e-9);

    let d = strategy.decide(0.30).unwrap();
    assert!(d.display_probability >= 0.10 && d.display_probability < 0.20);
    assert!(!d.is_toxic);

    let d = strategy.decide(0.95).unwrap();
    assert!(d.display_probability > 0.88 && d.display_probability <= 0.90);
    assert!(d.is_toxic);
}

#[test]
fn midpoint_does_not_flip_between_neighbours() {
    let strategy = RangeStretch::default();
    let below: Vec<bool> = (1..=10)
        .map(|i| strategy.decide(0.46 - i as f64 * 1e-7).unwrap().is_toxic)
        .collect();
    let above: Vec<bool> = (1..=10)
        .map(|i| strategy.decide(0.46 + i as f64 * 1e-7).unwrap().is_toxic)
        .collect();
    assert!(below.iter().all(|t| !t));
    assert!(above.iter().all(|t| *t));

    let repeated: Vec<bool> = (0..100)
        .map(|_| strategy.decide(0.46).unwrap().is_toxic)
        .collect();
    assert!(repeated.windows(2).all(|w| w[0] == w[1]));
}
