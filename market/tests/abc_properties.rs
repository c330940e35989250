use market::pattern::analyze;
use market::{PriceBar, PriceSeries};
use proptest::prelude::*;

mod fixtures;
use fixtures::{Tail, abc_series, series_from_lows};

/// Random walk of lows, kept strictly positive.
fn lows_strategy(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-3.0..3.0f64, 0..max_len).prop_map(|steps| {
        let mut price = 100.0;
        steps
            .into_iter()
            .map(|s| {
                price = (price + s).max(1.0);
                price
            })
            .collect()
    })
}

/// The retest fixture with a noisy floor, a deeper or shallower breakdown,
/// a moved retest low and a different last close, all rescaled to a random
/// price level. Every variant keeps a valid, recent A-B-C structure.
fn perturbed_abc() -> impl Strategy<Value = PriceSeries> {
    (
        0.5..50.0f64,
        prop::collection::vec(0.0..0.4f64, 158),
        0.0..20.0f64,
        99.6..100.8f64,
        99.0..103.0f64,
    )
        .prop_map(|(scale, floor_noise, extra_drop, retest_low, last_close)| {
            let base = abc_series(Tail::Retest);
            let bars = base.bars().iter().enumerate().map(|(i, b)| {
                let mut b = *b;
                match i {
                    0..158 => {
                        b.low += floor_noise[i];
                        b.high += floor_noise[i];
                        b.close += floor_noise[i];
                    }
                    165 => b.low -= extra_drop,
                    186 => b.low = retest_low,
                    187.. => {
                        b.low = last_close - 0.4;
                        b.high = last_close + 0.7;
                        b.close = last_close;
                    }
                    _ => {}
                }
                scaled(b, scale)
            });

            PriceSeries::new(base.symbol(), base.interval(), bars)
        })
}

fn scaled(b: PriceBar, k: f64) -> PriceBar {
    PriceBar {
        open: b.open * k,
        high: b.high * k,
        low: b.low * k,
        close: b.close * k,
        ..b
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn short_series_never_pass(lows in lows_strategy(30), lookback in 0usize..200) {
        let v = analyze(&series_from_lows(&lows, 1.5), lookback);
        prop_assert!(!v.passed);
        prop_assert!(v.points.is_none());
    }

    #[test]
    fn support_lies_in_floor_region(lows in lows_strategy(260), lookback in 1usize..200) {
        let series = series_from_lows(&lows, 1.5);
        let v = analyze(&series, lookback);

        if let Some(points) = v.points {
            let len = series.len();
            let eff = lookback.min(len - 5);
            let offset = len - eff;
            let split = (eff as f64 * 0.65).floor() as usize;

            prop_assert!(points.support.index >= offset);
            prop_assert!(points.support.index < offset + split);
        }
    }

    #[test]
    fn passing_verdicts_are_ordered(lows in lows_strategy(260), lookback in 1usize..200) {
        let v = analyze(&series_from_lows(&lows, 1.5), lookback);

        if v.passed {
            let points = v.points.unwrap();
            let b = points.breakdown.unwrap();
            let c = points.retest.unwrap();

            prop_assert!(points.support.index < b.index);
            prop_assert!(b.index < c.index);
            prop_assert!(b.value < points.support.value);
        }
    }

    #[test]
    fn perturbed_structures_pass_in_order(series in perturbed_abc()) {
        let v = analyze(&series, 120);
        prop_assert!(v.passed, "{:?}", v.outcome);

        let points = v.points.unwrap();
        let a = points.support;
        let b = points.breakdown.unwrap();
        let c = points.retest.unwrap();

        prop_assert!(a.index < b.index);
        prop_assert!(b.index < c.index);
        prop_assert!(b.value < a.value);
        prop_assert_eq!(b.index, 165);
        prop_assert!((c.value - a.value).abs() <= a.value * 0.01);
    }

    #[test]
    fn analysis_is_repeatable(lows in lows_strategy(260), lookback in 0usize..200) {
        let series = series_from_lows(&lows, 1.5);
        let first = analyze(&series, lookback);
        let second = analyze(&series, lookback);
        prop_assert_eq!(first, second);
    }
}
