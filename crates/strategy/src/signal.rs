use common::Bar;

use crate::config::SignalVariant;
use crate::indicators::IndicatorSnapshot;

/// Direction the current bar points in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Bullish, // entry condition holds
    Bearish, // exit condition holds
    Neutral, // equality: hold whatever we have
}

/// Evaluate one bar. `None` means an input is still warming up and the bar
/// must be treated as "no signal".
pub fn evaluate(
    variant: SignalVariant,
    bar: &Bar,
    snapshot: &IndicatorSnapshot<'_>,
    hist_lookback: usize,
) -> Option<Bias> {
    match variant {
        SignalVariant::Crossover => {
            let sma = snapshot.sma.filter(|v| v.is_finite())?;
            Some(compare(bar.close, sma))
        }
        SignalVariant::MacdHistMeanRevert => {
            let current = snapshot.histogram.value_at(0)?;
            let avg = snapshot.histogram.mean(hist_lookback)?;
            if !(current.is_finite() && avg.is_finite()) {
                return None;
            }
            Some(compare(current, avg))
        }
    }
}

fn compare(value: f64, reference: f64) -> Bias {
    if value > reference {
        Bias::Bullish
    } else if value < reference {
        Bias::Bearish
    } else {
        Bias::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::Lookback;
    use chrono::{TimeZone, Utc};

    fn bar(close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2000, 1, 4, 0, 0, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    fn snapshot(sma: Option<f64>, hist: &Lookback<f64>) -> IndicatorSnapshot<'_> {
        IndicatorSnapshot {
            sma,
            macd: None,
            histogram: hist,
        }
    }

    #[test]
    fn crossover_is_strict() {
        let hist = Lookback::new(3);
        let v = SignalVariant::Crossover;
        assert_eq!(
            evaluate(v, &bar(12.0), &snapshot(Some(11.0), &hist), 3),
            Some(Bias::Bullish)
        );
        assert_eq!(
            evaluate(v, &bar(10.0), &snapshot(Some(11.0), &hist), 3),
            Some(Bias::Bearish)
        );
        assert_eq!(
            evaluate(v, &bar(11.0), &snapshot(Some(11.0), &hist), 3),
            Some(Bias::Neutral)
        );
    }

    #[test]
    fn crossover_without_sma_is_no_signal() {
        let hist = Lookback::new(3);
        let out = evaluate(SignalVariant::Crossover, &bar(12.0), &snapshot(None, &hist), 3);
        assert_eq!(out, None);
    }

    #[test]
    fn histogram_above_its_mean_is_bullish() {
        let mut hist = Lookback::new(3);
        for v in [1.0, 2.0, 3.0] {
            hist.push(v);
        }
        let out = evaluate(SignalVariant::MacdHistMeanRevert, &bar(1.0), &snapshot(None, &hist), 3);
        assert_eq!(out, Some(Bias::Bullish));
    }

    #[test]
    fn histogram_below_its_mean_is_bearish() {
        let mut hist = Lookback::new(3);
        for v in [3.0, 2.0, 1.0] {
            hist.push(v);
        }
        let out = evaluate(SignalVariant::MacdHistMeanRevert, &bar(1.0), &snapshot(None, &hist), 3);
        assert_eq!(out, Some(Bias::Bearish));
    }

    #[test]
    fn short_histogram_history_is_no_signal() {
        let mut hist = Lookback::new(3);
        hist.push(1.0);
        hist.push(5.0);
        let out = evaluate(SignalVariant::MacdHistMeanRevert, &bar(1.0), &snapshot(None, &hist), 3);
        assert_eq!(out, None);
    }
}
