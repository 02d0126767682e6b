//! Technical indicators over a [`RollingSeriesBuffer`].
//!
//! - `ma`: simple and exponential moving averages
//! - `rsi`: relative strength index (simple-mean variant)
//! - `macd`: convergence/divergence oscillator
//! - `boll`: population standard deviation and volatility bands
//! - `atr`: average true range
//!
//! Every function fails with `InsufficientData` instead of returning a
//! placeholder when the history is too short.

pub mod atr;
pub mod boll;
pub mod ma;
pub mod macd;
pub mod rsi;

use serde::Serialize;

use crate::config::IndicatorSettings;
use crate::error::{EngineError, Result};
use crate::models::BarField;
use crate::series::RollingSeriesBuffer;

pub use boll::Bands;
pub use macd::Macd;

/// Read-only indicator view over a live buffer. Holds no state of its own.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorEngine<'a> {
    series: &'a RollingSeriesBuffer,
}

impl<'a> IndicatorEngine<'a> {
    pub fn new(series: &'a RollingSeriesBuffer) -> Self {
        Self { series }
    }

    pub fn series(&self) -> &'a RollingSeriesBuffer {
        self.series
    }

    pub fn snapshot(&self, field: BarField, count: usize) -> Result<Vec<f64>> {
        self.series.snapshot(field, count)
    }

    fn closes(&self) -> Vec<f64> {
        self.series.column(BarField::Close)
    }

    pub fn sma(&self, n: usize) -> Result<f64> {
        ma::sma(&self.closes(), n)
    }

    pub fn ema(&self, n: usize) -> Result<f64> {
        ma::ema(&self.closes(), n)
    }

    pub fn rsi(&self, n: usize) -> Result<f64> {
        rsi::rsi(&self.closes(), n)
    }

    pub fn macd(&self, fast: usize, slow: usize, signal: usize) -> Result<Macd> {
        macd::macd(&self.closes(), fast, slow, signal)
    }

    pub fn std_dev(&self, n: usize) -> Result<f64> {
        boll::std_dev(&self.closes(), n)
    }

    pub fn boll(&self, n: usize, k: f64) -> Result<Bands> {
        boll::boll(&self.closes(), n, k)
    }

    pub fn atr(&self, n: usize) -> Result<f64> {
        atr::atr(
            &self.series.column(BarField::High),
            &self.series.column(BarField::Low),
            &self.closes(),
            n,
        )
    }

    /// Evaluates every configured indicator; entries still warming up are `None`.
    pub fn readings(&self, settings: &IndicatorSettings) -> Result<IndicatorReadings> {
        let m = &settings.macd;
        Ok(IndicatorReadings {
            bars: self.series.len(),
            sma: warming(self.sma(settings.sma))?,
            rsi: warming(self.rsi(settings.rsi))?,
            macd: warming(self.macd(m.fast, m.slow, m.signal))?,
            boll: warming(self.boll(settings.boll.period, settings.boll.k))?,
        })
    }
}

/// Latest value of each configured indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorReadings {
    pub bars: usize,
    pub sma: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<Macd>,
    pub boll: Option<Bands>,
}

/// Maps "not enough history yet" to `None`; every other error propagates.
fn warming<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(EngineError::InsufficientData { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

pub(crate) fn check_lookback(name: &str, n: usize) -> Result<()> {
    if n == 0 {
        return Err(EngineError::invalid_config(format!("{name} lookback must be > 0")));
    }
    Ok(())
}

pub(crate) fn require(values: &[f64], required: usize) -> Result<()> {
    if values.len() < required {
        return Err(EngineError::InsufficientData {
            required,
            available: values.len(),
        });
    }
    Ok(())
}

/// Arithmetic mean taken around the first element, so a constant window
/// returns its value bit-for-bit.
pub(crate) fn mean(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return f64::NAN;
    };
    let offset: f64 = values.iter().map(|v| v - first).sum();
    first + offset / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;
    use crate::models::Bar;

    fn buffer(closes: &[f64], capacity: usize) -> RollingSeriesBuffer {
        let mut buf = RollingSeriesBuffer::new(capacity).unwrap();
        for (i, &c) in closes.iter().enumerate() {
            buf.append(Bar {
                symbol: "BTCUSDT".into(),
                venue: "BINANCE".into(),
                interval: Interval::parse("1m").unwrap(),
                open_time: i as i64 * 60_000,
                open: c,
                high: c + 0.5,
                low: c - 0.5,
                close: c,
                volume: 1.0,
                turnover: c,
                open_interest: 0.0,
            });
        }
        buf
    }

    #[test]
    fn sma_and_boll_on_reference_closes() {
        let buf = buffer(&[100.0, 101.0, 99.0, 102.0, 103.0], 5);
        let engine = IndicatorEngine::new(&buf);

        let sma = engine.sma(3).unwrap();
        assert!((sma - 101.333_333_333).abs() < 1e-6);

        let bands = engine.boll(3, 2.0).unwrap();
        let sigma = ((99.0_f64 - sma).powi(2) + (102.0 - sma).powi(2) + (103.0 - sma).powi(2)) / 3.0;
        let sigma = sigma.sqrt();
        assert!((sigma - 1.699_673).abs() < 1e-6);
        assert!((bands.mid - sma).abs() < 1e-9);
        assert!((bands.upper - (sma + 2.0 * sigma)).abs() < 1e-9);
        assert!((bands.lower - (sma - 2.0 * sigma)).abs() < 1e-9);
        assert!(bands.upper >= bands.mid && bands.mid >= bands.lower);
    }

    #[test]
    fn short_history_is_an_error_not_a_sentinel() {
        let buf = buffer(&[1.0, 2.0, 3.0], 10);
        let engine = IndicatorEngine::new(&buf);
        assert_eq!(
            engine.sma(5),
            Err(EngineError::InsufficientData {
                required: 5,
                available: 3
            })
        );
        assert!(matches!(engine.rsi(3), Err(EngineError::InsufficientData { .. })));
        assert!(matches!(engine.atr(3), Err(EngineError::InsufficientData { .. })));
        assert!(matches!(engine.sma(0), Err(EngineError::InvalidWindowConfig(_))));
    }

    #[test]
    fn readings_report_warm_up_as_none() {
        let settings = IndicatorSettings::default();
        let buf = buffer(&[10.0, 11.0, 12.0], 100);
        let r = IndicatorEngine::new(&buf).readings(&settings).unwrap();
        assert_eq!(r.bars, 3);
        assert_eq!(r.sma, None);
        assert_eq!(r.rsi, None);
        assert_eq!(r.macd, None);
        assert_eq!(r.boll, None);

        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i % 7) as f64).collect();
        let buf = buffer(&closes, 100);
        let r = IndicatorEngine::new(&buf).readings(&settings).unwrap();
        assert!(r.sma.is_some() && r.rsi.is_some() && r.macd.is_some() && r.boll.is_some());
    }

    #[test]
    fn mean_of_constant_is_exact() {
        assert_eq!(mean(&[0.1, 0.1, 0.1]), 0.1);
        assert!(mean(&[]).is_nan());
    }
}
