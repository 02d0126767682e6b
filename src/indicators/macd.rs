use serde::Serialize;

use super::{check_lookback, ma::ema_series, require};
use crate::error::{EngineError, Result};

/// MACD triple at the most recent point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// `macd = ema(fast) - ema(slow)`, `signal = ema(macd, signal)`,
/// `histogram = macd - signal`.
///
/// Needs `slow + signal - 1` values: the slow EMA's seed window plus enough
/// MACD points to seed the signal line.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Result<Macd> {
    check_lookback("macd fast", fast)?;
    check_lookback("macd slow", slow)?;
    check_lookback("macd signal", signal)?;
    if fast >= slow {
        return Err(EngineError::invalid_config(format!(
            "macd fast span ({fast}) must be shorter than slow span ({slow})"
        )));
    }
    require(values, slow + signal - 1)?;

    let fast_ema = ema_series(values, fast)?;
    let slow_ema = ema_series(values, slow)?;
    // fast_ema starts (slow - fast) points earlier than slow_ema
    let lag = slow - fast;
    let line: Vec<f64> = slow_ema
        .iter()
        .enumerate()
        .map(|(j, s)| fast_ema[j + lag] - s)
        .collect();

    let signal_series = ema_series(&line, signal)?;
    let macd = line[line.len() - 1];
    let signal = signal_series[signal_series.len() - 1];
    Ok(Macd {
        macd,
        signal,
        histogram: macd - signal,
    })
}
