use super::{check_lookback, mean, require};
use crate::error::Result;

/// Arithmetic mean of the last `n` values.
pub fn sma(values: &[f64], n: usize) -> Result<f64> {
    check_lookback("sma", n)?;
    require(values, n)?;
    Ok(mean(&values[values.len() - n..]))
}

/// EMA series with multiplier `2 / (span + 1)`, seeded with the SMA of the
/// first `span` values. Element `j` lines up with `values[j + span - 1]`.
pub fn ema_series(values: &[f64], span: usize) -> Result<Vec<f64>> {
    check_lookback("ema", span)?;
    require(values, span)?;

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len() - span + 1);
    let mut prev = mean(&values[..span]);
    out.push(prev);
    for &v in &values[span..] {
        prev += alpha * (v - prev);
        out.push(prev);
    }
    Ok(out)
}

/// Most recent EMA point over the whole of `values`.
pub fn ema(values: &[f64], span: usize) -> Result<f64> {
    let series = ema_series(values, span)?;
    Ok(series[series.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn sma_uses_trailing_window() {
        assert_eq!(sma(&[1.0, 2.0, 3.0, 4.0], 2).unwrap(), 3.5);
        assert_eq!(sma(&[100.0, 101.0, 102.0], 2).unwrap(), 101.5);
    }

    #[test]
    fn sma_of_constant_is_exact() {
        let closes = [0.3; 17];
        for n in 1..=closes.len() {
            assert_eq!(sma(&closes, n).unwrap(), 0.3);
        }
    }

    #[test]
    fn ema_seeds_with_sma() {
        // seed = (1+2+3)/3 = 2, alpha = 0.5
        let series = ema_series(&[1.0, 2.0, 3.0, 4.0, 6.0], 3).unwrap();
        assert_eq!(series, vec![2.0, 3.0, 4.5]);
        assert_eq!(ema(&[1.0, 2.0, 3.0, 4.0, 6.0], 3).unwrap(), 4.5);
    }

    #[test]
    fn ema_needs_span_values() {
        assert_eq!(
            ema(&[1.0, 2.0], 3),
            Err(EngineError::InsufficientData {
                required: 3,
                available: 2
            })
        );
    }
}
