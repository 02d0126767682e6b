use super::{check_lookback, require};
use crate::error::Result;

/// Relative strength index over the last `n` price changes.
///
/// Gains and losses are plain means over the `n` deltas (no Wilder
/// smoothing). A window without losses reads 100.
pub fn rsi(values: &[f64], n: usize) -> Result<f64> {
    check_lookback("rsi", n)?;
    require(values, n + 1)?;

    let window = &values[values.len() - n - 1..];
    let (gain, loss) = window.windows(2).fold((0.0, 0.0), |(g, l), w| {
        let delta = w[1] - w[0];
        (g + delta.max(0.0), l + (-delta).max(0.0))
    });
    let avg_gain = gain / n as f64;
    let avg_loss = loss / n as f64;

    if avg_loss == 0.0 {
        return Ok(100.0);
    }
    let rs = avg_gain / avg_loss;
    Ok((100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn balanced_moves_read_fifty() {
        let v = rsi(&[10.0, 11.0, 10.0, 11.0, 10.0], 4).unwrap();
        assert!((v - 50.0).abs() < 1e-12);
    }

    #[test]
    fn known_value() {
        // deltas: +2, -1, +3 -> avg_gain 5/3, avg_loss 1/3, rs 5
        let v = rsi(&[50.0, 52.0, 51.0, 54.0], 3).unwrap();
        assert!((v - (100.0 - 100.0 / 6.0)).abs() < 1e-12);
    }

    #[test]
    fn only_last_n_deltas_count() {
        let v = rsi(&[100.0, 1.0, 2.0, 3.0], 2).unwrap();
        assert_eq!(v, 100.0);
    }

    #[test]
    fn rising_run_approaches_hundred() {
        let n = 5;
        let mut closes = vec![100.0, 95.0, 90.0, 85.0, 80.0, 75.0];
        let mut last = rsi(&closes, n).unwrap();
        assert_eq!(last, 0.0);
        for step in 1..=n {
            closes.push(75.0 + step as f64);
            let next = rsi(&closes, n).unwrap();
            assert!(next >= last, "rsi fell from {last} to {next}");
            assert!((0.0..=100.0).contains(&next));
            last = next;
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn needs_n_plus_one_values() {
        assert_eq!(
            rsi(&[1.0, 2.0, 3.0], 3),
            Err(EngineError::InsufficientData {
                required: 4,
                available: 3
            })
        );
    }
}
