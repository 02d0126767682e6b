use super::{check_lookback, mean, require};
use crate::error::Result;

/// Mean true range over the last `n` bars. The first bar only supplies the
/// previous close, so `n + 1` bars are required.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], n: usize) -> Result<f64> {
    check_lookback("atr", n)?;
    let len = highs.len().min(lows.len()).min(closes.len());
    require(&closes[..len], n + 1)?;

    let start = len - n;
    let ranges: Vec<f64> = (start..len)
        .map(|i| {
            let prev_close = closes[i - 1];
            (highs[i] - lows[i])
                .max((highs[i] - prev_close).abs())
                .max((lows[i] - prev_close).abs())
        })
        .collect();
    Ok(mean(&ranges))
}
