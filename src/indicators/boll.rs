use serde::Serialize;

use super::{check_lookback, mean, require};
use crate::error::{EngineError, Result};

/// Bollinger bands: `mid ± k·sigma`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bands {
    pub upper: f64,
    pub mid: f64,
    pub lower: f64,
}

impl Bands {
    /// (upper - lower) / mid
    pub fn bandwidth(&self) -> Option<f64> {
        (self.mid != 0.0).then(|| (self.upper - self.lower) / self.mid)
    }
}

/// Population standard deviation of the last `n` values.
pub fn std_dev(values: &[f64], n: usize) -> Result<f64> {
    check_lookback("std_dev", n)?;
    require(values, n)?;
    let window = &values[values.len() - n..];
    let m = mean(window);
    let var = window.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n as f64;
    Ok(var.sqrt())
}

pub fn boll(values: &[f64], n: usize, k: f64) -> Result<Bands> {
    if !k.is_finite() || k <= 0.0 {
        return Err(EngineError::invalid_config(format!(
            "boll width must be a finite positive multiple, got {k}"
        )));
    }
    check_lookback("boll", n)?;
    require(values, n)?;

    let mid = mean(&values[values.len() - n..]);
    let sigma = std_dev(values, n)?;
    Ok(Bands {
        upper: mid + k * sigma,
        mid,
        lower: mid - k * sigma,
    })
}
