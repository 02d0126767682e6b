use serde::Deserialize;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::interval::Interval;
use crate::models::{Bar, Tick};

/// How `Tick::volume` (and `Tick::turnover`) should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeMode {
    /// Quantity traded by this tick alone.
    #[default]
    Incremental,
    /// Running session total; bars accumulate the positive difference.
    Cumulative,
}

#[derive(Debug, Clone)]
enum BarState {
    Empty,
    Open(Bar),
}

/// Synthesizes fixed-interval bars from a tick stream.
///
/// A bar is finalized only when a tick for a later bucket arrives, or on an
/// explicit [`flush`](Self::flush).
#[derive(Debug, Clone)]
pub struct BarAggregator {
    interval: Interval,
    volume_mode: VolumeMode,
    state: BarState,
    last_emitted: Option<i64>,
    // (volume, turnover) of the previous accepted tick, cumulative mode only
    last_totals: Option<(f64, Option<f64>)>,
}

impl BarAggregator {
    pub fn new(interval: Interval, volume_mode: VolumeMode) -> Self {
        Self {
            interval,
            volume_mode,
            state: BarState::Empty,
            last_emitted: None,
            last_totals: None,
        }
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// The bar still accumulating, if any.
    pub fn current(&self) -> Option<&Bar> {
        match &self.state {
            BarState::Open(bar) => Some(bar),
            BarState::Empty => None,
        }
    }

    /// Folds a tick into the open bar. Returns the previous bar when this
    /// tick starts a new bucket.
    ///
    /// Rejected ticks leave the aggregator untouched.
    pub fn update_tick(&mut self, tick: &Tick) -> Result<Option<Bar>> {
        validate(tick)?;
        let bucket = self.bucket_of(tick)?;

        match &self.state {
            BarState::Open(bar) => {
                if bucket < bar.open_time {
                    return Err(EngineError::OutOfOrderTick {
                        bucket_start: bucket,
                        open_bucket: bar.open_time,
                    });
                }
                if bar.symbol != tick.symbol || bar.venue != tick.venue {
                    return Err(EngineError::InvalidTick(format!(
                        "tick for {}@{} fed to aggregator holding {}@{}",
                        tick.symbol, tick.venue, bar.symbol, bar.venue
                    )));
                }
            }
            BarState::Empty => {
                if let Some(last) = self.last_emitted {
                    if bucket <= last {
                        return Err(EngineError::OutOfOrderTick {
                            bucket_start: bucket,
                            open_bucket: last,
                        });
                    }
                }
            }
        }

        let (volume, turnover) = self.deltas(tick);

        if let BarState::Open(bar) = &mut self.state {
            if bar.open_time == bucket {
                bar.update(tick.price, volume, turnover);
                if let Some(oi) = tick.open_interest {
                    bar.open_interest = oi;
                }
                return Ok(None);
            }
        }

        let mut next = Bar::from_trade(tick, self.interval, bucket);
        next.update(tick.price, volume, turnover);
        let finished = match std::mem::replace(&mut self.state, BarState::Open(next)) {
            BarState::Open(done) => Some(self.finish(done)),
            BarState::Empty => None,
        };
        Ok(finished)
    }

    /// Start of the bucket `tick` falls into.
    pub fn bucket_of(&self, tick: &Tick) -> Result<i64> {
        self.interval.bucket_start(tick.timestamp).ok_or_else(|| {
            EngineError::InvalidTick(format!(
                "timestamp {} has no {} bucket in range",
                tick.timestamp, self.interval
            ))
        })
    }

    /// Marks every bucket up to `open_time` as emitted, so later ticks can't
    /// reopen a bar that arrived from elsewhere. Must not be called while a
    /// bar at or after `open_time` is open.
    pub(crate) fn seal(&mut self, open_time: i64) {
        debug_assert!(self.current().is_none_or(|bar| bar.open_time < open_time));
        self.last_emitted = Some(self.last_emitted.map_or(open_time, |t| t.max(open_time)));
    }

    /// Finalizes whatever bar is open, e.g. at end of stream.
    pub fn flush(&mut self) -> Option<Bar> {
        match std::mem::replace(&mut self.state, BarState::Empty) {
            BarState::Open(bar) => Some(self.finish(bar)),
            BarState::Empty => None,
        }
    }

    fn finish(&mut self, bar: Bar) -> Bar {
        self.last_emitted = Some(bar.open_time);
        debug!(
            symbol = %bar.symbol,
            interval = %bar.interval,
            open_time = bar.open_time,
            o = bar.open, h = bar.high, l = bar.low, c = bar.close,
            v = bar.volume,
            "bar closed"
        );
        bar
    }

    /// Volume and turnover this tick adds to the bar. Commits the running
    /// totals, so only call once the tick has been accepted.
    fn deltas(&mut self, tick: &Tick) -> (f64, f64) {
        match self.volume_mode {
            VolumeMode::Incremental => {
                let turnover = tick.turnover.unwrap_or(tick.price * tick.volume);
                (tick.volume, turnover)
            }
            VolumeMode::Cumulative => {
                let previous = self.last_totals.replace((tick.volume, tick.turnover));
                let Some((prev_volume, prev_turnover)) = previous else {
                    return (0.0, 0.0);
                };
                let volume = (tick.volume - prev_volume).max(0.0);
                let turnover = match (tick.turnover, prev_turnover) {
                    (Some(now), Some(before)) => (now - before).max(0.0),
                    _ => tick.price * volume,
                };
                (volume, turnover)
            }
        }
    }
}

fn validate(tick: &Tick) -> Result<()> {
    if !tick.price.is_finite() || tick.price <= 0.0 {
        return Err(EngineError::InvalidTick(format!(
            "price must be positive, got {}",
            tick.price
        )));
    }
    if !tick.volume.is_finite() || tick.volume < 0.0 {
        return Err(EngineError::InvalidTick(format!(
            "volume must be non-negative, got {}",
            tick.volume
        )));
    }
    for (name, value) in [("turnover", tick.turnover), ("open_interest", tick.open_interest)] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(EngineError::InvalidTick(format!(
                    "{name} must be non-negative, got {v}"
                )));
            }
        }
    }
    Ok(())
}
