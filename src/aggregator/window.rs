use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::interval::Interval;
use crate::models::Bar;

/// What to do with a leading window the stream joined part-way through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstWindowPolicy {
    /// Emit it with its true (short) count.
    #[default]
    EmitPartial,
    /// Drop it; only windows the stream saw from their first slot are emitted.
    DiscardPartial,
}

/// A merged multi-period bar and the number of base bars folded into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowBar {
    pub bar: Bar,
    pub count: u32,
}

impl WindowBar {
    pub fn is_complete(&self, multiple: u32) -> bool {
        self.count >= multiple
    }
}

#[derive(Debug, Clone)]
struct WindowAccumulator {
    bar: Bar,
    count: u32,
}

impl WindowAccumulator {
    fn seed(base: &Bar, window: Interval, window_start: i64) -> Self {
        let mut bar = base.clone();
        bar.interval = window;
        bar.open_time = window_start;
        Self { bar, count: 1 }
    }

    fn merge(&mut self, base: &Bar) {
        let bar = &mut self.bar;
        bar.high = bar.high.max(base.high);
        bar.low = bar.low.min(base.low);
        bar.close = base.close;
        bar.volume += base.volume;
        bar.turnover += base.turnover;
        bar.open_interest = base.open_interest;
        self.count += 1;
    }
}

/// Where a base bar lands: its own bucket and the window containing it.
#[derive(Debug, Clone, Copy)]
struct Slot {
    start: i64,
    end: i64,
    window_start: i64,
}

#[derive(Debug, Clone)]
enum WindowState {
    Empty,
    Open(WindowAccumulator),
}

/// Merges `multiple` consecutive base bars into one coarser bar.
///
/// Windows are aligned to absolute multiples of `multiple × base` since the
/// Unix epoch, not to the first bar seen. A window closes as soon as the bar
/// filling its last slot is merged, or when a bar for a later window shows up
/// first (a gap in the base stream).
#[derive(Debug, Clone)]
pub struct WindowAggregator {
    base: Interval,
    window: Interval,
    multiple: u32,
    policy: FirstWindowPolicy,
    state: WindowState,
    leading: bool,
    last_slot: Option<i64>,
}

impl WindowAggregator {
    pub fn new(base: Interval, multiple: u32, policy: FirstWindowPolicy) -> Result<Self> {
        if multiple == 0 {
            return Err(EngineError::invalid_config("window multiple must be > 0"));
        }
        Ok(Self {
            base,
            window: base.multiple(multiple)?,
            multiple,
            policy,
            state: WindowState::Empty,
            leading: true,
            last_slot: None,
        })
    }

    pub fn base_interval(&self) -> Interval {
        self.base
    }

    pub fn window_interval(&self) -> Interval {
        self.window
    }

    pub fn multiple(&self) -> u32 {
        self.multiple
    }

    /// The in-progress window and its count so far.
    pub fn current(&self) -> Option<(&Bar, u32)> {
        match &self.state {
            WindowState::Open(acc) => Some((&acc.bar, acc.count)),
            WindowState::Empty => None,
        }
    }

    /// Rejects `bar` exactly as [`update_bar`](Self::update_bar) would,
    /// without touching any state. Returns the start of the base slot it
    /// would fill.
    pub fn check(&self, bar: &Bar) -> Result<i64> {
        self.locate(bar).map(|slot| slot.start)
    }

    /// Merges one base bar, returning the windows it closed (at most two:
    /// a gap-interrupted window and the bar's own window).
    pub fn update_bar(&mut self, bar: &Bar) -> Result<Vec<WindowBar>> {
        let slot = self.locate(bar)?;
        let mut closed = Vec::new();

        let crosses_window =
            matches!(&self.state, WindowState::Open(acc) if acc.bar.open_time != slot.window_start);
        if crosses_window {
            closed.extend(self.close());
        }

        match &mut self.state {
            WindowState::Open(acc) => acc.merge(bar),
            WindowState::Empty => {
                self.state =
                    WindowState::Open(WindowAccumulator::seed(bar, self.window, slot.window_start));
            }
        }
        self.last_slot = Some(slot.start);

        if slot.end.rem_euclid(self.window.as_ms()) == 0 {
            closed.extend(self.close());
        }
        Ok(closed)
    }

    fn locate(&self, bar: &Bar) -> Result<Slot> {
        if bar.interval != self.base {
            return Err(EngineError::IntervalMismatch {
                expected: self.base.to_string(),
                found: bar.interval.to_string(),
            });
        }
        bar.validate()?;

        let out_of_range = || {
            EngineError::InvalidBar(format!(
                "open time {} has no {} window in range",
                bar.open_time, self.window
            ))
        };
        let start = self.base.bucket_start(bar.open_time).ok_or_else(out_of_range)?;
        if let Some(last) = self.last_slot {
            if start <= last {
                return Err(EngineError::OutOfOrderBar {
                    open_time: bar.open_time,
                    last_open_time: last,
                });
            }
        }
        let window_start = self.window.bucket_start(start).ok_or_else(out_of_range)?;
        let end = start.checked_add(self.base.as_ms()).ok_or_else(out_of_range)?;
        Ok(Slot {
            start,
            end,
            window_start,
        })
    }

    /// Emits the in-progress window, if any, at end of stream.
    pub fn flush(&mut self) -> Option<WindowBar> {
        self.close()
    }

    fn close(&mut self) -> Option<WindowBar> {
        let WindowState::Open(acc) = std::mem::replace(&mut self.state, WindowState::Empty) else {
            return None;
        };
        let leading = std::mem::replace(&mut self.leading, false);

        if leading && acc.count < self.multiple && self.policy == FirstWindowPolicy::DiscardPartial {
            debug!(
                open_time = acc.bar.open_time,
                count = acc.count,
                "discarding partial leading window"
            );
            return None;
        }

        debug!(
            symbol = %acc.bar.symbol,
            interval = %self.window,
            open_time = acc.bar.open_time,
            count = acc.count,
            "window closed"
        );
        Some(WindowBar {
            bar: acc.bar,
            count: acc.count,
        })
    }
}
