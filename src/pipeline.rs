//! Per-symbol wiring: ticks -> base bars -> windows, each with its own history.

use serde::Serialize;

use crate::aggregator::{BarAggregator, WindowAggregator, WindowBar};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::indicators::{IndicatorEngine, IndicatorReadings};
use crate::models::{Bar, Tick};
use crate::series::RollingSeriesBuffer;

/// A finalized bar, in the order it was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineEvent {
    BaseBar(Bar),
    WindowBar(WindowBar),
}

/// One (symbol, base interval) stream.
///
/// Emitted bars are appended to their history buffer before the event is
/// returned, so indicator queries right after a call already see them.
#[derive(Debug, Clone)]
pub struct SymbolPipeline {
    config: EngineConfig,
    bars: BarAggregator,
    windows: WindowAggregator,
    base_series: RollingSeriesBuffer,
    window_series: RollingSeriesBuffer,
}

impl SymbolPipeline {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            bars: BarAggregator::new(config.base_interval, config.volume_mode),
            windows: WindowAggregator::new(
                config.base_interval,
                config.window_multiple,
                config.first_window,
            )?,
            base_series: RollingSeriesBuffer::new(config.base_capacity)?,
            window_series: RollingSeriesBuffer::new(config.window_capacity)?,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Feeds one tick. A rejected tick leaves every part of the pipeline as
    /// it was.
    pub fn on_tick(&mut self, tick: &Tick) -> Result<Vec<PipelineEvent>> {
        let bucket = self.bars.bucket_of(tick)?;
        if self.windows.window_interval().bucket_start(bucket).is_none() {
            return Err(EngineError::InvalidTick(format!(
                "timestamp {} has no {} window in range",
                tick.timestamp,
                self.windows.window_interval()
            )));
        }
        if let Some(open) = self.bars.current() {
            if bucket > open.open_time {
                // this tick finalizes `open`; the window side must take it
                self.windows.check(open)?;
            }
        }
        match self.bars.update_tick(tick)? {
            Some(bar) => self.push_base(bar),
            None => Ok(Vec::new()),
        }
    }

    /// Feeds a finished base bar from replayed history.
    ///
    /// A bar for a later bucket than the tick-built bar in progress finalizes
    /// that bar first; ticks for the replayed bucket or earlier are rejected
    /// afterwards.
    pub fn on_bar(&mut self, bar: Bar) -> Result<Vec<PipelineEvent>> {
        let slot = self.windows.check(&bar)?;
        if let Some(open) = self.bars.current() {
            if open.open_time >= slot {
                return Err(EngineError::OutOfOrderBar {
                    open_time: bar.open_time,
                    last_open_time: open.open_time,
                });
            }
            self.windows.check(open)?;
        }

        let mut events = match self.bars.flush() {
            Some(done) => self.push_base(done)?,
            None => Vec::new(),
        };
        self.bars.seal(slot);
        events.extend(self.push_base(bar)?);
        Ok(events)
    }

    /// Finalizes the open base bar and any partial window.
    pub fn flush(&mut self) -> Result<Vec<PipelineEvent>> {
        let mut events = match self.bars.flush() {
            Some(bar) => self.push_base(bar)?,
            None => Vec::new(),
        };
        if let Some(w) = self.windows.flush() {
            events.push(self.push_window(w));
        }
        Ok(events)
    }

    fn push_base(&mut self, bar: Bar) -> Result<Vec<PipelineEvent>> {
        let windows = self.windows.update_bar(&bar)?;
        self.base_series.append(bar.clone());
        let mut events = vec![PipelineEvent::BaseBar(bar)];
        events.extend(windows.into_iter().map(|w| self.push_window(w)));
        Ok(events)
    }

    fn push_window(&mut self, window: WindowBar) -> PipelineEvent {
        self.window_series.append(window.bar.clone());
        PipelineEvent::WindowBar(window)
    }

    pub fn current_bar(&self) -> Option<&Bar> {
        self.bars.current()
    }

    pub fn base_series(&self) -> &RollingSeriesBuffer {
        &self.base_series
    }

    pub fn window_series(&self) -> &RollingSeriesBuffer {
        &self.window_series
    }

    pub fn base_engine(&self) -> IndicatorEngine<'_> {
        IndicatorEngine::new(&self.base_series)
    }

    pub fn window_engine(&self) -> IndicatorEngine<'_> {
        IndicatorEngine::new(&self.window_series)
    }

    pub fn base_readings(&self) -> Result<IndicatorReadings> {
        self.base_engine().readings(&self.config.indicators)
    }

    pub fn window_readings(&self) -> Result<IndicatorReadings> {
        self.window_engine().readings(&self.config.indicators)
    }
}
