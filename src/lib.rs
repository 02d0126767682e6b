// src/lib.rs

pub mod aggregator;
pub mod bus;
pub mod common;
pub mod config;
pub mod error;
pub mod indicators;
pub mod interval;
pub mod models;
pub mod pipeline;
pub mod series;

pub use aggregator::{BarAggregator, FirstWindowPolicy, VolumeMode, WindowAggregator, WindowBar};
pub use bus::BarBus;
pub use config::EngineConfig;
pub use error::{ConfigError, EngineError};
pub use indicators::{Bands, IndicatorEngine, IndicatorReadings, Macd};
pub use interval::Interval;
pub use models::{Bar, BarField, MarketEvent, Tick};
pub use pipeline::{PipelineEvent, SymbolPipeline};
pub use series::RollingSeriesBuffer;

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// Counters reported at the end of a replay.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub lines: usize,
    pub ticks: usize,
    pub bars_in: usize,
    pub base_bars: usize,
    pub window_bars: usize,
    pub rejected: usize,
    pub malformed: usize,
}

/// Replays a JSON-lines stream of [`MarketEvent`]s through one pipeline per
/// (symbol, venue), publishing every finalized bar on `bus`.
///
/// Malformed lines and rejected records are logged and skipped; open bars
/// and windows are flushed at end of input.
pub async fn run_replay<R>(
    reader: R,
    cfg: &EngineConfig,
    bus: &BarBus,
) -> Result<ReplaySummary, Box<dyn std::error::Error>>
where
    R: AsyncBufRead + Unpin,
{
    cfg.validate()?;
    let mut pipelines: BTreeMap<(String, String), SymbolPipeline> = BTreeMap::new();
    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();

    info!(
        "🚀 Replay started (base: {}, window: {}x, capacity: {}/{})",
        cfg.base_interval, cfg.window_multiple, cfg.base_capacity, cfg.window_capacity
    );

    while let Some(line) = lines.next_line().await? {
        summary.lines += 1;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let event = match serde_json::from_str::<MarketEvent>(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = summary.lines, "skipping malformed record: {}", e);
                summary.malformed += 1;
                continue;
            }
        };

        let key = match &event {
            MarketEvent::Tick(t) => (t.symbol.clone(), t.venue.clone()),
            MarketEvent::Bar(b) => (b.symbol.clone(), b.venue.clone()),
        };
        let pipeline = match pipelines.entry(key) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                info!("📈 New stream {}@{}", e.key().0, e.key().1);
                e.insert(SymbolPipeline::new(cfg.clone())?)
            }
        };

        let result = match &event {
            MarketEvent::Tick(tick) => {
                summary.ticks += 1;
                pipeline.on_tick(tick)
            }
            MarketEvent::Bar(bar) => {
                summary.bars_in += 1;
                pipeline.on_bar(bar.clone())
            }
        };

        match result {
            Ok(events) => dispatch(pipeline, events, bus, &mut summary),
            Err(e) => {
                warn!(line = summary.lines, "rejected record: {}", e);
                summary.rejected += 1;
            }
        }
    }

    for ((symbol, venue), pipeline) in pipelines.iter_mut() {
        match pipeline.flush() {
            Ok(events) => dispatch(pipeline, events, bus, &mut summary),
            Err(e) => {
                warn!("final flush of {}@{} rejected: {}", symbol, venue, e);
                summary.rejected += 1;
            }
        }
    }

    info!(
        "✅ Replay finished: {} lines, {} base bars, {} window bars, {} rejected, {} malformed",
        summary.lines, summary.base_bars, summary.window_bars, summary.rejected, summary.malformed
    );
    Ok(summary)
}

fn dispatch(
    pipeline: &SymbolPipeline,
    events: Vec<PipelineEvent>,
    bus: &BarBus,
    summary: &mut ReplaySummary,
) {
    for event in events {
        match &event {
            PipelineEvent::BaseBar(bar) => {
                summary.base_bars += 1;
                if let Ok(r) = pipeline.base_readings() {
                    debug!(
                        symbol = %bar.symbol,
                        open_time = bar.open_time,
                        close = bar.close,
                        sma = ?r.sma,
                        rsi = ?r.rsi,
                        "base bar"
                    );
                }
            }
            PipelineEvent::WindowBar(w) => {
                summary.window_bars += 1;
                if let Ok(r) = pipeline.window_readings() {
                    info!(
                        "🕯️ {} {} window @{}: O {:.2} H {:.2} L {:.2} C {:.2} ({} bars) | SMA {:?} RSI {:?}",
                        w.bar.symbol,
                        w.bar.interval,
                        w.bar.open_datetime().map(|t| t.to_rfc3339()).unwrap_or_default(),
                        w.bar.open,
                        w.bar.high,
                        w.bar.low,
                        w.bar.close,
                        w.count,
                        r.sma,
                        r.rsi
                    );
                }
            }
        }
        bus.publish(event);
    }
}
