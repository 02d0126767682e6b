//! Market data value types.
//!
//! `Tick` and `Bar` are plain values: produced once, never shared mutably.
//! Timestamps are milliseconds since the Unix epoch (UTC).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::interval::Interval;

/// One line of a replay stream.
///
/// Uses `#[serde(tag = "type")]` to pick the variant from the `"type"` field:
/// - "tick" -> Tick(Tick)
/// - "bar" -> Bar(Bar)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MarketEvent {
    Tick(Tick),
    Bar(Bar),
}

/// A single price/volume observation.
///
/// `volume` is either the quantity traded by this tick or a running session
/// total, depending on the aggregator's [`VolumeMode`](crate::aggregator::VolumeMode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub venue: String,
    #[serde(rename = "ts")]
    pub timestamp: i64,
    pub price: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turnover: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_interest: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<Quote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<Quote>,
}

/// Best bid or ask level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub size: f64,
}

impl Tick {
    pub fn new(symbol: &str, venue: &str, timestamp: i64, price: f64, volume: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            venue: venue.to_string(),
            timestamp,
            price,
            volume,
            turnover: None,
            open_interest: None,
            bid: None,
            ask: None,
        }
    }
}

/// OHLCV summary over one bucket of `interval`, opened at `open_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub venue: String,
    pub interval: Interval,
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub turnover: f64,
    #[serde(default)]
    pub open_interest: f64,
}

impl Bar {
    /// Opens a bar seeded from a single trade.
    pub fn from_trade(tick: &Tick, interval: Interval, open_time: i64) -> Self {
        Self {
            symbol: tick.symbol.clone(),
            venue: tick.venue.clone(),
            interval,
            open_time,
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            volume: 0.0,
            turnover: 0.0,
            open_interest: tick.open_interest.unwrap_or(0.0),
        }
    }

    /// Folds one more trade into the bar.
    pub fn update(&mut self, price: f64, volume: f64, turnover: f64) {
        self.close = price;
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.volume += volume;
        self.turnover += turnover;
    }

    /// Price change of the bar body (close - open).
    pub fn change(&self) -> f64 {
        self.close - self.open
    }

    /// Exclusive end of the bar's bucket.
    pub fn close_time(&self) -> i64 {
        self.open_time + self.interval.as_ms()
    }

    pub fn open_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.open_time)
    }

    /// `high` bounds open/close/low from above and `low` bounds them from below.
    /// A bar with a non-finite price is never consistent.
    pub fn is_consistent(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite())
            && self.high >= self.open.max(self.close).max(self.low)
            && self.low <= self.open.min(self.close).min(self.high)
    }

    /// Checks a bar received from outside (e.g. replayed history) before it
    /// is merged anywhere.
    pub fn validate(&self) -> Result<()> {
        if !self.is_consistent() {
            return Err(EngineError::InvalidBar(format!(
                "{}@{} {}: o {} h {} l {} c {} breaks the high/low envelope",
                self.symbol, self.venue, self.open_time, self.open, self.high, self.low, self.close
            )));
        }
        for (name, v) in [
            ("volume", self.volume),
            ("turnover", self.turnover),
            ("open_interest", self.open_interest),
        ] {
            if v.is_nan() || v < 0.0 {
                return Err(EngineError::InvalidBar(format!("{name} must be non-negative, got {v}")));
            }
        }
        if self.interval.bucket_start(self.open_time).is_none() {
            return Err(EngineError::InvalidBar(format!(
                "open time {} is out of range for {}",
                self.open_time, self.interval
            )));
        }
        Ok(())
    }

    pub fn field(&self, field: BarField) -> f64 {
        match field {
            BarField::Open => self.open,
            BarField::High => self.high,
            BarField::Low => self.low,
            BarField::Close => self.close,
            BarField::Volume => self.volume,
            BarField::Turnover => self.turnover,
            BarField::OpenInterest => self.open_interest,
        }
    }
}

/// Numeric column of a [`Bar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarField {
    Open,
    High,
    Low,
    Close,
    Volume,
    Turnover,
    OpenInterest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tagged_events() {
        let tick = r#"{"type":"tick","symbol":"BTCUSDT","venue":"BINANCE","ts":60000,"price":101.5,"volume":0.25,"bid":{"price":101.4,"size":2.0}}"#;
        match serde_json::from_str::<MarketEvent>(tick).unwrap() {
            MarketEvent::Tick(t) => {
                assert_eq!(t.timestamp, 60_000);
                assert_eq!(t.price, 101.5);
                assert_eq!(t.bid, Some(Quote { price: 101.4, size: 2.0 }));
                assert_eq!(t.ask, None);
            }
            other => panic!("expected tick, got {other:?}"),
        }

        let bar = r#"{"type":"bar","symbol":"BTCUSDT","venue":"BINANCE","interval":"1m","open_time":0,"open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":3.0}"#;
        match serde_json::from_str::<MarketEvent>(bar).unwrap() {
            MarketEvent::Bar(b) => {
                assert_eq!(b.interval.as_ms(), 60_000);
                assert_eq!(b.turnover, 0.0);
                assert!(b.is_consistent());
            }
            other => panic!("expected bar, got {other:?}"),
        }
    }

    #[test]
    fn update_keeps_high_low_envelope() {
        let tick = Tick::new("BTCUSDT", "BINANCE", 0, 100.0, 1.0);
        let mut bar = Bar::from_trade(&tick, Interval::parse("1m").unwrap(), 0);
        bar.update(100.0, 1.0, 100.0);
        bar.update(103.0, 1.0, 103.0);
        bar.update(98.5, 2.0, 197.0);
        bar.update(101.0, 0.5, 50.5);
        assert_eq!((bar.open, bar.high, bar.low, bar.close), (100.0, 103.0, 98.5, 101.0));
        assert_eq!(bar.volume, 4.5);
        assert_eq!(bar.change(), 1.0);
        assert_eq!(bar.close_time(), 60_000);
        assert!(bar.is_consistent());
        assert_eq!(bar.validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_broken_bars() {
        let tick = Tick::new("BTCUSDT", "BINANCE", 0, 10.0, 1.0);
        let good = Bar::from_trade(&tick, Interval::parse("1m").unwrap(), 0);

        let mut inverted = good.clone();
        (inverted.open, inverted.high, inverted.low, inverted.close) = (10.0, 5.0, 20.0, 12.0);
        assert!(!inverted.is_consistent());
        assert!(matches!(inverted.validate(), Err(EngineError::InvalidBar(_))));

        let mut nan_open = good.clone();
        nan_open.open = f64::NAN;
        assert!(!nan_open.is_consistent());
        assert!(matches!(nan_open.validate(), Err(EngineError::InvalidBar(_))));

        let mut inf_high = good.clone();
        inf_high.high = f64::INFINITY;
        assert!(matches!(inf_high.validate(), Err(EngineError::InvalidBar(_))));

        let mut bad_volume = good.clone();
        bad_volume.volume = f64::NAN;
        assert!(matches!(bad_volume.validate(), Err(EngineError::InvalidBar(_))));
        bad_volume.volume = -1.0;
        assert!(matches!(bad_volume.validate(), Err(EngineError::InvalidBar(_))));

        let mut far_past = good;
        far_past.open_time = i64::MIN;
        assert!(matches!(far_past.validate(), Err(EngineError::InvalidBar(_))));
    }
}
