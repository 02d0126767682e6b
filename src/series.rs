//! Fixed-capacity bar history that every indicator reads from.

use crate::common::RingBuffer;
use crate::error::{EngineError, Result};
use crate::models::{Bar, BarField};

/// Most recent `capacity` bars in arrival order.
#[derive(Debug, Clone)]
pub struct RollingSeriesBuffer {
    bars: RingBuffer<Bar>,
}

impl RollingSeriesBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(EngineError::invalid_config("buffer capacity must be > 0"));
        }
        Ok(Self {
            bars: RingBuffer::new(capacity),
        })
    }

    /// Appends a bar, evicting (and returning) the oldest one when full.
    pub fn append(&mut self, bar: Bar) -> Option<Bar> {
        self.bars.push(bar)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bars.capacity()
    }

    pub fn is_warmed_up(&self) -> bool {
        self.bars.is_full()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Bar> + '_ {
        self.bars.iter()
    }

    /// The most recent `count` values of `field`, oldest first.
    pub fn snapshot(&self, field: BarField, count: usize) -> Result<Vec<f64>> {
        self.ensure(count)?;
        let skip = self.len() - count;
        Ok(self.bars.iter().skip(skip).map(|bar| bar.field(field)).collect())
    }

    /// Every retained value of `field`, oldest first.
    pub fn column(&self, field: BarField) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.field(field)).collect()
    }

    pub(crate) fn ensure(&self, required: usize) -> Result<()> {
        if required > self.len() {
            return Err(EngineError::InsufficientData {
                required,
                available: self.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;

    fn bar(i: i64, close: f64) -> Bar {
        Bar {
            symbol: "BTCUSDT".into(),
            venue: "BINANCE".into(),
            interval: Interval::parse("1m").unwrap(),
            open_time: i * 60_000,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10.0 + i as f64,
            turnover: 0.0,
            open_interest: 0.0,
        }
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            RollingSeriesBuffer::new(0),
            Err(EngineError::InvalidWindowConfig(_))
        ));
    }

    #[test]
    fn retains_last_n_in_order() {
        let mut buf = RollingSeriesBuffer::new(3).unwrap();
        for i in 0..7 {
            buf.append(bar(i, 100.0 + i as f64));
        }
        assert_eq!(buf.len(), 3);
        assert!(buf.is_warmed_up());
        let times: Vec<i64> = buf.iter().map(|b| b.open_time).collect();
        assert_eq!(times, vec![4 * 60_000, 5 * 60_000, 6 * 60_000]);
        assert_eq!(buf.column(BarField::Close), vec![104.0, 105.0, 106.0]);
    }

    #[test]
    fn warm_up_tracks_capacity() {
        let mut buf = RollingSeriesBuffer::new(2).unwrap();
        assert!(!buf.is_warmed_up());
        assert!(buf.append(bar(0, 1.0)).is_none());
        assert!(!buf.is_warmed_up());
        buf.append(bar(1, 2.0));
        assert!(buf.is_warmed_up());
        let evicted = buf.append(bar(2, 3.0)).unwrap();
        assert_eq!(evicted.close, 1.0);
    }

    #[test]
    fn snapshot_returns_most_recent_chronologically() {
        let mut buf = RollingSeriesBuffer::new(5).unwrap();
        for (i, c) in [100.0, 101.0, 99.0, 102.0, 103.0].into_iter().enumerate() {
            buf.append(bar(i as i64, c));
        }
        assert_eq!(buf.snapshot(BarField::Close, 3).unwrap(), vec![99.0, 102.0, 103.0]);
        assert_eq!(buf.snapshot(BarField::High, 2).unwrap(), vec![103.0, 104.0]);
        assert_eq!(buf.snapshot(BarField::Volume, 1).unwrap(), vec![14.0]);
        assert!(buf.snapshot(BarField::Close, 0).unwrap().is_empty());
    }

    #[test]
    fn snapshot_beyond_history_fails() {
        let mut buf = RollingSeriesBuffer::new(10).unwrap();
        buf.append(bar(0, 1.0));
        buf.append(bar(1, 2.0));
        assert_eq!(
            buf.snapshot(BarField::Close, 3),
            Err(EngineError::InsufficientData {
                required: 3,
                available: 2
            })
        );
    }
}
