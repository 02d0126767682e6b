//! Bar synthesis.
//!
//! - `bar`: ticks -> fixed-interval bars
//! - `window`: base bars -> multi-period bars

pub mod bar;
pub mod window;

pub use bar::{BarAggregator, VolumeMode};
pub use window::{FirstWindowPolicy, WindowAggregator, WindowBar};
