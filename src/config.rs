use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::aggregator::{FirstWindowPolicy, VolumeMode};
use crate::error::{ConfigError, EngineError, Result};
use crate::interval::Interval;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MacdSettings {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdSettings {
    fn default() -> Self {
        Self { fast: 12, slow: 26, signal: 9 }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BollSettings {
    pub period: usize,
    pub k: f64,
}

impl Default for BollSettings {
    fn default() -> Self {
        Self { period: 20, k: 2.0 }
    }
}

/// Lookbacks of the indicators evaluated on every closed bar.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct IndicatorSettings {
    pub sma: usize,
    pub rsi: usize,
    pub macd: MacdSettings,
    pub boll: BollSettings,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            sma: 20,
            rsi: 14,
            macd: MacdSettings::default(),
            boll: BollSettings::default(),
        }
    }
}

impl IndicatorSettings {
    /// Longest history any configured indicator needs.
    pub fn max_lookback(&self) -> usize {
        [
            self.sma,
            self.rsi + 1,
            self.macd.slow + self.macd.signal.saturating_sub(1),
            self.boll.period,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    fn validate(&self) -> Result<()> {
        let lookbacks = [
            ("sma", self.sma),
            ("rsi", self.rsi),
            ("macd.fast", self.macd.fast),
            ("macd.slow", self.macd.slow),
            ("macd.signal", self.macd.signal),
            ("boll.period", self.boll.period),
        ];
        for (name, n) in lookbacks {
            if n == 0 {
                return Err(EngineError::invalid_config(format!("indicators.{name} must be > 0")));
            }
        }
        if self.macd.fast >= self.macd.slow {
            return Err(EngineError::invalid_config(format!(
                "indicators.macd.fast ({}) must be < slow ({})",
                self.macd.fast, self.macd.slow
            )));
        }
        if !self.boll.k.is_finite() || self.boll.k <= 0.0 {
            return Err(EngineError::invalid_config(format!(
                "indicators.boll.k must be finite and > 0, got {}",
                self.boll.k
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EngineConfig {
    // e.g. "1m"; the only required key
    pub base_interval: Interval,

    #[serde(default = "default_window_multiple")]
    pub window_multiple: u32,
    #[serde(default)]
    pub first_window: FirstWindowPolicy,
    #[serde(default)]
    pub volume_mode: VolumeMode,

    #[serde(default = "default_capacity")]
    pub base_capacity: usize,
    #[serde(default = "default_capacity")]
    pub window_capacity: usize,

    #[serde(default)]
    pub indicators: IndicatorSettings,
}

fn default_window_multiple() -> u32 {
    5
}

fn default_capacity() -> usize {
    100
}

impl EngineConfig {
    /// Defaults for everything but the base interval.
    pub fn new(base_interval: Interval) -> Self {
        Self {
            base_interval,
            window_multiple: default_window_multiple(),
            first_window: FirstWindowPolicy::default(),
            volume_mode: VolumeMode::default(),
            base_capacity: default_capacity(),
            window_capacity: default_capacity(),
            indicators: IndicatorSettings::default(),
        }
    }

    /// Loads configuration from the 'config.yaml' file in the current working directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.yaml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml_content = fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml_content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_multiple == 0 {
            return Err(EngineError::invalid_config("window_multiple must be > 0"));
        }
        self.base_interval.multiple(self.window_multiple)?;
        self.indicators.validate()?;

        let needed = self.indicators.max_lookback();
        for (name, capacity) in [
            ("base_capacity", self.base_capacity),
            ("window_capacity", self.window_capacity),
        ] {
            if capacity == 0 {
                return Err(EngineError::invalid_config(format!("{name} must be > 0")));
            }
            if capacity < needed {
                return Err(EngineError::invalid_config(format!(
                    "{name} ({capacity}) can never hold the {needed} bars the indicators need"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn minimal_yaml_uses_defaults() {
        let cfg = EngineConfig::from_yaml_str("base_interval: 1m\n").unwrap();
        assert_eq!(cfg, EngineConfig::new(Interval::parse("1m").unwrap()));
        assert_eq!(cfg.indicators.max_lookback(), 34);
    }

    #[test]
    fn full_yaml() {
        let yaml = r#"
base_interval: 15s
window_multiple: 4
first_window: discard_partial
volume_mode: cumulative
base_capacity: 60
window_capacity: 40
indicators:
  sma: 10
  rsi: 6
  macd: { fast: 5, slow: 13, signal: 4 }
  boll: { period: 10, k: 2.5 }
"#;
        let cfg = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.base_interval.as_ms(), 15_000);
        assert_eq!(cfg.window_multiple, 4);
        assert_eq!(cfg.first_window, FirstWindowPolicy::DiscardPartial);
        assert_eq!(cfg.volume_mode, VolumeMode::Cumulative);
        assert_eq!(cfg.indicators.macd, MacdSettings { fast: 5, slow: 13, signal: 4 });
        assert_eq!(cfg.indicators.boll.k, 2.5);
    }

    #[test]
    fn invalid_settings_fail_at_load() {
        let cases = [
            "base_interval: 0m",
            "base_interval: 1m\nwindow_multiple: 0",
            "base_interval: 1m\nbase_capacity: 0",
            "base_interval: 1m\nwindow_capacity: 20",
            "base_interval: 1m\nindicators: { rsi: 0 }",
            "base_interval: 1m\nindicators: { macd: { fast: 26, slow: 12 } }",
            "base_interval: 1m\nindicators: { boll: { k: -1.0 } }",
            "base_interval: 1m\nindicators: { boll: { k: 0.0 } }",
        ];
        for yaml in cases {
            match EngineConfig::from_yaml_str(yaml) {
                Err(ConfigError::Invalid(EngineError::InvalidWindowConfig(_))) => {}
                // bad intervals are rejected while deserializing
                Err(ConfigError::Parse(_)) if yaml.contains("0m") => {}
                other => panic!("{yaml:?} should be invalid, got {other:?}"),
            }
        }
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_interval: 1h\nwindow_multiple: 4").unwrap();
        let cfg = EngineConfig::load_from(file.path()).unwrap();
        assert_eq!(cfg.base_interval.to_string(), "1h");
        assert_eq!(cfg.base_interval.multiple(cfg.window_multiple).unwrap().to_string(), "4h");

        assert!(matches!(
            EngineConfig::load_from("/definitely/not/here.yaml"),
            Err(ConfigError::Io(_))
        ));
    }
}
