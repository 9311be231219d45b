//! Shared configuration for Scrivener
//!
//! This crate is the single source of truth for viewport geometry, stroke
//! defaults, transform cache bounds and the sampling worker pool. Every
//! value has a working default; `from_env` overlays
//! `SCRIVENER_*` environment variables on top of those defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default viewport width in document units
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1000;

/// Default height of one text line in document units
pub const DEFAULT_LINE_HEIGHT: u32 = 60;

/// Default inset kept clear around the drawable area
pub const DEFAULT_PADDING: u32 = 20;

/// Default stroke width for lines without an explicit style
pub const DEFAULT_STROKE_WIDTH: f32 = 2.0;

/// Default stroke color for lines without an explicit style
pub const DEFAULT_STROKE_COLOR: &str = "black";

/// Multiplier applied to raw model offsets before integration
pub const STROKE_SCALE: f64 = 1.5;

/// Maximum number of normalized lines kept in the transform cache
pub const MAX_CACHE_SIZE: usize = 32;

/// Age after which an untouched cache entry is swept, and the sweep period
pub const CACHE_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Default number of concurrent sampling workers
pub const DEFAULT_WORKERS: usize = 4;

/// Default capacity of the per-stream event channel
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// Viewport and stroke defaults used by both renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Viewport width in document units
    pub viewport_width: u32,
    /// Height of one text line; the viewport is `line_height * (lines + 1)` tall
    pub line_height: u32,
    /// Inset kept clear on every side
    pub padding: u32,
    /// Stroke width for lines without an explicit style
    pub default_stroke_width: f32,
    /// Stroke color for lines without an explicit style
    pub default_stroke_color: String,
    /// Multiplier applied to raw offsets before integration
    pub stroke_scale: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            line_height: DEFAULT_LINE_HEIGHT,
            padding: DEFAULT_PADDING,
            default_stroke_width: DEFAULT_STROKE_WIDTH,
            default_stroke_color: DEFAULT_STROKE_COLOR.to_string(),
            stroke_scale: STROKE_SCALE,
        }
    }
}

impl RenderConfig {
    /// Build a config from defaults overlaid with `SCRIVENER_*` variables.
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_parse("SCRIVENER_VIEWPORT_WIDTH") {
            config.viewport_width = v;
        }
        if let Some(v) = env_parse("SCRIVENER_LINE_HEIGHT") {
            config.line_height = v;
        }
        if let Some(v) = env_parse("SCRIVENER_PADDING") {
            config.padding = v;
        }
        if let Some(v) = env_parse("SCRIVENER_STROKE_WIDTH") {
            config.default_stroke_width = v;
        }
        if let Ok(v) = std::env::var("SCRIVENER_STROKE_COLOR") {
            if !v.is_empty() {
                config.default_stroke_color = v;
            }
        }
        config
    }

    /// Viewport height for a document of `line_count` lines
    pub fn viewport_height(&self, line_count: usize) -> u32 {
        self.line_height
            .saturating_mul(u32::try_from(line_count).unwrap_or(u32::MAX).saturating_add(1))
    }

    /// Horizontal room a single line may occupy after scaling
    pub fn available_width(&self) -> f64 {
        f64::from(self.viewport_width) - 2.0 * f64::from(self.padding)
    }

    /// Vertical room a single line may occupy after scaling
    pub fn available_height(&self) -> f64 {
        f64::from(self.line_height) - f64::from(self.padding)
    }

    /// `viewBox` attribute value for a document of `line_count` lines
    pub fn view_box(&self, line_count: usize) -> String {
        format!(
            "0 0 {} {}",
            self.viewport_width,
            self.viewport_height(line_count)
        )
    }
}

/// Bounds for the shared transform cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry count above which least-recently-used entries are evicted
    pub max_entries: usize,
    /// Idle age after which an entry is swept; also the sweep period
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: MAX_CACHE_SIZE,
            ttl: CACHE_CLEANUP_INTERVAL,
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_parse("SCRIVENER_CACHE_SIZE") {
            config.max_entries = v;
        }
        if let Some(secs) = env_parse::<u64>("SCRIVENER_CACHE_TTL_SECS") {
            config.ttl = Duration::from_secs(secs);
        }
        config
    }
}

/// Sizing for the sampling worker pool and stream delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of sampling calls allowed to run at once
    pub workers: usize,
    /// Upper bound on a single sampling call; `None` waits indefinitely
    #[serde(with = "opt_duration_secs")]
    pub sample_timeout: Option<Duration>,
    /// Capacity of the per-stream event channel
    pub stream_buffer: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            sample_timeout: None,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_parse("SCRIVENER_WORKERS") {
            config.workers = v;
        }
        if let Some(secs) = env_parse::<f64>("SCRIVENER_SAMPLE_TIMEOUT_SECS") {
            if let Ok(timeout) = Duration::try_from_secs_f64(secs) {
                if !timeout.is_zero() {
                    config.sample_timeout = Some(timeout);
                }
            }
        }
        if let Some(v) = env_parse("SCRIVENER_STREAM_BUFFER") {
            config.stream_buffer = v;
        }
        config
    }
}

/// Everything an engine needs, grouped for one-shot injection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub render: RenderConfig,
    pub cache: CacheConfig,
    pub scheduler: SchedulerConfig,
}

impl EngineConfig {
    /// Parse every section from the environment
    pub fn from_env() -> Self {
        Self {
            render: RenderConfig::from_env(),
            cache: CacheConfig::from_env(),
            scheduler: SchedulerConfig::from_env(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

mod opt_duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.viewport_width, DEFAULT_VIEWPORT_WIDTH);
        assert_eq!(config.line_height, DEFAULT_LINE_HEIGHT);
        assert_eq!(config.padding, DEFAULT_PADDING);
        assert_eq!(config.default_stroke_color, "black");
    }

    #[test]
    fn test_derived_dimensions() {
        let config = RenderConfig::default();
        assert_eq!(config.viewport_height(1), 120);
        assert_eq!(config.viewport_height(4), 300);
        assert_eq!(config.available_width(), 960.0);
        assert_eq!(config.available_height(), 40.0);
        assert_eq!(config.view_box(2), "0 0 1000 180");
    }

    #[test]
    fn test_cache_defaults() {
        let cache = CacheConfig::default();
        assert_eq!(cache.max_entries, 32);
        assert_eq!(cache.ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"render":{"line_height":80},"scheduler":{"sample_timeout":2.5}}"#)
                .unwrap();
        assert_eq!(config.render.line_height, 80);
        assert_eq!(config.render.viewport_width, DEFAULT_VIEWPORT_WIDTH);
        assert_eq!(config.scheduler.sample_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.cache, CacheConfig::default());
    }

    // Only test in this crate that touches the process environment
    #[test]
    fn test_env_sample_timeout() {
        let cases = [
            ("2.5", Some(Duration::from_millis(2500))),
            ("1e30", None),
            ("-1", None),
            ("0", None),
            ("NaN", None),
            ("soon", None),
        ];
        for (raw, expected) in cases {
            // SAFETY: no other test reads or writes the environment
            unsafe { std::env::set_var("SCRIVENER_SAMPLE_TIMEOUT_SECS", raw) };
            assert_eq!(SchedulerConfig::from_env().sample_timeout, expected, "{raw}");
        }
        unsafe { std::env::remove_var("SCRIVENER_SAMPLE_TIMEOUT_SECS") };
    }
}
