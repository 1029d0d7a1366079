//! Viewer construction parameters.
//!
//! A viewer is built from a JSON object with camelCase keys. Everything
//! except `container` and `images` has a default; [`ViewerConfig::validate`]
//! reports every missing required key at once.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{DEFAULT_LANG, DEFAULT_OVERVIEW_MAP_SIZE, VIEWER_NAME_PREFIX};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    #[default]
    Warn,
    /// Show errors, warnings, and info messages
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

// ============================================================================
// View policies
// ============================================================================

/// Where the image sits in the canvas on first display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PositionPolicy {
    #[default]
    Center,
    Top,
    TopLeft,
}

impl PositionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionPolicy::Center => "center",
            PositionPolicy::Top => "top",
            PositionPolicy::TopLeft => "top-left",
        }
    }
}

impl From<String> for PositionPolicy {
    fn from(value: String) -> Self {
        match value.as_str() {
            "center" => PositionPolicy::Center,
            "top" => PositionPolicy::Top,
            "top-left" => PositionPolicy::TopLeft,
            other => {
                log::warn!(
                    "The setting for the center of the image is invalid: \"{}\". Using the default behaviour.",
                    other
                );
                PositionPolicy::Center
            }
        }
    }
}

impl From<PositionPolicy> for String {
    fn from(value: PositionPolicy) -> Self {
        value.as_str().to_string()
    }
}

/// Initial zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ZoomPolicy {
    /// The whole image is visible.
    #[default]
    Min,
    /// The smaller image dimension fills the canvas.
    Cover,
}

impl ZoomPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoomPolicy::Min => "min",
            ZoomPolicy::Cover => "cover",
        }
    }
}

impl From<String> for ZoomPolicy {
    fn from(value: String) -> Self {
        match value.as_str() {
            "cover" => ZoomPolicy::Cover,
            "min" => ZoomPolicy::Min,
            other => {
                log::warn!("Unknown zoom setting \"{}\", using \"min\"", other);
                ZoomPolicy::Min
            }
        }
    }
}

impl From<ZoomPolicy> for String {
    fn from(value: ZoomPolicy) -> Self {
        value.as_str().to_string()
    }
}

/// What the mouse wheel does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WheelMode {
    #[default]
    Zoom,
    Vertical,
}

impl WheelMode {
    pub fn toggled(self) -> Self {
        match self {
            WheelMode::Zoom => WheelMode::Vertical,
            WheelMode::Vertical => WheelMode::Zoom,
        }
    }
}

/// Properties that can be handed in at construction and read back later.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerProperties {
    /// Initial resolution, overriding the zoom policy.
    pub resolution: Option<f64>,
    pub wheel_mode: WheelMode,
    pub rotation: f64,
    pub overview_map_collapsed: bool,
}

// ============================================================================
// Viewer configuration
// ============================================================================

/// Construction parameters of a viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerConfig {
    #[serde(default = "generate_viewer_name")]
    pub name: String,

    /// Host element id (browser) or an arbitrary label (native).
    #[serde(default)]
    pub container: Option<String>,

    /// Image URLs of increasing size, or a single IIIF `info.json` URL.
    #[serde(default)]
    pub images: Vec<String>,

    /// `[width, height]` per image. Probed from the images when absent.
    #[serde(default)]
    pub sizes: Option<Vec<[u32; 2]>>,

    #[serde(default)]
    pub position: PositionPolicy,

    #[serde(default)]
    pub zoom: ZoomPolicy,

    #[serde(default = "default_overview_map_size")]
    pub overview_map_size: f64,

    #[serde(default = "default_lang")]
    pub lang: String,

    #[serde(default)]
    pub properties: ViewerProperties,

    /// Decimal places used when exporting coordinates to SVG.
    #[serde(default, deserialize_with = "deserialize_decimals")]
    pub max_coordinate_decimals: usize,

    /// Enable the drawing and editing capability.
    #[serde(default)]
    pub draw: bool,

    #[serde(default)]
    pub log_level: LogLevel,
}

static NAME_COUNTER: AtomicU64 = AtomicU64::new(0);

fn generate_viewer_name() -> String {
    let nanos = web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or_default();
    let seq = NAME_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mixed = nanos.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(seq);
    format!("{}{:x}", VIEWER_NAME_PREFIX, mixed % 0xFFFF_FFFF)
}

fn default_overview_map_size() -> f64 {
    DEFAULT_OVERVIEW_MAP_SIZE
}

fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

/// Accepts any JSON number and clamps it to a non-negative integer.
fn deserialize_decimals<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    Ok(clamp_decimals(value))
}

fn clamp_decimals(value: f64) -> usize {
    if value.is_finite() && value > 0.0 {
        value.floor() as usize
    } else {
        0
    }
}

impl ViewerConfig {
    pub fn new(container: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            name: generate_viewer_name(),
            container: Some(container.into()),
            images,
            sizes: None,
            position: PositionPolicy::default(),
            zoom: ZoomPolicy::default(),
            overview_map_size: DEFAULT_OVERVIEW_MAP_SIZE,
            lang: default_lang(),
            properties: ViewerProperties::default(),
            max_coordinate_decimals: 0,
            draw: false,
            log_level: LogLevel::default(),
        }
    }

    pub fn with_sizes(mut self, sizes: Vec<[u32; 2]>) -> Self {
        self.sizes = Some(sizes);
        self
    }

    pub fn with_draw(mut self, draw: bool) -> Self {
        self.draw = draw;
        self
    }

    /// Deserialize and validate a configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;
        if config.overview_map_size <= 0.0 {
            config.overview_map_size = DEFAULT_OVERVIEW_MAP_SIZE;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.container.as_deref().is_none_or(str::is_empty) {
            missing.push("container".to_string());
        }
        if self.images.is_empty() {
            missing.push("images".to_string());
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingParameters(missing));
        }
        if let Some(sizes) = &self.sizes {
            if sizes.len() != self.images.len() {
                return Err(ConfigError::SizeMismatch {
                    images: self.images.len(),
                    sizes: sizes.len(),
                });
            }
        }
        Ok(())
    }

    /// A single URL ending in `info.json` selects the IIIF path.
    pub fn iiif_info_url(&self) -> Option<&str> {
        match self.images.as_slice() {
            [url] if url.ends_with("info.json") => Some(url),
            _ => None,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Missing required parameter(s): {}", .0.join(", "))]
    MissingParameters(Vec<String>),

    #[error("The sizes and images arrays must be the same length")]
    SizeMismatch { images: usize, sizes: usize },
}
