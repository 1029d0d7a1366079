//! Global constants for the heiv viewer

use heiv_map::Color;

/// Default pixel size of the overview map
pub const DEFAULT_OVERVIEW_MAP_SIZE: f64 = 150.0;

/// Default language for control labels
pub const DEFAULT_LANG: &str = "de";

/// Prefix of generated viewer names
pub const VIEWER_NAME_PREFIX: &str = "heiImageViewer";

/// Pixel tolerance for hover, click and selection hit tests
pub const HIT_TOLERANCE: f64 = 5.0;

/// Pixel tolerance for grabbing a feature with the transform tool
pub const TRANSFORM_HIT_TOLERANCE: f64 = 2.0;

/// Pixel tolerance for grabbing a vertex in modify mode
pub const VERTEX_PIXEL_TOLERANCE: f64 = 5.0;

/// Default maximum zoom level for static images
pub const DEFAULT_MAX_ZOOM: f64 = 8.0;

/// Resolution ratio between consecutive zoom levels
pub const ZOOM_FACTOR: f64 = 1.5;

/// Maximum resolution as a multiple of the full-fit resolution
pub const MAX_RESOLUTION_FACTOR: f64 = 1.2;

/// Zoom step of the zoom buttons
pub const ZOOM_BUTTON_DELTA: f64 = 0.5;

/// Zoom step per wheel notch in zoom mode
pub const WHEEL_ZOOM_DELTA: f64 = 1.0;

/// Vertical pan per wheel notch in vertical mode, in image units
pub const WHEEL_VERTICAL_STEP: f64 = 50.0;

/// Duration of zoom animations, in milliseconds
pub const ZOOM_DURATION_MS: u64 = 250;

/// Duration of the focus animation, in milliseconds
pub const FOCUS_DURATION_MS: u64 = 800;

/// Padding kept around a focused feature, in pixels
pub const FOCUS_PADDING: f64 = 20.0;

/// Fill opacity of highlighted and focused features
pub const HIGHLIGHT_OPACITY: f64 = 0.3;

/// Fill opacity of hovered features
pub const HOVER_OPACITY: f64 = 0.1;

/// Fill opacity of base-styled features on `always` layers
pub const BASE_OPACITY: f64 = 0.0;

/// Stroke width of base-styled features
pub const BASE_STROKE_WIDTH: f64 = 1.0;

/// Stroke width of hovered and highlighted features
pub const STRONG_STROKE_WIDTH: f64 = 1.75;

/// Fill opacity of freshly drawn features
pub const DRAWN_OPACITY: f64 = 0.1;

/// Number of polygon edges used to approximate ellipses
pub const ELLIPSE_SEGMENTS: usize = 64;

/// Name of the layer created for drawing when none is given
pub const DEFAULT_DRAW_LAYER: &str = "draw_layer_default";

/// Color of layers that do not declare one
pub const DEFAULT_LAYER_COLOR: Color = Color::rgb(160, 0, 0);

/// Color of features when neither feature nor layer declares one
pub const DEFAULT_FEATURE_COLOR: Color = Color::RED;

/// Fraction of the image extent inside which zoom buttons keep the center
pub const ZOOM_DRIFT_EXTENT_RATIO: f64 = 0.8;

/// Per-resolution-unit step toward the image center when zooming from outside
pub const ZOOM_DRIFT_FACTOR: f64 = 0.05;

/// Rotation step of the rotate buttons
pub const ROTATE_STEP: f64 = std::f64::consts::FRAC_PI_2;

/// Rotations beyond this absolute value snap back to 0
pub const ROTATION_RESET_THRESHOLD: f64 = 6.15;

pub mod chrome {
    /// Delay before the overview map and zoom slider start fading, in milliseconds
    pub const FADE_DELAY_MS: u64 = 2500;

    /// Interval between fade steps, in milliseconds
    pub const FADE_STEP_MS: u64 = 50;

    /// Fraction of the current opacity removed per fade step
    pub const FADE_DECAY: f64 = 0.12;

    /// Opacity at which the element is hidden
    pub const FADE_HIDE_THRESHOLD: f64 = 0.1;
}
