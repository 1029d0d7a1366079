//! The view: which part of image space is shown, and how large.
//!
//! Resolution is measured in image units per canvas pixel. Zoom levels are
//! derived from it as `resolution = max_resolution / zoom_factor^zoom`.

use std::f64::consts::TAU;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::extent::{Coordinate, Extent};

/// Canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A canvas that has not been laid out yet.
    pub fn is_zero(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Parameters a [`View`] is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewOptions {
    pub center: Coordinate,
    pub resolution: f64,
    pub rotation: f64,
    pub max_resolution: f64,
    pub max_zoom: f64,
    pub zoom_factor: f64,
    /// Centers are clamped into this extent when set.
    pub extent: Option<Extent>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0],
            resolution: 1.0,
            rotation: 0.0,
            max_resolution: 1.0,
            max_zoom: 8.0,
            zoom_factor: 1.5,
            extent: None,
        }
    }
}

/// A snapshot of the view, handed to render backends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub center: Coordinate,
    pub resolution: f64,
    pub rotation: f64,
    pub zoom: f64,
}

/// Where an animation should end. Unset fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewTarget {
    pub center: Option<Coordinate>,
    pub resolution: Option<f64>,
    pub rotation: Option<f64>,
    /// Coordinate that stays fixed on screen while the resolution changes.
    /// Ignored when `center` is set.
    pub anchor: Option<Coordinate>,
}

#[derive(Debug, Clone)]
struct Animation {
    from: ViewState,
    target: ViewTarget,
    duration: Duration,
    elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct View {
    center: Coordinate,
    resolution: f64,
    rotation: f64,
    max_resolution: f64,
    min_resolution: f64,
    max_zoom: f64,
    zoom_factor: f64,
    extent: Option<Extent>,
    animation: Option<Animation>,
}

impl View {
    pub fn new(options: ViewOptions) -> Self {
        let zoom_factor = if options.zoom_factor > 1.0 {
            options.zoom_factor
        } else {
            1.5
        };
        let max_zoom = options.max_zoom.max(0.0);
        let min_resolution = options.max_resolution / zoom_factor.powf(max_zoom);
        let mut view = Self {
            center: options.center,
            resolution: options.resolution,
            rotation: 0.0,
            max_resolution: options.max_resolution,
            min_resolution,
            max_zoom,
            zoom_factor,
            extent: options.extent,
            animation: None,
        };
        view.center = view.constrain_center(options.center);
        view.resolution = view.constrain_resolution(options.resolution);
        view.rotation = normalize_rotation(options.rotation);
        view
    }

    pub fn center(&self) -> Coordinate {
        self.center
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    pub fn max_resolution(&self) -> f64 {
        self.max_resolution
    }

    pub fn min_resolution(&self) -> f64 {
        self.min_resolution
    }

    pub fn constraint_extent(&self) -> Option<Extent> {
        self.extent
    }

    /// Current zoom level, fractional.
    pub fn zoom(&self) -> f64 {
        self.zoom_for_resolution(self.resolution)
    }

    pub fn zoom_for_resolution(&self, resolution: f64) -> f64 {
        (self.max_resolution / resolution).ln() / self.zoom_factor.ln()
    }

    pub fn resolution_for_zoom(&self, zoom: f64) -> f64 {
        self.max_resolution / self.zoom_factor.powf(zoom)
    }

    /// Clamp a zoom level to `[0, max_zoom]`.
    pub fn constrained_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(0.0, self.max_zoom)
    }

    pub fn constrain_resolution(&self, resolution: f64) -> f64 {
        if !resolution.is_finite() || resolution <= 0.0 {
            return self.max_resolution;
        }
        resolution.clamp(self.min_resolution, self.max_resolution)
    }

    pub fn constrain_center(&self, center: Coordinate) -> Coordinate {
        match &self.extent {
            Some(extent) => extent.clamp(center),
            None => center,
        }
    }

    pub fn state(&self) -> ViewState {
        ViewState {
            center: self.center,
            resolution: self.resolution,
            rotation: self.rotation,
            zoom: self.zoom(),
        }
    }

    // ========================================================================
    // Direct setters. Each one cancels a running animation.
    // ========================================================================

    pub fn set_center(&mut self, center: Coordinate) {
        self.cancel_animations();
        self.center = self.constrain_center(center);
    }

    pub fn set_resolution(&mut self, resolution: f64) {
        self.cancel_animations();
        self.resolution = self.constrain_resolution(resolution);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        let resolution = self.resolution_for_zoom(self.constrained_zoom(zoom));
        self.set_resolution(resolution);
    }

    pub fn set_rotation(&mut self, rotation: f64) {
        self.cancel_animations();
        self.rotation = normalize_rotation(rotation);
    }

    // ========================================================================
    // Pixel <-> coordinate transforms
    // ========================================================================

    /// The image-space coordinate under a canvas pixel. Pixel origin is the
    /// top-left corner of the canvas with Y pointing down.
    pub fn coordinate_from_pixel(&self, pixel: [f64; 2], size: Size) -> Coordinate {
        let dx = (pixel[0] - size.width / 2.0) * self.resolution;
        let dy = (size.height / 2.0 - pixel[1]) * self.resolution;
        let (sin, cos) = self.rotation.sin_cos();
        [
            self.center[0] + dx * cos - dy * sin,
            self.center[1] + dx * sin + dy * cos,
        ]
    }

    pub fn pixel_from_coordinate(&self, coord: Coordinate, size: Size) -> [f64; 2] {
        let dx0 = coord[0] - self.center[0];
        let dy0 = coord[1] - self.center[1];
        let (sin, cos) = self.rotation.sin_cos();
        let dx = dx0 * cos + dy0 * sin;
        let dy = -dx0 * sin + dy0 * cos;
        [
            size.width / 2.0 + dx / self.resolution,
            size.height / 2.0 - dy / self.resolution,
        ]
    }

    /// The image-space extent visible on a canvas of `size`. With a rotated
    /// view this is the bounding box of the visible area.
    pub fn calculate_extent(&self, size: Size) -> Extent {
        let corners = [
            [0.0, 0.0],
            [size.width, 0.0],
            [size.width, size.height],
            [0.0, size.height],
        ];
        let mut extent = Extent::empty();
        for px in corners {
            extent.extend(self.coordinate_from_pixel(px, size));
        }
        extent
    }

    /// Compute the target that shows `extent` in full on a canvas of `size`
    /// with `padding` pixels kept free on every side.
    pub fn fit_target(&self, extent: &Extent, size: Size, padding: f64) -> ViewTarget {
        let (sin, cos) = self.rotation.sin_cos();
        let mut rotated = Extent::empty();
        for [x, y] in [
            [extent.min_x, extent.min_y],
            [extent.max_x, extent.min_y],
            [extent.max_x, extent.max_y],
            [extent.min_x, extent.max_y],
        ] {
            rotated.extend([x * cos + y * sin, -x * sin + y * cos]);
        }
        let avail_w = (size.width - 2.0 * padding).max(1.0);
        let avail_h = (size.height - 2.0 * padding).max(1.0);
        let resolution = (rotated.width() / avail_w).max(rotated.height() / avail_h);
        ViewTarget {
            center: Some(extent.center()),
            resolution: Some(self.constrain_resolution(resolution)),
            ..ViewTarget::default()
        }
    }

    /// Fit an extent immediately.
    pub fn fit(&mut self, extent: &Extent, size: Size, padding: f64) {
        let target = self.fit_target(extent, size, padding);
        self.cancel_animations();
        let from = self.state();
        self.apply(&target, 1.0, &from);
    }

    // ========================================================================
    // Animation
    // ========================================================================

    /// Start animating toward `target`. A zero duration applies it at once.
    /// Starting a new animation replaces the running one.
    pub fn animate(&mut self, target: ViewTarget, duration: Duration) {
        let from = self.state();
        if duration.is_zero() {
            self.animation = None;
            self.apply(&target, 1.0, &from);
            return;
        }
        self.animation = Some(Animation {
            from,
            target,
            duration,
            elapsed: Duration::ZERO,
        });
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn cancel_animations(&mut self) {
        if self.animation.take().is_some() {
            log::trace!("View animation cancelled");
        }
    }

    /// Advance the running animation by `dt`. Returns true when an
    /// animation completed during this step.
    pub fn advance(&mut self, dt: Duration) -> bool {
        let Some(mut animation) = self.animation.take() else {
            return false;
        };
        animation.elapsed += dt;
        let t = (animation.elapsed.as_secs_f64() / animation.duration.as_secs_f64()).min(1.0);
        self.apply(&animation.target, ease_in_out(t), &animation.from);
        if t < 1.0 {
            self.animation = Some(animation);
            false
        } else {
            true
        }
    }

    fn apply(&mut self, target: &ViewTarget, progress: f64, from: &ViewState) {
        let lerp = |a: f64, b: f64| a + (b - a) * progress;

        let resolution = match target.resolution {
            Some(r) => {
                let r = self.constrain_resolution(r);
                lerp(from.resolution, r)
            }
            None => from.resolution,
        };

        let center = match (target.center, target.anchor) {
            (Some(c), _) => [lerp(from.center[0], c[0]), lerp(from.center[1], c[1])],
            (None, Some(anchor)) => {
                let ratio = resolution / from.resolution;
                [
                    anchor[0] - (anchor[0] - from.center[0]) * ratio,
                    anchor[1] - (anchor[1] - from.center[1]) * ratio,
                ]
            }
            (None, None) => from.center,
        };

        if let Some(r) = target.rotation {
            self.rotation = normalize_rotation(lerp(from.rotation, r));
        }
        self.resolution = resolution;
        self.center = self.constrain_center(center);
    }
}

fn normalize_rotation(rotation: f64) -> f64 {
    rotation % TAU
}

/// Smoothstep easing.
fn ease_in_out(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn view() -> View {
        View::new(ViewOptions {
            center: [100.0, -50.0],
            resolution: 1.0,
            max_resolution: 4.0,
            max_zoom: 4.0,
            zoom_factor: 2.0,
            ..ViewOptions::default()
        })
    }

    #[test]
    fn test_zoom_resolution_relation() {
        let v = view();
        assert!(approx_eq(v.zoom(), 2.0));
        assert!(approx_eq(v.resolution_for_zoom(4.0), 0.25));
        assert!(approx_eq(v.min_resolution(), 0.25));
    }

    #[test]
    fn test_set_zoom_is_clamped() {
        let mut v = view();
        v.set_zoom(10.0);
        assert!(approx_eq(v.zoom(), 4.0));
        v.set_zoom(-3.0);
        assert!(approx_eq(v.resolution(), 4.0));
    }

    #[test]
    fn test_pixel_roundtrip_with_rotation() {
        let mut v = view();
        v.set_rotation(0.7);
        let size = Size::new(400.0, 300.0);
        let coord = v.coordinate_from_pixel([37.0, 250.0], size);
        let px = v.pixel_from_coordinate(coord, size);
        assert!(approx_eq(px[0], 37.0));
        assert!(approx_eq(px[1], 250.0));
    }

    #[test]
    fn test_canvas_center_maps_to_view_center() {
        let v = view();
        let size = Size::new(400.0, 300.0);
        assert_eq!(v.coordinate_from_pixel([200.0, 150.0], size), [100.0, -50.0]);
        // Y grows upwards in image space
        assert_eq!(v.coordinate_from_pixel([200.0, 0.0], size), [100.0, 100.0]);
    }

    #[test]
    fn test_calculate_extent() {
        let v = view();
        let e = v.calculate_extent(Size::new(400.0, 300.0));
        assert_eq!(e.to_array(), [-100.0, -200.0, 300.0, 100.0]);
    }

    #[test]
    fn test_fit_with_padding() {
        let v = view();
        let target = v.fit_target(&Extent::new(0.0, -100.0, 200.0, 0.0), Size::new(240.0, 240.0), 20.0);
        assert_eq!(target.center, Some([100.0, -50.0]));
        assert!(approx_eq(target.resolution.unwrap_or_default(), 1.0));
    }

    #[test]
    fn test_animation_reaches_target() {
        let mut v = view();
        v.animate(
            ViewTarget {
                center: Some([0.0, 0.0]),
                resolution: Some(0.5),
                ..ViewTarget::default()
            },
            Duration::from_millis(250),
        );
        assert!(v.is_animating());
        assert!(!v.advance(Duration::from_millis(100)));
        assert!(v.resolution() < 1.0 && v.resolution() > 0.5);
        assert!(v.advance(Duration::from_millis(200)));
        assert!(!v.is_animating());
        assert_eq!(v.center(), [0.0, 0.0]);
        assert!(approx_eq(v.resolution(), 0.5));
    }

    #[test]
    fn test_anchored_zoom_keeps_anchor_fixed() {
        let mut v = view();
        let size = Size::new(400.0, 300.0);
        let anchor = v.coordinate_from_pixel([50.0, 60.0], size);
        v.animate(
            ViewTarget {
                resolution: Some(0.5),
                anchor: Some(anchor),
                ..ViewTarget::default()
            },
            Duration::ZERO,
        );
        let px = v.pixel_from_coordinate(anchor, size);
        assert!(approx_eq(px[0], 50.0));
        assert!(approx_eq(px[1], 60.0));
    }

    #[test]
    fn test_setter_cancels_animation() {
        let mut v = view();
        v.animate(
            ViewTarget {
                resolution: Some(2.0),
                ..ViewTarget::default()
            },
            Duration::from_millis(500),
        );
        v.set_center([1.0, 1.0]);
        assert!(!v.is_animating());
        assert!(approx_eq(v.resolution(), 1.0));
    }

    #[test]
    fn test_center_constraint() {
        let v = View::new(ViewOptions {
            center: [1000.0, 1000.0],
            extent: Some(Extent::new(-10.0, -10.0, 10.0, 10.0)),
            ..ViewOptions::default()
        });
        assert_eq!(v.center(), [10.0, 10.0]);
    }
}
