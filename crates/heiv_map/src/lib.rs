//! heiv_map - the rendering-engine seam of the heiv image viewer.
//!
//! This crate holds everything the viewer needs to talk to a 2D mapping
//! engine without depending on one:
//! - [`Extent`] and [`Geometry`] in image coordinate space
//! - [`View`]: resolution, center and rotation with zoom constraints and
//!   a single-slot animation queue
//! - [`Style`]: the paint applied to a vector feature
//! - [`RenderBackend`]: the command sink an engine adapter implements,
//!   and [`RecordingBackend`], an in-memory implementation

pub mod backend;
pub mod extent;
pub mod geometry;
pub mod style;
pub mod view;

pub use backend::{
    ChromeElement, ImageLayerSpec, ImageSource, LayerHandle, RecordedFeature, RecordedLayer,
    RecordedOverview, RecordingBackend, RenderBackend, RenderFeature,
};
pub use extent::{Coordinate, Extent};
pub use geometry::{Geometry, VertexRef};
pub use style::{Color, ColorParseError, Style};
pub use view::{Size, View, ViewOptions, ViewState, ViewTarget};
