//! heiv - pan/zoom image viewer core with editable annotation layers.
//!
//! The viewer shows one image, either a static pyramid of pre-scaled files
//! or a IIIF image service, and overlays vector annotations parsed from
//! SVG markup or TEI point lists. Annotations can be highlighted, focused,
//! drawn, edited and exported back to SVG.
//!
//! Rendering goes through [`heiv_map::RenderBackend`]. The native build
//! ships a headless command-line front end, the wasm build a JavaScript
//! binding that forwards render commands to a page-supplied adapter.

pub mod codec;
pub mod config;
pub mod constants;
pub mod draw;
pub mod error;
pub mod events;
pub mod feature;
pub mod layer;
pub mod loader;
pub mod viewer;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;

pub use codec::{AnnotationRecord, CodecError, FeatureRecord, ShapeRecord};
pub use config::{ViewerConfig, ViewerProperties, WheelMode};
pub use draw::{DrawShape, EditMode, InteractionMode};
pub use error::{LoadError, ViewerError};
pub use events::{EventKind, ViewerEvent};
pub use feature::{Feature, ShapeKind};
pub use layer::{DisplayPolicy, Layer};
pub use loader::ResourceLoader;
pub use viewer::Viewer;
