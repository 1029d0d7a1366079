//! Viewer-level error type.

use crate::codec::CodecError;
use crate::config::ConfigError;

/// Failure while fetching or decoding an external resource.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Could not read data from {url}: {message}")]
pub struct LoadError {
    pub url: String,
    pub message: String,
}

impl LoadError {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by the public viewer API.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Raised by the throwing lookup variant. Carries the viewer name so a
    /// caller juggling several viewers can tell which one failed.
    #[error("Could not find a feature with id {id}")]
    FeatureNotFound { id: String, viewer: String },

    #[error("Could not find layer with name {name}")]
    LayerNotFound { name: String },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Data seems to be no valid IIIF image information: {url}")]
    InvalidIiifInfo { url: String },

    #[error("Drawing is not enabled for this viewer")]
    DrawingDisabled,

    #[error("Viewer has not been initialized")]
    NotInitialized,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ViewerError {
    pub fn feature_not_found(id: impl Into<String>, viewer: impl Into<String>) -> Self {
        Self::FeatureNotFound {
            id: id.into(),
            viewer: viewer.into(),
        }
    }

    /// Stable machine-readable error name.
    pub fn code(&self) -> &'static str {
        match self {
            ViewerError::Config(_) => "ERR_HEIIMAGEVIEWER_CONFIG",
            ViewerError::FeatureNotFound { .. } => "ERR_HEIIMAGEVIEWER_FEATURE_ID_NOT_FOUND",
            ViewerError::LayerNotFound { .. } => "ERR_HEIIMAGEVIEWER_LAYER_NOT_FOUND",
            ViewerError::Load(_) => "ERR_HEIIMAGEVIEWER_LOAD",
            ViewerError::InvalidIiifInfo { .. } => "ERR_HEIIMAGEVIEWER_INVALID_IIIF",
            ViewerError::DrawingDisabled => "ERR_HEIIMAGEVIEWER_DRAWING_DISABLED",
            ViewerError::NotInitialized => "ERR_HEIIMAGEVIEWER_NOT_INITIALIZED",
            ViewerError::Codec(_) => "ERR_HEIIMAGEVIEWER_CODEC",
            ViewerError::Json(_) => "ERR_HEIIMAGEVIEWER_JSON",
        }
    }

    /// Name of the viewer instance the error originated from, when known.
    pub fn viewer(&self) -> Option<&str> {
        match self {
            ViewerError::FeatureNotFound { viewer, .. } => Some(viewer),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_not_found_message() {
        let err = ViewerError::feature_not_found("zone_4", "heiImageViewerabc");
        assert_eq!(err.to_string(), "Could not find a feature with id zone_4");
        assert_eq!(err.code(), "ERR_HEIIMAGEVIEWER_FEATURE_ID_NOT_FOUND");
        assert_eq!(err.viewer(), Some("heiImageViewerabc"));
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: ViewerError = ConfigError::SizeMismatch {
            images: 2,
            sizes: 1,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "The sizes and images arrays must be the same length"
        );
    }
}
