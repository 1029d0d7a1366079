//! Error types for shape codec operations.

use thiserror::Error;

/// Errors that can occur while converting annotation shapes.
#[derive(Error, Debug)]
pub enum CodecError {
    /// XML parsing or serialization error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// SVG markup without an `<svg>` root element
    #[error("SVG source has no <svg> root element")]
    MissingSvgRoot,

    /// A numeric attribute could not be parsed
    #[error("Invalid value '{value}' for attribute '{attribute}'")]
    InvalidNumber {
        /// Name of the attribute
        attribute: String,
        /// The raw attribute value
        value: String,
    },

    /// A point list that is not a sequence of `x,y` pairs
    #[error("Invalid point list: {message}")]
    InvalidPoints {
        /// Description of the problem
        message: String,
    },

    /// Shape format other than `svg` or `tei`
    #[error("Unknown shape format '{0}'")]
    UnknownFormat(String),

    /// Output was not valid UTF-8
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },
}

impl CodecError {
    /// Create an invalid number error.
    pub fn invalid_number(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create an invalid point list error.
    pub fn invalid_points(message: impl Into<String>) -> Self {
        Self::InvalidPoints {
            message: message.into(),
        }
    }

    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}
