//! Error types for the bone compiler.

use thiserror::Error;

/// Result type alias using CompilerError.
pub type Result<T> = std::result::Result<T, CompilerError>;

/// Fatal errors for a compile run.
///
/// Data gaps (missing shapes, states, textures) never surface here; they are
/// recovered and recorded in [`crate::Diagnostics`] instead.
#[derive(Error, Debug)]
pub enum CompilerError {
    /// Failed to read or parse a ZIP archive.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read or process an image.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid rule bundle structure.
    #[error("Invalid rule bundle: {0}")]
    InvalidRuleBundle(String),

    /// A block name pattern failed to compile.
    #[error("Invalid block name pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A shape copies itself, directly or through a chain (strict mode only).
    #[error("Shape {0} copies itself")]
    SelfReferentialCopy(String),

    /// Copy or copy_block nesting went past the configured limit (strict mode only).
    #[error("Copy nesting deeper than {limit} while expanding {shape}")]
    CopyDepthExceeded { shape: String, limit: usize },

    /// Failed to build or encode the texture atlas.
    #[error("Atlas building error: {0}")]
    AtlasBuild(String),
}
