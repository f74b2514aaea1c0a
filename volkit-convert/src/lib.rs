//! Vologram Cut/Convert Pipeline
//!
//! Orchestrates a complete input-to-output rewrite of a vologram
//! container: frame-range cuts with keyframe reconstitution, normals
//! stripping, texture resizing, and audio trimming. Processing is
//! strictly sequential; any error aborts the whole run and the partial
//! output must not be considered valid.

pub mod cut;
pub mod pipeline;
mod progress;

pub use cut::{cut_split, CutSummary};
pub use pipeline::{convert, ConvertOptions, ConvertSummary};

/// Result type for volkit-convert operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for volkit-convert operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Container error: {0}")]
    Container(#[from] volkit_core::Error),

    #[error("Texture error: {0}")]
    Texture(#[from] volkit_texture::Error),

    #[error("Audio error: {0}")]
    Audio(#[from] volkit_audio::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Container has no frames")]
    EmptyContainer,

    #[error("Conversion cancelled")]
    Cancelled,
}
