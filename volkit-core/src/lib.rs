//! Vologram Container Library
//!
//! This library provides the binary container format for vologram files:
//! the versioned header codec, the per-frame record codec, and a frame
//! store with read-on-demand access and a one-slot keyframe cache.

pub mod frame;
pub mod header;
pub mod store;

pub use frame::{FrameArrays, FrameHeader, FrameLayout, FrameView, Keyframe, Span};
pub use header::{FormatTag, TextureCompression, TextureContainer, VolsHeader};
pub use store::FrameStore;

/// Result type for volkit-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for volkit-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad magic bytes, expected 'VOLS'")]
    BadMagic,

    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(u32),

    #[error("Truncated header")]
    TruncatedHeader,

    #[error("Unknown texture format byte: {0}")]
    BadTextureFormat(u8),

    #[error("Corrupt frame record: frame {frame}")]
    CorruptFrame { frame: u32 },

    #[error("Frame {frame} trailing size {trailing} disagrees with header size {header}")]
    IndexMismatch {
        frame: u32,
        header: u32,
        trailing: u32,
    },

    #[error("No keyframe found at or before frame {0}")]
    NoKeyframeBefore(u32),

    #[error("Frame index {index} out of range ({count} frames)")]
    FrameOutOfRange { index: u32, count: u32 },
}
