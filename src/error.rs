use std::fmt;

use crate::codec::CodecError;
use crate::ini::IniSection;

/// Conversion stage a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Metadata,
    Assembly,
    GridDecode,
    OverlayDecode,
    ActorExtraction,
    Serialization,
    CanonicalParse,
    Io,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Metadata => "metadata",
            Stage::Assembly => "packed section assembly",
            Stage::GridDecode => "tile grid decode",
            Stage::OverlayDecode => "overlay decode",
            Stage::ActorExtraction => "actor extraction",
            Stage::Serialization => "serialization",
            Stage::CanonicalParse => "canonical parse",
            Stage::Io => "io",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing section [{section}]")]
    MissingSection { section: String },

    #[error("malformed value for {section}.{key}: {value:?}")]
    MalformedScalar { section: String, key: String, value: String },

    #[error("invalid base64 in packed section [{section}]: {reason}")]
    InvalidBase64 { section: String, reason: String },

    #[error("chunk {chunk} truncated: header declares {need} bytes, {have} remain")]
    ChunkTruncated { chunk: usize, need: usize, have: usize },

    #[error("chunk {chunk} failed to decode: {source}")]
    Codec {
        chunk: usize,
        #[source]
        source: CodecError,
    },

    #[error("chunk {chunk} decoded to {len} bytes (max {max})")]
    OversizedChunk { chunk: usize, len: usize, max: usize },

    #[error("{stage}: stream truncated, need {need} bytes, have {have}")]
    StreamTruncated { stage: Stage, need: usize, have: usize },

    #[error("overlay code {code} at cell ({x}, {y}) has no table entry")]
    OverlayIndexOutOfRange { code: u8, x: i32, y: i32 },

    #[error("{stage}: cell index {index} lies outside a {grid_size}x{grid_size} grid")]
    CellOutOfRange { stage: Stage, index: i32, grid_size: i32 },

    #[error("{stage}: malformed entry {key} in [{section}]: {value:?}")]
    MalformedEntry { stage: Stage, section: String, key: String, value: String },

    #[error("tile file not found: {path}")]
    MissingTileFile { path: String },

    #[error("overlay {name:?} at cell ({x}, {y}) has no resource mapping")]
    UnmappedOverlay { name: String, x: i32, y: i32 },

    #[error("malformed canonical document: {0}")]
    MalformedCanonical(String),

    #[error("invalid grid size {0} (expected 64 or 128)")]
    InvalidGridSize(i32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stage of the conversion pipeline that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            Error::MissingSection { .. } | Error::MalformedScalar { .. } => Stage::Metadata,
            Error::InvalidBase64 { .. }
            | Error::ChunkTruncated { .. }
            | Error::Codec { .. }
            | Error::OversizedChunk { .. } => Stage::Assembly,
            Error::StreamTruncated { stage, .. }
            | Error::CellOutOfRange { stage, .. }
            | Error::MalformedEntry { stage, .. } => *stage,
            Error::OverlayIndexOutOfRange { .. } => Stage::OverlayDecode,
            Error::MissingTileFile { .. } => Stage::GridDecode,
            Error::UnmappedOverlay { .. } => Stage::Serialization,
            Error::MalformedCanonical(_) | Error::InvalidGridSize(_) => Stage::CanonicalParse,
            Error::Io(_) => Stage::Io,
        }
    }

    pub(crate) fn malformed_scalar(section: &str, key: &str, value: &str) -> Self {
        Error::MalformedScalar {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub(crate) fn malformed_entry(stage: Stage, section: &IniSection, key: &str, value: &str) -> Self {
        Error::MalformedEntry {
            stage,
            section: section.name().to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
