//! Boundary to the external chunk compression codec.
//!
//! Packed map sections are framed streams of independently compressed
//! chunks. The compression algorithm itself lives outside this crate;
//! the converter only relies on the contract below.

use std::fmt;

/// Size of every decoded chunk block. Short decoder output is zero-padded
/// up to this size; longer output is rejected.
pub const DECODED_CHUNK_SIZE: usize = 8192;

/// Mask applied to each 4-byte chunk length header. Clears a flag bit in
/// the top byte that this decoder ignores.
pub const CHUNK_LENGTH_MASK: u32 = 0xDFFF_FFFF;

/// Failure reported by a [`ChunkCodec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecError {
    message: String,
}

impl CodecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CodecError {}

/// Synchronous whole-chunk codec.
///
/// `decode` must either decode the entire chunk (at most
/// [`DECODED_CHUNK_SIZE`] bytes of output) or fail; there is no partial
/// output contract. `encode` is only needed when re-authoring packed
/// sections.
pub trait ChunkCodec {
    fn decode(&self, compressed: &[u8]) -> Result<Vec<u8>, CodecError>;

    fn encode(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Identity codec: chunks are stored uncompressed.
    pub struct StoredCodec;

    impl ChunkCodec for StoredCodec {
        fn decode(&self, compressed: &[u8]) -> Result<Vec<u8>, CodecError> {
            if compressed.len() > DECODED_CHUNK_SIZE {
                return Err(CodecError::new("stored chunk exceeds block size"));
            }
            Ok(compressed.to_vec())
        }

        fn encode(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError> {
            Ok(raw.to_vec())
        }
    }

    /// Codec that rejects every chunk.
    pub struct FailingCodec;

    impl ChunkCodec for FailingCodec {
        fn decode(&self, _compressed: &[u8]) -> Result<Vec<u8>, CodecError> {
            Err(CodecError::new("corrupt payload"))
        }

        fn encode(&self, _raw: &[u8]) -> Result<Vec<u8>, CodecError> {
            Err(CodecError::new("encoder unavailable"))
        }
    }

    /// Codec that reports more output than a block can hold.
    pub struct OverflowCodec;

    impl ChunkCodec for OverflowCodec {
        fn decode(&self, _compressed: &[u8]) -> Result<Vec<u8>, CodecError> {
            Ok(vec![0; DECODED_CHUNK_SIZE + 1])
        }

        fn encode(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError> {
            Ok(raw.to_vec())
        }
    }
}
