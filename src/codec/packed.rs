//! Packed sections: numbered base64 lines carrying a framed stream of
//! compressed chunks.
//!
//! Frame layout, repeated until fewer than four bytes remain:
//!
//! ```text
//! u32 LE header   length = header & CHUNK_LENGTH_MASK
//! [u8; length]    compressed chunk, decodes to one DECODED_CHUNK_SIZE block
//! ```
//!
//! Running out of bytes where a header would start ends the stream. Running
//! out inside a chunk body is an error.

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{debug, trace};

use super::chunk::{ChunkCodec, CHUNK_LENGTH_MASK, DECODED_CHUNK_SIZE};
use super::{BinaryReader, BinaryWriter};
use crate::error::{Error, Result, Stage};
use crate::ini::IniSection;

/// Concatenate the trimmed values of keys `"1"`, `"2"`, ... up to the first
/// missing index.
pub fn join_numbered_lines(section: &IniSection) -> String {
    let mut joined = String::new();
    for i in 1.. {
        match section.get(&i.to_string()) {
            Some(line) => joined.push_str(line.trim()),
            None => break,
        }
    }
    joined
}

/// Split a framed chunk stream into its compressed chunk bodies.
pub fn split_chunks(data: &[u8]) -> Result<Vec<&[u8]>> {
    let mut reader = BinaryReader::new(data, Stage::Assembly);
    let mut chunks = Vec::new();

    while reader.remaining() >= 4 {
        let header = reader.read_u32_le()?;
        let length = (header & CHUNK_LENGTH_MASK) as usize;
        if reader.remaining() < length {
            return Err(Error::ChunkTruncated {
                chunk: chunks.len(),
                need: length,
                have: reader.remaining(),
            });
        }
        trace!(chunk = chunks.len(), header, length, "chunk frame");
        chunks.push(reader.read_bytes(length)?);
    }

    if !reader.is_empty() {
        trace!(trailing = reader.remaining(), "ignoring bytes after last chunk");
    }
    Ok(chunks)
}

/// Decode every chunk into a fixed-size block and concatenate them.
pub fn decode_chunks(chunks: &[&[u8]], codec: &dyn ChunkCodec) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(chunks.len() * DECODED_CHUNK_SIZE);
    for (index, chunk) in chunks.iter().enumerate() {
        let mut block = codec
            .decode(chunk)
            .map_err(|source| Error::Codec { chunk: index, source })?;
        if block.len() > DECODED_CHUNK_SIZE {
            return Err(Error::OversizedChunk {
                chunk: index,
                len: block.len(),
                max: DECODED_CHUNK_SIZE,
            });
        }
        block.resize(DECODED_CHUNK_SIZE, 0);
        out.extend_from_slice(&block);
    }
    Ok(out)
}

/// Reassemble a packed section into its flat decoded byte stream.
pub fn read_packed_section(section: &IniSection, codec: &dyn ChunkCodec) -> Result<Vec<u8>> {
    let text = join_numbered_lines(section);
    let data = STANDARD.decode(text.as_bytes()).map_err(|e| Error::InvalidBase64 {
        section: section.name().to_string(),
        reason: e.to_string(),
    })?;

    let chunks = split_chunks(&data)?;
    let out = decode_chunks(&chunks, codec)?;
    debug!(
        section = section.name(),
        encoded = data.len(),
        chunks = chunks.len(),
        decoded = out.len(),
        "assembled packed section"
    );
    Ok(out)
}

/// Re-author raw bytes as a packed section named `name`.
///
/// The input is cut into [`DECODED_CHUNK_SIZE`] blocks, each encoded and
/// framed with a plain length header, and the base64 text is split into
/// numbered lines of at most `line_width` characters.
pub fn write_packed_section(
    name: &str,
    raw: &[u8],
    codec: &dyn ChunkCodec,
    line_width: usize,
) -> Result<IniSection> {
    let mut writer = BinaryWriter::with_capacity(raw.len() + raw.len() / DECODED_CHUNK_SIZE * 4 + 4);
    for (index, block) in raw.chunks(DECODED_CHUNK_SIZE).enumerate() {
        let encoded = codec
            .encode(block)
            .map_err(|source| Error::Codec { chunk: index, source })?;
        writer.write_u32_le(encoded.len() as u32 & CHUNK_LENGTH_MASK);
        writer.write_bytes(&encoded);
    }

    let text = STANDARD.encode(writer.as_slice());
    let width = line_width.max(1);
    let mut section = IniSection::new(name);
    // Base64 output is ASCII, so byte offsets are char boundaries.
    for (i, start) in (0..text.len()).step_by(width).enumerate() {
        let end = (start + width).min(text.len());
        section.insert((i + 1).to_string(), &text[start..end]);
    }
    Ok(section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::chunk::testing::{FailingCodec, OverflowCodec, StoredCodec};

    fn frame(chunks: &[&[u8]]) -> Vec<u8> {
        let mut writer = BinaryWriter::new();
        for chunk in chunks {
            writer.write_u32_le(chunk.len() as u32);
            writer.write_bytes(chunk);
        }
        writer.into_vec()
    }

    fn section_from(bytes: &[u8], line_width: usize) -> IniSection {
        let text = STANDARD.encode(bytes);
        let mut section = IniSection::new("MapPack");
        for (i, piece) in text.as_bytes().chunks(line_width).enumerate() {
            section.insert((i + 1).to_string(), format!("  {}  ", std::str::from_utf8(piece).unwrap()));
        }
        section
    }

    #[test]
    fn test_join_stops_at_first_gap() {
        let mut section = IniSection::new("MapPack");
        section.insert("2", " BB ");
        section.insert("1", "AA");
        section.insert("4", "DD");
        assert_eq!(join_numbered_lines(&section), "AABB");
    }

    #[test]
    fn test_single_chunk_consuming_buffer_terminates() {
        let payload = [7u8; 10];
        let data = frame(&[&payload]);
        let chunks = split_chunks(&data).unwrap();
        assert_eq!(chunks, vec![&payload[..]]);
    }

    #[test]
    fn test_flag_bit_is_masked_off() {
        let mut writer = BinaryWriter::new();
        writer.write_u32_le(3 | 0x2000_0000);
        writer.write_bytes(&[1, 2, 3]);
        let data = writer.into_vec();

        let chunks = split_chunks(&data).unwrap();
        assert_eq!(chunks, vec![&[1u8, 2, 3][..]]);
    }

    #[test]
    fn test_partial_header_is_clean_end() {
        let mut data = frame(&[&[9, 9]]);
        data.extend_from_slice(&[0x01, 0x00, 0x00]);
        assert_eq!(split_chunks(&data).unwrap().len(), 1);
    }

    #[test]
    fn test_truncated_body_is_error() {
        let mut data = frame(&[&[1, 2, 3, 4]]);
        data.truncate(data.len() - 1);
        match split_chunks(&data) {
            Err(Error::ChunkTruncated { chunk, need, have }) => {
                assert_eq!((chunk, need, have), (0, 4, 3));
            }
            other => panic!("expected ChunkTruncated, got {other:?}"),
        }
    }

    #[test]
    fn test_blocks_are_padded_and_ordered() {
        let data = frame(&[&[1, 2], &[3]]);
        let section = section_from(&data, 4);

        let out = read_packed_section(&section, &StoredCodec).unwrap();

        assert_eq!(out.len(), 2 * DECODED_CHUNK_SIZE);
        assert_eq!(&out[..3], &[1, 2, 0]);
        assert_eq!(out[DECODED_CHUNK_SIZE], 3);
        assert!(out[DECODED_CHUNK_SIZE + 1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_section_yields_empty_stream() {
        let out = read_packed_section(&IniSection::new("OverlayPack"), &StoredCodec).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_codec_failure_aborts() {
        let section = section_from(&frame(&[&[1], &[2]]), 70);
        let err = read_packed_section(&section, &FailingCodec).unwrap_err();
        assert!(matches!(err, Error::Codec { chunk: 0, .. }));
        assert_eq!(err.stage(), Stage::Assembly);
    }

    #[test]
    fn test_oversized_block_rejected() {
        let section = section_from(&frame(&[&[1]]), 70);
        let err = read_packed_section(&section, &OverflowCodec).unwrap_err();
        assert!(matches!(err, Error::OversizedChunk { .. }));
    }

    #[test]
    fn test_bad_base64_names_section() {
        let mut section = IniSection::new("OverlayPack");
        section.insert("1", "not*base64!");
        match read_packed_section(&section, &StoredCodec) {
            Err(Error::InvalidBase64 { section, .. }) => assert_eq!(section, "OverlayPack"),
            other => panic!("expected InvalidBase64, got {other:?}"),
        }
    }

    #[test]
    fn test_authored_section_reassembles() {
        let raw: Vec<u8> = (0..DECODED_CHUNK_SIZE * 2 + 100).map(|i| (i % 251) as u8).collect();

        let section = write_packed_section("MapPack", &raw, &StoredCodec, 70).unwrap();
        assert!(section.iter().all(|(_, line)| line.len() <= 70));
        assert_eq!(section.get("1").map(str::len), Some(70));

        let out = read_packed_section(&section, &StoredCodec).unwrap();
        assert_eq!(out.len(), 3 * DECODED_CHUNK_SIZE);
        assert_eq!(&out[..raw.len()], &raw[..]);
    }
}
