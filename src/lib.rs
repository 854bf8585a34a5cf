//! Legacy map conversion
//!
//! Reads binary-packed strategy-game maps (INI text plus either packed
//! base64 sections or a raw tile file) into a canonical in-memory document,
//! and writes that document out in the canonical text format.

pub mod codec;
pub mod config;
pub mod error;
pub mod ini;
pub mod map;

pub use config::ConvertOptions;
pub use error::{Error, Result, Stage};
pub use ini::{IniFile, IniSection, SectionReader};
pub use codec::{
    ChunkCodec, CodecError, DECODED_CHUNK_SIZE,
    MapData, OverlayDecoder, OverlayTable, ResourceTable,
    read_packed_section, write_packed_section, save_map,
};
pub use map::{
    ActorExtractor, ActorRecord, Grid, LayoutKind, TileRecord,
    MapDocument, MapDocumentBuilder, MapMetadata, load_map,
};
