pub mod reader;
pub mod writer;
pub mod chunk;
pub mod packed;
pub mod tile_layout;
pub mod overlay;
pub mod canonical;

pub use reader::BinaryReader;
pub use writer::BinaryWriter;
pub use chunk::{ChunkCodec, CodecError, CHUNK_LENGTH_MASK, DECODED_CHUNK_SIZE};
pub use packed::{read_packed_section, write_packed_section, split_chunks, decode_chunks, join_numbered_lines};
pub use tile_layout::{decode_tile_grid, read_flat_tiles, read_packed_tiles, tile_stream_len};
pub use overlay::{OverlayDecoder, OverlayTable, ResourceTable, NO_OVERLAY};
pub use canonical::{MapData, save_map, AUTO_IMAGE};
