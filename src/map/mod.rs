pub mod grid;
pub mod actor;
pub mod document;

pub use grid::{
    auto_image_index, cell_from_index, Grid, LayoutKind, TileRecord,
    PACKED_FORMAT_VERSION, SENTINEL_TILE_8, SENTINEL_TILE_16,
};
pub use actor::{ActorExtractor, ActorRecord, ACTOR_SECTIONS, MAX_SPAWN_SLOTS};
pub use document::{load_map, MapDocument, MapDocumentBuilder, MapMetadata};
