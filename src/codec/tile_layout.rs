//! Binary tile layouts.
//!
//! Packed layout (two planes, both row-major):
//!
//! ```text
//! [u16 LE; n*n]   tile ids
//! [u8;     n*n]   image indices
//! ```
//!
//! Flat layout (one plane of interleaved pairs, row-major):
//!
//! ```text
//! [(u8 tile, u8 image); n*n]
//! ```
//!
//! Readers copy raw fields only; sentinel images are rewritten by
//! [`Grid::normalize_sentinel_images`] afterwards.

use tracing::debug;

use super::BinaryReader;
use crate::error::{Result, Stage};
use crate::map::{Grid, LayoutKind};

/// Bytes a full grid occupies in the given layout.
pub fn tile_stream_len(layout: LayoutKind) -> usize {
    let cells = (layout.grid_size() * layout.grid_size()) as usize;
    match layout {
        LayoutKind::Packed => cells * 3,
        LayoutKind::Flat => cells * 2,
    }
}

/// Fill tile ids and image indices from the packed two-plane stream.
pub fn read_packed_tiles(data: &[u8], grid: &mut Grid) -> Result<()> {
    let mut reader = BinaryReader::new(data, Stage::GridDecode);
    reader.require(tile_stream_len(LayoutKind::Packed))?;

    for (_, _, cell) in grid.cells_mut() {
        cell.tile_id = reader.read_u16_le()?;
    }
    for (_, _, cell) in grid.cells_mut() {
        cell.image_index = reader.read_u8()?;
    }
    Ok(())
}

/// Fill tile ids and image indices from interleaved flat pairs.
pub fn read_flat_tiles(data: &[u8], grid: &mut Grid) -> Result<()> {
    let mut reader = BinaryReader::new(data, Stage::GridDecode);
    reader.require(tile_stream_len(LayoutKind::Flat))?;

    for (_, _, cell) in grid.cells_mut() {
        cell.tile_id = reader.read_u8()? as u16;
        cell.image_index = reader.read_u8()?;
    }
    Ok(())
}

/// Decode a fresh grid for `layout` and normalise its sentinel cells.
pub fn decode_tile_grid(layout: LayoutKind, data: &[u8]) -> Result<Grid> {
    let mut grid = Grid::new(layout);
    match layout {
        LayoutKind::Packed => read_packed_tiles(data, &mut grid)?,
        LayoutKind::Flat => read_flat_tiles(data, &mut grid)?,
    }
    let sentinels = grid.normalize_sentinel_images();
    debug!(?layout, grid_size = grid.size(), sentinels, "decoded tile grid");
    Ok(grid)
}
