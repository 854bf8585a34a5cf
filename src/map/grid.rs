use crate::error::{Error, Result, Stage};

/// `[Basic] NewINIFormat` value that selects the packed layout.
pub const PACKED_FORMAT_VERSION: i32 = 3;

/// Tile id meaning "auto-select a clear/water image" in 8-bit tile data.
pub const SENTINEL_TILE_8: u16 = 0xFF;
/// Tile id meaning "auto-select a clear/water image" in 16-bit tile data.
pub const SENTINEL_TILE_16: u16 = 0xFFFF;

/// Binary layout of a source map, chosen once from the format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutKind {
    /// Base64 `MapPack`/`OverlayPack` sections, 128x128 grid, 16-bit tiles.
    Packed,
    /// Sibling raw tile file plus `[OVERLAY]` text, 64x64 grid, 8-bit tiles.
    Flat,
}

impl LayoutKind {
    pub fn from_format_version(version: i32) -> Self {
        if version == PACKED_FORMAT_VERSION {
            LayoutKind::Packed
        } else {
            LayoutKind::Flat
        }
    }

    pub fn from_grid_size(size: i32) -> Result<Self> {
        match size {
            128 => Ok(LayoutKind::Packed),
            64 => Ok(LayoutKind::Flat),
            other => Err(Error::InvalidGridSize(other)),
        }
    }

    pub fn grid_size(self) -> i32 {
        match self {
            LayoutKind::Packed => 128,
            LayoutKind::Flat => 64,
        }
    }

    /// Whether `tile` asks for an auto-selected image under this layout.
    /// 16-bit data also honours the 8-bit marker.
    pub fn is_sentinel(self, tile: u16) -> bool {
        match self {
            LayoutKind::Packed => tile == SENTINEL_TILE_8 || tile == SENTINEL_TILE_16,
            LayoutKind::Flat => tile == SENTINEL_TILE_8,
        }
    }
}

/// Translate a linear cell index into `(x, y)` for a square grid.
pub fn cell_from_index(index: i32, grid_size: i32) -> (i32, i32) {
    (index % grid_size, index / grid_size)
}

/// Image index used for an auto-selected tile: a 4x4 repeating pattern.
pub fn auto_image_index(x: i32, y: i32) -> u8 {
    ((x % 4) + (y % 4) * 4) as u8
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileRecord {
    pub tile_id: u16,
    pub image_index: u8,
    pub overlay: Option<String>,
}

/// Square, fixed-size grid of tile records stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    layout: LayoutKind,
    size: i32,
    cells: Vec<TileRecord>,
}

impl Grid {
    pub fn new(layout: LayoutKind) -> Self {
        let size = layout.grid_size();
        Self {
            layout,
            size,
            cells: vec![TileRecord::default(); (size * size) as usize],
        }
    }

    pub fn layout(&self) -> LayoutKind {
        self.layout
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.size || y >= self.size {
            return None;
        }
        Some((y * self.size + x) as usize)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&TileRecord> {
        self.offset(x, y).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut TileRecord> {
        let i = self.offset(x, y)?;
        Some(&mut self.cells[i])
    }

    /// Resolve a linear cell index to a mutable cell, failing if the index
    /// lies outside the grid.
    pub fn cell_at_index_mut(&mut self, index: i32, stage: Stage) -> Result<&mut TileRecord> {
        let size = self.size;
        let out_of_range = || Error::CellOutOfRange { stage, index, grid_size: size };
        if index < 0 {
            return Err(out_of_range());
        }
        let (x, y) = cell_from_index(index, size);
        self.get_mut(x, y).ok_or_else(out_of_range)
    }

    /// Row-major iteration yielding `(x, y, cell)`.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, &TileRecord)> {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, c)| (i as i32 % size, i as i32 / size, c))
    }

    pub(crate) fn cells_mut(&mut self) -> impl Iterator<Item = (i32, i32, &mut TileRecord)> {
        let size = self.size;
        self.cells
            .iter_mut()
            .enumerate()
            .map(move |(i, c)| (i as i32 % size, i as i32 / size, c))
    }

    /// Replace the stored image of every sentinel tile with its
    /// position-derived auto image. Returns the number of cells rewritten.
    pub fn normalize_sentinel_images(&mut self) -> usize {
        let layout = self.layout;
        let mut rewritten = 0;
        for (x, y, cell) in self.cells_mut() {
            if layout.is_sentinel(cell.tile_id) {
                cell.image_index = auto_image_index(x, y);
                rewritten += 1;
            }
        }
        rewritten
    }
}
