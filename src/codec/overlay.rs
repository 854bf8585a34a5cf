//! Overlay decoding and the code/resource lookup tables.

use tracing::debug;

use super::BinaryReader;
use crate::error::{Error, Result, Stage};
use crate::ini::IniSection;
use crate::map::Grid;

/// Overlay byte meaning "no overlay".
pub const NO_OVERLAY: u8 = 0xFF;

/// Ordered code -> overlay identifier table for packed overlay streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayTable {
    names: &'static [&'static str],
}

impl OverlayTable {
    /// Walls, ore/gem stages, civilian decorations and crates.
    pub const RED_ALERT: OverlayTable = OverlayTable {
        names: &[
            "sbag", "cycl", "brik", "fenc", "wood",
            "gold01", "gold02", "gold03", "gold04",
            "gem01", "gem02", "gem03", "gem04",
            "v12", "v13", "v14", "v15", "v16", "v17", "v18",
            "fpls", "wcrate", "scrate", "barb", "sbag",
        ],
    };

    pub const fn new(names: &'static [&'static str]) -> Self {
        Self { names }
    }

    pub fn lookup(&self, code: u8) -> Option<&'static str> {
        self.names.get(code as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for OverlayTable {
    fn default() -> Self {
        Self::RED_ALERT
    }
}

/// Overlay identifier <-> `(resource type, resource image)` pairs used by
/// the canonical resource stream. Type `0` means "no resource".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTable {
    entries: &'static [(&'static str, u8, u8)],
}

impl ResourceTable {
    pub const ORE_AND_GEMS: ResourceTable = ResourceTable {
        entries: &[
            ("gold01", 1, 0),
            ("gold02", 1, 1),
            ("gold03", 1, 2),
            ("gold04", 1, 3),
            ("gem01", 2, 0),
            ("gem02", 2, 1),
            ("gem03", 2, 2),
            ("gem04", 2, 3),
        ],
    };

    pub const fn new(entries: &'static [(&'static str, u8, u8)]) -> Self {
        Self { entries }
    }

    pub fn resource_for(&self, overlay: &str) -> Option<(u8, u8)> {
        self.entries
            .iter()
            .find(|(name, _, _)| *name == overlay)
            .map(|&(_, kind, image)| (kind, image))
    }

    pub fn overlay_for(&self, kind: u8, image: u8) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|&&(_, k, i)| k == kind && i == image)
            .map(|&(name, _, _)| name)
    }
}

impl Default for ResourceTable {
    fn default() -> Self {
        Self::ORE_AND_GEMS
    }
}

/// Writes overlay identifiers into an already tile-decoded grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayDecoder {
    table: OverlayTable,
}

impl OverlayDecoder {
    pub fn new(table: OverlayTable) -> Self {
        Self { table }
    }

    /// One byte per cell, row-major. [`NO_OVERLAY`] leaves the cell empty.
    pub fn decode_packed(&self, data: &[u8], grid: &mut Grid) -> Result<()> {
        let mut reader = BinaryReader::new(data, Stage::OverlayDecode);
        reader.require(grid.cell_count())?;

        let mut placed = 0usize;
        for (x, y, cell) in grid.cells_mut() {
            let code = reader.read_u8()?;
            cell.overlay = if code == NO_OVERLAY {
                None
            } else {
                let name = self
                    .table
                    .lookup(code)
                    .ok_or(Error::OverlayIndexOutOfRange { code, x, y })?;
                placed += 1;
                Some(name.to_string())
            };
        }
        debug!(placed, "decoded packed overlays");
        Ok(())
    }

    /// `[OVERLAY]` entries keyed by linear cell index. An absent section
    /// places nothing.
    pub fn decode_flat(&self, section: Option<&IniSection>, grid: &mut Grid) -> Result<()> {
        let Some(section) = section else {
            debug!("no [OVERLAY] section");
            return Ok(());
        };

        for (key, value) in section.iter() {
            let index: i32 = key
                .trim()
                .parse()
                .map_err(|_| Error::malformed_entry(Stage::OverlayDecode, section, key, value))?;
            let cell = grid.cell_at_index_mut(index, Stage::OverlayDecode)?;
            cell.overlay = Some(value.trim().to_lowercase());
        }
        debug!(placed = section.len(), grid_size = grid.size(), "decoded overlay section");
        Ok(())
    }
}
