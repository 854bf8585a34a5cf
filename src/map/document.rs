use std::path::Path;

use tracing::{debug, info};

use super::actor::{ActorExtractor, ActorRecord, WAYPOINT_SECTION};
use super::grid::{Grid, LayoutKind};
use crate::codec::{decode_tile_grid, read_packed_section, ChunkCodec, OverlayDecoder};
use crate::config::ConvertOptions;
use crate::error::{Error, Result};
use crate::ini::{IniFile, IniSection, SectionReader};

/// Scalar metadata read from `[Basic]` and `[Map]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapMetadata {
    pub title: String,
    pub theater: String,
    pub format_version: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    pub width: i32,
    pub height: i32,
}

impl MapMetadata {
    pub fn layout(&self) -> LayoutKind {
        LayoutKind::from_format_version(self.format_version)
    }

    pub fn read(ini: &dyn SectionReader, options: &ConvertOptions) -> Result<Self> {
        let basic = required_section(ini, "Basic")?;
        let map = required_section(ini, "Map")?;

        let theater = map.value_or("Theater", &options.default_theater);
        Ok(Self {
            title: basic.value_or("Name", &options.default_title).to_string(),
            theater: theater.chars().take(options.theater_max_len).collect(),
            format_version: scalar(basic, "NewINIFormat")?,
            x_offset: scalar(map, "X")?,
            y_offset: scalar(map, "Y")?,
            width: scalar(map, "Width")?,
            height: scalar(map, "Height")?,
        })
    }
}

fn required_section<'a>(ini: &'a dyn SectionReader, name: &str) -> Result<&'a IniSection> {
    ini.section(name)
        .ok_or_else(|| Error::MissingSection { section: name.to_string() })
}

/// Absent numeric fields read as `0`; present but non-numeric ones are fatal.
fn scalar(section: &IniSection, key: &str) -> Result<i32> {
    let raw = section.value_or(key, "0");
    raw.trim()
        .parse()
        .map_err(|_| Error::malformed_scalar(section.name(), key, raw))
}

/// Canonical in-memory map. Owns its grid and actor list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapDocument {
    metadata: MapMetadata,
    grid: Grid,
    actors: Vec<ActorRecord>,
    spawn_points: Vec<(i32, i32)>,
}

impl MapDocument {
    /// Assemble a document programmatically. The grid's layout decides the
    /// format version recorded in `metadata`.
    pub fn new(
        mut metadata: MapMetadata,
        grid: Grid,
        actors: Vec<ActorRecord>,
        spawn_points: Vec<(i32, i32)>,
    ) -> Self {
        if metadata.layout() != grid.layout() {
            metadata.format_version = match grid.layout() {
                LayoutKind::Packed => super::grid::PACKED_FORMAT_VERSION,
                LayoutKind::Flat => 0,
            };
        }
        Self { metadata, grid, actors, spawn_points }
    }

    pub fn metadata(&self) -> &MapMetadata {
        &self.metadata
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn theater(&self) -> &str {
        &self.metadata.theater
    }

    pub fn layout(&self) -> LayoutKind {
        self.grid.layout()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_size(&self) -> i32 {
        self.grid.size()
    }

    pub fn actors(&self) -> &[ActorRecord] {
        &self.actors
    }

    pub fn spawn_points(&self) -> &[(i32, i32)] {
        &self.spawn_points
    }

    /// `[x, y, width, height]` of the playable area.
    pub fn bounds(&self) -> [i32; 4] {
        let m = &self.metadata;
        [m.x_offset, m.y_offset, m.width, m.height]
    }

    pub fn is_in_map(&self, x: i32, y: i32) -> bool {
        let m = &self.metadata;
        x >= m.x_offset && y >= m.y_offset && x < m.x_offset + m.width && y < m.y_offset + m.height
    }
}

/// Builds a [`MapDocument`] from a legacy INI document.
pub struct MapDocumentBuilder<'a> {
    options: &'a ConvertOptions,
    codec: &'a dyn ChunkCodec,
    overlays: OverlayDecoder,
}

impl<'a> MapDocumentBuilder<'a> {
    pub fn new(options: &'a ConvertOptions, codec: &'a dyn ChunkCodec) -> Self {
        Self { options, codec, overlays: OverlayDecoder::default() }
    }

    pub fn with_overlay_decoder(mut self, overlays: OverlayDecoder) -> Self {
        self.overlays = overlays;
        self
    }

    /// Ingest a document. `tile_file` holds the raw tile stream that flat
    /// maps keep beside the INI text; packed maps ignore it.
    pub fn build(&self, ini: &dyn SectionReader, tile_file: Option<&[u8]>) -> Result<MapDocument> {
        let metadata = MapMetadata::read(ini, self.options)?;
        let layout = metadata.layout();
        debug!(title = %metadata.title, ?layout, "ingesting map");

        let grid = match layout {
            LayoutKind::Packed => {
                let tiles = read_packed_section(required_section(ini, "MapPack")?, self.codec)?;
                let mut grid = decode_tile_grid(layout, &tiles)?;
                let overlays = read_packed_section(required_section(ini, "OverlayPack")?, self.codec)?;
                self.overlays.decode_packed(&overlays, &mut grid)?;
                grid
            }
            LayoutKind::Flat => {
                let tiles = tile_file.ok_or_else(|| Error::MissingTileFile {
                    path: format!("<{} tile file>", self.options.tile_file_extension),
                })?;
                let mut grid = decode_tile_grid(layout, tiles)?;
                self.overlays.decode_flat(ini.section("OVERLAY"), &mut grid)?;
                grid
            }
        };

        let extractor = ActorExtractor::new(layout);
        let actors = extractor.extract(ini)?;
        let spawn_points = extractor.spawn_points(ini.section(WAYPOINT_SECTION))?;

        info!(
            title = %metadata.title,
            grid_size = grid.size(),
            actors = actors.len(),
            spawns = spawn_points.len(),
            "map ingested"
        );
        Ok(MapDocument { metadata, grid, actors, spawn_points })
    }
}

/// Load a legacy map from disk. Flat-layout maps also read the sibling
/// tile file named by `options.tile_file_extension`.
pub fn load_map(path: &Path, codec: &dyn ChunkCodec, options: &ConvertOptions) -> Result<MapDocument> {
    let text = std::fs::read_to_string(path)?;
    let ini = IniFile::parse(&text);
    let builder = MapDocumentBuilder::new(options, codec);

    let layout = MapMetadata::read(&ini, options)?.layout();
    if layout == LayoutKind::Packed {
        return builder.build(&ini, None);
    }

    let tile_path = path.with_extension(&options.tile_file_extension);
    let tiles = match std::fs::read(&tile_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::MissingTileFile { path: tile_path.display().to_string() });
        }
        Err(e) => return Err(e.into()),
    };
    builder.build(&ini, Some(&tiles))
}
