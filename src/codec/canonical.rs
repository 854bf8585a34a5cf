//! Canonical map document: metadata, base64 tile/resource streams and
//! line-oriented waypoint/actor lists under a single `MAP` node.
//!
//! Tile stream, one entry per cell in row-major order:
//!
//! ```text
//! u16 LE tile id
//! u8     image index (AUTO_IMAGE for sentinel tiles)
//! ```
//!
//! Resource stream, one entry per cell: `u8 resource type, u8 resource image`,
//! `(0, 0)` for cells without an overlay.

use std::fmt::Write as _;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{debug, info};

use super::overlay::ResourceTable;
use super::{BinaryReader, BinaryWriter};
use crate::config::ConvertOptions;
use crate::error::{Error, Result, Stage};
use crate::map::{ActorRecord, Grid, LayoutKind, MapDocument, MapMetadata, TileRecord};

/// Image byte written for sentinel tiles: "pick an image for me".
pub const AUTO_IMAGE: u8 = 0xFF;

const ROOT_NODE: &str = "MAP";

/// Flattened canonical representation, ready to render as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapData {
    pub map_format: u32,
    pub title: String,
    pub description: String,
    pub author: String,
    pub players: usize,
    pub tileset: String,
    pub bounds: [i32; 4],
    pub size: (i32, i32),
    pub tile_data: String,
    pub resource_data: String,
    pub waypoints: Vec<String>,
    pub actors: Vec<String>,
}

fn encode_tiles(grid: &Grid) -> Vec<u8> {
    let mut writer = BinaryWriter::with_capacity(grid.cell_count() * 3);
    for (_, _, cell) in grid.iter() {
        writer.write_u16_le(cell.tile_id);
        let image = if LayoutKind::Packed.is_sentinel(cell.tile_id) {
            AUTO_IMAGE
        } else {
            cell.image_index
        };
        writer.write_u8(image);
    }
    writer.into_vec()
}

fn encode_resources(grid: &Grid, table: &ResourceTable) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter::with_capacity(grid.cell_count() * 2);
    for (x, y, cell) in grid.iter() {
        let (kind, image) = match cell.overlay.as_deref() {
            None => (0, 0),
            Some(name) => table.resource_for(name).ok_or_else(|| Error::UnmappedOverlay {
                name: name.to_string(),
                x,
                y,
            })?,
        };
        writer.write_u8(kind);
        writer.write_u8(image);
    }
    Ok(writer.into_vec())
}

impl MapData {
    pub fn from_document(doc: &MapDocument, options: &ConvertOptions) -> Result<Self> {
        Self::from_document_with(doc, options, &ResourceTable::default())
    }

    pub fn from_document_with(
        doc: &MapDocument,
        options: &ConvertOptions,
        resources: &ResourceTable,
    ) -> Result<Self> {
        let grid = doc.grid();
        let tiles = encode_tiles(grid);
        let resource_bytes = encode_resources(grid, resources)?;

        let waypoints = doc
            .spawn_points()
            .iter()
            .enumerate()
            .map(|(i, (x, y))| format!("spawn{i}={x}|{y}"))
            .collect();
        let actors = doc
            .actors()
            .iter()
            .enumerate()
            .map(|(i, a)| format!("actor{i}={}|{}|{}", a.type_name, a.location.0, a.location.1))
            .collect();

        debug!(tiles = tiles.len(), resources = resource_bytes.len(), "encoded map streams");
        Ok(Self {
            map_format: options.map_format,
            title: doc.title().to_string(),
            description: options.description.clone(),
            author: options.author.clone(),
            players: doc.spawn_points().len(),
            tileset: doc.theater().to_string(),
            bounds: doc.bounds(),
            size: (grid.size(), grid.size()),
            tile_data: STANDARD.encode(&tiles),
            resource_data: STANDARD.encode(&resource_bytes),
            waypoints,
            actors,
        })
    }

    /// Render as the indented `MAP:` node.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let [bx, by, bw, bh] = self.bounds;
        let _ = writeln!(out, "{ROOT_NODE}:");
        let _ = writeln!(out, "\tMapFormat: {}", self.map_format);
        let _ = writeln!(out, "\tTitle: {}", self.title);
        let _ = writeln!(out, "\tDescription: {}", self.description);
        let _ = writeln!(out, "\tAuthor: {}", self.author);
        let _ = writeln!(out, "\tPlayers: {}", self.players);
        let _ = writeln!(out, "\tTileset: {}", self.tileset);
        let _ = writeln!(out, "\tBounds: {bx},{by},{bw},{bh}");
        let _ = writeln!(out, "\tSize: {},{}", self.size.0, self.size.1);
        let _ = writeln!(out, "\tTileData: {}", self.tile_data);
        let _ = writeln!(out, "\tResourceData: {}", self.resource_data);
        let _ = writeln!(out, "\tWaypoints:");
        for line in &self.waypoints {
            let _ = writeln!(out, "\t\t{line}");
        }
        let _ = writeln!(out, "\tActors:");
        for line in &self.actors {
            let _ = writeln!(out, "\t\t{line}");
        }
        out
    }

    /// Parse text produced by [`MapData::to_text`].
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        match lines.next() {
            Some(first) if first.trim_end() == format!("{ROOT_NODE}:") => {}
            other => return Err(malformed(format!("expected `{ROOT_NODE}:` node, found {other:?}"))),
        }

        let mut fields: Vec<(&str, &str)> = Vec::new();
        let mut waypoints = Vec::new();
        let mut actors = Vec::new();
        let mut list: Option<&str> = None;

        for line in lines {
            if let Some(child) = line.strip_prefix("\t\t") {
                match list {
                    Some("Waypoints") => waypoints.push(child.trim().to_string()),
                    Some("Actors") => actors.push(child.trim().to_string()),
                    _ => return Err(malformed(format!("unexpected list entry {child:?}"))),
                }
                continue;
            }
            let field = line
                .strip_prefix('\t')
                .ok_or_else(|| malformed(format!("unindented line {line:?}")))?;
            let (key, value) = field
                .split_once(':')
                .ok_or_else(|| malformed(format!("expected `Key: value`, found {field:?}")))?;
            let (key, value) = (key.trim(), value.trim());
            if value.is_empty() && (key == "Waypoints" || key == "Actors") {
                list = Some(key);
            } else {
                list = None;
                fields.push((key, value));
            }
        }

        let get = |key: &str| field(&fields, key);

        let bounds = parse_ints(get("Bounds")?, "Bounds", 4)?;
        let size = parse_ints(get("Size")?, "Size", 2)?;
        Ok(Self {
            map_format: parse_field(get("MapFormat")?, "MapFormat")?,
            title: get("Title")?.to_string(),
            description: get("Description").unwrap_or_default().to_string(),
            author: get("Author").unwrap_or_default().to_string(),
            players: parse_field(get("Players")?, "Players")?,
            tileset: get("Tileset")?.to_string(),
            bounds: [bounds[0], bounds[1], bounds[2], bounds[3]],
            size: (size[0], size[1]),
            tile_data: get("TileData")?.to_string(),
            resource_data: get("ResourceData")?.to_string(),
            waypoints,
            actors,
        })
    }

    /// Rebuild a [`MapDocument`] from canonical data.
    pub fn to_document(&self) -> Result<MapDocument> {
        self.to_document_with(&ResourceTable::default())
    }

    pub fn to_document_with(&self, resources: &ResourceTable) -> Result<MapDocument> {
        if self.size.0 != self.size.1 {
            return Err(malformed(format!("non-square size {:?}", self.size)));
        }
        let layout = LayoutKind::from_grid_size(self.size.0)?;
        let mut grid = Grid::new(layout);

        let tiles = decode_base64(&self.tile_data, "TileData")?;
        let resource_bytes = decode_base64(&self.resource_data, "ResourceData")?;
        let mut tile_reader = BinaryReader::new(&tiles, Stage::CanonicalParse);
        let mut resource_reader = BinaryReader::new(&resource_bytes, Stage::CanonicalParse);
        tile_reader.require(grid.cell_count() * 3)?;
        resource_reader.require(grid.cell_count() * 2)?;

        for (x, y, cell) in grid.cells_mut() {
            let tile_id = tile_reader.read_u16_le()?;
            let image_index = tile_reader.read_u8()?;
            let kind = resource_reader.read_u8()?;
            let image = resource_reader.read_u8()?;
            let overlay = if kind == 0 {
                None
            } else {
                let name = resources.overlay_for(kind, image).ok_or_else(|| {
                    malformed(format!("unknown resource ({kind}, {image}) at ({x}, {y})"))
                })?;
                Some(name.to_string())
            };
            *cell = TileRecord { tile_id, image_index, overlay };
        }
        grid.normalize_sentinel_images();

        let spawn_points = self
            .waypoints
            .iter()
            .map(|line| parse_entry(line, "spawn").and_then(|f| location(&f, 0, line)))
            .collect::<Result<Vec<_>>>()?;
        let actors = self
            .actors
            .iter()
            .map(|line| {
                let f = parse_entry(line, "actor")?;
                if f.len() != 3 {
                    return Err(malformed(format!("actor line {line:?}")));
                }
                Ok(ActorRecord::new(f[0], location(&f, 1, line)?, None))
            })
            .collect::<Result<Vec<_>>>()?;

        let [x_offset, y_offset, width, height] = self.bounds;
        let metadata = MapMetadata {
            title: self.title.clone(),
            theater: self.tileset.clone(),
            format_version: 0,
            x_offset,
            y_offset,
            width,
            height,
        };
        Ok(MapDocument::new(metadata, grid, actors, spawn_points))
    }
}

fn malformed(message: String) -> Error {
    Error::MalformedCanonical(message)
}

fn field<'a>(fields: &[(&str, &'a str)], key: &str) -> Result<&'a str> {
    fields
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .ok_or_else(|| malformed(format!("missing field {key}")))
}

fn decode_base64(text: &str, field: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text.as_bytes())
        .map_err(|e| malformed(format!("{field}: {e}")))
}

fn parse_field<T: std::str::FromStr>(value: &str, field: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| malformed(format!("{field}: {value:?}")))
}

fn parse_ints(value: &str, field: &str, count: usize) -> Result<Vec<i32>> {
    let ints = value
        .split(',')
        .map(|v| parse_field(v, field))
        .collect::<Result<Vec<i32>>>()?;
    if ints.len() != count {
        return Err(malformed(format!("{field}: expected {count} values, found {value:?}")));
    }
    Ok(ints)
}

/// Split `"<prefix><k>=a|b|c"` into its `|`-separated fields.
fn parse_entry<'a>(line: &'a str, prefix: &str) -> Result<Vec<&'a str>> {
    let (key, value) = line
        .split_once('=')
        .filter(|(k, _)| k.starts_with(prefix))
        .ok_or_else(|| malformed(format!("expected {prefix}<n>=..., found {line:?}")))?;
    parse_field::<usize>(&key[prefix.len()..], prefix)?;
    Ok(value.split('|').collect())
}

fn location(fields: &[&str], start: usize, line: &str) -> Result<(i32, i32)> {
    match fields.get(start..start + 2) {
        Some([x, y]) => Ok((parse_field(x, line)?, parse_field(y, line)?)),
        _ => Err(malformed(format!("missing coordinates in {line:?}"))),
    }
}

/// Serialize `doc` and write it to `path`.
pub fn save_map(doc: &MapDocument, path: &Path, options: &ConvertOptions) -> Result<()> {
    let data = MapData::from_document(doc, options)?;
    std::fs::write(path, data.to_text())?;
    info!(path = %path.display(), title = %data.title, "map saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::chunk::testing::StoredCodec;
    use crate::codec::write_packed_section;
    use crate::ini::IniFile;
    use crate::map::MapDocumentBuilder;

    fn flat_document() -> MapDocument {
        let ini = IniFile::parse(
            "[Basic]\nName=Nod 3\n[Map]\nTheater=WINTER\nX=1\nY=2\nWidth=30\nHeight=20\n\
             [OVERLAY]\n70=GOLD04\n71=GEM01\n\
             [UNITS]\n0=Nod,LTNK,256,200,0,Guard,None\n\
             [TERRAIN]\n300=T05,None\n\
             [Waypoints]\n1=140\n0=70\n",
        );
        let mut tiles = vec![0u8; 64 * 64 * 2];
        tiles[0] = 0x05;
        tiles[1] = 0x02;
        tiles[2] = 0xFF;
        tiles[3] = 0x44;
        let options = ConvertOptions::default();
        MapDocumentBuilder::new(&options, &StoredCodec).build(&ini, Some(&tiles)).unwrap()
    }

    #[test]
    fn test_flat_document_streams() {
        let data = MapData::from_document(&flat_document(), &ConvertOptions::default()).unwrap();

        assert_eq!(data.size, (64, 64));
        assert_eq!(data.bounds, [1, 2, 30, 20]);
        assert_eq!(data.players, 2);
        assert_eq!(data.author, "Westwood Studios");

        let tiles = STANDARD.decode(&data.tile_data).unwrap();
        assert_eq!(tiles.len(), 64 * 64 * 3);
        assert_eq!(&tiles[..6], &[0x05, 0x00, 0x02, 0xFF, 0x00, AUTO_IMAGE]);

        let resources = STANDARD.decode(&data.resource_data).unwrap();
        assert_eq!(resources.len(), 64 * 64 * 2);
        assert_eq!(&resources[140..144], &[1, 3, 2, 0]);
        assert_eq!(&resources[..2], &[0, 0]);

        assert_eq!(data.waypoints, vec!["spawn0=6|1", "spawn1=12|2"]);
        assert_eq!(data.actors, vec!["actor0=ltnk|8|3", "actor1=T05|44|4"]);
    }

    #[test]
    fn test_text_layout() {
        let data = MapData::from_document(&flat_document(), &ConvertOptions::default()).unwrap();
        let text = data.to_text();

        assert!(text.starts_with("MAP:\n\tMapFormat: 1\n\tTitle: Nod 3\n"));
        assert!(text.contains("\tBounds: 1,2,30,20\n"));
        assert!(text.contains("\tWaypoints:\n\t\tspawn0=6|1\n\t\tspawn1=12|2\n"));
        assert!(text.ends_with("\tActors:\n\t\tactor0=ltnk|8|3\n\t\tactor1=T05|44|4\n"));
    }

    #[test]
    fn test_flat_round_trip() {
        let doc = flat_document();
        let options = ConvertOptions::default();
        let text = MapData::from_document(&doc, &options).unwrap().to_text();

        let parsed = MapData::parse(&text).unwrap();
        let reread = parsed.to_document().unwrap();

        assert_eq!(reread.grid(), doc.grid());
        assert_eq!(reread.spawn_points(), doc.spawn_points());
        assert_eq!(reread.bounds(), doc.bounds());
        assert_eq!(reread.title(), doc.title());
        let strip = |a: &[ActorRecord]| -> Vec<(String, (i32, i32))> {
            a.iter().map(|a| (a.type_name.clone(), a.location)).collect()
        };
        assert_eq!(strip(reread.actors()), strip(doc.actors()));

        // A second pass is byte-stable.
        assert_eq!(MapData::from_document(&reread, &options).unwrap().to_text(), text);
    }

    #[test]
    fn test_packed_round_trip() {
        let n = 128 * 128;
        let mut tiles = vec![0u8; n * 3];
        for i in 0..n {
            tiles[2 * i] = (i % 7) as u8;
            tiles[2 * n + i] = (i % 5) as u8;
        }
        // Cell (3, 0): 16-bit sentinel. Cell (4, 0): 8-bit sentinel.
        tiles[6] = 0xFF;
        tiles[7] = 0xFF;
        tiles[8] = 0xFF;
        tiles[9] = 0x00;
        let mut overlays = vec![0xFFu8; n];
        overlays[129] = 12;

        let mut ini = IniFile::parse("[Basic]\nNewINIFormat=3\n[Map]\nWidth=10\nHeight=10\n");
        ini.add_section(write_packed_section("MapPack", &tiles, &StoredCodec, 70).unwrap());
        ini.add_section(write_packed_section("OverlayPack", &overlays, &StoredCodec, 70).unwrap());
        let options = ConvertOptions::default();
        let doc = MapDocumentBuilder::new(&options, &StoredCodec).build(&ini, None).unwrap();
        assert_eq!(doc.grid().get(3, 0).unwrap().image_index, 3);
        assert_eq!(doc.grid().get(4, 0).unwrap().image_index, 0);

        let text = MapData::from_document(&doc, &options).unwrap().to_text();
        let reread = MapData::parse(&text).unwrap().to_document().unwrap();

        assert_eq!(reread.layout(), LayoutKind::Packed);
        assert_eq!(reread.grid(), doc.grid());
        assert_eq!(reread.grid().get(1, 1).unwrap().overlay.as_deref(), Some("gem04"));
    }

    #[test]
    fn test_hand_edited_sentinel_normalizes_on_write() {
        let mut grid = Grid::new(LayoutKind::Flat);
        *grid.get_mut(2, 3).unwrap() = TileRecord { tile_id: 0xFF, image_index: 42, overlay: None };
        let metadata = MapMetadata {
            title: "Edited".into(),
            theater: "DESERT".into(),
            format_version: 0,
            x_offset: 0,
            y_offset: 0,
            width: 64,
            height: 64,
        };
        let doc = MapDocument::new(metadata, grid, Vec::new(), Vec::new());

        let data = MapData::from_document(&doc, &ConvertOptions::default()).unwrap();
        let tiles = STANDARD.decode(&data.tile_data).unwrap();
        assert_eq!(tiles[(3 * 64 + 2) * 3 + 2], AUTO_IMAGE);

        let reread = data.to_document().unwrap();
        assert_eq!(reread.grid().get(2, 3).unwrap().image_index, 2 + 3 * 4);
    }

    #[test]
    fn test_wall_overlay_cannot_serialize() {
        let ini = IniFile::parse("[Basic]\n[Map]\n[OVERLAY]\n5=BRIK\n");
        let tiles = vec![0u8; 64 * 64 * 2];
        let options = ConvertOptions::default();
        let doc = MapDocumentBuilder::new(&options, &StoredCodec).build(&ini, Some(&tiles)).unwrap();

        let err = MapData::from_document(&doc, &options).unwrap_err();
        assert_eq!(err.stage(), Stage::Serialization);
        assert!(matches!(err, Error::UnmappedOverlay { ref name, x: 5, y: 0 } if name == "brik"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(MapData::parse("").is_err());
        assert!(MapData::parse("Map:\n\tTitle: x\n").is_err());

        let err = MapData::parse("MAP:\n\tMapFormat: 1\n\tTitle: x\n").unwrap_err();
        assert_eq!(err.stage(), Stage::CanonicalParse);
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn test_save_map_writes_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nod3.yaml");
        let doc = flat_document();

        save_map(&doc, &path, &ConvertOptions::default()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let reread = MapData::parse(&text).unwrap().to_document().unwrap();
        assert_eq!(reread.grid(), doc.grid());
    }
}
