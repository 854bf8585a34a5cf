use tracing::debug;

use super::grid::{cell_from_index, LayoutKind};
use crate::error::{Error, Result, Stage};
use crate::ini::{IniSection, SectionReader};

/// Sections holding owned actors, in extraction order.
pub const ACTOR_SECTIONS: [&str; 3] = ["STRUCTURES", "UNITS", "INFANTRY"];

pub const TERRAIN_SECTION: &str = "TERRAIN";
pub const WAYPOINT_SECTION: &str = "Waypoints";

/// Waypoint slots below this number are player spawns.
pub const MAX_SPAWN_SLOTS: i32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorRecord {
    pub type_name: String,
    pub location: (i32, i32),
    pub owner: Option<String>,
}

impl ActorRecord {
    pub fn new(type_name: impl Into<String>, location: (i32, i32), owner: Option<String>) -> Self {
        Self { type_name: type_name.into(), location, owner }
    }
}

fn parse_index(stage: Stage, section: &IniSection, key: &str, value: &str, field: &str) -> Result<i32> {
    field
        .trim()
        .parse()
        .map_err(|_| Error::malformed_entry(stage, section, key, value))
}

/// Parses actor and waypoint sections against a fixed grid size.
#[derive(Debug, Clone, Copy)]
pub struct ActorExtractor {
    layout: LayoutKind,
    grid_size: i32,
}

impl ActorExtractor {
    pub fn new(layout: LayoutKind) -> Self {
        Self { layout, grid_size: layout.grid_size() }
    }

    /// Entries of `owner,type,health,location,facing,...`; trailing fields
    /// are ignored. Type names are lowercased.
    pub fn owned_actors(&self, section: &IniSection) -> Result<Vec<ActorRecord>> {
        let mut actors = Vec::with_capacity(section.len());
        for (key, value) in section.iter() {
            let fields: Vec<&str> = value.split(',').collect();
            if fields.len() < 4 {
                return Err(Error::malformed_entry(Stage::ActorExtraction, section, key, value));
            }
            let index = parse_index(Stage::ActorExtraction, section, key, value, fields[3])?;
            actors.push(ActorRecord::new(
                fields[1].trim().to_lowercase(),
                cell_from_index(index, self.grid_size),
                Some(fields[0].trim().to_string()),
            ));
        }
        Ok(actors)
    }

    /// Terrain entries are keyed by linear cell index. Packed maps store the
    /// bare type name; flat maps store a list whose first field is the type.
    pub fn terrain(&self, section: &IniSection) -> Result<Vec<ActorRecord>> {
        let mut actors = Vec::with_capacity(section.len());
        for (key, value) in section.iter() {
            let index = parse_index(Stage::ActorExtraction, section, key, value, key)?;
            let type_name = match self.layout {
                LayoutKind::Packed => value.trim(),
                LayoutKind::Flat => value.split(',').next().unwrap_or_default().trim(),
            };
            actors.push(ActorRecord::new(type_name, cell_from_index(index, self.grid_size), None));
        }
        Ok(actors)
    }

    /// Structures, units, infantry, then terrain. Absent sections contribute
    /// nothing.
    pub fn extract(&self, ini: &dyn SectionReader) -> Result<Vec<ActorRecord>> {
        let mut actors = Vec::new();
        for name in ACTOR_SECTIONS {
            match ini.section(name) {
                Some(section) => actors.extend(self.owned_actors(section)?),
                None => debug!(section = name, "section absent"),
            }
        }
        match ini.section(TERRAIN_SECTION) {
            Some(section) => actors.extend(self.terrain(section)?),
            None => debug!(section = TERRAIN_SECTION, "section absent"),
        }
        debug!(actors = actors.len(), "extracted actors");
        Ok(actors)
    }

    /// Spawn points from `[Waypoints]`: entries with a positive cell index
    /// and a slot below [`MAX_SPAWN_SLOTS`], ordered by slot.
    pub fn spawn_points(&self, section: Option<&IniSection>) -> Result<Vec<(i32, i32)>> {
        let Some(section) = section else {
            debug!(section = WAYPOINT_SECTION, "section absent");
            return Ok(Vec::new());
        };

        let mut slots = Vec::new();
        for (key, value) in section.iter() {
            let slot = parse_index(Stage::ActorExtraction, section, key, value, key)?;
            let index = parse_index(Stage::ActorExtraction, section, key, value, value)?;
            if index > 0 && slot < MAX_SPAWN_SLOTS {
                slots.push((slot, cell_from_index(index, self.grid_size)));
            }
        }
        slots.sort_by_key(|&(slot, _)| slot);
        Ok(slots.into_iter().map(|(_, cell)| cell).collect())
    }
}
