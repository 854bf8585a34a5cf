use serde::{Deserialize, Serialize};

/// Knobs for ingestion defaults and canonical output metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Schema version written as `MapFormat`.
    pub map_format: u32,
    pub author: String,
    pub description: String,
    /// Title used when `[Basic] Name` is absent.
    pub default_title: String,
    /// Theater used when `[Map] Theater` is absent.
    pub default_theater: String,
    pub theater_max_len: usize,
    /// Extension of the raw tile file that accompanies flat-layout maps.
    pub tile_file_extension: String,
    /// Maximum characters per numbered line when re-authoring packed sections.
    pub line_width: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            map_format: 1,
            author: "Westwood Studios".to_string(),
            description: String::new(),
            default_title: "(null)".to_string(),
            default_theater: "TEMPERAT".to_string(),
            theater_max_len: 8,
            tile_file_extension: "bin".to_string(),
            line_width: 70,
        }
    }
}

impl ConvertOptions {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
