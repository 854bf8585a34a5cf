//! Section/key-value view over a textual map document.

use indexmap::IndexMap;

/// Read access to named sections of key/value text pairs.
pub trait SectionReader {
    /// Look up a section by name. Names are matched case-insensitively.
    fn section(&self, name: &str) -> Option<&IniSection>;
}

/// One `[Name]` block. Keys keep their declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniSection {
    name: String,
    entries: IndexMap<String, String>,
}

impl IniSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), entries: IndexMap::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn value_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Insert or overwrite a key. An overwritten key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parsed INI document.
#[derive(Debug, Clone, Default)]
pub struct IniFile {
    sections: IndexMap<String, IniSection>,
}

impl IniFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text. `;` starts a comment line; lines outside any section
    /// and lines without `=` are skipped.
    pub fn parse(text: &str) -> Self {
        let mut file = Self::new();
        let mut current: Option<String> = None;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim();
                let key = name.to_ascii_lowercase();
                file.sections
                    .entry(key.clone())
                    .or_insert_with(|| IniSection::new(name));
                current = Some(key);
                continue;
            }

            let Some(section) = current.as_ref().and_then(|k| file.sections.get_mut(k)) else {
                continue;
            };
            if let Some((key, value)) = line.split_once('=') {
                section.insert(key.trim(), value.trim());
            }
        }

        file
    }

    pub fn add_section(&mut self, section: IniSection) {
        self.sections.insert(section.name.to_ascii_lowercase(), section);
    }

    pub fn sections(&self) -> impl Iterator<Item = &IniSection> {
        self.sections.values()
    }
}

impl SectionReader for IniFile {
    fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.get(&name.to_ascii_lowercase())
    }
}
