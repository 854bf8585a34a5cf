use byteorder::{LittleEndian, WriteBytesExt};

/// Growable little-endian byte sink used for the canonical tile and
/// resource streams and for framing re-authored packed sections.
pub struct BinaryWriter {
    data: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: Vec::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    // Writes into a Vec<u8> cannot fail.
    pub fn write_u16_le(&mut self, v: u16) {
        let _ = self.data.write_u16::<LittleEndian>(v);
    }

    pub fn write_u32_le(&mut self, v: u32) {
        let _ = self.data.write_u32::<LittleEndian>(v);
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BinaryWriter> for Vec<u8> {
    fn from(writer: BinaryWriter) -> Self {
        writer.into_vec()
    }
}
