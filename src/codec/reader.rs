use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result, Stage};

/// Little-endian cursor over a borrowed byte stream.
///
/// Every read that runs past the end reports [`Error::StreamTruncated`]
/// tagged with the stage the reader was created for.
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
    stage: Stage,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8], stage: Stage) -> Self {
        Self { data, pos: 0, stage }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Fail up front if fewer than `n` bytes remain.
    pub fn require(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(Error::StreamTruncated {
                stage: self.stage,
                need: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.require(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.require(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_remaining(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }
}
