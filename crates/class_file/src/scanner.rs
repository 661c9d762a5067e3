use byteorder::{BigEndian, ByteOrder};

use crate::{ClassFileError, Result};

type Endian = BigEndian;

/// Reads big-endian values out of an in-memory buffer, typically an attribute
/// payload. Unlike [`crate::Parser`] the position is explicit and every read
/// is bounded by the buffer.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(Endian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(Endian::read_u32(self.take(4)?))
    }

    /// Borrows the next `len` bytes straight out of the buffer.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Reads `count` items with `f`, which is handed this scanner each time.
    pub fn seq<T>(
        &mut self,
        count: usize,
        mut f: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        // Each item takes at least a byte, so a count larger than what is left
        // is bound to fail; don't reserve for it.
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            items.push(f(self)?);
        }
        Ok(items)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(ClassFileError::BufferUnderrun {
                offset: self.pos,
                requested: len,
                available: self.remaining(),
            });
        }

        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }
}
