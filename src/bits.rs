use crate::error::{Error, Result};

/// LSB-first bit cursor over a deflate stream.
pub struct BitReader<'a> {
    bytes: &'a [u8],
    byte_cursor: usize,
    bit_buffer: u32,
    bit_count: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            byte_cursor: 0,
            bit_buffer: 0,
            bit_count: 0,
        }
    }

    /// Buffers whole input bytes until at least `n` bits are available or the input runs out.
    fn refill(&mut self, n: u32) {
        while self.bit_count < n {
            let Some(&byte) = self.bytes.get(self.byte_cursor) else {
                return;
            };
            self.byte_cursor += 1;
            self.bit_buffer |= (byte as u32) << self.bit_count;
            self.bit_count += 8;
        }
    }

    fn mask(n: u32) -> u32 {
        (1u32 << n) - 1
    }

    /// Returns the next `n` bits (at most 16) without consuming them.
    pub fn peek(&mut self, n: u32) -> Result<u32> {
        debug_assert!(n <= 16);
        self.refill(n);
        if self.bit_count < n {
            return Err(Error::EndOfStream);
        }
        Ok(self.bit_buffer & Self::mask(n))
    }

    /// Like [`Self::peek`] but pads with zeros past the end of input, also returning how many
    /// of the bits are real.
    pub fn peek_padded(&mut self, n: u32) -> (u32, u32) {
        self.refill(n);
        (self.bit_buffer & Self::mask(n), self.bit_count.min(n))
    }

    /// Discards `n` bits that have already been buffered by a peek.
    pub fn consume(&mut self, n: u32) -> Result<()> {
        if self.bit_count < n {
            return Err(Error::EndOfStream);
        }
        self.bit_buffer >>= n;
        self.bit_count -= n;
        Ok(())
    }

    pub fn bits(&mut self, n: u32) -> Result<u32> {
        let value = self.peek(n)?;
        self.consume(n)?;
        Ok(value)
    }

    pub fn align_to_byte(&mut self) {
        let partial = self.bit_count % 8;
        self.bit_buffer >>= partial;
        self.bit_count -= partial;
    }

    /// Copies `dst.len()` raw bytes; the bit buffer must be empty.
    pub fn copy_aligned(&mut self, dst: &mut [u8]) -> Result<()> {
        if self.bit_count != 0 {
            return Err(Error::Unaligned);
        }
        let src = self
            .bytes
            .get(self.byte_cursor..)
            .and_then(|rest| rest.get(..dst.len()))
            .ok_or(Error::EndOfStream)?;
        dst.copy_from_slice(src);
        self.byte_cursor += dst.len();
        Ok(())
    }

    /// Bytes of input not yet buffered.
    pub fn remaining_bytes(&self) -> usize {
        self.bytes.len() - self.byte_cursor
    }
}
