use crate::error::{Error, Result};

/// Cursor over an in-memory buffer used for the container framing.
///
/// A failed read leaves the cursor where it was; callers abort the parse on the first error.
pub struct BytesBuffer<'a> {
    bytes: &'a [u8],
    byte_cursor: usize,
}

impl<'a> BytesBuffer<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            byte_cursor: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.byte_cursor
    }

    pub fn pop_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        let bytes = self
            .bytes
            .get(self.byte_cursor..)
            .and_then(|rest| rest.get(..n))
            .ok_or(Error::Truncated {
                needed: n,
                remaining,
            })?;
        self.byte_cursor += n;
        Ok(bytes)
    }

    pub fn pop_byte(&mut self) -> Result<u8> {
        Ok(self.pop_bytes(1)?[0])
    }

    fn pop_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0; N];
        array.copy_from_slice(self.pop_bytes(N)?);
        Ok(array)
    }

    pub fn pop_word_le(&mut self) -> Result<u32> {
        self.pop_array().map(u32::from_le_bytes)
    }

    pub fn pop_word_be(&mut self) -> Result<u32> {
        self.pop_array().map(u32::from_be_bytes)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.pop_bytes(n).map(|_| ())
    }

    pub fn copy_into(&mut self, dst: &mut Vec<u8>, n: usize) -> Result<()> {
        let bytes = self.pop_bytes(n)?;
        dst.try_reserve(n)?;
        dst.extend_from_slice(bytes);
        Ok(())
    }
}
