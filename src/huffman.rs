use crate::{
    bits::BitReader,
    error::{Error, Result},
};

pub const MAX_CODE_LENGTH: u32 = 15;
const TABLE_SIZE: usize = 1 << MAX_CODE_LENGTH;
const SYMBOL_MASK: u16 = 0xfff;

/// Flat decode table for a canonical Huffman code.
///
/// Indexed by the next 15 stream bits, each entry packs `(length << 12) | symbol`. Every
/// 15-bit pattern whose low `length` bits spell a symbol's (bit-reversed) code holds that
/// symbol, so a single lookup resolves any code. A zero entry marks a pattern no code covers.
pub struct HuffmanTable {
    entries: Vec<u16>,
}

impl HuffmanTable {
    /// Builds the table from per-symbol code lengths, 0 meaning the symbol is unused.
    pub fn from_lengths(lengths: &[u8]) -> Result<Self> {
        debug_assert!(lengths.len() <= SYMBOL_MASK as usize);
        let mut length_counts = [0u16; MAX_CODE_LENGTH as usize + 1];
        for &length in lengths {
            if length as u32 > MAX_CODE_LENGTH {
                return Err(Error::CodeTooLong(length));
            }
            length_counts[length as usize] += 1;
        }
        length_counts[0] = 0;

        let mut next_code = [0u32; MAX_CODE_LENGTH as usize + 1];
        let mut code = 0u32;
        for length in 1..=MAX_CODE_LENGTH as usize {
            code = (code + length_counts[length - 1] as u32) << 1;
            next_code[length] = code;
        }

        let mut entries = Vec::new();
        entries.try_reserve_exact(TABLE_SIZE)?;
        entries.resize(TABLE_SIZE, 0);

        for (symbol, &length) in lengths.iter().enumerate() {
            if length == 0 {
                continue;
            }
            let length = length as u32;
            let code = next_code[length as usize];
            next_code[length as usize] += 1;

            let reversed = (code as u16).reverse_bits() >> (16 - length);
            let entry = ((length as u16) << 12) | symbol as u16;
            for prefix in 0..1usize << (MAX_CODE_LENGTH - length) {
                entries[(prefix << length) | reversed as usize] = entry;
            }
        }

        Ok(Self { entries })
    }

    /// Resolves and consumes the next symbol in the stream.
    pub fn decode_symbol(&self, reader: &mut BitReader) -> Result<u16> {
        let (bits, available) = reader.peek_padded(MAX_CODE_LENGTH);
        let entry = self.entries[bits as usize];
        let length = (entry >> 12) as u32;
        if length == 0 {
            return Err(if available < MAX_CODE_LENGTH {
                Error::EndOfStream
            } else {
                Error::InvalidCode
            });
        }
        if length > available {
            return Err(Error::EndOfStream);
        }
        reader.consume(length)?;
        Ok(entry & SYMBOL_MASK)
    }
}
