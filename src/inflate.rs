//! Deflate (RFC 1951) block decoding into a fixed-capacity output buffer.

use tracing::debug;

use crate::{
    bits::BitReader,
    error::{zeroed_buffer, Error, Result},
    huffman::HuffmanTable,
};

const END_OF_BLOCK: u16 = 256;
const FIXED_LITERAL_COUNT: usize = 288;
const FIXED_DISTANCE_COUNT: usize = 32;
const CODE_LENGTH_COUNT: usize = 19;

/// Order in which the code length code lengths are stored.
const CODE_LENGTH_ORDER: [usize; CODE_LENGTH_COUNT] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

pub(crate) const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115,
    131, 163, 195, 227, 258,
];

pub(crate) const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

pub(crate) const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

pub(crate) const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockType {
    Stored,
    FixedHuffman,
    DynamicHuffman,
}

impl TryFrom<u32> for BlockType {
    type Error = Error;

    fn try_from(bits: u32) -> Result<Self> {
        match bits {
            0 => Ok(Self::Stored),
            1 => Ok(Self::FixedHuffman),
            2 => Ok(Self::DynamicHuffman),
            bits => Err(Error::BlockType(bits)),
        }
    }
}

pub(crate) fn fixed_literal_lengths() -> [u8; FIXED_LITERAL_COUNT] {
    let mut lengths = [8; FIXED_LITERAL_COUNT];
    lengths[144..256].fill(9);
    lengths[256..280].fill(7);
    lengths
}

fn fixed_tables() -> Result<(HuffmanTable, HuffmanTable)> {
    Ok((
        HuffmanTable::from_lengths(&fixed_literal_lengths())?,
        HuffmanTable::from_lengths(&[5; FIXED_DISTANCE_COUNT])?,
    ))
}

/// Reads the code length alphabet of a dynamic block and expands it into the literal/length
/// and distance tables.
fn dynamic_tables(reader: &mut BitReader) -> Result<(HuffmanTable, HuffmanTable)> {
    let literal_count = reader.bits(5)? as usize + 257;
    let distance_count = reader.bits(5)? as usize + 1;
    let code_length_count = reader.bits(4)? as usize + 4;

    let mut code_length_lengths = [0u8; CODE_LENGTH_COUNT];
    for &symbol in &CODE_LENGTH_ORDER[..code_length_count] {
        code_length_lengths[symbol] = reader.bits(3)? as u8;
    }
    let code_length_table = HuffmanTable::from_lengths(&code_length_lengths)?;

    let total = literal_count + distance_count;
    let mut lengths: Vec<u8> = Vec::with_capacity(total);
    while lengths.len() < total {
        let symbol = code_length_table.decode_symbol(reader)?;
        let (length, repeat) = match symbol {
            0..=15 => (symbol as u8, 1),
            16 => (
                *lengths.last().ok_or(Error::DanglingRepeat)?,
                3 + reader.bits(2)? as usize,
            ),
            17 => (0, 3 + reader.bits(3)? as usize),
            18 => (0, 11 + reader.bits(7)? as usize),
            symbol => {
                return Err(Error::InvalidSymbol {
                    alphabet: "code length",
                    symbol,
                })
            }
        };
        if lengths.len() + repeat > total {
            return Err(Error::CodeLengthOverflow(total));
        }
        lengths.resize(lengths.len() + repeat, length);
    }

    if lengths[END_OF_BLOCK as usize] == 0 {
        return Err(Error::MissingEndOfBlock);
    }
    debug!(literal_count, distance_count, "read dynamic tables");

    let (literal_lengths, distance_lengths) = lengths.split_at(literal_count);
    Ok((
        HuffmanTable::from_lengths(literal_lengths)?,
        HuffmanTable::from_lengths(distance_lengths)?,
    ))
}

/// Pre-sized inflation sink; back-references read from bytes already written to it.
pub struct OutputBuffer {
    bytes: Vec<u8>,
    position: usize,
}

impl OutputBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            bytes: zeroed_buffer(capacity)?,
            position: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn push(&mut self, byte: u8) -> Result<()> {
        let capacity = self.capacity();
        let slot = self
            .bytes
            .get_mut(self.position)
            .ok_or(Error::OutputOverflow(capacity))?;
        *slot = byte;
        self.position += 1;
        Ok(())
    }

    /// Copies `length` bytes starting `distance` bytes back, one byte at a time so that a copy
    /// overlapping its own output repeats the pattern.
    fn copy_back(&mut self, distance: usize, length: usize) -> Result<()> {
        if distance > self.position {
            return Err(Error::DistanceTooFar {
                distance,
                position: self.position,
            });
        }
        if self.position + length > self.capacity() {
            return Err(Error::OutputOverflow(self.capacity()));
        }
        for _ in 0..length {
            self.bytes[self.position] = self.bytes[self.position - distance];
            self.position += 1;
        }
        Ok(())
    }

    fn stored_block(&mut self, reader: &mut BitReader) -> Result<()> {
        reader.align_to_byte();
        let len = reader.bits(16)? as u16;
        let nlen = reader.bits(16)? as u16;
        if len ^ nlen != 0xffff {
            return Err(Error::StoredLength { len, nlen });
        }
        let end = self.position + len as usize;
        if end > self.capacity() {
            return Err(Error::OutputOverflow(self.capacity()));
        }
        reader.copy_aligned(&mut self.bytes[self.position..end])?;
        self.position = end;
        Ok(())
    }

    fn huffman_block(
        &mut self,
        reader: &mut BitReader,
        literals: &HuffmanTable,
        distances: &HuffmanTable,
    ) -> Result<()> {
        loop {
            let symbol = literals.decode_symbol(reader)?;
            if symbol < END_OF_BLOCK {
                self.push(symbol as u8)?;
                continue;
            }
            if symbol == END_OF_BLOCK {
                return Ok(());
            }

            let index = (symbol - 257) as usize;
            let (Some(&base), Some(&extra_bits)) =
                (LENGTH_BASE.get(index), LENGTH_EXTRA_BITS.get(index))
            else {
                return Err(Error::InvalidSymbol {
                    alphabet: "length",
                    symbol,
                });
            };
            let length = base as usize + reader.bits(extra_bits as u32)? as usize;

            let symbol = distances.decode_symbol(reader)?;
            let index = symbol as usize;
            let (Some(&base), Some(&extra_bits)) =
                (DISTANCE_BASE.get(index), DISTANCE_EXTRA_BITS.get(index))
            else {
                return Err(Error::InvalidSymbol {
                    alphabet: "distance",
                    symbol,
                });
            };
            let distance = base as usize + reader.bits(extra_bits as u32)? as usize;

            self.copy_back(distance, length)?;
        }
    }

    /// Returns the written prefix of the buffer.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.bytes.truncate(self.position);
        self.bytes
    }
}

/// Inflates every block up to and including the final one into a buffer of `capacity` bytes.
pub fn inflate(reader: &mut BitReader, capacity: usize) -> Result<Vec<u8>> {
    let mut output = OutputBuffer::with_capacity(capacity)?;
    loop {
        let is_final = reader.bits(1)? == 1;
        let block_type: BlockType = reader.bits(2)?.try_into()?;
        let start = output.position();
        match block_type {
            BlockType::Stored => output.stored_block(reader)?,
            BlockType::FixedHuffman => {
                let (literals, distances) = fixed_tables()?;
                output.huffman_block(reader, &literals, &distances)?;
            }
            BlockType::DynamicHuffman => {
                let (literals, distances) = dynamic_tables(reader)?;
                output.huffman_block(reader, &literals, &distances)?;
            }
        }
        debug!(
            ?block_type,
            is_final,
            bytes = output.position() - start,
            "inflated block"
        );
        if is_final {
            break;
        }
    }
    Ok(output.into_bytes())
}
