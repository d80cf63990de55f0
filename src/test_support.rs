//! Fixture builders for the decoder tests: a bit writer, deflate block encoders and a chunk
//! writer.

use crate::inflate::{
    fixed_literal_lengths, DISTANCE_BASE, DISTANCE_EXTRA_BITS, LENGTH_BASE, LENGTH_EXTRA_BITS,
};

pub struct BitWriter {
    bytes: Vec<u8>,
    bit_buffer: u64,
    bit_count: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            bytes: vec![],
            bit_buffer: 0,
            bit_count: 0,
        }
    }

    /// Writes the low `n` bits of `value`, least significant first.
    pub fn write_bits(&mut self, value: u32, n: u32) {
        self.bit_buffer |= ((value as u64) & ((1 << n) - 1)) << self.bit_count;
        self.bit_count += n;
        while self.bit_count >= 8 {
            self.bytes.push(self.bit_buffer as u8);
            self.bit_buffer >>= 8;
            self.bit_count -= 8;
        }
    }

    /// Writes a Huffman code, most significant bit first.
    pub fn write_code(&mut self, code: u16, length: u8) {
        for shift in (0..length).rev() {
            self.write_bits(((code >> shift) & 1) as u32, 1);
        }
    }

    pub fn align(&mut self) {
        if self.bit_count > 0 {
            self.write_bits(0, 8 - self.bit_count);
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.align();
        self.bytes.extend_from_slice(bytes);
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.align();
        self.bytes
    }
}

/// `(code, length)` per symbol of the canonical code described by `lengths`.
pub fn canonical_codes(lengths: &[u8]) -> Vec<(u16, u8)> {
    let max = lengths.iter().copied().max().unwrap_or(0) as usize;
    let mut counts = vec![0u16; max + 1];
    for &length in lengths.iter().filter(|&&length| length > 0) {
        counts[length as usize] += 1;
    }
    let mut next = vec![0u16; max + 1];
    let mut code = 0u16;
    for length in 1..=max {
        code = (code + counts[length - 1]) << 1;
        next[length] = code;
    }
    lengths
        .iter()
        .map(|&length| {
            if length == 0 {
                return (0, 0);
            }
            let code = next[length as usize];
            next[length as usize] += 1;
            (code, length)
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub enum Token {
    Literal(u8),
    Match { length: usize, distance: usize },
}

fn base_index(bases: &[u16], value: usize) -> usize {
    bases
        .iter()
        .rposition(|&base| base as usize <= value)
        .expect("value below the smallest base")
}

fn write_tokens(
    writer: &mut BitWriter,
    literal_codes: &[(u16, u8)],
    distance_codes: &[(u16, u8)],
    tokens: &[Token],
) {
    for token in tokens {
        match *token {
            Token::Literal(byte) => {
                let (code, length) = literal_codes[byte as usize];
                writer.write_code(code, length);
            }
            Token::Match { length, distance } => {
                let index = base_index(&LENGTH_BASE, length);
                let (code, code_length) = literal_codes[257 + index];
                writer.write_code(code, code_length);
                writer.write_bits(
                    (length - LENGTH_BASE[index] as usize) as u32,
                    LENGTH_EXTRA_BITS[index] as u32,
                );
                let index = base_index(&DISTANCE_BASE, distance);
                let (code, code_length) = distance_codes[index];
                writer.write_code(code, code_length);
                writer.write_bits(
                    (distance - DISTANCE_BASE[index] as usize) as u32,
                    DISTANCE_EXTRA_BITS[index] as u32,
                );
            }
        }
    }
    let (code, length) = literal_codes[256];
    writer.write_code(code, length);
}

pub fn stored_block(writer: &mut BitWriter, data: &[u8], is_final: bool) {
    writer.write_bits(is_final as u32, 1);
    writer.write_bits(0, 2);
    let len = data.len() as u16;
    writer.write_bytes(&len.to_le_bytes());
    writer.write_bytes(&(!len).to_le_bytes());
    writer.write_bytes(data);
}

pub fn fixed_block(writer: &mut BitWriter, tokens: &[Token], is_final: bool) {
    writer.write_bits(is_final as u32, 1);
    writer.write_bits(1, 2);
    write_tokens(
        writer,
        &canonical_codes(&fixed_literal_lengths()),
        &canonical_codes(&[5; 32]),
        tokens,
    );
}

/// Run-length encodes code lengths into `(symbol, extra bits value)` pairs.
pub fn code_length_ops(lengths: &[u8]) -> Vec<(u16, u32)> {
    let mut ops = vec![];
    let mut i = 0;
    while i < lengths.len() {
        let length = lengths[i];
        let run = lengths[i..].iter().take_while(|&&l| l == length).count();
        if length == 0 && run >= 3 {
            let run = run.min(138);
            if run >= 11 {
                ops.push((18, (run - 11) as u32));
            } else {
                ops.push((17, (run - 3) as u32));
            }
            i += run;
        } else {
            ops.push((length as u16, 0));
            i += 1;
            let mut repeats = run - 1;
            while repeats >= 3 {
                let chunk = repeats.min(6);
                ops.push((16, (chunk - 3) as u32));
                repeats -= chunk;
                i += chunk;
            }
        }
    }
    ops
}

/// Writes HLIT, HDIST, HCLEN, a code length code giving all 19 symbols 5 bits, then `ops`.
pub fn write_code_lengths(
    writer: &mut BitWriter,
    literal_count: usize,
    distance_count: usize,
    ops: &[(u16, u32)],
) {
    writer.write_bits((literal_count - 257) as u32, 5);
    writer.write_bits((distance_count - 1) as u32, 5);
    writer.write_bits(19 - 4, 4);
    for _ in 0..19 {
        writer.write_bits(5, 3);
    }
    let codes = canonical_codes(&[5; 19]);
    for &(symbol, extra) in ops {
        let (code, length) = codes[symbol as usize];
        writer.write_code(code, length);
        match symbol {
            16 => writer.write_bits(extra, 2),
            17 => writer.write_bits(extra, 3),
            18 => writer.write_bits(extra, 7),
            _ => {}
        }
    }
}

pub fn dynamic_block(
    writer: &mut BitWriter,
    literal_lengths: &[u8],
    distance_lengths: &[u8],
    tokens: &[Token],
    is_final: bool,
) {
    writer.write_bits(is_final as u32, 1);
    writer.write_bits(2, 2);
    let all: Vec<u8> = literal_lengths
        .iter()
        .chain(distance_lengths)
        .copied()
        .collect();
    write_code_lengths(
        writer,
        literal_lengths.len(),
        distance_lengths.len(),
        &code_length_ops(&all),
    );
    write_tokens(
        writer,
        &canonical_codes(literal_lengths),
        &canonical_codes(distance_lengths),
        tokens,
    );
}

fn adler32(bytes: &[u8]) -> u32 {
    let (mut a, mut b) = (1u32, 0u32);
    for &byte in bytes {
        a = (a + byte as u32) % 65521;
        b = (b + a) % 65521;
    }
    (b << 16) | a
}

/// Wraps raw deflate blocks in a zlib header and Adler-32 trailer of `inflated`.
pub fn zlib_wrap(deflate: &[u8], inflated: &[u8]) -> Vec<u8> {
    let mut stream = vec![0x78, 0x01];
    stream.extend_from_slice(deflate);
    stream.extend_from_slice(&adler32(inflated).to_be_bytes());
    stream
}

/// A zlib stream holding `data` in stored blocks of at most `block_size` bytes.
pub fn zlib_stored(data: &[u8], block_size: usize) -> Vec<u8> {
    let mut writer = BitWriter::new();
    let blocks: Vec<&[u8]> = if data.is_empty() {
        vec![data]
    } else {
        data.chunks(block_size).collect()
    };
    for (i, block) in blocks.iter().enumerate() {
        stored_block(&mut writer, block, i + 1 == blocks.len());
    }
    zlib_wrap(&writer.finish(), data)
}

pub fn header_chunk(
    width: u32,
    height: u32,
    bit_depth: u8,
    color_type: u8,
    interlace: u8,
) -> Vec<u8> {
    let mut data = vec![];
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[bit_depth, color_type, 0, 0, interlace]);
    data
}

/// Signature followed by the given chunks, each with a zero checksum.
pub fn container(chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    for (chunk_type, data) in chunks {
        bytes.extend_from_slice(&(data.len() as u32).to_be_bytes());
        bytes.extend_from_slice(*chunk_type);
        bytes.extend_from_slice(data);
        bytes.extend_from_slice(&[0; 4]);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_length_ops() {
        let mut lengths = vec![0u8; 20];
        lengths.extend([3; 8]);
        lengths.extend([0, 0, 0, 0, 7, 7]);
        assert_eq!(
            vec![(18, 9), (3, 0), (16, 3), (3, 0), (17, 1), (7, 0), (7, 0)],
            code_length_ops(&lengths)
        );
    }

    #[test]
    fn adler() {
        assert_eq!(0x11e60398, adler32(b"Wikipedia"));
    }
}
