use std::fmt::Display;

use tracing::{debug, trace};

use crate::{
    bits::BitReader,
    error::{Error, Result},
    inflate,
};

const DEFLATE: u8 = 8;
const PRESET_DICTIONARY_FLAG: u8 = 1 << 5;
const LEVEL_NAMES: [&str; 4] = ["fastest", "fast", "default", "maximum"];

/// The CMF and FLG bytes opening a zlib stream (RFC 1950).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    cmf: u8,
    flg: u8,
}

impl Header {
    pub const LEN: usize = 2;

    /// LZ77 window announced by CINFO, never checked against the distances actually used.
    pub fn window_size(&self) -> usize {
        1 << (8 + (self.cmf >> 4) as u32)
    }

    /// FLEVEL, from 0 (fastest) to 3 (maximum compression).
    pub fn level(&self) -> u8 {
        self.flg >> 6
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Method: deflate")?;
        writeln!(f, "Window size: {} bytes", self.window_size())?;
        writeln!(f, "Preset dictionary: no")?;
        writeln!(
            f,
            "Level: {} ({})",
            self.level(),
            LEVEL_NAMES[self.level() as usize]
        )?;
        writeln!(f, "Check bits: 0b{:05b}", self.flg & 0x1f)
    }
}

impl TryFrom<&[u8]> for Header {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let &[cmf, flg, ..] = bytes else {
            return Err(Error::EndOfStream);
        };
        if cmf & 0xf != DEFLATE {
            return Err(Error::CompressionMethod(cmf & 0xf));
        }
        if u16::from_be_bytes([cmf, flg]) % 31 != 0 {
            return Err(Error::HeaderCheck);
        }
        if flg & PRESET_DICTIONARY_FLAG != 0 {
            return Err(Error::PresetDictionary);
        }
        Ok(Self { cmf, flg })
    }
}

/// Inflates a zlib stream into at most `capacity` bytes. Any Adler-32 trailer is left unread.
pub fn inflate(bytes: &[u8], capacity: usize) -> Result<Vec<u8>> {
    let header = Header::try_from(bytes)?;
    debug!(
        window_size = header.window_size(),
        level = header.level(),
        "inflating zlib stream"
    );
    let mut reader = BitReader::new(&bytes[Header::LEN..]);
    let inflated = inflate::inflate(&mut reader, capacity)?;
    trace!(unread = reader.remaining_bytes(), "skipping zlib trailer");
    Ok(inflated)
}

/// Like [`inflate`], but the stream must produce exactly `expected_len` bytes.
pub fn inflate_exact(bytes: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let inflated = inflate(bytes, expected_len)?;
    if inflated.len() != expected_len {
        return Err(Error::SizeMismatch {
            expected: expected_len,
            actual: inflated.len(),
        });
    }
    Ok(inflated)
}
