use std::fmt::Display;

use tracing::{debug, trace};

use crate::{
    bytes::BytesBuffer,
    error::{Error, Result},
    filter,
    image::Image,
    zlib,
};

/// The 8-byte signature read as two little-endian words.
const SIGNATURE: [u32; 2] = [0x474e5089, 0x0a1a0a0d];
const HEADER_CHUNK_LEN: u32 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkType(pub [u8; 4]);

impl ChunkType {
    pub const HEADER: Self = Self(*b"IHDR");
    pub const DATA: Self = Self(*b"IDAT");
    pub const END: Self = Self(*b"IEND");

    /// Chunks whose type starts with an uppercase letter must be understood by the decoder.
    pub fn is_mandatory(&self) -> bool {
        self.0[0].is_ascii_uppercase()
    }
}

impl Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub chunk_type: ChunkType,
    pub len: u32,
}

/// Walks the chunks following the signature. The caller decides what to do with each payload
/// and must consume the trailing checksum before asking for the next chunk.
pub struct ChunkReader<'a> {
    bytes: BytesBuffer<'a>,
}

impl<'a> ChunkReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let mut bytes = BytesBuffer::new(bytes);
        for expected in SIGNATURE {
            if bytes.pop_word_le()? != expected {
                return Err(Error::BadSignature);
            }
        }
        Ok(Self { bytes })
    }

    pub fn remaining(&self) -> usize {
        self.bytes.remaining()
    }

    /// Reads the length and type of the next chunk, or `None` once the input is exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<ChunkHeader>> {
        if self.bytes.remaining() == 0 {
            return Ok(None);
        }
        let len = self.bytes.pop_word_be()?;
        let chunk_type = ChunkType(self.bytes.pop_word_le()?.to_le_bytes());
        Ok(Some(ChunkHeader { chunk_type, len }))
    }

    pub fn payload(&mut self, len: u32) -> Result<&'a [u8]> {
        self.bytes.pop_bytes(len as usize)
    }

    pub fn copy_payload(&mut self, dst: &mut Vec<u8>, len: u32) -> Result<()> {
        self.bytes.copy_into(dst, len as usize)
    }

    pub fn skip_payload(&mut self, len: u32) -> Result<()> {
        self.bytes.skip(len as usize)
    }

    /// Consumes the checksum ending every chunk. It is returned as-is, never verified.
    pub fn checksum(&mut self) -> Result<u32> {
        self.bytes.pop_word_be()
    }
}

/// Lists every chunk of a file without interpreting any of them.
pub fn list_chunks(data: &[u8]) -> Result<Vec<ChunkHeader>> {
    let mut reader = ChunkReader::new(data)?;
    let mut chunks = vec![];
    while let Some(chunk) = reader.next_chunk()? {
        reader.skip_payload(chunk.len)?;
        reader.checksum()?;
        chunks.push(chunk);
    }
    Ok(chunks)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    Rgb,
    Rgba,
}

impl ColorType {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ColorType::Rgb => 3,
            ColorType::Rgba => 4,
        }
    }
}

impl TryFrom<u8> for ColorType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            2 => Ok(Self::Rgb),
            6 => Ok(Self::Rgba),
            byte => Err(Error::UnsupportedColorType(byte)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub color_type: ColorType,
}

impl ImageHeader {
    /// Size of the inflated payload: one filter type byte plus the raw bytes of every scanline.
    pub fn filtered_len(&self) -> Result<usize> {
        let too_large = || Error::ImageTooLarge {
            width: self.width,
            height: self.height,
        };
        (self.width as usize)
            .checked_mul(self.color_type.bytes_per_pixel())
            .and_then(|row| row.checked_add(1))
            .and_then(|stride| stride.checked_mul(self.height as usize))
            .ok_or_else(too_large)
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl Display for ImageHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Width: {}", self.width)?;
        writeln!(f, "Height: {}", self.height)?;
        writeln!(f, "Bit depth: 8")?;
        writeln!(f, "Color type: {:?}", self.color_type)?;
        writeln!(f, "Interlace: none")
    }
}

impl TryFrom<&[u8]> for ImageHeader {
    type Error = Error;

    fn try_from(data: &[u8]) -> Result<Self> {
        if data.len() != HEADER_CHUNK_LEN as usize {
            return Err(Error::HeaderLength(data.len() as u32));
        }
        let mut bytes = BytesBuffer::new(data);
        let width = bytes.pop_word_be()?;
        let height = bytes.pop_word_be()?;
        let bit_depth = bytes.pop_byte()?;
        let color_type = bytes.pop_byte()?;
        let options = [
            ("bit depth", bit_depth, 8),
            ("compression method", bytes.pop_byte()?, 0),
            ("filter method", bytes.pop_byte()?, 0),
            ("interlace method", bytes.pop_byte()?, 0),
        ];
        for (field, value, supported) in options {
            if value != supported {
                return Err(Error::UnsupportedOption { field, value });
            }
        }
        Ok(Self {
            width,
            height,
            color_type: color_type.try_into()?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    /// Largest `width * height` accepted before any buffer is sized from the header.
    pub max_pixels: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_pixels: 1 << 28,
        }
    }
}

impl DecodeLimits {
    fn check(&self, header: &ImageHeader) -> Result<()> {
        if header.pixel_count() > self.max_pixels {
            return Err(Error::ImageTooLarge {
                width: header.width,
                height: header.height,
            });
        }
        Ok(())
    }
}

/// Parses a header chunk payload, rejecting a wrong declared length before reading any of it.
fn parse_header(reader: &mut ChunkReader, len: u32) -> Result<ImageHeader> {
    if len != HEADER_CHUNK_LEN {
        return Err(Error::HeaderLength(len));
    }
    ImageHeader::try_from(reader.payload(len)?)
}

/// Reads the signature and the leading header chunk only.
pub fn read_header(data: &[u8]) -> Result<ImageHeader> {
    let mut reader = ChunkReader::new(data)?;
    match reader.next_chunk()? {
        Some(ChunkHeader {
            chunk_type: ChunkType::HEADER,
            len,
        }) => parse_header(&mut reader, len),
        _ => Err(Error::MissingHeader),
    }
}

pub fn decode(data: &[u8]) -> Result<Image> {
    decode_with_limits(data, DecodeLimits::default())
}

pub fn decode_with_limits(data: &[u8], limits: DecodeLimits) -> Result<Image> {
    let mut reader = ChunkReader::new(data)?;
    let mut header = None;
    let mut compressed: Vec<u8> = vec![];
    let mut first_chunk = true;

    while let Some(ChunkHeader { chunk_type, len }) = reader.next_chunk()? {
        debug!(%chunk_type, len, "chunk");
        match chunk_type {
            ChunkType::HEADER => {
                if !first_chunk {
                    return Err(Error::HeaderPosition);
                }
                let parsed = parse_header(&mut reader, len)?;
                limits.check(&parsed)?;
                header = Some(parsed);
            }
            ChunkType::DATA => {
                if compressed.len() + len as usize > data.len() {
                    return Err(Error::DataOverflow);
                }
                reader.copy_payload(&mut compressed, len)?;
            }
            ChunkType::END => {
                if len != 0 {
                    return Err(Error::EndChunkLength(len));
                }
                reader.checksum()?;
                if reader.remaining() != 0 {
                    return Err(Error::TrailingData(reader.remaining()));
                }
                let header = header.ok_or(Error::MissingHeader)?;
                return reconstruct(&header, &compressed);
            }
            chunk_type if chunk_type.is_mandatory() => {
                return Err(Error::UnknownChunk(chunk_type.0));
            }
            chunk_type => {
                trace!(%chunk_type, "skipping ancillary chunk");
                reader.skip_payload(len)?;
            }
        }
        reader.checksum()?;
        first_chunk = false;
    }
    Err(Error::MissingEnd)
}

fn reconstruct(header: &ImageHeader, compressed: &[u8]) -> Result<Image> {
    let bpp = header.color_type.bytes_per_pixel();
    let (width, height) = (header.width as usize, header.height as usize);
    let mut filtered = zlib::inflate_exact(compressed, header.filtered_len()?)?;
    filter::unfilter(&mut filtered, width * bpp, height, bpp)?;
    let pixels = filter::expand_to_rgba(&filtered, width, height, bpp)?;
    debug!(width = header.width, height = header.height, "decoded image");
    Ok(Image::new(header.width, header.height, pixels))
}
