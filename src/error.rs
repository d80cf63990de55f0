use std::collections::TryReserveError;

use thiserror::Error;

/// Broad family a decode failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The chunked container itself is malformed or unsupported.
    Container,
    /// The compressed payload inside the data chunks is malformed.
    Stream,
    /// Inflation succeeded but the scanlines could not be rebuilt.
    Reconstruction,
    /// A scratch or output buffer could not be allocated.
    Resource,
}

#[derive(Error, Debug)]
pub enum Error {
    // Container
    #[error("invalid signature")]
    BadSignature,
    #[error("truncated input: needed {needed} bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },
    #[error("header chunk must be the first chunk")]
    HeaderPosition,
    #[error("header chunk must be 13 bytes long, got {0}")]
    HeaderLength(u32),
    #[error("unsupported {field}: {value}")]
    UnsupportedOption { field: &'static str, value: u8 },
    #[error("unsupported color type: {0}")]
    UnsupportedColorType(u8),
    #[error("end chunk reached before any header chunk")]
    MissingHeader,
    #[error("accumulated data chunks exceed the input size")]
    DataOverflow,
    #[error("end chunk must be empty, got length {0}")]
    EndChunkLength(u32),
    #[error("{0} trailing bytes after the end chunk")]
    TrailingData(usize),
    #[error("unknown mandatory chunk: {}", String::from_utf8_lossy(.0))]
    UnknownChunk([u8; 4]),
    #[error("input ended before the end chunk")]
    MissingEnd,
    #[error("image of {width}x{height} pixels is too large")]
    ImageTooLarge { width: u32, height: u32 },

    // Compressed stream
    #[error("unsupported compression method: {0}")]
    CompressionMethod(u8),
    #[error("corrupt stream: invalid CMF, FLG, or both")]
    HeaderCheck,
    #[error("preset dictionaries are not supported")]
    PresetDictionary,
    #[error("unexpected end of compressed stream")]
    EndOfStream,
    #[error("invalid block type: {0}")]
    BlockType(u32),
    #[error("stored block length {len:#06x} does not match its complement {nlen:#06x}")]
    StoredLength { len: u16, nlen: u16 },
    #[error("stored block is not byte aligned")]
    Unaligned,
    #[error("code length {0} exceeds the maximum of 15")]
    CodeTooLong(u8),
    #[error("bit pattern does not map to any symbol")]
    InvalidCode,
    #[error("invalid {alphabet} symbol: {symbol}")]
    InvalidSymbol { alphabet: &'static str, symbol: u16 },
    #[error("code length repeat with no previous length")]
    DanglingRepeat,
    #[error("code lengths overflow the declared count of {0}")]
    CodeLengthOverflow(usize),
    #[error("no code for the end-of-block symbol")]
    MissingEndOfBlock,
    #[error("back-reference distance {distance} reaches before the start of the output at {position}")]
    DistanceTooFar { distance: usize, position: usize },
    #[error("output exceeds its capacity of {0} bytes")]
    OutputOverflow(usize),

    // Reconstruction
    #[error("unknown filter type {filter} on scanline {row}")]
    UnknownFilter { row: usize, filter: u8 },
    #[error("decompressed {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    // Resource
    #[error("allocation failed: {0}")]
    Allocation(#[from] TryReserveError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadSignature
            | Error::Truncated { .. }
            | Error::HeaderPosition
            | Error::HeaderLength(_)
            | Error::UnsupportedOption { .. }
            | Error::UnsupportedColorType(_)
            | Error::MissingHeader
            | Error::DataOverflow
            | Error::EndChunkLength(_)
            | Error::TrailingData(_)
            | Error::UnknownChunk(_)
            | Error::MissingEnd
            | Error::ImageTooLarge { .. } => ErrorKind::Container,
            Error::CompressionMethod(_)
            | Error::HeaderCheck
            | Error::PresetDictionary
            | Error::EndOfStream
            | Error::BlockType(_)
            | Error::StoredLength { .. }
            | Error::Unaligned
            | Error::CodeTooLong(_)
            | Error::InvalidCode
            | Error::InvalidSymbol { .. }
            | Error::DanglingRepeat
            | Error::CodeLengthOverflow(_)
            | Error::MissingEndOfBlock
            | Error::DistanceTooFar { .. }
            | Error::OutputOverflow(_) => ErrorKind::Stream,
            Error::UnknownFilter { .. } | Error::SizeMismatch { .. } => ErrorKind::Reconstruction,
            Error::Allocation(_) => ErrorKind::Resource,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Allocates a zeroed buffer of `len` bytes, reporting failure instead of aborting.
pub(crate) fn zeroed_buffer(len: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len)?;
    buffer.resize(len, 0);
    Ok(buffer)
}
