//! Decoding of 8-bit RGB and RGBA PNG images into packed RGBA pixels, along with the zlib and
//! deflate layers underneath.

pub mod bits;
pub mod bmp;
pub mod bytes;
pub mod error;
pub mod filter;
pub mod huffman;
pub mod image;
pub mod inflate;
pub mod png;
pub mod zlib;

#[cfg(test)]
mod test_support;

pub use error::{Error, ErrorKind, Result};
pub use image::Image;
pub use png::{decode, decode_with_limits, DecodeLimits};
