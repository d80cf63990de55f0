use std::{
    fs,
    io::{stdout, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::ValueEnum;
use pngcore::{bmp, png, zlib, DecodeLimits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Packed RGBA bytes, row after row
    Raw,
    /// 32-bit bitmap keeping the alpha channel
    Bmp,
    /// 24-bit bitmap, alpha dropped
    Bmp24,
}

fn read(file: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(file).context(format!("reading from {}", file.display()))
}

fn write_out(output: Option<PathBuf>, bytes: &[u8]) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(&path, bytes).context(format!("writing to {}", path.display()))?;
        }
        None => {
            stdout().write_all(bytes)?;
            stdout().flush()?;
        }
    }
    Ok(())
}

pub fn info(file: &Path) -> anyhow::Result<()> {
    let bytes = read(file)?;
    let header = png::read_header(&bytes).context("reading the image header")?;
    print!("{header}");
    let chunks = png::list_chunks(&bytes).context("listing chunks")?;
    println!("Chunks:");
    for chunk in chunks {
        println!("  {} ({} bytes)", chunk.chunk_type, chunk.len);
    }
    Ok(())
}

pub fn decode(
    file: &Path,
    output: Option<PathBuf>,
    format: OutputFormat,
    max_pixels: Option<u64>,
) -> anyhow::Result<()> {
    let bytes = read(file)?;
    let mut limits = DecodeLimits::default();
    if let Some(max_pixels) = max_pixels {
        limits.max_pixels = max_pixels;
    }
    let image = png::decode_with_limits(&bytes, limits)
        .context(format!("decoding {}", file.display()))?;
    let encoded = match format {
        OutputFormat::Raw => image.into_pixels(),
        OutputFormat::Bmp => bmp::write_rgba(&image),
        OutputFormat::Bmp24 => bmp::write_rgb(&image),
    };
    write_out(output, &encoded)
}

pub fn zlib_metadata(file: &Path) -> anyhow::Result<()> {
    let bytes = read(file)?;
    let header: zlib::Header = bytes.as_slice().try_into().context("decoding read bytes")?;
    print!("{header}");
    Ok(())
}

pub fn zlib_inflate(file: &Path, capacity: usize) -> anyhow::Result<()> {
    let bytes = read(file)?;
    let inflated = zlib::inflate(&bytes, capacity).context("inflating read bytes")?;
    write_out(None, &inflated)
}
