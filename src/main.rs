use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;

mod commands;

use commands::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "pngcore")]
#[command(version)]
#[command(about = "Decode 8-bit RGB and RGBA PNG images and inspect zlib streams")]
struct Args {
    /// Log more details to stderr (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the image header and the list of chunks
    Info { file: PathBuf },
    /// Decode an image into RGBA pixels
    Decode {
        file: PathBuf,
        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Raw)]
        format: OutputFormat,
        /// Refuse images with more pixels than this
        #[arg(long)]
        max_pixels: Option<u64>,
    },
    /// Print the header fields of a zlib stream
    ZlibMetadata { file: PathBuf },
    /// Inflate a zlib stream to stdout
    ZlibInflate {
        file: PathBuf,
        /// Size of the output buffer in bytes
        #[arg(long, default_value_t = 16 * 1024 * 1024)]
        capacity: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Info { file } => commands::info(&file),
        Command::Decode {
            file,
            output,
            format,
            max_pixels,
        } => commands::decode(&file, output, format, max_pixels),
        Command::ZlibMetadata { file } => commands::zlib_metadata(&file),
        Command::ZlibInflate { file, capacity } => commands::zlib_inflate(&file, capacity),
    }
}
