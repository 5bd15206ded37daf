//! Render SIXEL graphics into PNG files.

use clap::Parser;
use sixel_stream::{sixel_decode, SixelImage};
use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::{fs, io};

/// Decode SIXEL data and write it out as a PNG image.
///
/// Reads the bytes from FILE, or from stdin when FILE is omitted or "-";
/// stdin input needs an explicit --out target.
#[derive(Parser)]
#[command(name = "sixel2png", version, about)]
struct Args {
    /// SIXEL input ("-" or omitted reads stdin)
    #[arg(value_name = "FILE")]
    source: Option<PathBuf>,

    /// Where to write the PNG (defaults to the input path with a .png
    /// extension)
    #[arg(short, long, value_name = "PNG")]
    out: Option<PathBuf>,

    /// Print the decoded dimensions instead of writing a file
    #[arg(long)]
    info: bool,

    /// No progress chatter on stderr
    #[arg(short, long)]
    quiet: bool,
}

fn write_png(image: SixelImage, target: &Path) -> Result<(), Box<dyn Error>> {
    let raster =
        image::RgbaImage::from_raw(image.width as u32, image.height as u32, image.pixels)
            .ok_or("decoded pixel buffer does not match its dimensions")?;
    raster.save(target)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    // "-" is just an explicit way of asking for stdin
    let file = args.source.filter(|path| path.as_os_str() != "-");

    let data = match &file {
        Some(path) => fs::read(path)
            .map_err(|err| format!("cannot read '{}': {err}", path.display()))?,
        None => {
            let mut bytes = Vec::new();
            io::stdin()
                .read_to_end(&mut bytes)
                .map_err(|err| format!("cannot read stdin: {err}"))?;
            bytes
        }
    };

    if !args.quiet {
        eprintln!("decoding {} SIXEL bytes", data.len());
    }

    let image = sixel_decode(&data)?;
    let (width, height) = (image.width, image.height);

    if args.info {
        println!("{width}x{height}");
        return Ok(());
    }

    let target = match (args.out, &file) {
        (Some(path), _) => path,
        (None, Some(path)) => path.with_extension("png"),
        (None, None) => return Err("--out is needed when the input comes from stdin".into()),
    };

    write_png(image, &target)?;

    if !args.quiet {
        eprintln!("wrote {width}x{height} px to '{}'", target.display());
    }

    Ok(())
}
