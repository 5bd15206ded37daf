//! Decode a SIXEL file and print image facts.
//!
//! ```sh
//! cargo run --example decode -- image.six
//! ```

use sixel_stream::sixel_decode;
use std::{env, fs, process};

fn main() {
    let path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: decode <file.six>");
            process::exit(2);
        }
    };

    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("failed to read '{path}': {err}");
            process::exit(1);
        }
    };

    match sixel_decode(&data) {
        Ok(image) => {
            println!(
                "{path}: {}x{} pixels, {} bytes RGBA",
                image.width,
                image.height,
                image.pixels.len()
            );
        }
        Err(err) => {
            eprintln!("failed to decode '{path}': {err}");
            process::exit(1);
        }
    }
}
