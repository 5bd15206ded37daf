//! Stream a SIXEL file band by band without assembling an image.
//!
//! ```sh
//! cargo run --example bands -- image.six
//! ```

use sixel_stream::{Action, Band, BandDecoder, DecodeHandler};
use std::{env, fs, process};

struct Report {
    index: usize,
}

impl DecodeHandler for Report {
    fn handle_band(&mut self, band: Band<'_>) -> Action {
        let painted: usize = band
            .rows()
            .map(|row| row.iter().filter(|px| *px >> 24 == 0xFF).count())
            .sum();
        println!(
            "band {:3}: {} columns, {painted} opaque pixels",
            self.index,
            band.width()
        );
        self.index += 1;
        Action::Continue
    }
}

// The band decoder expects a bare payload; cut away a DCS envelope if the
// file carries one.
fn strip_envelope(data: &[u8]) -> &[u8] {
    let mut payload = data;
    if let Some(pos) = payload.windows(2).position(|w| w == b"\x1bP") {
        if let Some(q) = payload[pos..].iter().position(|&b| b == b'q') {
            payload = &payload[pos + q + 1..];
        }
    }
    if payload.ends_with(b"\x1b\\") {
        payload = &payload[..payload.len() - 2];
    }
    payload
}

fn main() {
    let path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: bands <file.six>");
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

    let mut decoder = BandDecoder::new();
    let mut report = Report { index: 0 };
    decoder.decode_bytes(strip_envelope(&data), &mut report);

    let pending = decoder.current_width();
    if pending > 0 {
        println!("pending band: {pending} columns");
    }
}
