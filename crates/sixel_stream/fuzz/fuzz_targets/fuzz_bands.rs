#![no_main]

use libfuzzer_sys::fuzz_target;
use sixel_stream::{Action, Band, BandDecoder, DecodeHandler, MAX_WIDTH};

struct Check;

impl DecodeHandler for Check {
    fn handle_band(&mut self, band: Band<'_>) -> Action {
        // grow mode caps at MAX_WIDTH - 4, truncate mode at the raster
        // width, which clamps to MAX_WIDTH
        assert!(band.width() <= MAX_WIDTH);
        Action::Continue
    }
}

fuzz_target!(|input: (u8, Vec<u8>)| {
    // Chunked band decoding must never panic and must keep width bounds,
    // for any chunk size and any byte stream
    let (split, data) = input;
    let mut decoder = BandDecoder::new();
    decoder.init(0xFFFFFFFF, 0xFF000000, 256, split & 1 == 0);
    let mut check = Check;
    let step = usize::from(split >> 1).max(1);
    for piece in data.chunks(step) {
        decoder.decode_bytes(piece, &mut check);
    }
    assert!(decoder.current_width() <= MAX_WIDTH);
});
