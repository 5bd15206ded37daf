use sixel_stream::*;

/// Band collector for driving the core directly.
#[derive(Default)]
struct Collect {
    bands: Vec<(usize, Vec<u32>)>,
}

impl DecodeHandler for Collect {
    fn handle_band(&mut self, band: Band<'_>) -> Action {
        let mut px = Vec::with_capacity(band.width() * 6);
        for row in band.rows() {
            px.extend_from_slice(row);
        }
        self.bands.push((band.width(), px));
        Action::Continue
    }
}

fn column(px: &[u32], width: usize, col: usize) -> [u32; 6] {
    let mut out = [0; 6];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = px[i * width + col];
    }
    out
}

const FILL: u32 = 0xFF000000;
const RED: u32 = 0xFFFF0000; // blue-channel red per the little-endian layout
const GREEN: u32 = 0xFF00FF00;

/// Decoder seeded like the reference scenarios: black fill, register 1 and 2
/// preset.
fn scenario_decoder(truncate: bool) -> BandDecoder {
    let mut dec = BandDecoder::new();
    dec.init(DEFAULT_FOREGROUND, FILL, PALETTE_SIZE, truncate);
    dec.palette_mut()[1] = RED;
    dec.palette_mut()[2] = GREEN;
    dec
}

#[test]
fn select_and_paint_single_column() {
    let mut dec = scenario_decoder(true);
    let mut sink = Collect::default();
    dec.decode_bytes(b"#1~-", &mut sink);

    let (width, px) = &sink.bands[0];
    assert_eq!(*width, 1);
    assert_eq!(column(px, 1, 0), [RED; 6]);
}

#[test]
fn compressed_run_paints_four_columns() {
    let mut dec = scenario_decoder(true);
    let mut sink = Collect::default();
    dec.decode_bytes(b"#1!4~-", &mut sink);

    let (width, px) = &sink.bands[0];
    assert_eq!(*width, 4);
    for col in 0..4 {
        assert_eq!(column(px, 4, col), [RED; 6], "column {col}");
    }
}

#[test]
fn empty_sixels_advance_but_keep_fill() {
    let mut dec = scenario_decoder(true);
    let mut sink = Collect::default();
    dec.decode_bytes(b"#1??~??-", &mut sink);

    let (width, px) = &sink.bands[0];
    assert_eq!(*width, 5);
    for col in [0, 1, 3, 4] {
        assert_eq!(column(px, 5, col), [FILL; 6], "column {col}");
    }
    assert_eq!(column(px, 5, 2), [RED; 6]);
}

#[test]
fn carriage_return_overlay_keeps_other_rows() {
    let mut dec = scenario_decoder(true);
    let mut sink = Collect::default();
    dec.decode_bytes(b"#1~$#2@-", &mut sink);

    let (width, px) = &sink.bands[0];
    assert_eq!(*width, 1);
    assert_eq!(column(px, 1, 0), [GREEN, RED, RED, RED, RED, RED]);
}

#[test]
fn truncating_raster_stream_uses_initial_color() {
    let mut dec = BandDecoder::new();
    dec.init(0xFFAABBCC, FILL, PALETTE_SIZE, true);
    let mut sink = Collect::default();
    dec.decode_bytes(b"\"1;1;3;6!3~-", &mut sink);

    assert_eq!(dec.mode(), ParseMode::Truncate);
    assert_eq!(dec.level(), Level::Two);
    assert_eq!(dec.image_size(), Some((3, 6)));
    let (width, px) = &sink.bands[0];
    assert_eq!(*width, 3);
    for col in 0..3 {
        assert_eq!(column(px, 3, col), [0xFFAABBCC; 6], "column {col}");
    }
}

#[test]
fn rgb_definition_lands_little_endian() {
    let mut dec = scenario_decoder(true);
    let mut sink = Collect::default();
    dec.decode_bytes(b"#1;2;100;0;0~", &mut sink);

    assert_eq!(dec.palette()[1], 0xFF0000FF);
    dec.decode_bytes(b"#1~-", &mut sink);
    assert_eq!(column(&sink.bands[0].1, 2, 0), [0xFF0000FF; 6]);
}

#[test]
fn chunk_splits_do_not_change_output() {
    // digits, runs, color definitions and band breaks crossing every
    // possible split point
    let data: &[u8] = b"\"1;1;40;12#1;2;100;50;0!10~#2!5N??@$#1;1;120;50;100!3B-#2!40F~-";

    let decode_split = |at: usize| {
        let mut dec = BandDecoder::new();
        let mut sink = Collect::default();
        dec.decode_bytes(&data[..at], &mut sink);
        dec.decode_bytes(&data[at..], &mut sink);
        let pending: Vec<Vec<u32>> = dec.current_band().rows().map(|row| row.to_vec()).collect();
        (sink.bands, dec.current_width(), pending)
    };

    let reference = decode_split(0);
    for at in 1..data.len() {
        assert_eq!(decode_split(at), reference, "split at {at}");
    }
}

#[test]
fn reinit_reproduces_identical_bands() {
    let data = b"#1;2;0;100;0!7~??~-#1!3B-";
    let mut dec = BandDecoder::new();

    let mut first = Collect::default();
    dec.init(DEFAULT_FOREGROUND, FILL, 64, true);
    dec.decode_bytes(data, &mut first);

    let mut second = Collect::default();
    dec.init(DEFAULT_FOREGROUND, FILL, 64, true);
    dec.init(DEFAULT_FOREGROUND, FILL, 64, true);
    dec.decode_bytes(data, &mut second);

    assert_eq!(first.bands, second.bands);
}

#[test]
fn invariants_hold_for_arbitrary_input() {
    let streams: [&[u8]; 6] = [
        b"",
        b"\"9999999999;0;1;1~~~",
        b"#;;;~!~$-\"",
        b"!999999999999~",
        b"#1;2;100;100;100;100;100;100;100;100~",
        b"\x00\x7f\x1b~-",
    ];
    for data in streams {
        let mut dec = BandDecoder::new();
        let mut sink = Collect::default();
        dec.decode_bytes(data, &mut sink);
        assert!(dec.current_width() <= MAX_WIDTH);
        for color in dec.palette() {
            assert_eq!(color >> 24, 0xFF, "palette alpha in {data:?}");
        }
    }
}

// ---------------------------------------------------------------------------
// image layer, full DCS sequences
// ---------------------------------------------------------------------------

#[test]
fn decode_with_repeat() {
    let image = sixel_decode(b"\x1bPq#0!5~\x1b\\").unwrap();
    assert_eq!(image.width, 5, "width should follow the repeat count");
    assert_eq!(image.height, 6);
}

#[test]
fn decode_carriage_return() {
    let image = sixel_decode(b"\x1bPq#0~~$~~\x1b\\").unwrap();
    assert_eq!(image.width, 2);
    assert_eq!(image.height, 6);
}

#[test]
fn decode_newline() {
    let image = sixel_decode(b"\x1bPq#0~~-~~\x1b\\").unwrap();
    assert_eq!(image.width, 2);
    assert_eq!(image.height, 12);
}

#[test]
fn decode_rgb_color() {
    let image = sixel_decode(b"\x1bPq#0;2;100;50;0#0~\x1b\\").unwrap();
    let (r, g, b, a) = (
        image.pixels[0],
        image.pixels[1],
        image.pixels[2],
        image.pixels[3],
    );
    assert_eq!(r, 255);
    assert_eq!(g, 128);
    assert_eq!(b, 0);
    assert_eq!(a, 255);
}

#[test]
fn decode_color_redefinition() {
    let sixel_data = b"\x1bPq\
        #0;2;100;0;0~$-\
        #0;2;0;100;0~$-\
        #0;2;0;0;100~\
        \x1b\\";

    let image = sixel_decode(sixel_data).unwrap();
    assert_eq!(image.width, 1);
    assert_eq!(image.height, 18);

    let row = |y: usize| &image.pixels[y * 4..y * 4 + 4];
    assert_eq!(row(0), &[255, 0, 0, 255]);
    assert_eq!(row(6), &[0, 255, 0, 255]);
    assert_eq!(row(12), &[0, 0, 255, 255]);
}

#[test]
fn decode_all_sixel_chars() {
    let sixel_data =
        b"\x1bPq#0?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~\x1b\\";
    let image = sixel_decode(sixel_data).unwrap();
    assert_eq!(image.width, 64, "one column per sixel char");
    assert_eq!(image.height, 6);
}

#[test]
fn decode_palette_bounds() {
    let image = sixel_decode(b"\x1bPq#255;2;50;50;50#255~~\x1b\\").unwrap();
    assert_eq!(image.width, 2);
    assert_eq!(&image.pixels[..4], &[128, 128, 128, 255]);

    // registers wrap modulo the palette length
    let wrapped = sixel_decode(b"\x1bPq#300;2;50;50;50#44~~\x1b\\").unwrap();
    assert_eq!(&wrapped.pixels[..4], &[128, 128, 128, 255]);
}

#[test]
fn decode_raster_attributes_size_image() {
    let image = sixel_decode(b"\x1bPq\"1;1;10;20#0~\x1b\\").unwrap();
    assert_eq!(image.width, 10);
    assert_eq!(image.height, 20);
}

#[test]
fn decode_truncates_past_raster_width() {
    let with_excess = sixel_decode(b"\x1bPq\"1;1;4;6#0!64~\x1b\\").unwrap();
    let exact = sixel_decode(b"\x1bPq\"1;1;4;6#0!4~\x1b\\").unwrap();
    assert_eq!(with_excess.width, 4);
    assert_eq!(with_excess.pixels, exact.pixels);
}

#[test]
fn decode_hls_color() {
    // hue 120 with the VT340 rotation is pure red
    let image = sixel_decode(b"\x1bPq#0;1;120;50;100#0~\x1b\\").unwrap();
    assert_eq!(&image.pixels[..4], &[255, 0, 0, 255]);
}

#[test]
fn decode_empty_is_an_error() {
    assert!(matches!(
        sixel_decode(b"\x1bPq\x1b\\"),
        Err(SixelError::NoPixelData)
    ));
}

#[test]
fn decode_overlay_preserves_previous_pixels() {
    // paint a full red column, return, overlay only the bottom row green
    let image = sixel_decode(b"\x1bPq#0;2;100;0;0~$#1;2;0;100;0_\x1b\\").unwrap();
    assert_eq!((image.width, image.height), (1, 6));
    assert_eq!(&image.pixels[..4], &[255, 0, 0, 255]);
    assert_eq!(&image.pixels[5 * 4..], &[0, 255, 0, 255]);
}
