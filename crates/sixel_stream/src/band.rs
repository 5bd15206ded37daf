//! The streaming band decoder: byte-level state machine, raster-attribute
//! preamble, and the two paint modes.
//!
//! [`BandDecoder`] decodes one SIXEL image at a time from a host-filled
//! chunk buffer and hands every completed six-pixel band to a
//! [`DecodeHandler`]. It never assembles an image itself; see
//! [`Decoder`](crate::Decoder) for that.
//!
//! Two paint modes cover the width-management strategies:
//!
//! - **Grow** (level 1 streams, or level 2 with truncation disabled): the
//!   usable band width follows the cursor, newly exposed columns are cleared
//!   with the fill color in 128-column steps.
//! - **Truncate** (level 2 with truncation enabled): the raster width is
//!   cleared once per band and sixels past it are dropped. Not strictly
//!   conforming, but what most hosts want, and measurably faster.
//!
//! Malformed input never errors; recovery rules are local and silent (see
//! the individual operations). The only way a decode stops early is the
//! handler returning [`Action::Abort`], which sets a sticky abort flag until
//! the next [`BandDecoder::init`].

use crate::color::{default_palette, COLOR_CONVERTERS, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
use crate::paint::{Band, BandBuffer, GUARD, ROW_LEN};
use crate::{CHUNK_SIZE, MAX_WIDTH, PALETTE_SIZE, PARAM_SIZE};

// Chunk scans are terminated by a sentinel byte; masked with 0x7F it maps to
// DEL, which no inner loop consumes.
const SENTINEL: u8 = 0xFF;

// M1 clearing granularity in columns.
const CLEAR_CHUNK: usize = 128;

/// Parser state across the overlapping introducer forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Plain sixel data.
    Data,
    /// After `!`, collecting a repeat count.
    Compression,
    /// After `#`, collecting register / colorspace parameters.
    Color,
    /// Inside the `"` raster-attribute preamble.
    Attr,
}

/// Paint mode committed by the raster-attribute preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// No data byte seen yet.
    Undecided,
    /// Band width grows with the cursor, cleared on demand.
    Grow,
    /// Fixed raster width, cleared per band, excess sixels dropped.
    Truncate,
}

/// SIXEL conformance level derived from the preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Undecided,
    /// No (usable) raster attributes.
    One,
    /// Raster attributes with all four values present.
    Two,
}

/// Raw values of the `"n;d;w;h` raster-attribute preamble.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterAttributes {
    /// Pixel aspect numerator.
    pub numerator: u32,
    /// Pixel aspect denominator.
    pub denominator: u32,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

/// Continue/abort decision returned by [`DecodeHandler`] callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Abort,
}

/// Host hooks invoked synchronously by the decoder.
pub trait DecodeHandler {
    /// One completed band. All pixel writes for it are done; no writes for
    /// the next band happen before this returns. [`Action::Abort`] stops
    /// the decode for good.
    fn handle_band(&mut self, band: Band<'_>) -> Action;

    /// The raster-attribute preamble committed a paint mode. The decoder is
    /// passed read-only so the host can size buffers from
    /// [`BandDecoder::image_size`] and friends.
    fn mode_parsed(&mut self, mode: ParseMode, decoder: &BandDecoder) -> Action {
        let _ = (mode, decoder);
        Action::Continue
    }
}

#[inline]
fn is_digit(code: u8) -> bool {
    code.wrapping_sub(b'0') < 10
}

#[inline]
fn is_sixel(code: u8) -> bool {
    code.wrapping_sub(b'?') < 64
}

// Sixel data or any introducer that ends the raster-attribute preamble.
#[inline]
fn ends_preamble(code: u8) -> bool {
    is_sixel(code) || matches!(code, b'!' | b'#' | b'$' | b'-')
}

#[inline]
fn fastmod(value: u32, len: usize) -> usize {
    let value = value as usize;
    if value < len {
        value
    } else {
        value % len
    }
}

/// Streaming SIXEL band decoder for a single image.
///
/// The host copies raw bytes into the chunk buffer ([`Self::chunk_mut`]),
/// calls [`Self::decode`] per filled range, and receives bands through its
/// [`DecodeHandler`]. The final, unterminated band is not flushed
/// automatically; pull it with [`Self::current_band`] after the last chunk.
///
/// A decoder instance is single-image: call [`Self::init`] before reusing it.
pub struct BandDecoder {
    state: State,
    color: u32,
    cursor: usize,
    params: [u32; PARAM_SIZE],
    p_length: usize,
    palette_length: usize,
    fill_color: u32,
    truncate: bool,
    level: Level,
    mode: ParseMode,
    raster: RasterAttributes,
    // band width and image height in Truncate mode, both including the guard
    // offset on width
    width: usize,
    height: usize,
    // Grow mode book-keeping
    real_width: usize,
    cleared_width: usize,
    abort: bool,
    palette: [u32; PALETTE_SIZE],
    chunk: [u8; CHUNK_SIZE + 1],
    bands: BandBuffer,
}

impl BandDecoder {
    /// Create a decoder with the default palette, foreground and fill color.
    pub fn new() -> Self {
        let mut decoder = Self {
            state: State::Data,
            color: 0,
            cursor: GUARD,
            params: [0; PARAM_SIZE],
            p_length: 1,
            palette_length: PALETTE_SIZE,
            fill_color: 0,
            truncate: true,
            level: Level::Undecided,
            mode: ParseMode::Undecided,
            raster: RasterAttributes::default(),
            width: 0,
            height: 0,
            real_width: GUARD,
            cleared_width: GUARD,
            abort: false,
            palette: default_palette(),
            chunk: [0; CHUNK_SIZE + 1],
            bands: BandBuffer::new(),
        };
        decoder.init(DEFAULT_FOREGROUND, DEFAULT_BACKGROUND, PALETTE_SIZE, true);
        decoder
    }

    /// Reset the parser for the next image.
    ///
    /// `palette_length` is clamped to `1..=PALETTE_SIZE`; register lookups
    /// wrap modulo this length. Palette contents are kept, write through
    /// [`Self::palette_mut`] to replace them.
    pub fn init(&mut self, sixel_color: u32, fill_color: u32, palette_length: usize, truncate: bool) {
        self.state = State::Data;
        self.color = sixel_color;
        self.cursor = GUARD;
        self.params = [0; PARAM_SIZE];
        self.p_length = 1;
        self.palette_length = palette_length.clamp(1, PALETTE_SIZE);
        self.fill_color = fill_color;
        self.truncate = truncate;
        self.level = Level::Undecided;
        self.mode = ParseMode::Undecided;
        self.raster = RasterAttributes::default();
        self.width = 0;
        self.height = 0;
        self.real_width = GUARD;
        self.cleared_width = GUARD;
        self.abort = false;
    }

    /// Host-writable chunk buffer for [`Self::decode`].
    pub fn chunk_mut(&mut self) -> &mut [u8] {
        &mut self.chunk[..CHUNK_SIZE]
    }

    /// Decode bytes `[start, end)` of the chunk buffer.
    ///
    /// The byte at index `end` is scratched with an internal sentinel, so a
    /// refill through [`Self::chunk_mut`] must rewrite it. No-op once a
    /// handler aborted; `end` is clamped to `CHUNK_SIZE`.
    pub fn decode<H: DecodeHandler>(&mut self, start: usize, end: usize, handler: &mut H) {
        if self.abort {
            return;
        }
        let end = end.min(CHUNK_SIZE);
        let start = start.min(end);
        match self.mode {
            ParseMode::Undecided => self.decode_raster(start, end, handler),
            ParseMode::Grow => self.decode_grow(start, end, handler),
            ParseMode::Truncate => self.decode_truncate(start, end, handler),
        }
    }

    /// Stream an arbitrary byte slice through the chunk buffer.
    pub fn decode_bytes<H: DecodeHandler>(&mut self, data: &[u8], handler: &mut H) {
        for piece in data.chunks(CHUNK_SIZE) {
            if self.abort {
                return;
            }
            self.chunk[..piece.len()].copy_from_slice(piece);
            self.decode(0, piece.len(), handler);
        }
    }

    /// Width of the band currently being decoded.
    ///
    /// In grow mode this is the maximum cursor position seen so far, in
    /// truncate mode the fixed raster width, before any data byte 0.
    pub fn current_width(&self) -> usize {
        match self.mode {
            ParseMode::Grow => self.real_width.max(self.cursor).min(MAX_WIDTH) - GUARD,
            ParseMode::Truncate => self.width - GUARD,
            ParseMode::Undecided => 0,
        }
    }

    /// View of the pending, not yet emitted band.
    ///
    /// The core never flushes the final band on its own; the host reads it
    /// through this accessor once the byte stream is exhausted.
    pub fn current_band(&self) -> Band<'_> {
        Band::new(&self.bands, self.current_width())
    }

    /// Active palette registers (`palette_length` entries).
    pub fn palette(&self) -> &[u32] {
        &self.palette[..self.palette_length]
    }

    /// All palette registers, for host-side (re)seeding.
    pub fn palette_mut(&mut self) -> &mut [u32; PALETTE_SIZE] {
        &mut self.palette
    }

    /// Paint mode committed by the preamble.
    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Conformance level committed by the preamble.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Raw raster-attribute values, zero where absent.
    pub fn raster_attributes(&self) -> RasterAttributes {
        self.raster
    }

    /// Fill color for unpainted pixels.
    pub fn fill_color(&self) -> u32 {
        self.fill_color
    }

    /// Fixed image size in truncate mode, `None` otherwise.
    pub fn image_size(&self) -> Option<(usize, usize)> {
        match self.mode {
            ParseMode::Truncate => Some((self.width - GUARD, self.height)),
            _ => None,
        }
    }

    /// True once a handler aborted; cleared by [`Self::init`].
    pub fn is_aborted(&self) -> bool {
        self.abort
    }

    /// Resolve a pending color introducer: select for one parameter, define
    /// and select for five valid ones, anything else leaves color and
    /// palette untouched.
    fn apply_color(&mut self, color: u32) -> u32 {
        if self.p_length == 1 {
            return self.palette[fastmod(self.params[0], self.palette_length)];
        }
        if self.p_length == 5 {
            let kind = self.params[1];
            let first_max = if kind == 1 { 360 } else { 100 };
            if (kind == 1 || kind == 2)
                && self.params[2] <= first_max
                && self.params[3] <= 100
                && self.params[4] <= 100
            {
                let slot = fastmod(self.params[0], self.palette_length);
                self.palette[slot] = COLOR_CONVERTERS[(kind - 1) as usize](
                    self.params[2],
                    self.params[3],
                    self.params[4],
                );
                return self.palette[slot];
            }
        }
        color
    }

    /// Clear the next 128-column chunk with the fill color (grow mode).
    fn clear_ahead(&mut self) {
        self.bands
            .fill_columns(self.cleared_width, CLEAR_CHUNK, self.fill_color);
        self.cleared_width += CLEAR_CHUNK;
    }

    /// Arm the band buffers for the next grow-mode band.
    fn reset_band_grow(&mut self) {
        self.real_width = GUARD;
        let chunks = if self.width > 0 {
            self.width.div_ceil(CLEAR_CHUNK)
        } else {
            1
        };
        let len = (chunks * CLEAR_CHUNK).min(ROW_LEN - GUARD);
        self.bands.fill_columns(GUARD, len, self.fill_color);
        self.cleared_width = GUARD + len;
    }

    /// Clear the full raster width for the next truncate-mode band.
    fn reset_band_truncate(&mut self) {
        self.bands
            .fill_columns(GUARD, self.width - GUARD, self.fill_color);
    }

    /// Preamble decoder: consumes at most one raster-attribute introducer at
    /// stream start, commits level and mode, then re-feeds the chunk range
    /// to the committed decoder (preamble bytes are inert for it).
    fn decode_raster<H: DecodeHandler>(&mut self, start: usize, end: usize, handler: &mut H) {
        let mut i = start;
        while i < end {
            let code = self.chunk[i] & 0x7F;
            i += 1;
            if self.state == State::Attr {
                if is_digit(code) {
                    let p = &mut self.params[self.p_length - 1];
                    *p = p.saturating_mul(10).saturating_add((code - b'0') as u32);
                } else if code == b';' {
                    if self.p_length < PARAM_SIZE {
                        self.params[self.p_length] = 0;
                        self.p_length += 1;
                    }
                } else if ends_preamble(code) {
                    if self.p_length == 4 {
                        self.level = Level::Two;
                        self.mode = if self.truncate {
                            ParseMode::Truncate
                        } else {
                            ParseMode::Grow
                        };
                        self.raster = RasterAttributes {
                            numerator: self.params[0],
                            denominator: self.params[1],
                            width: self.params[2],
                            height: self.params[3],
                        };
                        if self.truncate {
                            self.width = (self.params[2] as usize).min(MAX_WIDTH) + GUARD;
                            self.height = self.params[3] as usize;
                        }
                    } else {
                        // broken raster attributes ("1;1 ...): keep whatever
                        // was seen and fall back to level 1
                        self.level = Level::One;
                        self.mode = ParseMode::Grow;
                        self.raster = RasterAttributes {
                            numerator: self.params[0],
                            denominator: if self.p_length > 1 { self.params[1] } else { 0 },
                            width: if self.p_length > 2 { self.params[2] } else { 0 },
                            height: 0,
                        };
                    }
                    self.state = State::Data;
                    break;
                }
            } else if code == b'"' {
                self.state = State::Attr;
            } else if ends_preamble(code) {
                self.level = Level::One;
                self.mode = ParseMode::Grow;
                self.raster = RasterAttributes::default();
                break;
            }
        }

        if self.mode == ParseMode::Undecided {
            return;
        }
        match self.mode {
            ParseMode::Truncate => self.reset_band_truncate(),
            _ => self.reset_band_grow(),
        }
        if handler.mode_parsed(self.mode, self) == Action::Abort {
            self.abort = true;
            return;
        }
        match self.mode {
            ParseMode::Grow => self.decode_grow(start, end, handler),
            ParseMode::Truncate => self.decode_truncate(start, end, handler),
            ParseMode::Undecided => unreachable!(),
        }
    }

    /// Grow-mode decoder: width follows the cursor, columns are cleared on
    /// demand ahead of it.
    fn decode_grow<H: DecodeHandler>(&mut self, start: usize, end: usize, handler: &mut H) {
        let mut cur = self.cursor;
        let mut state = self.state;
        let mut color = self.color;
        self.chunk[end] = SENTINEL;
        let mut i = start;
        while i < end {
            let mut code = self.chunk[i] & 0x7F;
            i += 1;

            if is_digit(code) {
                let slot = self.p_length - 1;
                let mut p = self.params[slot];
                loop {
                    p = p.saturating_mul(10).saturating_add((code - b'0') as u32);
                    code = self.chunk[i] & 0x7F;
                    i += 1;
                    if !is_digit(code) {
                        break;
                    }
                }
                self.params[slot] = p;
            }

            if is_sixel(code) {
                if state != State::Data {
                    if state == State::Compression {
                        // repeat count 0 paints a single sixel; everything
                        // past the clip column is dropped anyway
                        let n = (self.params[0].max(1) as usize).min(MAX_WIDTH);
                        while cur + n >= self.cleared_width && self.cleared_width < MAX_WIDTH {
                            self.clear_ahead();
                        }
                        self.bands.put_run((code - b'?') as u32, color, n, cur);
                        cur += n;
                        code = self.chunk[i] & 0x7F;
                        i += 1;
                    } else {
                        color = self.apply_color(color);
                    }
                    state = State::Data;
                }
                while is_sixel(code) {
                    if cur >= self.cleared_width && self.cleared_width < MAX_WIDTH {
                        self.clear_ahead();
                    }
                    self.bands.put_single((code - b'?') as u32, color, cur);
                    cur += 1;
                    code = self.chunk[i] & 0x7F;
                    i += 1;
                }
            }

            match code {
                b'!' | b'#' => {
                    if state == State::Color {
                        color = self.apply_color(color);
                    }
                    self.params[0] = 0;
                    self.p_length = 1;
                    state = if code == b'!' {
                        State::Compression
                    } else {
                        State::Color
                    };
                }
                b'$' => {
                    self.real_width = self.real_width.max(cur).min(MAX_WIDTH);
                    cur = GUARD;
                }
                b'-' => {
                    self.real_width = self.real_width.max(cur).min(MAX_WIDTH);
                    // keep current_width() coherent inside the handler
                    self.cursor = self.real_width;
                    let band = Band::new(&self.bands, self.real_width - GUARD);
                    if handler.handle_band(band) == Action::Abort {
                        self.abort = true;
                        self.cursor = GUARD;
                        self.real_width = GUARD;
                        return;
                    }
                    self.reset_band_grow();
                    cur = GUARD;
                }
                b';' => {
                    if self.p_length < PARAM_SIZE {
                        self.params[self.p_length] = 0;
                        self.p_length += 1;
                    }
                }
                _ => {}
            }
        }
        self.cursor = cur;
        self.state = state;
        self.color = color;
    }

    /// Truncate-mode decoder: fixed pre-cleared width, runs of four sixels
    /// go through the wide kernel.
    fn decode_truncate<H: DecodeHandler>(&mut self, start: usize, end: usize, handler: &mut H) {
        let mut cur = self.cursor;
        let mut state = self.state;
        let mut color = self.color;
        self.chunk[end] = SENTINEL;
        let mut i = start;
        while i < end {
            let mut code = self.chunk[i] & 0x7F;
            i += 1;

            if is_digit(code) {
                let slot = self.p_length - 1;
                let mut p = self.params[slot];
                loop {
                    p = p.saturating_mul(10).saturating_add((code - b'0') as u32);
                    code = self.chunk[i] & 0x7F;
                    i += 1;
                    if !is_digit(code) {
                        break;
                    }
                }
                self.params[slot] = p;
            }

            if is_sixel(code) {
                if state != State::Data {
                    if state == State::Compression {
                        let n = (self.params[0].max(1) as usize).min(MAX_WIDTH);
                        self.bands.put_run((code - b'?') as u32, color, n, cur);
                        cur += n;
                        code = self.chunk[i] & 0x7F;
                        i += 1;
                    } else {
                        color = self.apply_color(color);
                    }
                    state = State::Data;
                }
                while is_sixel(code) {
                    // aggregate four sixels at an aligned cursor for the wide
                    // kernel, paint column-wise otherwise
                    if cur % 4 != 0 || cur + 4 > MAX_WIDTH {
                        self.bands.put_single((code - b'?') as u32, color, cur);
                        cur += 1;
                        code = self.chunk[i] & 0x7F;
                        i += 1;
                        continue;
                    }
                    let mut agg = 0u32;
                    let mut got = 0;
                    while got < 4 && is_sixel(code) {
                        agg |= ((code - b'?') as u32) << (got * 8);
                        got += 1;
                        code = self.chunk[i] & 0x7F;
                        i += 1;
                    }
                    if got == 4 {
                        self.bands.put_wide(agg, color, cur);
                        cur += 4;
                    } else {
                        // trailing remnant of an ended run
                        for lane in 0..got {
                            self.bands
                                .put_single(agg >> (lane * 8) & 0x3F, color, cur);
                            cur += 1;
                        }
                    }
                }
            }

            match code {
                b'!' | b'#' => {
                    if state == State::Color {
                        color = self.apply_color(color);
                    }
                    self.params[0] = 0;
                    self.p_length = 1;
                    state = if code == b'!' {
                        State::Compression
                    } else {
                        State::Color
                    };
                }
                b'$' => {
                    cur = GUARD;
                }
                b'-' => {
                    let band = Band::new(&self.bands, self.width - GUARD);
                    if handler.handle_band(band) == Action::Abort {
                        self.abort = true;
                        return;
                    }
                    self.reset_band_truncate();
                    cur = GUARD;
                }
                b';' => {
                    if self.p_length < PARAM_SIZE {
                        self.params[self.p_length] = 0;
                        self.p_length += 1;
                    }
                }
                _ => {}
            }
        }
        self.cursor = cur;
        self.state = state;
        self.color = color;
    }
}

impl Default for BandDecoder {
    fn default() -> Self {
        Self::new()
    }
}
