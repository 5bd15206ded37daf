//! Image assembly on top of the band decoder.
//!
//! [`Decoder`] feeds chunks through a [`BandDecoder`] and composes the
//! emitted bands into a full RGBA image. [`sixel_decode`] is the one-shot
//! entry point and also understands the DCS envelope
//! (`ESC P Ps;Ps;Ps q … ESC \` or the 8-bit 0x90/0x9C form).

use crate::band::{Action, BandDecoder, DecodeHandler, ParseMode};
use crate::color::{default_palette, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
use crate::paint::Band;
use crate::{Result, SixelError, PALETTE_SIZE};

/// A decoded SIXEL image.
#[derive(Debug, Clone)]
pub struct SixelImage {
    /// RGBA pixel data, 4 bytes per pixel, row-major.
    pub pixels: Vec<u8>,
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
}

/// Decoder configuration.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Drawing color before any `#` introducer selects one.
    pub sixel_color: u32,
    /// Color of unpainted pixels.
    pub fill_color: u32,
    /// Initial palette registers; `None` installs the default palette.
    pub palette: Option<Vec<u32>>,
    /// Usable palette registers, clamped to `1..=PALETTE_SIZE`. Register
    /// requests wrap modulo this value.
    pub palette_limit: usize,
    /// Honor raster-attribute widths by truncation (faster, and what most
    /// hosts want). When false, level-2 streams also decode in grow mode.
    pub truncate: bool,
    /// Upper bound on assembled pixel memory in bytes.
    pub memory_limit: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            sixel_color: DEFAULT_FOREGROUND,
            fill_color: DEFAULT_BACKGROUND,
            palette: None,
            palette_limit: PALETTE_SIZE,
            truncate: true,
            memory_limit: 2048 * 65536,
        }
    }
}

// One stored grow-mode band: six rows of `width` pixels, back to back.
struct StoredBand {
    width: usize,
    rows: Vec<u32>,
}

// Collects bands as the core emits them.
struct Assembler {
    mode: ParseMode,
    memory_limit: usize,
    // grow mode
    bands: Vec<StoredBand>,
    stored_pixels: usize,
    // truncate mode
    canvas: Vec<u32>,
    size: (usize, usize),
    rows_filled: usize,
    failed: Option<SixelError>,
}

impl Assembler {
    fn new(memory_limit: usize) -> Self {
        Self {
            mode: ParseMode::Undecided,
            memory_limit,
            bands: Vec::new(),
            stored_pixels: 0,
            canvas: Vec::new(),
            size: (0, 0),
            rows_filled: 0,
            failed: None,
        }
    }

    fn reset(&mut self, memory_limit: usize) {
        self.mode = ParseMode::Undecided;
        self.memory_limit = memory_limit;
        self.bands.clear();
        self.stored_pixels = 0;
        self.canvas.clear();
        self.size = (0, 0);
        self.rows_filled = 0;
        self.failed = None;
    }

    fn out_of_memory(&mut self) -> Action {
        self.failed = Some(SixelError::MemoryLimit(self.memory_limit));
        Action::Abort
    }
}

impl DecodeHandler for Assembler {
    fn mode_parsed(&mut self, mode: ParseMode, decoder: &BandDecoder) -> Action {
        self.mode = mode;
        if mode == ParseMode::Truncate {
            let (width, height) = decoder.image_size().unwrap_or((0, 0));
            if width.saturating_mul(height).saturating_mul(4) > self.memory_limit {
                return self.out_of_memory();
            }
            self.size = (width, height);
            self.canvas = vec![decoder.fill_color(); width * height];
            self.rows_filled = 0;
        }
        Action::Continue
    }

    fn handle_band(&mut self, band: Band<'_>) -> Action {
        match self.mode {
            ParseMode::Truncate => {
                let (width, height) = self.size;
                let mut row = 0;
                while row < 6 && self.rows_filled < height {
                    let dst = self.rows_filled * width;
                    self.canvas[dst..dst + width].copy_from_slice(band.row(row));
                    self.rows_filled += 1;
                    row += 1;
                }
            }
            _ => {
                let added = band.width() * 6;
                if (self.stored_pixels + added) * 4 > self.memory_limit {
                    return self.out_of_memory();
                }
                self.stored_pixels += added;
                let mut rows = Vec::with_capacity(added);
                for row in band.rows() {
                    rows.extend_from_slice(row);
                }
                self.bands.push(StoredBand {
                    width: band.width(),
                    rows,
                });
            }
        }
        Action::Continue
    }
}

/// Streaming image decoder.
///
/// Feed any number of chunks with [`Self::decode`], then call
/// [`Self::finish`] to pull the trailing band and obtain the image. Call
/// [`Self::init`] to reuse the instance for the next image.
pub struct Decoder {
    core: BandDecoder,
    assembler: Assembler,
    opts: DecodeOptions,
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_options(DecodeOptions::default())
    }

    pub fn with_options(opts: DecodeOptions) -> Self {
        let memory_limit = opts.memory_limit;
        let mut decoder = Self {
            core: BandDecoder::new(),
            assembler: Assembler::new(memory_limit),
            opts,
        };
        decoder.init();
        decoder
    }

    /// Re-arm for the next image: parser state, palette and collected bands.
    pub fn init(&mut self) {
        self.core.init(
            self.opts.sixel_color,
            self.opts.fill_color,
            self.opts.palette_limit,
            self.opts.truncate,
        );
        let registers = self.core.palette_mut();
        *registers = default_palette();
        if let Some(user) = &self.opts.palette {
            for (dst, src) in registers.iter_mut().zip(user) {
                *dst = *src;
            }
        }
        self.assembler.reset(self.opts.memory_limit);
    }

    /// Decode the next chunk of SIXEL payload bytes.
    pub fn decode(&mut self, data: &[u8]) -> Result<()> {
        self.core.decode_bytes(data, &mut self.assembler);
        match &self.assembler.failed {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Read access to the underlying band decoder.
    pub fn band_decoder(&self) -> &BandDecoder {
        &self.core
    }

    /// Compose the image, including the pending unterminated band.
    ///
    /// The assembled pixel data is moved into the returned image; call
    /// [`Self::init`] before decoding another one.
    pub fn finish(&mut self) -> Result<SixelImage> {
        if let Some(err) = self.assembler.failed.take() {
            return Err(err);
        }
        // a second finish without init in between has nothing left to return
        let mode = std::mem::replace(&mut self.assembler.mode, ParseMode::Undecided);
        match mode {
            ParseMode::Undecided => Err(SixelError::NoPixelData),
            ParseMode::Truncate => {
                let (width, height) = self.assembler.size;
                if width == 0 || height == 0 {
                    return Err(SixelError::NoPixelData);
                }
                let mut canvas = std::mem::take(&mut self.assembler.canvas);
                // peek into the band still being decoded
                let pending = self.core.current_band();
                let mut row = 0;
                while row < 6 && self.assembler.rows_filled < height {
                    let dst = self.assembler.rows_filled * width;
                    canvas[dst..dst + width].copy_from_slice(pending.row(row));
                    self.assembler.rows_filled += 1;
                    row += 1;
                }
                Ok(image_from_canvas(canvas, width, height))
            }
            ParseMode::Grow => {
                let pending_width = self.core.current_width();
                let width = self
                    .assembler
                    .bands
                    .iter()
                    .map(|band| band.width)
                    .max()
                    .unwrap_or(0)
                    .max(pending_width);
                let height =
                    self.assembler.bands.len() * 6 + if pending_width > 0 { 6 } else { 0 };
                if width == 0 || height == 0 {
                    return Err(SixelError::NoPixelData);
                }
                if width.saturating_mul(height).saturating_mul(4) > self.opts.memory_limit {
                    return Err(SixelError::MemoryLimit(self.opts.memory_limit));
                }
                // bands may differ in width; pad the narrow ones
                let mut canvas = vec![self.core.fill_color(); width * height];
                for (index, band) in self.assembler.bands.iter().enumerate() {
                    for row in 0..6 {
                        let dst = (index * 6 + row) * width;
                        canvas[dst..dst + band.width]
                            .copy_from_slice(&band.rows[row * band.width..(row + 1) * band.width]);
                    }
                }
                if pending_width > 0 {
                    let pending = self.core.current_band();
                    let base = self.assembler.bands.len() * 6;
                    for row in 0..6 {
                        let dst = (base + row) * width;
                        canvas[dst..dst + pending_width].copy_from_slice(pending.row(row));
                    }
                }
                Ok(image_from_canvas(canvas, width, height))
            }
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn image_from_canvas(canvas: Vec<u32>, width: usize, height: usize) -> SixelImage {
    let mut pixels = Vec::with_capacity(canvas.len() * 4);
    for px in canvas {
        pixels.extend_from_slice(&px.to_le_bytes());
    }
    SixelImage {
        pixels,
        width,
        height,
    }
}

struct Envelope<'a> {
    params: [u16; 8],
    param_count: usize,
    payload: &'a [u8],
}

impl<'a> Envelope<'a> {
    fn split(bytes: &'a [u8]) -> Result<Self> {
        let mut idx = 0;
        while idx < bytes.len() {
            match bytes[idx] {
                0x90 => {
                    return Self::parse_dcs(bytes, idx + 1);
                }
                0x1b => {
                    if idx + 1 < bytes.len() && bytes[idx + 1] == b'P' {
                        return Self::parse_dcs(bytes, idx + 2);
                    }
                    idx += 1;
                }
                _ => idx += 1,
            }
        }

        // no DCS introducer, treat everything as payload
        Ok(Envelope {
            params: [0; 8],
            param_count: 0,
            payload: bytes,
        })
    }

    fn parse_dcs(bytes: &'a [u8], mut idx: usize) -> Result<Self> {
        let mut params = [0u16; 8];
        let mut param_count = 0usize;
        let mut current: u16 = 0;
        let mut has_digit = false;

        while idx < bytes.len() {
            match bytes[idx] {
                b'0'..=b'9' => {
                    let digit = (bytes[idx] - b'0') as u16;
                    current = current.saturating_mul(10).saturating_add(digit);
                    has_digit = true;
                    idx += 1;
                }
                b';' => {
                    if param_count < params.len() {
                        params[param_count] = if has_digit { current } else { 0 };
                        param_count += 1;
                    }
                    current = 0;
                    has_digit = false;
                    idx += 1;
                }
                b'q' => {
                    if param_count < params.len() && (has_digit || param_count > 0) {
                        params[param_count] = if has_digit { current } else { 0 };
                        param_count += 1;
                    }
                    idx += 1;
                    break;
                }
                0x1b | 0x9c => {
                    return Err(SixelError::InvalidData(
                        "stray terminator in DCS introducer".to_string(),
                    ));
                }
                _ => idx += 1,
            }
        }

        Ok(Envelope {
            params,
            param_count,
            payload: &bytes[idx.min(bytes.len())..],
        })
    }

    fn background_select(&self) -> Option<u16> {
        (self.param_count > 1).then_some(self.params[1])
    }
}

fn strip_string_terminator(data: &[u8]) -> &[u8] {
    if data.ends_with(b"\x1b\\") {
        &data[..data.len() - 2]
    } else if data.last() == Some(&0x9c) {
        &data[..data.len() - 1]
    } else {
        data
    }
}

/// Decode a complete SIXEL sequence in one call.
///
/// Accepts either a bare SIXEL payload or a full DCS sequence; the DCS
/// parameter P2 = 1 selects a transparent background (unpainted pixels get
/// alpha 0). Decodes with [`DecodeOptions::default`] otherwise.
///
/// # Example
///
/// ```
/// use sixel_stream::sixel_decode;
///
/// let image = sixel_decode(b"\x1bPq#2;2;100;0;0~\x1b\\")?;
/// assert_eq!((image.width, image.height), (1, 6));
/// assert_eq!(&image.pixels[..4], &[255, 0, 0, 255]);
/// # Ok::<(), sixel_stream::SixelError>(())
/// ```
#[must_use = "this returns the decoded SixelImage"]
pub fn sixel_decode(data: &[u8]) -> Result<SixelImage> {
    let envelope = Envelope::split(data)?;
    let payload = strip_string_terminator(envelope.payload);

    let mut opts = DecodeOptions::default();
    if envelope.background_select() == Some(1) {
        // P2 = 1: leave unpainted pixels transparent
        opts.fill_color = 0;
    }

    let mut decoder = Decoder::with_options(opts);
    decoder.decode(payload)?;
    decoder.finish()
}
