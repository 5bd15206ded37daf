//! # sixel_stream
//!
//! A streaming SIXEL decoder that turns terminal graphics byte streams into
//! 32-bit RGBA rasters, with SIMD-accelerated band painting.
//!
//! The crate has two layers:
//!
//! - [`BandDecoder`] is the core: a chunk-fed state machine that paints six
//!   pixel rows at a time and hands every completed band to a host
//!   [`DecodeHandler`]. Use it when composing the image yourself (terminal
//!   emulators usually do).
//! - [`Decoder`] / [`sixel_decode`] sit on top and assemble the bands into a
//!   full image.
//!
//! ## Quick start
//!
//! ```
//! use sixel_stream::sixel_decode;
//!
//! // red 3x6 block, wrapped in a DCS sequence
//! let image = sixel_decode(b"\x1bPq#0;2;100;0;0#0!3~\x1b\\")?;
//! assert_eq!((image.width, image.height), (3, 6));
//! // pixels are RGBA, 4 bytes per pixel
//! assert_eq!(&image.pixels[..4], &[255, 0, 0, 255]);
//! # Ok::<(), sixel_stream::SixelError>(())
//! ```
//!
//! ## Streaming bands
//!
//! ```
//! use sixel_stream::{Action, Band, BandDecoder, DecodeHandler};
//!
//! struct Widths(Vec<usize>);
//!
//! impl DecodeHandler for Widths {
//!     fn handle_band(&mut self, band: Band<'_>) -> Action {
//!         self.0.push(band.width());
//!         Action::Continue
//!     }
//! }
//!
//! let mut decoder = BandDecoder::new();
//! let mut widths = Widths(Vec::new());
//! decoder.decode_bytes(b"~~~-~-", &mut widths);
//! assert_eq!(widths.0, [3, 1]);
//! ```
//!
//! Malformed input never fails: the parser recovers silently (broken raster
//! attributes fall back to level 1, out-of-range colors are ignored, runs
//! are clipped at [`MAX_WIDTH`]). Errors only surface from the image layer,
//! for resource limits and malformed DCS envelopes.

use thiserror::Error;

mod band;
mod color;
mod image;
mod paint;

pub use band::{Action, BandDecoder, DecodeHandler, Level, ParseMode, RasterAttributes};
pub use color::{
    alpha, blue, default_palette, green, normalize_hls, normalize_rgb, red, rgba,
    DEFAULT_BACKGROUND, DEFAULT_FOREGROUND, PALETTE_VT340_COLOR, PALETTE_VT340_GREY,
};
pub use image::{sixel_decode, DecodeOptions, Decoder, SixelImage};
pub use paint::Band;

/// Errors that can occur while decoding SIXEL data.
///
/// The band-level core never errors; these come from the image layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SixelError {
    /// Malformed DCS introducer.
    #[error("invalid SIXEL data: {0}")]
    InvalidData(String),

    /// The stream contained no decodable pixel data.
    #[error("no SIXEL pixel data found")]
    NoPixelData,

    /// Assembling the image would exceed the configured memory limit.
    #[error("image exceeds memory limit of {0} bytes")]
    MemoryLimit(usize),
}

/// Result type for SIXEL operations.
pub type Result<T> = core::result::Result<T, SixelError>;

/// Size of the host-writable input chunk buffer in bytes.
pub const CHUNK_SIZE: usize = 4096;

/// Number of palette registers.
pub const PALETTE_SIZE: usize = 256;

/// Row buffer clip column. With the four guard columns in front, the widest
/// band that can be emitted is `MAX_WIDTH - 4` pixels.
pub const MAX_WIDTH: usize = 4096;

/// Maximum number of collected numeric parameters per introducer.
pub const PARAM_SIZE: usize = 8;
