//! Color conversion and default palettes.
//!
//! All pixel values are packed little-endian RGBA (`0xAABBGGRR` as an
//! integer), so a byte-wise view of a pixel buffer reads `R, G, B, A`.
//! SIXEL color definitions arrive as integer percentages: RGB channels in
//! 0..100, HLS as hue 0..360 (rotated by 240° on VT340 hardware) and
//! lightness/saturation in 0..100.

use crate::PALETTE_SIZE;

/// Pack RGBA channel bytes into a pixel value.
#[inline]
pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (a as u32) << 24 | (b as u32) << 16 | (g as u32) << 8 | r as u32
}

/// Red channel of a packed pixel.
#[inline]
pub const fn red(color: u32) -> u8 {
    (color & 0xFF) as u8
}

/// Green channel of a packed pixel.
#[inline]
pub const fn green(color: u32) -> u8 {
    (color >> 8 & 0xFF) as u8
}

/// Blue channel of a packed pixel.
#[inline]
pub const fn blue(color: u32) -> u8 {
    (color >> 16 & 0xFF) as u8
}

/// Alpha channel of a packed pixel.
#[inline]
pub const fn alpha(color: u32) -> u8 {
    (color >> 24) as u8
}

/// Default sixel drawing color when none is selected (white).
pub const DEFAULT_FOREGROUND: u32 = rgba(255, 255, 255, 255);

/// Default fill color for unpainted pixels (opaque black).
pub const DEFAULT_BACKGROUND: u32 = rgba(0, 0, 0, 255);

/// 0..100 percent to a 0..255 channel byte with integer rounding.
const fn percent_channel(c: u32) -> u32 {
    let c = if c > 100 { 100 } else { c };
    (c * 256 - c + 50) / 100
}

/// Normalize percent-based SIXEL RGB (0..100 each) to a packed pixel.
///
/// Alpha is forced to 0xFF. Values above 100 are clamped.
#[inline]
pub const fn normalize_rgb(r: u32, g: u32, b: u32) -> u32 {
    0xFF00_0000 | percent_channel(b) << 16 | percent_channel(g) << 8 | percent_channel(r)
}

// hue to channel value helper
fn h2c(t1: f32, t2: f32, c: f32) -> f32 {
    let c = if c < 0.0 {
        c + 1.0
    } else if c > 1.0 {
        c - 1.0
    } else {
        c
    };
    if c < 1.0 / 6.0 {
        t2 + (t1 - t2) * 6.0 * c
    } else if c < 0.5 {
        t1
    } else if c < 2.0 / 3.0 {
        t2 + (t1 - t2) * (4.0 - c * 6.0)
    } else {
        t2
    }
}

/// Normalize SIXEL HLS to a packed pixel.
///
/// `h` is 0..360, `l` and `s` are 0..100. The hue is rotated by 240°
/// (VT340 convention) before conversion. Zero saturation short-circuits
/// to the gray produced by [`normalize_rgb`].
pub fn normalize_hls(h: u32, l: u32, s: u32) -> u32 {
    if s == 0 {
        return normalize_rgb(l, l, l);
    }
    let h = ((h % 360 + 240) % 360) as f32 / 360.0;
    let l = l.min(100) as f32 / 100.0;
    let s = s.min(100) as f32 / 100.0;
    let t1 = if l < 0.5 { l * (1.0 + s) } else { l * (1.0 - s) + s };
    let t2 = l * 2.0 - t1;
    let r = (255.0 * h2c(t1, t2, h + 1.0 / 3.0) + 0.5) as u32;
    let g = (255.0 * h2c(t1, t2, h) + 0.5) as u32;
    let b = (255.0 * h2c(t1, t2, h - 1.0 / 3.0) + 0.5) as u32;
    0xFF00_0000 | b << 16 | g << 8 | r
}

// Converter dispatch for the color introducer, indexed by `Pu - 1`
// (1 = HLS, 2 = RGB).
pub(crate) const COLOR_CONVERTERS: [fn(u32, u32, u32) -> u32; 2] = [normalize_hls, normalize_rgb];

/// The 16 predefined color registers of the VT340 (percent values).
///
/// See <https://vt100.net/docs/vt3xx-gp/chapter2.html#S2.4>.
pub const PALETTE_VT340_COLOR: [u32; 16] = [
    normalize_rgb(0, 0, 0),    // black
    normalize_rgb(20, 20, 80), // blue
    normalize_rgb(80, 13, 13), // red
    normalize_rgb(20, 80, 20), // green
    normalize_rgb(80, 20, 80), // magenta
    normalize_rgb(20, 80, 80), // cyan
    normalize_rgb(80, 80, 20), // yellow
    normalize_rgb(53, 53, 53), // gray 50%
    normalize_rgb(26, 26, 26), // gray 25%
    normalize_rgb(33, 33, 60), // blue, less saturated
    normalize_rgb(60, 26, 26), // red, less saturated
    normalize_rgb(33, 60, 33), // green, less saturated
    normalize_rgb(60, 33, 60), // magenta, less saturated
    normalize_rgb(33, 60, 60), // cyan, less saturated
    normalize_rgb(60, 60, 33), // yellow, less saturated
    normalize_rgb(80, 80, 80), // gray 75%
];

/// The 16 predefined monochrome registers of the VT340 (percent values).
pub const PALETTE_VT340_GREY: [u32; 16] = [
    normalize_rgb(0, 0, 0),
    normalize_rgb(13, 13, 13),
    normalize_rgb(26, 26, 26),
    normalize_rgb(40, 40, 40),
    normalize_rgb(6, 6, 6),
    normalize_rgb(20, 20, 20),
    normalize_rgb(33, 33, 33),
    normalize_rgb(46, 46, 46),
    normalize_rgb(0, 0, 0),
    normalize_rgb(13, 13, 13),
    normalize_rgb(26, 26, 26),
    normalize_rgb(40, 40, 40),
    normalize_rgb(6, 6, 6),
    normalize_rgb(20, 20, 20),
    normalize_rgb(33, 33, 33),
    normalize_rgb(46, 46, 46),
];

/// Build the full 256-register startup palette.
///
/// The VT340 color registers occupy slots 0..16, followed by a 6×6×6 color
/// cube and a 24-step gray ramp, so every register holds an opaque color.
pub fn default_palette() -> [u32; PALETTE_SIZE] {
    let mut colors = [0u32; PALETTE_SIZE];
    colors[..16].copy_from_slice(&PALETTE_VT340_COLOR);

    let mut cursor = 16;
    for r in 0..6u32 {
        for g in 0..6u32 {
            for b in 0..6u32 {
                if cursor < PALETTE_SIZE {
                    colors[cursor] = normalize_rgb(r * 20, g * 20, b * 20);
                }
                cursor += 1;
            }
        }
    }

    for level in 0..24u32 {
        if cursor >= PALETTE_SIZE {
            break;
        }
        let value = level * 100 / 23;
        colors[cursor] = normalize_rgb(value, value, value);
        cursor += 1;
    }

    while cursor < PALETTE_SIZE {
        colors[cursor] = DEFAULT_FOREGROUND;
        cursor += 1;
    }

    colors
}
