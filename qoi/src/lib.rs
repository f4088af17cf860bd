//! Encoder and decoder for the [QOI image format](https://qoiformat.org/).
//!
//! QOI losslessly compresses 8-bit RGB and RGBA images into a byte stream made of a 14-byte
//! header, a sequence of variable-length chunks, and an 8-byte end marker.
//!
//! # Header
//!
//! - 4-byte magic: `qoif`
//! - u32be width (non-zero)
//! - u32be height (non-zero)
//! - u8 channel count (3 = RGB, 4 = RGBA)
//! - u8 colorspace (0 = sRGB with linear alpha, 1 = all channels linear). Informative only, the
//!   codec never interprets it.
//!
//! # Stream format
//!
//! Encoder and decoder both keep track of the previously seen pixel (starting out as
//! `(0, 0, 0, 255)`) and a 64-entry [`ColorArray`] of recently seen pixels (all zero
//! initially), addressed by [`Pixel::hash`]. Each chunk describes the next pixel(s) relative to
//! that state. See [consts] for the different operation types, and [`Chunk`] for their typed
//! representation.
//!
//! # Example
//!
//! ```
//! let pixels = [0u8, 42, 66, 255, 0, 42, 66, 255];
//! let encoded = qoi::encode(&pixels, 2, 1, 4, 0).unwrap();
//!
//! let (decoded, header) = qoi::decode(&encoded).unwrap();
//! assert_eq!((header.width, header.height), (2, 1));
//! assert_eq!(decoded, pixels);
//! ```
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "alloc")]
pub mod encode;
#[cfg(feature = "alloc")]
mod qoi_image;

pub mod chunk;
pub mod color_array;
pub mod decode;
pub mod header;
pub mod utils;

pub use chunk::Chunk;
pub use color_array::ColorArray;
pub use decode::{DecodeError, QoiDecodeContext};
pub use header::{Channels, Colorspace, Header, HeaderError};
pub use utils::Pixel;

#[cfg(feature = "alloc")]
pub use decode::decode;
#[cfg(feature = "alloc")]
pub use encode::{encode, encoded_size_limit, EncodeError, QoiEncodeContext};
#[cfg(feature = "std")]
pub use qoi_image::{OpenError, SaveError};
#[cfg(feature = "alloc")]
pub use qoi_image::QoiImage;

pub mod consts {
    /// Size of the image header, in bytes.
    pub const QOI_HEADER_SIZE: usize = 14;

    /// Magic bytes at the start of every image.
    pub const QOI_MAGIC: [u8; 4] = *b"qoif";

    /// Marks the end of the stream, following the last chunk.
    pub const QOI_END_MARKER: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 1];

    /// Upper bound for `width * height`, guarding against absurd allocations from hostile
    /// headers.
    pub const QOI_PIXELS_MAX: usize = 400_000_000;

    /// Longest run a single [`QOI_OP_RUN`] chunk can describe.
    pub const QOI_MAX_RUN: u8 = 62;

    /// Mask for the 2-bit tags.
    pub const QOI_MASK_2: u8 = 0b1100_0000;

    /// Re-emit a pixel from the color array.
    ///
    /// ```plain
    /// .- QOI_OP_INDEX ----------.
    /// |         Byte[0]         |
    /// |  7  6  5  4  3  2  1  0 |
    /// |-------+-----------------|
    /// |  0  0 |     index       |
    /// `-------------------------`
    /// ```
    ///
    /// - 2-bit tag b00
    /// - 6-bit index into the color array: 0..63
    /// - A valid encoder must not issue 2 or more consecutive QOI_OP_INDEX chunks to the same
    ///   index. QOI_OP_RUN should be used instead.
    pub const QOI_OP_INDEX: u8 = 0b0000_0000;

    /// Calculate a pixel based on a 2-bit difference from the previous pixel.
    ///
    /// ```plain
    /// .- QOI_OP_DIFF -----------.
    /// |         Byte[0]         |
    /// |  7  6  5  4  3  2  1  0 |
    /// |-------+-----+-----+-----|
    /// |  0  1 |  dr |  dg |  db |
    /// `-------------------------`
    /// ```
    ///
    /// - 2-bit tag b01
    /// - 2-bit   red channel difference from the previous pixel between -2..1, stored with a bias
    ///   of 2
    /// - 2-bit green channel difference from the previous pixel between -2..1, stored with a bias
    ///   of 2
    /// - 2-bit  blue channel difference from the previous pixel between -2..1, stored with a bias
    ///   of 2
    ///
    /// Differences wrap around, so `1 - 2` is `255`. The alpha value stays unchanged.
    pub const QOI_OP_DIFF: u8 = 0b0100_0000;

    /// Calculate a pixel based on a 6-bit green-channel difference from the previous pixel, and
    /// differences to the green-channel difference for red and blue.
    ///
    ///  ```plain
    /// .- QOI_OP_LUMA -------------------------------------.
    /// |         Byte[0]         |         Byte[1]         |
    /// |  7  6  5  4  3  2  1  0 |  7  6  5  4  3  2  1  0 |
    /// |-------+-----------------+-------------+-----------|
    /// |  1  0 |   green diff    |   dr - dg   |  db - dg  |
    /// `---------------------------------------------------`
    /// ```
    ///
    /// - 2-bit tag b10
    /// - 6-bit green channel difference from the previous pixel (`-32..31`), stored with a bias
    ///   of 32
    /// - 4-bit red channel difference minus green channel difference (`-8..7`), stored with a bias
    ///   of 8
    /// - 4-bit blue channel difference minus green channel difference (`-8..7`), stored with a bias
    ///   of 8
    ///
    /// The alpha value stays unchanged.
    pub const QOI_OP_LUMA: u8 = 0b1000_0000;

    /// Repeats the last pixel.
    ///
    /// ```plain
    /// .- QOI_OP_RUN ------------.
    /// |         Byte[0]         |
    /// |  7  6  5  4  3  2  1  0 |
    /// |-------+-----------------|
    /// |  1  1 |       run       |
    /// `-------------------------`
    /// ```
    ///
    /// - 2-bit tag b11
    /// - 6-bit run-length repeating the previous pixel: 1..62
    /// - The run-length is stored with a bias of -1. Note that the run-lengths 63 and 64 (`b111110`
    ///   and `b111111`) are illegal as they are occupied by the QOI_OP_RGB and QOI_OP_RGBA tag.
    pub const QOI_OP_RUN: u8 = 0b1100_0000;

    /// Emits a full pixel, keeping the alpha value of the previous pixel.
    ///
    /// ```plain
    /// .- QOI_OP_RGB ------------------------------------------.
    /// |         Byte[0]         | Byte[1] | Byte[2] | Byte[3] |
    /// |  7  6  5  4  3  2  1  0 | 7 .. 0  | 7 .. 0  | 7 .. 0  |
    /// |-------------------------+---------+---------+---------|
    /// |  1  1  1  1  1  1  1  0 |   red   |  green  |  blue   |
    /// `-------------------------------------------------------`
    /// ```
    ///
    /// - 8-bit tag b11111110
    pub const QOI_OP_RGB: u8 = 0b1111_1110;

    /// Emits a full pixel including its alpha value.
    ///
    /// ```plain
    /// .- QOI_OP_RGBA ---------------------------------------------------.
    /// |         Byte[0]         | Byte[1] | Byte[2] | Byte[3] | Byte[4] |
    /// |  7  6  5  4  3  2  1  0 | 7 .. 0  | 7 .. 0  | 7 .. 0  | 7 .. 0  |
    /// |-------------------------+---------+---------+---------+---------|
    /// |  1  1  1  1  1  1  1  1 |   red   |  green  |  blue   |  alpha  |
    /// `-----------------------------------------------------------------`
    /// ```
    ///
    /// - 8-bit tag b11111111
    pub const QOI_OP_RGBA: u8 = 0b1111_1111;
}
