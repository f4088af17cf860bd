use crate::{
    chunk::{Chunk, ChunkWriter},
    color_array::ColorArray,
    consts::{QOI_END_MARKER, QOI_HEADER_SIZE, QOI_MAX_RUN},
    header::{Header, HeaderError},
    utils::{diff, Pixel},
};
use alloc::vec::Vec;
use core::convert::Infallible;
use itertools::Itertools;
use snafu::{ensure, ResultExt, Snafu};

#[cfg(feature = "std")]
mod std_api;
#[cfg(feature = "std")]
pub use std_api::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EncodeError {
    #[snafu(display("invalid image header"))]
    InvalidHeader { source: HeaderError },
    #[snafu(display(
        "pixel buffer holds {actual} bytes, but a {width}x{height} image with {channels} channels needs {expected}"
    ))]
    BufferLengthMismatch {
        width: u32,
        height: u32,
        channels: u8,
        expected: usize,
        actual: usize,
    },
}

/// Encodes raw pixels (3 or 4 interleaved channels, row-major) into a new buffer.
pub fn encode(
    pixels: &[u8],
    width: u32,
    height: u32,
    channels: u8,
    colorspace: u8,
) -> Result<Vec<u8>, EncodeError> {
    let header = Header::new(width, height, channels, colorspace).context(InvalidHeaderSnafu)?;

    let mut w = Vec::new();
    QoiEncodeContext::new().encode_to_vec(&header, pixels, &mut w)?;
    Ok(w)
}

/// Worst-case size of an encoded image: every pixel as a full RGB(A) chunk.
pub const fn encoded_size_limit(header: &Header) -> usize {
    QOI_HEADER_SIZE
        + header.pixel_count() * (header.channels.bytes_per_pixel() + 1)
        + QOI_END_MARKER.len()
}

pub(crate) fn check_pixel_buffer(header: &Header, pixels: &[u8]) -> Result<(), EncodeError> {
    ensure!(
        pixels.len() == header.raw_len(),
        BufferLengthMismatchSnafu {
            width: header.width,
            height: header.height,
            channels: header.channels as u8,
            expected: header.raw_len(),
            actual: pixels.len(),
        }
    );
    Ok(())
}

impl ChunkWriter for Vec<u8> {
    type Error = Infallible;

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Infallible> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Encoder state: the previous pixel and the color array.
///
/// The state is reset at the start of every encode call.
#[derive(Debug, Clone, Copy)]
pub struct QoiEncodeContext {
    prev: Pixel,
    arr: ColorArray,
}

impl QoiEncodeContext {
    pub const fn new() -> Self {
        Self {
            prev: Pixel::START,
            arr: ColorArray::new(),
        }
    }

    /// The color array as left behind by the last encode call.
    pub fn color_array(&self) -> &ColorArray {
        &self.arr
    }

    /// Encodes a complete image, appending it to `w`.
    ///
    /// Nothing is written if `pixels` doesn't match the header's geometry.
    pub fn encode_to_vec(
        &mut self,
        header: &Header,
        pixels: &[u8],
        w: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        check_pixel_buffer(header, pixels)?;

        w.reserve(QOI_HEADER_SIZE + pixels.len() / 2 + QOI_END_MARKER.len());
        self.encode_chunks(header, pixels, w)
            .unwrap_or_else(|never| match never {});

        Ok(())
    }

    /// Writes header, chunks and end marker. `pixels` must already be checked against `header`.
    pub(crate) fn encode_chunks<W: ChunkWriter + ?Sized>(
        &mut self,
        header: &Header,
        pixels: &[u8],
        w: &mut W,
    ) -> Result<(), W::Error> {
        self.prev = Pixel::START;
        self.arr = ColorArray::new();

        w.write_bytes(&header.to_bytes())?;

        let pixels = pixels
            .chunks_exact(header.channels.bytes_per_pixel())
            .map(Pixel::from_channels);

        for (count, pixel) in pixels.dedup_with_count() {
            let mut repeats = count;

            if pixel != self.prev {
                self.chunk_for(pixel).write_to(w)?;

                // add to color array
                self.arr.store(pixel);
                self.prev = pixel;
                repeats -= 1;
            }

            // already same as prev, no need to touch the color array
            let max_run = usize::from(QOI_MAX_RUN);
            for _ in 0..repeats / max_run {
                Chunk::Run(QOI_MAX_RUN).write_to(w)?;
            }
            let rest = repeats % max_run;
            if rest > 0 {
                Chunk::Run(rest as u8).write_to(w)?;
            }
        }

        w.write_bytes(&QOI_END_MARKER)
    }

    /// Picks the smallest chunk for a pixel that differs from the previous one.
    ///
    /// The order is INDEX, DIFF, LUMA, RGB, RGBA.
    #[inline]
    fn chunk_for(&self, pixel: Pixel) -> Chunk {
        let index = pixel.hash();
        if self.arr.lookup(index) == pixel {
            return Chunk::Index(index);
        }

        let prev = self.prev;
        if pixel.a != prev.a {
            return Chunk::Rgba(pixel.to_rgba());
        }

        let (dr, dg, db) = (diff(pixel.r, prev.r), diff(pixel.g, prev.g), diff(pixel.b, prev.b));

        if matches!((dr, dg, db), (-2..=1, -2..=1, -2..=1)) {
            return Chunk::Diff { dr, dg, db };
        }

        let dr_dg = i16::from(dr) - i16::from(dg);
        let db_dg = i16::from(db) - i16::from(dg);

        if matches!((dr_dg, dg, db_dg), (-8..=7, -32..=31, -8..=7)) {
            Chunk::Luma {
                dg,
                dr_dg: dr_dg as i8,
                db_dg: db_dg as i8,
            }
        } else {
            Chunk::Rgb([pixel.r, pixel.g, pixel.b])
        }
    }
}

impl Default for QoiEncodeContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::QOI_MAGIC;

    fn chunks_of(pixels: &[u8], width: u32, height: u32, channels: u8) -> Vec<u8> {
        let encoded = encode(pixels, width, height, channels, 1).unwrap();
        assert_eq!(&encoded[..4], QOI_MAGIC);
        assert_eq!(&encoded[encoded.len() - 8..], QOI_END_MARKER);
        encoded[QOI_HEADER_SIZE..encoded.len() - 8].to_vec()
    }

    fn repeat(pixel: [u8; 4], count: usize) -> Vec<u8> {
        pixel.iter().copied().cycle().take(4 * count).collect()
    }

    #[test]
    fn writes_header() {
        let encoded = encode(&[0, 42, 66, 255], 1, 1, 4, 1).unwrap();
        assert_eq!(
            encoded,
            [
                b'q', b'o', b'i', b'f', 0, 0, 0, 1, 0, 0, 0, 1, 4, 1, // header
                0xFE, 0, 42, 66, // rgb
                0, 0, 0, 0, 0, 0, 0, 1,
            ]
        );
    }

    #[test]
    fn rgb_and_rgba() {
        let pixels = [0, 42, 66, 255, 0, 24, 66, 255, 34, 20, 4, 255, 6, 66, 166, 255];
        assert_eq!(
            chunks_of(&pixels, 2, 2, 4),
            [0xFE, 0, 42, 66, 0xFE, 0, 24, 66, 0xFE, 34, 20, 4, 0xFE, 6, 66, 166]
        );

        let pixels = [0, 42, 66, 0, 0, 24, 66, 8, 34, 20, 4, 55, 6, 66, 166, 255];
        assert_eq!(
            chunks_of(&pixels, 2, 2, 4),
            [
                0xFF, 0, 42, 66, 0, 0xFF, 0, 24, 66, 8, 0xFF, 34, 20, 4, 55, 0xFF, 6, 66, 166,
                255
            ]
        );
    }

    #[test]
    fn index_for_zero_pixel_in_fresh_array() {
        assert_eq!(chunks_of(&[0, 0, 0, 0], 1, 1, 4), [0b00_000000]);
    }

    #[test]
    fn index_beats_diff_and_luma() {
        // the last pixel is a DIFF of +1 away from its predecessor, but already in the array
        let pixels = [
            100, 100, 100, 255, // rgb
            101, 101, 101, 255, // diff
            100, 100, 100, 255, // index
            101, 101, 101, 255, // index
        ];
        let chunks = chunks_of(&pixels, 4, 1, 4);
        assert_eq!(
            chunks,
            [
                0xFE,
                100,
                100,
                100,
                0b01_111111,
                Pixel::rgb(100, 100, 100).hash(),
                Pixel::rgb(101, 101, 101).hash(),
            ]
        );
    }

    #[test]
    fn index_with_collisions() {
        let pixels = [
            13, 17, 32, 217, // slot 47
            89, 144, 233, 255, // also slot 47
            255, 255, 255, 234, // slot 63
            89, 144, 233, 255, // index 47
            0, 0, 0, 0, // index 0
        ];
        assert_eq!(
            chunks_of(&pixels, 5, 1, 4),
            [
                0xFF, 13, 17, 32, 217, 0xFF, 89, 144, 233, 255, 0xFF, 255, 255, 255, 234,
                0b00_101111, 0b00_000000
            ]
        );
    }

    #[test]
    fn diff_edges() {
        let pixels = [0, 1, 42, 166, 255, 1, 43, 166];
        assert_eq!(
            chunks_of(&pixels, 2, 1, 4),
            [0xFF, 0, 1, 42, 166, 0b01_011011]
        );

        let pixels = [100, 100, 100, 255, 101, 101, 101, 255];
        assert_eq!(chunks_of(&pixels, 2, 1, 4)[4..], [0b01_111111]);

        // +2 on red is out of range for DIFF, but fits LUMA
        let pixels = [100, 100, 100, 255, 102, 100, 100, 255];
        assert_eq!(
            chunks_of(&pixels, 2, 1, 4)[4..],
            [0b10_100000, 0b1010_1000]
        );
    }

    #[test]
    fn luma_edges() {
        let pixels = [0, 1, 42, 166, 243, 252, 44, 166];
        assert_eq!(
            chunks_of(&pixels, 2, 1, 4),
            [0xFF, 0, 1, 42, 166, 0b10_011011, 0b0000_1111]
        );

        // dg = +31, dr - dg = +7, db - dg = -8
        let pixels = [100, 100, 100, 255, 138, 131, 123, 255];
        assert_eq!(
            chunks_of(&pixels, 2, 1, 4)[4..],
            [0b10_111111, 0b1111_0000]
        );

        // dg = +32 doesn't fit anymore
        let pixels = [100, 100, 100, 255, 132, 132, 132, 255];
        assert_eq!(chunks_of(&pixels, 2, 1, 4)[4..], [0xFE, 132, 132, 132]);
    }

    #[test]
    fn alpha_change_forces_rgba() {
        let pixels = [100, 100, 100, 255, 100, 100, 101, 254];
        assert_eq!(
            chunks_of(&pixels, 2, 1, 4)[4..],
            [0xFF, 100, 100, 101, 254]
        );
    }

    #[test]
    fn runs() {
        let pixel = [0, 1, 42, 166];

        assert_eq!(
            chunks_of(&repeat(pixel, 2), 2, 1, 4),
            [0xFF, 0, 1, 42, 166, 0b11_000000]
        );
        assert_eq!(
            chunks_of(&repeat(pixel, 42), 7, 6, 4),
            [0xFF, 0, 1, 42, 166, 0b11_101000]
        );
        // 1 explicit pixel + a maximal run
        assert_eq!(
            chunks_of(&repeat(pixel, 63), 21, 3, 4),
            [0xFF, 0, 1, 42, 166, 0b11_111101]
        );
        // the 64th pixel starts a new run
        assert_eq!(
            chunks_of(&repeat(pixel, 64), 32, 2, 4),
            [0xFF, 0, 1, 42, 166, 0b11_111101, 0b11_000000]
        );
    }

    #[test]
    fn run_of_start_pixel() {
        let chunks = chunks_of(&repeat([0, 0, 0, 255], 62), 62, 1, 4);
        assert_eq!(chunks, [0b11_111101]);

        let chunks = chunks_of(&repeat([0, 0, 0, 255], 63), 63, 1, 4);
        assert_eq!(chunks, [0b11_111101, 0b11_000000]);
    }

    #[test]
    fn runs_leave_color_array_alone() {
        let header = Header::new(3, 1, 4, 0).unwrap();
        let mut ctx = QoiEncodeContext::new();
        let mut w = Vec::new();
        ctx.encode_to_vec(&header, &repeat([0, 0, 0, 255], 3), &mut w)
            .unwrap();

        assert_eq!(ctx.color_array(), &ColorArray::new());
    }

    #[test]
    fn rgb_images_stay_opaque() {
        let pixels = [100, 2, 3, 200, 100, 0];
        assert_eq!(
            chunks_of(&pixels, 2, 1, 3),
            [0xFE, 100, 2, 3, 0xFE, 200, 100, 0]
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            encode(&[], 0, 0, 4, 0),
            Err(EncodeError::InvalidHeader {
                source: HeaderError::ZeroDimension { .. }
            })
        ));
        assert!(matches!(
            encode(&[0; 2], 1, 1, 2, 0),
            Err(EncodeError::InvalidHeader {
                source: HeaderError::UnsupportedChannelCount { channels: 2 }
            })
        ));
        assert!(matches!(
            encode(&[0; 7], 2, 1, 4, 0),
            Err(EncodeError::BufferLengthMismatch {
                expected: 8,
                actual: 7,
                ..
            })
        ));
    }

    #[test]
    fn nothing_written_on_error() {
        let header = Header::new(2, 1, 3, 0).unwrap();
        let mut w = vec![9];
        assert!(QoiEncodeContext::new()
            .encode_to_vec(&header, &[0; 5], &mut w)
            .is_err());
        assert_eq!(w, [9]);
    }

    #[test]
    fn size_limit_holds() {
        let header = Header::new(3, 2, 4, 0).unwrap();
        let pixels: Vec<u8> = (0..24u8).map(|i| i.wrapping_mul(97)).collect();

        let mut w = Vec::new();
        QoiEncodeContext::new()
            .encode_to_vec(&header, &pixels, &mut w)
            .unwrap();
        assert!(w.len() <= encoded_size_limit(&header));
        assert_eq!(encoded_size_limit(&header), 14 + 6 * 5 + 8);
    }
}
