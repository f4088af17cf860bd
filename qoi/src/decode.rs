use crate::{
    chunk::Chunk,
    color_array::ColorArray,
    consts::{QOI_END_MARKER, QOI_HEADER_SIZE},
    header::{Channels, Header, HeaderError},
    utils::Pixel,
};
use snafu::{ensure, OptionExt, ResultExt, Snafu};

#[cfg(feature = "alloc")]
mod alloc_api;
#[cfg(feature = "alloc")]
pub use alloc_api::*;

#[derive(Debug, Snafu)]
#[snafu(module)]
pub enum DecodeError {
    #[snafu(display("invalid image header"))]
    InvalidHeader { source: HeaderError },
    #[snafu(display("stream ended after {decoded} of {expected} pixels"))]
    TruncatedStream { decoded: usize, expected: usize },
    #[snafu(display("run of {run} pixels exceeds the {remaining} pixels left in the image"))]
    RunOverflow { run: u8, remaining: usize },
    #[snafu(display("output holds {available} pixels, but the image has {required}"))]
    OutputTooSmall { required: usize, available: usize },
    #[snafu(display("stream does not end with the end marker"))]
    InvalidEndMarker,
}

/// Decoder state: the previous pixel and the color array, plus decoding options.
///
/// The state is reset at the start of every decode call, so a context can be reused for any
/// number of images.
#[derive(Debug, Clone)]
pub struct QoiDecodeContext {
    prev: Pixel,
    arr: ColorArray,
    strict_end_marker: bool,
}

impl QoiDecodeContext {
    pub const fn new() -> Self {
        Self {
            prev: Pixel::START,
            arr: ColorArray::new(),
            strict_end_marker: false,
        }
    }

    /// Whether a missing or malformed end marker fails the decode. If not (the default), it is
    /// only logged.
    pub const fn strict_end_marker(mut self, strict: bool) -> Self {
        self.strict_end_marker = strict;
        self
    }

    /// The color array as left behind by the last decode call.
    pub fn color_array(&self) -> &ColorArray {
        &self.arr
    }

    #[cfg(test)]
    pub(crate) fn prev(&self) -> Pixel {
        self.prev
    }

    /// Decodes a complete image into `output`.
    ///
    /// Either all `width * height` pixels are written, or an error is returned.
    pub fn decode(
        &mut self,
        data: &[u8],
        mut output: impl DecodeOutput,
    ) -> Result<Header, DecodeError> {
        self.prev = Pixel::START;
        self.arr = ColorArray::new();

        let header = Header::parse(data).context(decode_error::InvalidHeaderSnafu)?;
        let data = &data[QOI_HEADER_SIZE..];
        let pixel_count = header.pixel_count();

        log::debug!(
            "decoding {}x{} image, {:?}, {:?}, {} bytes of chunks",
            header.width,
            header.height,
            header.channels,
            header.colorspace,
            data.len(),
        );

        output.prepare(&header, data.len());
        if let Some(available) = output.max_len() {
            ensure!(
                available >= pixel_count,
                decode_error::OutputTooSmallSnafu {
                    required: pixel_count,
                    available
                }
            );
        }

        let mut bytes = data.iter();
        let mut position = 0;

        while position < pixel_count {
            let chunk = Chunk::read(&mut bytes).context(decode_error::TruncatedStreamSnafu {
                decoded: position,
                expected: pixel_count,
            })?;

            let pixel = match chunk {
                Chunk::Run(run) => {
                    let remaining = pixel_count - position;
                    ensure!(
                        usize::from(run) <= remaining,
                        decode_error::RunOverflowSnafu { run, remaining }
                    );

                    // the previous pixel isn't necessarily stored yet at the very start
                    self.arr.store(self.prev);
                    output.write_many_pixels(self.prev, usize::from(run));
                    position += usize::from(run);
                    continue;
                }
                Chunk::Index(index) => {
                    // already in arr
                    let pixel = self.arr.lookup(index);
                    self.set_pixel(pixel, &mut output);
                    position += 1;
                    continue;
                }
                Chunk::Diff { dr, dg, db } => self.prev.offset(dr, dg, db),
                Chunk::Luma { dg, dr_dg, db_dg } => self.prev.offset(dr_dg + dg, dg, db_dg + dg),
                Chunk::Rgb([r, g, b]) => Pixel::new(r, g, b, self.prev.a),
                Chunk::Rgba(rgba) => Pixel::from(rgba),
            };

            self.arr.store(pixel);
            self.set_pixel(pixel, &mut output);
            position += 1;
        }

        debug_assert_eq!(output.current_output_position(), pixel_count);

        let trailer = bytes.as_slice();
        if trailer != QOI_END_MARKER {
            ensure!(!self.strict_end_marker, decode_error::InvalidEndMarkerSnafu);
            log::warn!(
                "image stream does not end with the end marker, {} trailing bytes: {:02x?}",
                trailer.len(),
                &trailer[..trailer.len().min(QOI_END_MARKER.len())],
            );
        }

        log::debug!("decoded {position} pixels");

        Ok(header)
    }

    /// Decodes a complete image into `output`, which must be large enough to hold it.
    ///
    /// `channels` picks the layout of the output, `None` uses the channel count from the header.
    /// Returns the number of pixels written.
    pub fn decode_to_slice(
        &mut self,
        data: &[u8],
        channels: Option<Channels>,
        output: &mut [u8],
    ) -> Result<(usize, Header), DecodeError> {
        let header = self.decode(data, SliceDecodeOutput::new(output, channels))?;
        Ok((header.pixel_count(), header))
    }

    #[inline(always)]
    fn set_pixel(&mut self, pixel: Pixel, output: &mut impl DecodeOutput) {
        self.prev = pixel;
        output.write_pixel(pixel);
    }
}

impl Default for QoiDecodeContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Destination for decoded pixels.
pub trait DecodeOutput {
    /// Called once the header is parsed, before any pixel is written. `input_len` is the number
    /// of bytes following the header.
    fn prepare(&mut self, header: &Header, input_len: usize);

    fn write_pixel(&mut self, pixel: Pixel);
    fn write_many_pixels(&mut self, pixel: Pixel, count: usize);

    /// Returns the maximum number of pixels that can be written to the output.
    ///
    /// `None` if the output is unbounded.
    fn max_len(&self) -> Option<usize>;
    fn current_output_position(&self) -> usize;
}

impl<T: DecodeOutput + ?Sized> DecodeOutput for &mut T {
    fn prepare(&mut self, header: &Header, input_len: usize) {
        (**self).prepare(header, input_len)
    }

    fn write_pixel(&mut self, pixel: Pixel) {
        (**self).write_pixel(pixel)
    }

    fn write_many_pixels(&mut self, pixel: Pixel, count: usize) {
        (**self).write_many_pixels(pixel, count)
    }

    fn max_len(&self) -> Option<usize> {
        (**self).max_len()
    }

    fn current_output_position(&self) -> usize {
        (**self).current_output_position()
    }
}

/// Writes raw pixels into a caller-provided buffer, without allocating.
pub struct SliceDecodeOutput<'a> {
    output: &'a mut [u8],
    requested: Option<Channels>,
    channels: Channels,
    output_idx: usize,
}

impl<'a> SliceDecodeOutput<'a> {
    /// `channels` picks the raw layout, `None` uses the channel count from the header.
    pub fn new(output: &'a mut [u8], channels: Option<Channels>) -> Self {
        Self {
            output,
            requested: channels,
            channels: channels.unwrap_or(Channels::Rgba),
            output_idx: 0,
        }
    }
}

impl DecodeOutput for SliceDecodeOutput<'_> {
    fn prepare(&mut self, header: &Header, _input_len: usize) {
        self.channels = self.requested.unwrap_or(header.channels);
        self.output_idx = 0;
    }

    #[inline]
    fn write_pixel(&mut self, pixel: Pixel) {
        let n = self.channels.bytes_per_pixel();
        let start = self.output_idx * n;
        self.output[start..start + n].copy_from_slice(&pixel.to_rgba()[..n]);
        self.output_idx += 1;
    }

    #[inline]
    fn write_many_pixels(&mut self, pixel: Pixel, count: usize) {
        let n = self.channels.bytes_per_pixel();
        let start = self.output_idx * n;
        let rgba = pixel.to_rgba();
        for dst in self.output[start..start + count * n].chunks_exact_mut(n) {
            dst.copy_from_slice(&rgba[..n]);
        }
        self.output_idx += count;
    }

    fn max_len(&self) -> Option<usize> {
        Some(self.output.len() / self.channels.bytes_per_pixel())
    }

    fn current_output_position(&self) -> usize {
        self.output_idx
    }
}
