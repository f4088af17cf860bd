use crate::{
    decode::{DecodeError, DecodeOutput, QoiDecodeContext},
    header::{Channels, Header},
    utils::Pixel,
};
use alloc::vec::Vec;

/// Upper bound of pixels a single input byte can produce (one maximal run).
const MAX_PIXELS_PER_BYTE: usize = 62;

/// Decodes a complete image into a newly allocated raw pixel buffer, with the channel count
/// declared in its header.
pub fn decode(data: &[u8]) -> Result<(Vec<u8>, Header), DecodeError> {
    let mut pixels = Vec::new();
    let header = QoiDecodeContext::new().decode_to_vec(data, None, &mut pixels)?;
    Ok((pixels, header))
}

impl QoiDecodeContext {
    /// Decodes a complete image, appending the raw pixels to `w`.
    ///
    /// `channels` picks the layout of the output, `None` uses the channel count from the header.
    /// On error, `w` is left as it was.
    pub fn decode_to_vec(
        &mut self,
        data: &[u8],
        channels: Option<Channels>,
        w: &mut Vec<u8>,
    ) -> Result<Header, DecodeError> {
        let start = w.len();

        self.decode(data, VecDecodeOutput::new(w, channels))
            .map_err(|e| {
                w.truncate(start);
                e
            })
    }
}

/// Appends raw pixels to a `Vec`.
pub struct VecDecodeOutput<'a> {
    output: &'a mut Vec<u8>,
    requested: Option<Channels>,
    channels: Channels,
    start: usize,
}

impl<'a> VecDecodeOutput<'a> {
    /// `channels` picks the raw layout, `None` uses the channel count from the header.
    pub fn new(output: &'a mut Vec<u8>, channels: Option<Channels>) -> Self {
        let start = output.len();
        Self {
            output,
            requested: channels,
            channels: channels.unwrap_or(Channels::Rgba),
            start,
        }
    }
}

impl DecodeOutput for VecDecodeOutput<'_> {
    fn prepare(&mut self, header: &Header, input_len: usize) {
        self.channels = self.requested.unwrap_or(header.channels);

        // the header alone can't be trusted to size the allocation
        let pixels = header
            .pixel_count()
            .min(input_len.saturating_mul(MAX_PIXELS_PER_BYTE));
        self.output
            .reserve(pixels * self.channels.bytes_per_pixel());
    }

    #[inline]
    fn write_pixel(&mut self, pixel: Pixel) {
        let n = self.channels.bytes_per_pixel();
        self.output.extend_from_slice(&pixel.to_rgba()[..n]);
    }

    #[inline]
    fn write_many_pixels(&mut self, pixel: Pixel, count: usize) {
        let n = self.channels.bytes_per_pixel();
        let rgba = pixel.to_rgba();
        self.output
            .extend(core::iter::repeat(&rgba[..n]).take(count).flatten());
    }

    fn max_len(&self) -> Option<usize> {
        None
    }

    fn current_output_position(&self) -> usize {
        (self.output.len() - self.start) / self.channels.bytes_per_pixel()
    }
}
