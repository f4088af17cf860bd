use crate::{
    decode::{DecodeError, QoiDecodeContext},
    encode::{check_pixel_buffer, EncodeError, InvalidHeaderSnafu, QoiEncodeContext},
    header::{Channels, Colorspace, Header},
    utils::Pixel,
};
use alloc::vec::Vec;
use snafu::ResultExt;

/// An owned, decoded image: a header plus its raw, row-major pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QoiImage {
    header: Header,
    pixels: Vec<u8>,
}

impl QoiImage {
    /// Wraps a raw pixel buffer, which has to match the given geometry exactly.
    pub fn new(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        channels: Channels,
        colorspace: Colorspace,
    ) -> Result<Self, EncodeError> {
        let header = Header::new(width, height, channels as u8, colorspace as u8)
            .context(InvalidHeaderSnafu)?;
        check_pixel_buffer(&header, &pixels)?;

        Ok(Self { header, pixels })
    }

    /// Decodes an encoded image, keeping the channel count of its header.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut pixels = Vec::new();
        let header = QoiDecodeContext::new().decode_to_vec(data, None, &mut pixels)?;
        Ok(Self { header, pixels })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Vec::new();
        QoiEncodeContext::new()
            .encode_chunks(&self.header, &self.pixels, &mut w)
            .unwrap_or_else(|never| match never {});
        w
    }

    /// The pixel at column `x` of row `y`, or `None` if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        if x >= self.header.width || y >= self.header.height {
            return None;
        }

        let bpp = self.header.channels.bytes_per_pixel();
        let start = (y as usize * self.header.width as usize + x as usize) * bpp;
        self.pixels
            .get(start..start + bpp)
            .map(Pixel::from_channels)
    }

    pub fn width(&self) -> u32 {
        self.header.width
    }

    pub fn height(&self) -> u32 {
        self.header.height
    }

    pub fn channels(&self) -> Channels {
        self.header.channels
    }

    pub fn colorspace(&self) -> Colorspace {
        self.header.colorspace
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

#[cfg(feature = "std")]
pub use file_api::{OpenError, SaveError};

#[cfg(feature = "std")]
mod file_api {
    use super::QoiImage;
    use crate::decode::DecodeError;
    use snafu::{ResultExt, Snafu};
    use std::{
        fs,
        io::{self, BufWriter, Write},
        path::{Path, PathBuf},
    };

    #[derive(Debug, Snafu)]
    pub enum OpenError {
        #[snafu(display("failed to read {}", path.display()))]
        Read { source: io::Error, path: PathBuf },
        #[snafu(display("failed to decode {}", path.display()))]
        Decode { source: DecodeError, path: PathBuf },
    }

    #[derive(Debug, Snafu)]
    pub enum SaveError {
        #[snafu(display("failed to write {}", path.display()))]
        Write { source: io::Error, path: PathBuf },
    }

    impl QoiImage {
        /// Reads and decodes an image file.
        pub fn open(path: impl AsRef<Path>) -> Result<Self, OpenError> {
            let path = path.as_ref();
            let data = fs::read(path).context(ReadSnafu { path })?;

            log::debug!("read {} bytes from {}", data.len(), path.display());
            Self::from_bytes(&data).context(DecodeSnafu { path })
        }

        /// Encodes the image into a file, replacing it if it exists.
        pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SaveError> {
            let path = path.as_ref();
            let encoded = self.encode();

            let mut w = BufWriter::new(fs::File::create(path).context(WriteSnafu { path })?);
            w.write_all(&encoded)
                .and_then(|()| w.flush())
                .context(WriteSnafu { path })?;

            log::debug!("wrote {} bytes to {}", encoded.len(), path.display());
            Ok(())
        }
    }
}
