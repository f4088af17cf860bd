use crate::consts::{QOI_HEADER_SIZE, QOI_MAGIC, QOI_PIXELS_MAX};
use byteorder::{BigEndian, ByteOrder};
use snafu::{ensure, Snafu};

#[derive(Debug, Snafu)]
pub enum HeaderError {
    #[snafu(display("expected at least {QOI_HEADER_SIZE} header bytes, got {len}"))]
    UnexpectedEof { len: usize },
    #[snafu(display("invalid magic bytes {magic:02x?}, expected `qoif`"))]
    InvalidMagic { magic: [u8; 4] },
    #[snafu(display("image dimensions must be non-zero, got {width}x{height}"))]
    ZeroDimension { width: u32, height: u32 },
    #[snafu(display("unsupported channel count {channels}, expected 3 or 4"))]
    UnsupportedChannelCount { channels: u8 },
    #[snafu(display("invalid colorspace {colorspace}, expected 0 or 1"))]
    InvalidColorspace { colorspace: u8 },
    #[snafu(display(
        "{width}x{height} image exceeds the limit of {QOI_PIXELS_MAX} pixels"
    ))]
    TooManyPixels { width: u32, height: u32 },
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Rgb = 3,
    Rgba = 4,
}

impl Channels {
    /// Number of bytes per pixel in a raw buffer.
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for Channels {
    type Error = HeaderError;

    fn try_from(channels: u8) -> Result<Self, Self::Error> {
        match channels {
            3 => Ok(Channels::Rgb),
            4 => Ok(Channels::Rgba),
            _ => UnsupportedChannelCountSnafu { channels }.fail(),
        }
    }
}

/// Stored in the header and handed back on decode, but never interpreted.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colorspace {
    /// sRGB color channels with linear alpha.
    #[default]
    Srgb = 0,
    /// All channels linear.
    Linear = 1,
}

impl TryFrom<u8> for Colorspace {
    type Error = HeaderError;

    fn try_from(colorspace: u8) -> Result<Self, Self::Error> {
        match colorspace {
            0 => Ok(Colorspace::Srgb),
            1 => Ok(Colorspace::Linear),
            _ => InvalidColorspaceSnafu { colorspace }.fail(),
        }
    }
}

/// A validated image header: both dimensions are non-zero and the pixel count is within
/// [`QOI_PIXELS_MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub width: u32,
    pub height: u32,
    pub channels: Channels,
    pub colorspace: Colorspace,
}

impl Header {
    pub fn new(width: u32, height: u32, channels: u8, colorspace: u8) -> Result<Self, HeaderError> {
        ensure!(width != 0 && height != 0, ZeroDimensionSnafu { width, height });

        let channels = Channels::try_from(channels)?;
        let colorspace = Colorspace::try_from(colorspace)?;

        ensure!(
            u64::from(width) * u64::from(height) <= QOI_PIXELS_MAX as u64,
            TooManyPixelsSnafu { width, height }
        );

        Ok(Self {
            width,
            height,
            channels,
            colorspace,
        })
    }

    /// Parses and validates the first [`QOI_HEADER_SIZE`] bytes of `data`.
    pub fn parse(data: &[u8]) -> Result<Self, HeaderError> {
        ensure!(
            data.len() >= QOI_HEADER_SIZE,
            UnexpectedEofSnafu { len: data.len() }
        );

        let magic = [data[0], data[1], data[2], data[3]];
        ensure!(magic == QOI_MAGIC, InvalidMagicSnafu { magic });

        let width = BigEndian::read_u32(&data[4..8]);
        let height = BigEndian::read_u32(&data[8..12]);

        Self::new(width, height, data[12], data[13])
    }

    pub fn to_bytes(&self) -> [u8; QOI_HEADER_SIZE] {
        let mut header = [0; QOI_HEADER_SIZE];
        header[..4].copy_from_slice(&QOI_MAGIC);
        BigEndian::write_u32(&mut header[4..8], self.width);
        BigEndian::write_u32(&mut header[8..12], self.height);
        header[12] = self.channels as u8;
        header[13] = self.colorspace as u8;
        header
    }

    #[inline]
    pub const fn pixel_count(&self) -> usize {
        // Can't overflow, the product is capped at QOI_PIXELS_MAX.
        self.width as usize * self.height as usize
    }

    /// Length of the raw pixel buffer in bytes.
    #[inline]
    pub const fn raw_len(&self) -> usize {
        self.pixel_count() * self.channels.bytes_per_pixel()
    }
}
