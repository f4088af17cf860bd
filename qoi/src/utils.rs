/// A single pixel. Images with 3 channels are handled with an alpha value of 255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    /// The all-zero pixel every [`ColorArray`](crate::ColorArray) slot starts out with.
    pub const ZERO: Pixel = Pixel::new(0, 0, 0, 0);

    /// The "previous pixel" both encoder and decoder start out with.
    pub const START: Pixel = Pixel::new(0, 0, 0, 255);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque pixel.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Reads a pixel from 3 (RGB) or 4 (RGBA) raw channel bytes.
    ///
    /// # Panics
    ///
    /// Panics if fewer than 3 bytes are given.
    #[inline]
    pub fn from_channels(channels: &[u8]) -> Self {
        match *channels {
            [r, g, b, a, ..] => Self::new(r, g, b, a),
            [r, g, b] => Self::rgb(r, g, b),
            _ => panic!("a pixel needs at least 3 channels, got {}", channels.len()),
        }
    }

    #[inline]
    pub const fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Index of this pixel in the color array: `(r * 3 + g * 5 + b * 7 + a * 11) % 64`.
    #[inline]
    pub const fn hash(self) -> u8 {
        // 64 divides 256, so wrapping u8 arithmetic yields the same remainder.
        self.r
            .wrapping_mul(3)
            .wrapping_add(self.g.wrapping_mul(5))
            .wrapping_add(self.b.wrapping_mul(7))
            .wrapping_add(self.a.wrapping_mul(11))
            & 0b0011_1111 // % 64
    }

    /// Applies signed per-channel differences, wrapping around. Alpha is kept.
    #[inline]
    pub const fn offset(self, r_diff: i8, g_diff: i8, b_diff: i8) -> Self {
        Self::new(
            self.r.wrapping_add_signed(r_diff),
            self.g.wrapping_add_signed(g_diff),
            self.b.wrapping_add_signed(b_diff),
            self.a,
        )
    }
}

impl From<[u8; 4]> for Pixel {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self::new(r, g, b, a)
    }
}

impl From<[u8; 3]> for Pixel {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

/// Computes the signed, wrapping difference `a - b` of two channel values.
#[inline]
pub const fn diff(a: u8, b: u8) -> i8 {
    a.wrapping_sub(b) as i8
}
