use crate::utils::Pixel;

/// The running array of recently seen pixels, addressed by [`Pixel::hash`].
///
/// Every encode or decode call starts out with a fresh, all-zero array. Colliding pixels simply
/// overwrite each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorArray {
    arr: [Pixel; 64],
}

impl ColorArray {
    pub const fn new() -> Self {
        Self {
            arr: [Pixel::ZERO; 64],
        }
    }

    /// Returns the pixel currently stored at `index`. Only the low 6 bits of `index` are used.
    #[inline]
    pub const fn lookup(&self, index: u8) -> Pixel {
        self.arr[(index & 0b0011_1111) as usize]
    }

    /// Stores `pixel` in its hash slot, replacing whatever was there.
    #[inline]
    pub fn store(&mut self, pixel: Pixel) {
        self.arr[usize::from(pixel.hash())] = pixel;
    }

    #[cfg(test)]
    pub(crate) fn slots(&self) -> &[Pixel; 64] {
        &self.arr
    }
}

impl Default for ColorArray {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let arr = ColorArray::new();
        assert!(arr.slots().iter().all(|&p| p == Pixel::ZERO));
        assert_eq!(arr.lookup(53), Pixel::ZERO);
    }

    #[test]
    fn store_uses_hash_slot() {
        let mut arr = ColorArray::new();
        let pixel = Pixel::new(255, 255, 255, 240);
        arr.store(pixel);

        assert_eq!(arr.lookup(1), pixel);
        assert_eq!(arr.slots().iter().filter(|&&p| p != Pixel::ZERO).count(), 1);
    }

    #[test]
    fn collisions_overwrite() {
        let mut arr = ColorArray::new();
        arr.store(Pixel::new(89, 144, 233, 255));
        arr.store(Pixel::new(13, 17, 32, 217));

        assert_eq!(arr.lookup(47), Pixel::new(13, 17, 32, 217));
    }

    #[test]
    fn lookup_masks_index() {
        let mut arr = ColorArray::new();
        arr.store(Pixel::new(255, 255, 255, 234));

        assert_eq!(arr.lookup(63), arr.lookup(0b1111_1111));
    }
}
