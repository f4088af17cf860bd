use crate::consts::*;

/// A single chunk of the stream, with its bias already removed.
///
/// See [consts](crate::consts) for the bit layout of each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk {
    /// Index into the color array, `0..=63`.
    Index(u8),
    /// Per-channel differences to the previous pixel, each `-2..=1`.
    Diff { dr: i8, dg: i8, db: i8 },
    /// Green difference to the previous pixel (`-32..=31`), and the red and blue differences
    /// relative to it (`-8..=7`).
    Luma { dg: i8, dr_dg: i8, db_dg: i8 },
    /// Number of repetitions of the previous pixel, `1..=62`.
    Run(u8),
    Rgb([u8; 3]),
    Rgba([u8; 4]),
}

/// Sink for encoded chunk bytes.
pub trait ChunkWriter {
    type Error;

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

impl Chunk {
    /// Reads the next chunk from `bytes`.
    ///
    /// Returns `None` if the input ends before the chunk is complete.
    #[inline]
    pub fn read(bytes: &mut core::slice::Iter<'_, u8>) -> Option<Self> {
        let mut next = || bytes.next().copied();

        let byte = next()?;
        let chunk = match byte {
            QOI_OP_RGB => Chunk::Rgb([next()?, next()?, next()?]),
            QOI_OP_RGBA => Chunk::Rgba([next()?, next()?, next()?, next()?]),
            _ => match byte & QOI_MASK_2 {
                QOI_OP_INDEX => Chunk::Index(byte),
                QOI_OP_DIFF => Chunk::Diff {
                    dr: ((byte >> 4) & 0b11) as i8 - 2,
                    dg: ((byte >> 2) & 0b11) as i8 - 2,
                    db: (byte & 0b11) as i8 - 2,
                },
                QOI_OP_LUMA => {
                    let rb_diffs = next()?;
                    Chunk::Luma {
                        dg: (byte & 0b0011_1111) as i8 - 32,
                        dr_dg: (rb_diffs >> 4) as i8 - 8,
                        db_dg: (rb_diffs & 0b1111) as i8 - 8,
                    }
                }
                _ => Chunk::Run((byte & 0b0011_1111) + 1),
            },
        };

        Some(chunk)
    }

    /// Number of bytes this chunk occupies in the stream.
    pub const fn encoded_len(&self) -> usize {
        match self {
            Chunk::Index(_) | Chunk::Diff { .. } | Chunk::Run(_) => 1,
            Chunk::Luma { .. } => 2,
            Chunk::Rgb(_) => 4,
            Chunk::Rgba(_) => 5,
        }
    }

    /// Serializes this chunk, re-applying the biases.
    ///
    /// Field values outside of the ranges documented on the variants produce a corrupt stream.
    #[inline]
    pub fn write_to<W: ChunkWriter + ?Sized>(self, w: &mut W) -> Result<(), W::Error> {
        match self {
            Chunk::Index(index) => {
                debug_assert!(index < 64);
                w.write_bytes(&[QOI_OP_INDEX | index])
            }
            Chunk::Diff { dr, dg, db } => {
                debug_assert!(matches!((dr, dg, db), (-2..=1, -2..=1, -2..=1)));
                let mut b = QOI_OP_DIFF;
                b |= ((dr + 2) as u8) << 4;
                b |= ((dg + 2) as u8) << 2;
                b |= (db + 2) as u8;
                w.write_bytes(&[b])
            }
            Chunk::Luma { dg, dr_dg, db_dg } => {
                debug_assert!(matches!((dr_dg, dg, db_dg), (-8..=7, -32..=31, -8..=7)));
                w.write_bytes(&[
                    QOI_OP_LUMA | (dg + 32) as u8,
                    ((dr_dg + 8) as u8) << 4 | (db_dg + 8) as u8,
                ])
            }
            Chunk::Run(run) => {
                debug_assert!((1..=QOI_MAX_RUN).contains(&run));
                w.write_bytes(&[QOI_OP_RUN | (run - 1)])
            }
            Chunk::Rgb([r, g, b]) => w.write_bytes(&[QOI_OP_RGB, r, g, b]),
            Chunk::Rgba([r, g, b, a]) => w.write_bytes(&[QOI_OP_RGBA, r, g, b, a]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{convert::Infallible, vec::Vec};

    struct Bytes(Vec<u8>);

    impl ChunkWriter for Bytes {
        type Error = Infallible;

        fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Infallible> {
            self.0.extend_from_slice(bytes);
            Ok(())
        }
    }

    fn read_all(data: &[u8]) -> Vec<Chunk> {
        let mut bytes = data.iter();
        core::iter::from_fn(|| Chunk::read(&mut bytes)).collect()
    }

    fn bytes_of(chunk: Chunk) -> Vec<u8> {
        let mut w = Bytes(Vec::new());
        chunk.write_to(&mut w).unwrap();
        assert_eq!(w.0.len(), chunk.encoded_len());
        w.0
    }

    #[test]
    fn reads_every_tag() {
        let data = [
            0xFF, 0, 1, 42, 166, // rgba
            0xFE, 0, 42, 66, // rgb
            0b00_101111, // index
            0b01_011011, // diff
            0b10_011011, 0b0000_1111, // luma
            0b11_000000, // run of 1
            0b11_111101, // run of 62
        ];

        assert_eq!(
            read_all(&data),
            [
                Chunk::Rgba([0, 1, 42, 166]),
                Chunk::Rgb([0, 42, 66]),
                Chunk::Index(47),
                Chunk::Diff {
                    dr: -1,
                    dg: 0,
                    db: 1
                },
                Chunk::Luma {
                    dg: -5,
                    dr_dg: -8,
                    db_dg: 7
                },
                Chunk::Run(1),
                Chunk::Run(62),
            ]
        );
    }

    #[test]
    fn incomplete_chunks() {
        for data in [
            &[0xFF, 1, 2, 3][..],
            &[0xFE, 1, 2],
            &[0b10_000000],
            &[],
        ] {
            assert_eq!(Chunk::read(&mut data.iter()), None, "{data:?}");
        }
    }

    #[test]
    fn writes_boundary_values() {
        assert_eq!(
            bytes_of(Chunk::Diff {
                dr: 1,
                dg: 1,
                db: 1
            }),
            [0b01_111111]
        );
        assert_eq!(
            bytes_of(Chunk::Diff {
                dr: -2,
                dg: -2,
                db: -2
            }),
            [0b01_000000]
        );
        assert_eq!(
            bytes_of(Chunk::Luma {
                dg: 31,
                dr_dg: 7,
                db_dg: -8
            }),
            [0b10_111111, 0b1111_0000]
        );
        assert_eq!(bytes_of(Chunk::Run(62)), [0b11_111101]);
        assert_eq!(bytes_of(Chunk::Run(1)), [0b11_000000]);
        assert_eq!(bytes_of(Chunk::Index(63)), [0b00_111111]);
        assert_eq!(bytes_of(Chunk::Rgb([1, 2, 3])), [0xFE, 1, 2, 3]);
        assert_eq!(bytes_of(Chunk::Rgba([1, 2, 3, 4])), [0xFF, 1, 2, 3, 4]);
    }

    #[test]
    fn write_then_read_is_identity() {
        let chunks = [
            Chunk::Index(12),
            Chunk::Diff {
                dr: 0,
                dg: -2,
                db: 1,
            },
            Chunk::Luma {
                dg: -32,
                dr_dg: 3,
                db_dg: -1,
            },
            Chunk::Run(33),
            Chunk::Rgb([255, 254, 253]),
            Chunk::Rgba([9, 8, 7, 6]),
        ];

        let mut w = Bytes(Vec::new());
        for chunk in chunks {
            chunk.write_to(&mut w).unwrap();
        }

        assert_eq!(read_all(&w.0), chunks);
    }
}
