use crate::{
    chunk::ChunkWriter,
    encode::{check_pixel_buffer, EncodeError, QoiEncodeContext},
    header::Header,
};
use snafu::{ResultExt, Snafu};
use std::io::Write;

#[derive(Debug, Snafu)]
pub enum EncodeToWriterError {
    #[snafu(display("{source}"))]
    Encode { source: EncodeError },
    #[snafu(display("failed to write encoded image"))]
    WriteIo { source: std::io::Error },
}

struct IoChunkWriter<W>(W);

impl<W: Write> ChunkWriter for IoChunkWriter<W> {
    type Error = std::io::Error;

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.0.write_all(bytes)
    }
}

impl QoiEncodeContext {
    /// Encodes a complete image into `w`, chunk by chunk.
    ///
    /// The pixel buffer is checked before anything is written. Wrap unbuffered writers in a
    /// [`std::io::BufWriter`], since chunks are mostly single bytes.
    pub fn encode<W: Write>(
        &mut self,
        header: &Header,
        pixels: &[u8],
        w: W,
    ) -> Result<(), EncodeToWriterError> {
        check_pixel_buffer(header, pixels).context(EncodeSnafu)?;

        self.encode_chunks(header, pixels, &mut IoChunkWriter(w))
            .context(WriteIoSnafu)
    }
}
