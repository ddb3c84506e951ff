//! Known-size regime: stateless reseek-and-read on every chunk request.

use super::Chunk;
use crate::error::{UploadError, UploadResult};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, SeekFrom};

pub struct SizedWindower {
    reader: Box<dyn AsyncRead + AsyncSeek + Unpin + Send>,
    total_len: u64,
    chunk_size: u64,
}

impl SizedWindower {
    pub(crate) fn new(
        reader: Box<dyn AsyncRead + AsyncSeek + Unpin + Send>,
        total_len: u64,
        chunk_size: u64,
    ) -> Self {
        Self {
            reader,
            total_len,
            chunk_size,
        }
    }

    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    /// Produce the chunk starting at `bytes_sent`: seek there, read exactly
    /// `min(chunk_size, total_len - bytes_sent)` bytes (looping over short reads).
    pub async fn next_chunk(&mut self, bytes_sent: u64) -> UploadResult<Chunk> {
        let remaining = self.total_len.saturating_sub(bytes_sent);
        let chunk_len = remaining.min(self.chunk_size);

        self.reader
            .seek(SeekFrom::Start(bytes_sent))
            .await
            .map_err(UploadError::from)?;

        let mut buf = BytesMut::with_capacity(chunk_len as usize);
        buf.resize(chunk_len as usize, 0);
        let mut filled = 0usize;
        while filled < buf.len() {
            let n = self
                .reader
                .read(&mut buf[filled..])
                .await
                .map_err(UploadError::from)?;
            if n == 0 {
                return Err(UploadError::Io(format!(
                    "unexpected EOF at offset {} (expected {} more bytes)",
                    bytes_sent + filled as u64,
                    buf.len() - filled
                )));
            }
            filled += n;
        }

        Ok(Chunk {
            bytes: Bytes::from(buf),
            start: bytes_sent,
            total_len: Some(self.total_len),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn reads_full_chunk() {
        let data = vec![1u8; 453];
        let mut windower = SizedWindower::new(Box::new(Cursor::new(data.clone())), 453, 100);
        let chunk = windower.next_chunk(0).await.unwrap();
        assert_eq!(chunk.bytes.len(), 100);
        assert_eq!(chunk.start, 0);
        assert_eq!(chunk.total_len, Some(453));
    }

    #[tokio::test]
    async fn last_chunk_is_short() {
        let data = vec![1u8; 453];
        let mut windower = SizedWindower::new(Box::new(Cursor::new(data)), 453, 100);
        let chunk = windower.next_chunk(400).await.unwrap();
        assert_eq!(chunk.bytes.len(), 53);
    }

    #[tokio::test]
    async fn resend_reseeks_to_new_offset() {
        let data: Vec<u8> = (0..453u32).map(|i| (i % 256) as u8).collect();
        let mut windower = SizedWindower::new(Box::new(Cursor::new(data.clone())), 453, 400);
        let chunk = windower.next_chunk(120).await.unwrap();
        assert_eq!(chunk.bytes.len(), 333);
        assert_eq!(chunk.bytes[0], data[120]);
    }
}
