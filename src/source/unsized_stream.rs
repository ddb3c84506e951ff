//! Unknown-size regime: a persistent chunk buffer plus a one-byte look-ahead slot, so
//! a partial server acknowledgement can be turned into a resend without rewinding a
//! non-seekable source.

use super::Chunk;
use crate::error::{UploadError, UploadResult};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

pub struct UnsizedWindower {
    reader: Box<dyn AsyncRead + Unpin + Send>,
    chunk_size: usize,
    buf: Option<BytesMut>,
    start_offset: u64,
    used_len: usize,
    look_ahead: Option<u8>,
    total_len: Option<u64>,
}

impl UnsizedWindower {
    pub(crate) fn new(reader: Box<dyn AsyncRead + Unpin + Send>, chunk_size: u64) -> Self {
        Self {
            reader,
            chunk_size: chunk_size as usize,
            buf: None,
            start_offset: 0,
            used_len: 0,
            look_ahead: None,
            total_len: None,
        }
    }

    pub fn total_len(&self) -> Option<u64> {
        self.total_len
    }

    /// Produce the next chunk given `ack`, the driver's current `bytes_sent`. See the
    /// buffer-reconciliation algorithm this module implements: compact or shift the
    /// buffer against `ack`, fill from the source (skipping the fill step once EOF has
    /// already been discovered), then probe for EOF with the look-ahead byte.
    pub async fn next_chunk(&mut self, ack: u64, cancel: &CancellationToken) -> UploadResult<Chunk> {
        if self.buf.is_none() {
            let mut buf = BytesMut::with_capacity(self.chunk_size);
            buf.resize(self.chunk_size, 0);
            self.buf = Some(buf);
        }

        if ack == self.start_offset + self.used_len as u64 {
            // Previous chunk fully accepted.
            self.start_offset = ack;
            self.used_len = 0;
        } else {
            let delta = (ack - self.start_offset) as usize;
            let buf = self.buf.as_mut().expect("buffer allocated above");
            buf.copy_within(delta..self.used_len, 0);
            self.start_offset = ack;
            self.used_len -= delta;
        }

        let already_eof = self.total_len.is_some();

        if !already_eof {
            let buf = self.buf.as_mut().expect("buffer allocated above");

            if let Some(byte) = self.look_ahead.take() {
                if self.used_len < self.chunk_size {
                    buf[self.used_len] = byte;
                    self.used_len += 1;
                } else {
                    self.look_ahead = Some(byte);
                }
            }

            // Buffer already full on a retry with no new bytes accepted: the cached
            // look-ahead byte already proves more data follows, skip the fill loop.
            if self.look_ahead.is_none() {
                while self.used_len < self.chunk_size {
                    if cancel.is_cancelled() {
                        return Err(UploadError::Cancelled);
                    }
                    let n = self
                        .reader
                        .read(&mut buf[self.used_len..self.chunk_size])
                        .await
                        .map_err(UploadError::from)?;
                    if n == 0 {
                        break;
                    }
                    self.used_len += n;
                }

                if self.used_len < self.chunk_size {
                    self.total_len = Some(self.start_offset + self.used_len as u64);
                } else {
                    let mut probe = [0u8; 1];
                    let n = self.reader.read(&mut probe).await.map_err(UploadError::from)?;
                    if n == 0 {
                        self.total_len = Some(self.start_offset + self.used_len as u64);
                    } else {
                        self.look_ahead = Some(probe[0]);
                    }
                }
            }
        }

        let buf = self.buf.as_ref().expect("buffer allocated above");
        Ok(Chunk {
            bytes: Bytes::copy_from_slice(&buf[..self.used_len]),
            start: self.start_offset,
            total_len: self.total_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn single_chunk_fits_with_room_to_spare() {
        let data = vec![7u8; 453];
        let mut windower = UnsizedWindower::new(Box::new(Cursor::new(data)), 1000);
        let chunk = windower.next_chunk(0, &token()).await.unwrap();
        assert_eq!(chunk.bytes.len(), 453);
        assert_eq!(chunk.total_len, Some(453));
    }

    #[tokio::test]
    async fn exact_fit_requires_look_ahead_probe() {
        let data = vec![7u8; 100];
        let mut windower = UnsizedWindower::new(Box::new(Cursor::new(data)), 100);
        let chunk = windower.next_chunk(0, &token()).await.unwrap();
        assert_eq!(chunk.bytes.len(), 100);
        assert_eq!(chunk.total_len, Some(100));
    }

    #[tokio::test]
    async fn multi_chunk_reconciles_on_full_ack() {
        let data: Vec<u8> = (0..453u32).map(|i| (i % 256) as u8).collect();
        let mut windower = UnsizedWindower::new(Box::new(Cursor::new(data.clone())), 100);

        let c1 = windower.next_chunk(0, &token()).await.unwrap();
        assert_eq!(c1.bytes.len(), 100);
        assert_eq!(c1.total_len, None);

        let c2 = windower.next_chunk(100, &token()).await.unwrap();
        assert_eq!(c2.start, 100);
        assert_eq!(c2.bytes.len(), 100);
        assert_eq!(&c2.bytes[..], &data[100..200]);
    }

    #[tokio::test]
    async fn partial_ack_shifts_buffer_without_rereading_source() {
        let data: Vec<u8> = (0..453u32).map(|i| (i % 256) as u8).collect();
        let mut windower = UnsizedWindower::new(Box::new(Cursor::new(data.clone())), 400);

        let c1 = windower.next_chunk(0, &token()).await.unwrap();
        assert_eq!(c1.bytes.len(), 400);

        // Server only accepted the first 120 bytes of chunk 1.
        let c2 = windower.next_chunk(120, &token()).await.unwrap();
        assert_eq!(c2.start, 120);
        assert_eq!(&c2.bytes[..], &data[120..400]);
    }

    #[tokio::test]
    async fn full_chunk_retry_with_no_bytes_accepted_does_not_double_consume() {
        // chunk_size 100, data 250: after chunk 1 fills exactly and the look-ahead
        // probe confirms more data follows, a retry that reports zero bytes accepted
        // (ack == start_offset) must resend the exact same 100 bytes without reading
        // past the cached look-ahead byte.
        let data: Vec<u8> = (0..250u32).map(|i| (i % 256) as u8).collect();
        let mut windower = UnsizedWindower::new(Box::new(Cursor::new(data.clone())), 100);

        let c1 = windower.next_chunk(0, &token()).await.unwrap();
        assert_eq!(c1.bytes.len(), 100);
        assert_eq!(&c1.bytes[..], &data[0..100]);

        // Retry: server accepted nothing from the failed attempt.
        let retry = windower.next_chunk(0, &token()).await.unwrap();
        assert_eq!(retry.start, 0);
        assert_eq!(&retry.bytes[..], &data[0..100]);
        assert_eq!(retry.total_len, None);

        let c2 = windower.next_chunk(100, &token()).await.unwrap();
        assert_eq!(&c2.bytes[..], &data[100..200]);
    }

    #[tokio::test]
    async fn final_chunk_shorter_than_buffer_discovers_total() {
        let data: Vec<u8> = (0..453u32).map(|i| (i % 256) as u8).collect();
        let mut windower = UnsizedWindower::new(Box::new(Cursor::new(data.clone())), 100);

        for ack in [0u64, 100, 200, 300] {
            let _ = windower.next_chunk(ack, &token()).await.unwrap();
        }
        let last = windower.next_chunk(400, &token()).await.unwrap();
        assert_eq!(last.bytes.len(), 53);
        assert_eq!(last.total_len, Some(453));
    }

    #[tokio::test]
    async fn cancellation_is_observed_mid_fill() {
        let data = vec![0u8; 10];
        let mut windower = UnsizedWindower::new(Box::new(Cursor::new(data)), 1000);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = windower.next_chunk(0, &cancel).await;
        assert!(matches!(result, Err(UploadError::Cancelled)));
    }
}
