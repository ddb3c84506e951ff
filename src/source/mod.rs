//! Stream windowing: turns an arbitrary async byte stream into a sequence of chunks,
//! under either the known-size or unknown-size regime.

mod sized;
mod unsized_stream;

pub use sized::SizedWindower;
pub use unsized_stream::UnsizedWindower;

use crate::error::UploadResult;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncSeek};
use tokio_util::sync::CancellationToken;

/// One produced chunk: its bytes, absolute start offset, and the total source length
/// if it became known while producing this chunk.
pub struct Chunk {
    pub bytes: Bytes,
    pub start: u64,
    pub total_len: Option<u64>,
}

/// The caller-supplied input stream, in either regime.
///
/// Each regime type-erases its reader behind its own trait bound instead of sharing
/// one type parameter. A sized source is reseekable; an unsized source is read
/// forward only, so it never needs `AsyncSeek`.
pub enum UploadSource {
    /// A seekable stream of known total length.
    Sized {
        reader: Box<dyn AsyncRead + AsyncSeek + Unpin + Send>,
        total_len: u64,
    },
    /// A stream whose length is not known up front (e.g. a pipe).
    Unsized {
        reader: Box<dyn AsyncRead + Unpin + Send>,
    },
}

impl UploadSource {
    /// A reseekable source of known total length.
    pub fn sized<T>(reader: T, total_len: u64) -> Self
    where
        T: AsyncRead + AsyncSeek + Unpin + Send + 'static,
    {
        UploadSource::Sized {
            reader: Box::new(reader),
            total_len,
        }
    }

    /// A forward-only source whose length is not known up front.
    pub fn unsized_stream<T>(reader: T) -> Self
    where
        T: AsyncRead + Unpin + Send + 'static,
    {
        UploadSource::Unsized {
            reader: Box::new(reader),
        }
    }

    pub fn total_len(&self) -> Option<u64> {
        match self {
            UploadSource::Sized { total_len, .. } => Some(*total_len),
            UploadSource::Unsized { .. } => None,
        }
    }
}

/// Internal windower dispatch, driven by the session driver. `bytes_sent` is the
/// driver's current send cursor (the server's last-acknowledged high-water mark).
pub enum Windower {
    Sized(SizedWindower),
    Unsized(UnsizedWindower),
}

impl Windower {
    pub fn new(source: UploadSource, chunk_size: u64) -> Self {
        match source {
            UploadSource::Sized { reader, total_len } => {
                Windower::Sized(SizedWindower::new(reader, total_len, chunk_size))
            }
            UploadSource::Unsized { reader } => {
                Windower::Unsized(UnsizedWindower::new(reader, chunk_size))
            }
        }
    }

    pub fn total_len(&self) -> Option<u64> {
        match self {
            Windower::Sized(w) => Some(w.total_len()),
            Windower::Unsized(w) => w.total_len(),
        }
    }

    pub async fn next_chunk(&mut self, bytes_sent: u64, cancel: &CancellationToken) -> UploadResult<Chunk> {
        match self {
            Windower::Sized(w) => w.next_chunk(bytes_sent).await,
            Windower::Unsized(w) => w.next_chunk(bytes_sent, cancel).await,
        }
    }
}
