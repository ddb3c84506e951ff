//! Client-side resumable chunked upload protocol over HTTP.
//!
//! Implements the `Content-Range` / `308 Resume Incomplete` resumable-upload protocol
//! used by several storage APIs: a caller hands the driver an arbitrary byte stream
//! (seekable or not), a metadata body, and a target endpoint, and the driver transfers
//! the bytes in a sequence of bounded-size requests, recovering from transient
//! failures by asking the server how much it has durably received and resending only
//! the missing tail.
//!
//! ```no_run
//! use reqwest::Client;
//! use resumable_upload::{FnProgress, Upload, UploadSource};
//! use tokio::fs::File;
//!
//! # async fn run() -> Result<(), resumable_upload::UploadError> {
//! let file = File::open("movie.mp4").await?;
//! let metadata = file.metadata().await?;
//! let source = UploadSource::sized(file, metadata.len());
//!
//! let progress = Upload::<serde_json::Value>::new(
//!     Client::new(),
//!     "https://example.com/upload/drive/v3/files",
//!     "POST",
//!     source,
//!     "video/mp4",
//! )?
//! .with_progress_subscriber(FnProgress(|p| println!("{:?}", p.status)))
//! .upload()
//! .await?;
//! println!("sent {} bytes", progress.bytes_sent);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod params;
pub mod progress;
pub mod range;
pub mod recovery;
pub mod retry;
pub mod session;
pub mod source;

pub use config::{UploadConfig, DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use driver::Upload;
pub use error::{ErrorDocument, SubError, UploadError, UploadResult};
pub use progress::{FnProgress, NoOpProgress, Progress, ProgressCallback, ProgressHandle, ProgressStatus};
pub use recovery::{RecoveryAction, RecoveryHook, StatusQueryRecovery};
pub use retry::{ExponentialBackoff, RetryPolicy};
pub use session::SessionParams;
pub use source::UploadSource;
