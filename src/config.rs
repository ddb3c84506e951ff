//! Chunk-size and retry defaults.

use crate::error::UploadError;
use std::time::Duration;

/// Protocol minimum chunk size (256 KiB). Every chunk but the last must be a multiple
/// of this.
pub const MIN_CHUNK_SIZE: u64 = 256 * 1024;

/// Default chunk size (10 MiB) used when the caller doesn't set one.
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// Default maximum number of retry attempts per chunk.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default base delay for exponential backoff.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Default cap on backoff delay.
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Chunk-size and retry configuration for one upload.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub chunk_size: u64,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            retry_max_delay: DEFAULT_RETRY_MAX_DELAY,
        }
    }
}

impl UploadConfig {
    /// Validate `chunk_size`: must be positive and a multiple of [`MIN_CHUNK_SIZE`].
    pub fn validate_chunk_size(chunk_size: u64) -> Result<(), UploadError> {
        if chunk_size == 0 {
            return Err(UploadError::InvalidArgument(
                "chunk_size must be positive".to_string(),
            ));
        }
        if chunk_size % MIN_CHUNK_SIZE != 0 {
            return Err(UploadError::InvalidArgument(format!(
                "chunk_size must be a multiple of {} bytes, got {}",
                MIN_CHUNK_SIZE, chunk_size
            )));
        }
        Ok(())
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Result<Self, UploadError> {
        Self::validate_chunk_size(chunk_size)?;
        self.chunk_size = chunk_size;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chunk_size_is_valid() {
        assert!(UploadConfig::validate_chunk_size(DEFAULT_CHUNK_SIZE).is_ok());
    }

    #[test]
    fn rejects_zero_chunk_size() {
        assert!(UploadConfig::validate_chunk_size(0).is_err());
    }

    #[test]
    fn rejects_non_multiple_chunk_size() {
        assert!(UploadConfig::validate_chunk_size(MIN_CHUNK_SIZE + 1).is_err());
    }

    #[test]
    fn accepts_exact_minimum() {
        assert!(UploadConfig::validate_chunk_size(MIN_CHUNK_SIZE).is_ok());
    }
}
