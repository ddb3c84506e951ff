//! Progress model: cloneable snapshots and observer callbacks.

use crate::error::UploadError;
use std::sync::{Arc, RwLock};

/// Lifecycle status of one upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Starting,
    Uploading,
    Completed,
    Failed,
}

/// A cloneable progress snapshot, emitted in causal order to every registered
/// [`ProgressCallback`].
#[derive(Debug, Clone)]
pub struct Progress {
    pub status: ProgressStatus,
    pub bytes_sent: u64,
    pub total_len: Option<u64>,
    pub error: Option<UploadError>,
}

impl Progress {
    pub fn starting() -> Self {
        Self {
            status: ProgressStatus::Starting,
            bytes_sent: 0,
            total_len: None,
            error: None,
        }
    }

    pub fn uploading(bytes_sent: u64, total_len: Option<u64>) -> Self {
        Self {
            status: ProgressStatus::Uploading,
            bytes_sent,
            total_len,
            error: None,
        }
    }

    pub fn completed(bytes_sent: u64, total_len: Option<u64>) -> Self {
        Self {
            status: ProgressStatus::Completed,
            bytes_sent,
            total_len,
            error: None,
        }
    }

    pub fn failed(bytes_sent: u64, total_len: Option<u64>, error: UploadError) -> Self {
        Self {
            status: ProgressStatus::Failed,
            bytes_sent,
            total_len,
            error: Some(error),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ProgressStatus::Completed | ProgressStatus::Failed)
    }
}

/// Receives progress snapshots as the upload advances.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, progress: Progress);
}

/// A progress callback that does nothing.
pub struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _progress: Progress) {}
}

/// A closure-based progress callback.
pub struct FnProgress<F>(pub F);

impl<F> ProgressCallback for FnProgress<F>
where
    F: Fn(Progress) + Send + Sync,
{
    fn on_progress(&self, progress: Progress) {
        (self.0)(progress)
    }
}

impl<T: ProgressCallback + ?Sized> ProgressCallback for Arc<T> {
    fn on_progress(&self, progress: Progress) {
        (**self).on_progress(progress)
    }
}

impl ProgressCallback for Box<dyn ProgressCallback> {
    fn on_progress(&self, progress: Progress) {
        (**self).on_progress(progress)
    }
}

/// A cheaply cloneable handle to the latest [`Progress`] snapshot of a running upload,
/// obtainable before the `Upload` is consumed by `upload()`/`upload_async()` so a
/// caller can poll it from another task.
#[derive(Clone)]
pub struct ProgressHandle {
    inner: Arc<RwLock<Progress>>,
}

impl ProgressHandle {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Progress::starting())),
        }
    }

    pub(crate) fn set(&self, progress: Progress) {
        *self.inner.write().expect("progress lock poisoned") = progress;
    }

    /// The latest progress snapshot.
    pub fn snapshot(&self) -> Progress {
        self.inner.read().expect("progress lock poisoned").clone()
    }
}

impl ProgressCallback for ProgressHandle {
    fn on_progress(&self, progress: Progress) {
        self.set(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn handle_reflects_latest_snapshot() {
        let handle = ProgressHandle::new();
        assert_eq!(handle.snapshot().status, ProgressStatus::Starting);
        handle.on_progress(Progress::uploading(100, Some(453)));
        let snap = handle.snapshot();
        assert_eq!(snap.status, ProgressStatus::Uploading);
        assert_eq!(snap.bytes_sent, 100);
    }

    #[test]
    fn fn_progress_invokes_closure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let cb = FnProgress(move |p: Progress| seen2.lock().unwrap().push(p.status));
        cb.on_progress(Progress::starting());
        cb.on_progress(Progress::completed(453, Some(453)));
        let statuses = seen.lock().unwrap();
        assert_eq!(statuses.as_slice(), [ProgressStatus::Starting, ProgressStatus::Completed]);
    }

    #[test]
    fn noop_progress_does_not_panic() {
        NoOpProgress.on_progress(Progress::failed(0, None, UploadError::Cancelled));
    }
}
