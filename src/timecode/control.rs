//! Control-path handle shared with the frame thread
//!
//! The frame thread owns an element mutably; other threads reconfigure it
//! through an [`ElementControl`]. Every shared field sits behind its own
//! lock, held only for the read or write itself.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Span};

use crate::error::Result;
use crate::record::{LogRecord, RecordLog};
use crate::utils::{Condition, LogThrottler};
use crate::warn_throttled;

/// Cloneable handle to an element's runtime settings
pub struct ElementControl<R> {
    log: Arc<RecordLog<R>>,
    pipeline_latency: Arc<Mutex<Option<Duration>>>,
    span: Span,
}

impl<R> Clone for ElementControl<R> {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
            pipeline_latency: self.pipeline_latency.clone(),
            span: self.span.clone(),
        }
    }
}

impl<R: LogRecord> ElementControl<R> {
    pub(crate) fn new(
        log: Arc<RecordLog<R>>,
        pipeline_latency: Arc<Mutex<Option<Duration>>>,
        span: Span,
    ) -> Self {
        Self {
            log,
            pipeline_latency,
            span,
        }
    }

    /// Path of the active log file
    pub fn location(&self) -> Option<PathBuf> {
        self.log.location()
    }

    /// Point the record log at a new file
    ///
    /// On failure the previous file keeps receiving records.
    pub fn set_location(&self, path: impl AsRef<Path>) -> Result<()> {
        let _entered = self.span.enter();
        self.log.set_location(path)
    }

    /// Latency last reported by the downstream pipeline
    pub fn pipeline_latency(&self) -> Option<Duration> {
        *self.pipeline_latency.lock()
    }

    /// Record a latency report from the downstream pipeline
    pub fn set_pipeline_latency(&self, latency: Option<Duration>) {
        *self.pipeline_latency.lock() = latency;
        let _entered = self.span.enter();
        match latency {
            Some(l) => info!(
                "Latency is now {:.3} ms ({} ns)",
                l.as_secs_f64() * 1e3,
                l.as_nanos()
            ),
            None => info!("Latency is now unknown"),
        }
    }
}

/// Keeps an element's log on the configured location
///
/// A location that cannot be opened yet (a directory not mounted, a
/// permission not granted) stays pending. It is tried again on every
/// [`LocationFollower::retry`] until it opens or the configuration moves on.
pub struct LocationFollower<R> {
    control: ElementControl<R>,
    /// Location last read from the configuration
    observed: PathBuf,
    /// Location the log should be on
    target: PathBuf,
    pending: bool,
    attempts: u32,
    throttler: LogThrottler,
}

impl<R: LogRecord> LocationFollower<R> {
    /// Follow the configuration starting from `observed`
    ///
    /// `target` is the location the element was started on. It differs from
    /// `observed` when the command line overrides the configuration.
    pub fn new(control: ElementControl<R>, observed: PathBuf, target: PathBuf) -> Self {
        let pending = control.location().as_deref() != Some(target.as_path());
        Self {
            control,
            observed,
            target,
            pending,
            attempts: 0,
            throttler: LogThrottler::default(),
        }
    }

    /// Handle of the followed element
    pub fn control(&self) -> ElementControl<R> {
        self.control.clone()
    }

    /// Location the log should be on
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Whether the target location has not been opened yet
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Apply a location read from a reloaded configuration
    ///
    /// An unchanged location only retries a pending one.
    pub fn observe(&mut self, location: &Path) -> bool {
        if location != self.observed {
            self.observed = location.to_path_buf();
            self.target = location.to_path_buf();
            self.pending = true;
            self.attempts = 0;
            self.throttler.clear(Condition::LocationPending);
        }
        self.retry()
    }

    /// Try to open a pending location
    ///
    /// Returns whether the log is on the target location.
    pub fn retry(&mut self) -> bool {
        if !self.pending {
            return true;
        }
        self.attempts += 1;
        match self.control.set_location(&self.target) {
            Ok(()) => {
                if self.attempts > 1 {
                    info!(
                        "Opened {} after {} attempts",
                        self.target.display(),
                        self.attempts
                    );
                }
                self.pending = false;
                self.attempts = 0;
                self.throttler.clear(Condition::LocationPending);
                true
            }
            Err(e) => {
                warn_throttled!(
                    self.throttler,
                    Condition::LocationPending,
                    attempts = self.attempts,
                    "{}, will retry",
                    e
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SenderRecord;
    use std::thread;

    fn control() -> ElementControl<SenderRecord> {
        ElementControl::new(
            Arc::new(RecordLog::detached()),
            Arc::new(Mutex::new(None)),
            Span::none(),
        )
    }

    #[test]
    fn test_pipeline_latency_shared_between_clones() {
        let a = control();
        let b = a.clone();
        assert_eq!(a.pipeline_latency(), None);

        let handle = thread::spawn(move || b.set_pipeline_latency(Some(Duration::from_millis(40))));
        handle.join().unwrap();
        assert_eq!(a.pipeline_latency(), Some(Duration::from_millis(40)));

        a.set_pipeline_latency(None);
        assert_eq!(a.pipeline_latency(), None);
    }

    #[test]
    fn test_follower_retries_until_location_opens() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let missing = dir.path().join("later").join("sndr.csv");
        let control = control();
        control.set_location(&first).unwrap();
        let mut follower = LocationFollower::new(control.clone(), first.clone(), first.clone());
        assert!(!follower.is_pending());

        // The directory does not exist yet, the old file stays active
        assert!(!follower.observe(&missing));
        assert!(follower.is_pending());
        assert_eq!(control.location(), Some(first));

        // Same configuration again, still failing
        assert!(!follower.observe(&missing));
        assert!(!follower.retry());

        std::fs::create_dir(dir.path().join("later")).unwrap();
        assert!(follower.retry());
        assert!(!follower.is_pending());
        assert_eq!(control.location(), Some(missing));
    }

    #[test]
    fn test_follower_keeps_override_until_config_changes() {
        let dir = tempfile::tempdir().unwrap();
        let configured = dir.path().join("configured.csv");
        let overridden = dir.path().join("override.csv");
        let control = control();
        control.set_location(&overridden).unwrap();

        let mut follower = LocationFollower::new(control.clone(), configured.clone(), overridden.clone());
        assert!(!follower.is_pending());

        // Reloading an unchanged configuration leaves the override in place
        assert!(follower.observe(&configured));
        assert_eq!(control.location(), Some(overridden));

        let moved = dir.path().join("moved.csv");
        assert!(follower.observe(&moved));
        assert_eq!(follower.target(), moved.as_path());
        assert_eq!(control.location(), Some(moved));
    }

    #[test]
    fn test_follower_starts_pending_when_initial_open_failed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing").join("rcvr.csv");
        let control = control();
        let mut follower = LocationFollower::new(control.clone(), target.clone(), target.clone());
        assert!(follower.is_pending());
        assert!(!follower.retry());

        std::fs::create_dir(dir.path().join("missing")).unwrap();
        assert!(follower.retry());
        assert_eq!(control.location(), Some(target));
    }

    #[test]
    fn test_set_location_through_control() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sndr.csv");
        let control = control();
        assert_eq!(control.location(), None);
        control.set_location(&path).unwrap();
        assert_eq!(control.location(), Some(path));
    }
}
