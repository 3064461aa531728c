//! Record log file sink
//!
//! The sink owns the open log file behind a mutex. Appends and location
//! changes take the same lock, so a record is never split across two files.
//! A new location is opened before the lock is taken; if that fails the
//! current file stays active.

use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::LogRecord;
use crate::error::{Result, TimecodeError};
use crate::utils::{Condition, LogThrottler};
use crate::warn_throttled;

/// An open log destination
struct LogFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LogFile {
    /// Create (truncate) `path` and write the column header
    fn create(path: &Path, columns: &str) -> Result<Self> {
        let open_err = |source| TimecodeError::LogOpen {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(open_err)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", columns).map_err(open_err)?;
        writer.flush().map_err(open_err)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    fn close(mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Failed flushing logfile {}: {}", self.path.display(), e);
        }
        info!("Closing logfile {}", self.path.display());
    }
}

/// Append-only, line-oriented log of `R` records
pub struct RecordLog<R> {
    active: Mutex<Option<LogFile>>,
    throttler: LogThrottler,
    _record: PhantomData<fn(&R)>,
}

impl<R: LogRecord> RecordLog<R> {
    /// Open a log at `path`, truncating any previous content
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = LogFile::create(path.as_ref(), R::COLUMNS)?;
        debug!("Opened logfile {}", file.path.display());
        Ok(Self::from_file(Some(file)))
    }

    /// A log without destination; records are dropped until a location is set
    pub fn detached() -> Self {
        Self::from_file(None)
    }

    /// Open a log at `path`, falling back to a detached log on failure
    pub fn open_or_detached(path: impl AsRef<Path>) -> Self {
        match Self::open(path) {
            Ok(log) => log,
            Err(e) => {
                error!("{}", e);
                Self::detached()
            }
        }
    }

    fn from_file(file: Option<LogFile>) -> Self {
        Self {
            active: Mutex::new(file),
            throttler: LogThrottler::default(),
            _record: PhantomData,
        }
    }

    /// Path of the active log file
    pub fn location(&self) -> Option<PathBuf> {
        self.active.lock().as_ref().map(|f| f.path.clone())
    }

    pub fn is_attached(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Switch to a new log file
    ///
    /// The new file is created and its header written first. On failure the
    /// current file stays active and the error is returned. On success the
    /// previous file is flushed and closed.
    pub fn set_location(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = LogFile::create(path.as_ref(), R::COLUMNS)?;
        info!("Logging records to {}", file.path.display());

        let previous = self.active.lock().replace(file);
        self.throttler.clear(Condition::LogDetached);
        if let Some(previous) = previous {
            previous.close();
        }
        Ok(())
    }

    /// Append one record and flush it
    ///
    /// Records sent to a detached log are dropped with a throttled warning.
    pub fn append(&self, record: &R) -> Result<()> {
        let mut active = self.active.lock();
        let Some(file) = active.as_mut() else {
            warn_throttled!(self.throttler, Condition::LogDetached, "No logfile open, dropping records");
            return Ok(());
        };
        writeln!(file.writer, "{}", record)?;
        file.writer.flush()?;
        Ok(())
    }

    /// Flush and close the active file, leaving the log detached
    pub fn close(&self) {
        let previous = self.active.lock().take();
        if let Some(previous) = previous {
            previous.close();
        }
    }
}

impl<R> Drop for RecordLog<R> {
    fn drop(&mut self) {
        if let Some(file) = self.active.get_mut().take() {
            file.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ReceiverRecord, SenderRecord};
    use std::fs;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn record(frame_nr: u64) -> SenderRecord {
        SenderRecord {
            timestamp: "2011-10-08 07:07:09.000000Z".to_string(),
            frame_nr,
            render_time_us: frame_nr * 40_000,
            epoch_offset_s: 1000,
        }
    }

    #[test]
    fn test_open_writes_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rcvr.csv");
        let log = RecordLog::<ReceiverRecord>::open(&path).unwrap();
        assert_eq!(log.location(), Some(path.clone()));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "ts\tframe_nr\tlatency\ttime_s\ttime_p\tsec_offset\n"
        );
    }

    #[test]
    fn test_append_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sndr.csv");
        let log = RecordLog::open(&path).unwrap();
        log.append(&record(0)).unwrap();
        log.append(&record(1)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "2011-10-08 07:07:09.000000Z\t0\t0\t1000");
        assert_eq!(lines[2], "2011-10-08 07:07:09.000000Z\t1\t40000\t1000");
    }

    #[test]
    fn test_open_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sndr.csv");
        fs::write(&path, "stale\n").unwrap();
        let _log = RecordLog::<SenderRecord>::open(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ts\tframe_nr\ttime_s\tsec_offset\n");
    }

    #[test]
    fn test_set_location_swaps_file() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");

        let log = RecordLog::open(&first).unwrap();
        log.append(&record(0)).unwrap();
        log.set_location(&second).unwrap();
        log.append(&record(1)).unwrap();

        assert_eq!(log.location(), Some(second.clone()));
        let first_content = fs::read_to_string(&first).unwrap();
        let second_content = fs::read_to_string(&second).unwrap();
        assert_eq!(first_content.lines().count(), 2);
        assert!(first_content.contains("\t0\t0\t1000"));
        assert_eq!(second_content.lines().count(), 2);
        assert!(second_content.contains("\t1\t40000\t1000"));
    }

    #[test]
    fn test_failed_set_location_keeps_previous() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let bad = dir.path().join("missing-dir").join("log.csv");

        let log = RecordLog::open(&first).unwrap();
        let err = log.set_location(&bad).unwrap_err();
        assert!(matches!(err, TimecodeError::LogOpen { ref path, .. } if *path == bad));
        assert_eq!(log.location(), Some(first.clone()));

        log.append(&record(5)).unwrap();
        assert_eq!(fs::read_to_string(&first).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_detached_log_drops_records() {
        let log = RecordLog::<SenderRecord>::detached();
        assert!(!log.is_attached());
        assert!(log.append(&record(0)).is_ok());
        assert_eq!(log.location(), None);
    }

    #[test]
    fn test_open_or_detached_falls_back() {
        let dir = tempdir().unwrap();
        let log = RecordLog::<SenderRecord>::open_or_detached(dir.path().join("no/such/dir.csv"));
        assert!(!log.is_attached());

        let path = dir.path().join("ok.csv");
        log.set_location(&path).unwrap();
        assert!(log.is_attached());
        log.append(&record(3)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_close_detaches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sndr.csv");
        let log = RecordLog::open(&path).unwrap();
        log.append(&record(0)).unwrap();
        log.close();
        assert!(!log.is_attached());
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_concurrent_swaps_never_split_records() {
        let dir = tempdir().unwrap();
        let paths: Vec<_> = (0..4).map(|i| dir.path().join(format!("log{}.csv", i))).collect();
        let log = Arc::new(RecordLog::open(&paths[0]).unwrap());

        let writer = {
            let log = log.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    log.append(&record(i)).unwrap();
                }
            })
        };
        for path in paths.iter().skip(1) {
            log.set_location(path).unwrap();
        }
        writer.join().unwrap();

        let mut total = 0;
        for path in &paths {
            let content = fs::read_to_string(path).unwrap();
            let mut lines = content.lines();
            assert_eq!(lines.next(), Some(SenderRecord::COLUMNS));
            for line in lines {
                assert_eq!(line.split('\t').count(), 4, "split record: {:?}", line);
                total += 1;
            }
        }
        assert_eq!(total, 500);
    }
}
