use crate::error::TailError;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Follows an append-only log file, yielding each new complete line once
///
/// The tailer starts at the end of the file: lines written before it was
/// opened are never returned. Incomplete trailing data is held back until
/// its newline arrives. If the file shrinks below the read offset it is
/// treated as truncated and read again from the start.
///
/// Truncation is only noticed when a poll finds the file shorter than the
/// offset. A copy-truncate followed by more than `offset` bytes of new data
/// before the next poll goes unnoticed, and reading resumes at the stale
/// offset, possibly mid-record. The parser drops that fragment as malformed.
/// Rename-style rotation is not followed either; restart the tailer instead.
///
/// As an iterator it blocks, polling every `poll_interval`, and ends once the
/// shared `running` flag is cleared.
pub struct LogTailer {
    /// Path being followed
    path: PathBuf,
    /// Reader over the open file
    reader: BufReader<File>,
    /// Bytes consumed from the file so far
    offset: u64,
    /// Bytes of a line whose newline has not been written yet
    pending: Vec<u8>,
    /// Sleep between polls when no data is available
    poll_interval: Duration,
    /// Cleared to stop waiting for the file or for new lines
    running: Arc<AtomicBool>,
}

impl LogTailer {
    /// Open `path` for tailing, waiting for it to exist
    ///
    /// # Arguments
    ///
    /// * `path` - Log file to follow
    /// * `poll_interval` - How long to sleep when there is nothing to read
    /// * `running` - Shared stop flag; clearing it ends the wait and the line sequence
    ///
    /// # Errors
    ///
    /// Returns `TailError::Stopped` if the flag is cleared before the file
    /// appears, or `TailError::IoError` if the file cannot be opened.
    pub fn open(
        path: impl Into<PathBuf>,
        poll_interval: Duration,
        running: Arc<AtomicBool>,
    ) -> Result<Self, TailError> {
        let path = path.into();
        Self::wait_for_file(&path, poll_interval, &running)?;

        let mut file = File::open(&path)?;
        let offset = file.seek(SeekFrom::End(0))?;
        info!(
            "Watcher is now monitoring new log entries in {} (offset {})",
            path.display(),
            offset
        );

        Ok(Self {
            path,
            reader: BufReader::new(file),
            offset,
            pending: Vec::new(),
            poll_interval,
            running,
        })
    }

    /// Block until `path` exists or the stop flag is cleared
    fn wait_for_file(
        path: &Path,
        poll_interval: Duration,
        running: &AtomicBool,
    ) -> Result<(), TailError> {
        let mut announced = false;
        while !path.exists() {
            if !running.load(Ordering::SeqCst) {
                return Err(TailError::Stopped);
            }
            if !announced {
                info!("Waiting for log file {} to become available...", path.display());
                announced = true;
            }
            thread::sleep(poll_interval);
        }
        if !running.load(Ordering::SeqCst) {
            return Err(TailError::Stopped);
        }
        Ok(())
    }

    /// Read the next complete line without blocking
    ///
    /// Returns `Ok(None)` when no complete line is available yet. Blank lines
    /// are skipped. Invalid UTF-8 is replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns `TailError::IoError` if reading the file fails.
    pub fn poll_line(&mut self) -> Result<Option<String>, TailError> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.pending)?;
            if read == 0 {
                self.detect_truncation()?;
                return Ok(None);
            }
            self.offset += read as u64;

            if self.pending.last() != Some(&b'\n') {
                // Partial write; wait for the rest of the line
                return Ok(None);
            }

            let line = String::from_utf8_lossy(&self.pending)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            self.pending.clear();

            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(line));
        }
    }

    /// Restart from the beginning if the file shrank below our offset
    ///
    /// A file that was truncated and has already grown past the offset again
    /// looks like plain appends and is not detected.
    fn detect_truncation(&mut self) -> Result<(), TailError> {
        let len = self.reader.get_ref().metadata()?.len();
        if len < self.offset {
            warn!(
                "Log file {} shrank from {} to {} bytes, assuming truncation and reading from start",
                self.path.display(),
                self.offset,
                len
            );
            self.reader.seek(SeekFrom::Start(0))?;
            self.offset = 0;
            self.pending.clear();
        }
        Ok(())
    }

    /// Bytes consumed from the file so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for LogTailer {
    type Item = Result<String, TailError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.running.load(Ordering::SeqCst) {
            match self.poll_line() {
                Ok(Some(line)) => return Some(Ok(line)),
                Ok(None) => thread::sleep(self.poll_interval),
                Err(e) => return Some(Err(e)),
            }
        }
        debug!("Log tailer stopping: shutdown requested");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    const POLL: Duration = Duration::from_millis(10);

    fn running() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(true))
    }

    fn append(path: &Path, data: &[u8]) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
    }

    #[test]
    fn test_skips_content_written_before_open() {
        let file = NamedTempFile::new().unwrap();
        append(file.path(), b"{\"pool\":\"blue\"}\n{\"pool\":\"blue\"}\n");

        let mut tailer = LogTailer::open(file.path(), POLL, running()).unwrap();
        assert_eq!(tailer.offset(), 32);
        assert_eq!(tailer.poll_line().unwrap(), None);

        append(file.path(), b"{\"pool\":\"green\"}\n");
        assert_eq!(
            tailer.poll_line().unwrap(),
            Some("{\"pool\":\"green\"}".to_string())
        );
        assert_eq!(tailer.poll_line().unwrap(), None);
    }

    #[test]
    fn test_empty_file_yields_nothing() {
        let file = NamedTempFile::new().unwrap();
        let mut tailer = LogTailer::open(file.path(), POLL, running()).unwrap();
        for _ in 0..5 {
            assert_eq!(tailer.poll_line().unwrap(), None);
        }
    }

    #[test]
    fn test_partial_line_is_held_back() {
        let file = NamedTempFile::new().unwrap();
        let mut tailer = LogTailer::open(file.path(), POLL, running()).unwrap();

        append(file.path(), b"{\"pool\":");
        assert_eq!(tailer.poll_line().unwrap(), None);

        append(file.path(), b"\"blue\"}\r\n");
        assert_eq!(
            tailer.poll_line().unwrap(),
            Some("{\"pool\":\"blue\"}".to_string())
        );
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let file = NamedTempFile::new().unwrap();
        let mut tailer = LogTailer::open(file.path(), POLL, running()).unwrap();

        append(file.path(), b"\n  \nfirst\n\nsecond\n");
        assert_eq!(tailer.poll_line().unwrap(), Some("first".to_string()));
        assert_eq!(tailer.poll_line().unwrap(), Some("second".to_string()));
        assert_eq!(tailer.poll_line().unwrap(), None);
    }

    #[test]
    fn test_invalid_utf8_does_not_fail() {
        let file = NamedTempFile::new().unwrap();
        let mut tailer = LogTailer::open(file.path(), POLL, running()).unwrap();

        append(file.path(), b"bad \xff bytes\n");
        let line = tailer.poll_line().unwrap().unwrap();
        assert!(line.starts_with("bad "));
    }

    #[test]
    fn test_truncation_restarts_from_beginning() {
        let file = NamedTempFile::new().unwrap();
        append(file.path(), b"old line one\nold line two\n");
        let mut tailer = LogTailer::open(file.path(), POLL, running()).unwrap();

        OpenOptions::new()
            .write(true)
            .open(file.path())
            .unwrap()
            .set_len(0)
            .unwrap();
        assert_eq!(tailer.poll_line().unwrap(), None);
        assert_eq!(tailer.offset(), 0);

        append(file.path(), b"after truncate\n");
        assert_eq!(
            tailer.poll_line().unwrap(),
            Some("after truncate".to_string())
        );
    }

    #[test]
    fn test_truncation_with_shorter_rewrite_before_poll() {
        let file = NamedTempFile::new().unwrap();
        append(file.path(), b"old line one\nold line two\n");
        let mut tailer = LogTailer::open(file.path(), POLL, running()).unwrap();
        assert_eq!(tailer.offset(), 26);

        OpenOptions::new()
            .write(true)
            .open(file.path())
            .unwrap()
            .set_len(0)
            .unwrap();
        append(file.path(), b"new\n");

        assert_eq!(tailer.poll_line().unwrap(), None);
        assert_eq!(tailer.offset(), 0);
        assert_eq!(tailer.poll_line().unwrap(), Some("new".to_string()));
    }

    #[test]
    fn test_waits_for_file_to_appear() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("access.log");

        let writer_path = path.clone();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            File::create(&writer_path).unwrap();
        });

        let mut tailer = LogTailer::open(&path, POLL, running()).unwrap();
        writer.join().unwrap();

        append(&path, b"hello\n");
        assert_eq!(tailer.poll_line().unwrap(), Some("hello".to_string()));
    }

    #[test]
    fn test_stop_while_waiting_for_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("never.log");
        let flag = Arc::new(AtomicBool::new(false));

        assert!(matches!(
            LogTailer::open(&path, POLL, flag),
            Err(TailError::Stopped)
        ));
    }

    #[test]
    fn test_iterator_yields_lines_and_stops() {
        let file = NamedTempFile::new().unwrap();
        let flag = running();
        let mut tailer = LogTailer::open(file.path(), POLL, Arc::clone(&flag)).unwrap();

        append(file.path(), b"one\ntwo\n");
        assert_eq!(tailer.next().unwrap().unwrap(), "one");
        assert_eq!(tailer.next().unwrap().unwrap(), "two");

        flag.store(false, Ordering::SeqCst);
        assert!(tailer.next().is_none());
    }

    #[test]
    fn test_iterator_blocks_until_line_arrives() {
        let file = NamedTempFile::new().unwrap();
        let mut tailer = LogTailer::open(file.path(), POLL, running()).unwrap();

        let path = file.path().to_path_buf();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            append(&path, b"late line\n");
        });

        assert_eq!(tailer.next().unwrap().unwrap(), "late line");
        writer.join().unwrap();
    }
}
