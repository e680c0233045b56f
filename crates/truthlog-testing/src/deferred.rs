//! A writer that buffers in memory until asked to persist.
//!
//! Test output only needs to reach disk when a test fails or has no truth
//! transcript yet. [`DeferredFileWriter`] accumulates everything in memory
//! and, once [`promote`](DeferredFileWriter::promote)d, replays the buffer
//! into the target file and writes through from then on.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

enum Sink {
    Buffered(Vec<u8>),
    File(File),
    Closed,
}

/// Buffered writer with on-demand promotion to a file.
pub struct DeferredFileWriter {
    path: Option<PathBuf>,
    sink: Mutex<Sink>,
}

impl DeferredFileWriter {
    /// Buffer output destined for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            sink: Mutex::new(Sink::Buffered(Vec::new())),
        }
    }

    /// A writer with no backing file. Promotion is a no-op.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            sink: Mutex::new(Sink::Buffered(Vec::new())),
        }
    }

    /// Target file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append `buf` to the buffer or the promoted file.
    ///
    /// The whole buffer is written or an error is returned.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        match &mut *self.sink.lock() {
            Sink::Buffered(pending) => {
                pending.extend_from_slice(buf);
                Ok(buf.len())
            }
            Sink::File(file) => file.write_all(buf).map(|()| buf.len()),
            Sink::Closed => Err(io::Error::other("deferred writer is closed")),
        }
    }

    /// Switch to writing through to the file, replaying buffered output.
    ///
    /// Idempotent. On error the writer stays buffered and a later call
    /// retries.
    pub fn promote(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut sink = self.sink.lock();
        let Sink::Buffered(pending) = &*sink else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(pending)?;
        debug!(path = %path.display(), bytes = pending.len(), "promoted deferred output to file");
        *sink = Sink::File(file);
        Ok(())
    }

    /// Flush and close the file. Does nothing if never promoted.
    pub fn close(&self) -> io::Result<()> {
        let mut sink = self.sink.lock();
        if !matches!(*sink, Sink::File(_)) {
            return Ok(());
        }
        match std::mem::replace(&mut *sink, Sink::Closed) {
            Sink::File(mut file) => {
                file.flush()?;
                file.sync_all()
            }
            _ => Ok(()),
        }
    }

    /// Whether output is going straight to the file.
    pub fn is_promoted(&self) -> bool {
        !matches!(*self.sink.lock(), Sink::Buffered(_))
    }

    /// Copy of the pending buffer, or `None` once promoted.
    pub fn buffered(&self) -> Option<Vec<u8>> {
        match &*self.sink.lock() {
            Sink::Buffered(pending) => Some(pending.clone()),
            Sink::File(_) | Sink::Closed => None,
        }
    }
}

impl std::fmt::Debug for DeferredFileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredFileWriter")
            .field("path", &self.path)
            .field("promoted", &self.is_promoted())
            .finish()
    }
}

impl Write for &DeferredFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        DeferredFileWriter::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut *self.sink.lock() {
            Sink::File(file) => file.flush(),
            Sink::Buffered(_) | Sink::Closed => Ok(()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_until_promoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let w = DeferredFileWriter::new(&path);

        let _ = w.write(b"one\n").unwrap();
        assert!(!path.exists());
        assert_eq!(w.buffered().unwrap(), b"one\n");

        w.promote().unwrap();
        assert!(w.is_promoted());
        assert!(w.buffered().is_none());

        let _ = w.write(b"two\n").unwrap();
        w.close().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn promote_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let w = DeferredFileWriter::new(&path);
        let _ = w.write(b"a\n").unwrap();
        w.promote().unwrap();
        w.promote().unwrap();
        let _ = w.write(b"b\n").unwrap();
        w.close().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn promote_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.log");
        let w = DeferredFileWriter::new(&path);
        w.promote().unwrap();
        w.close().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn failed_promotion_stays_buffered() {
        let dir = tempfile::tempdir().unwrap();
        // The target is an existing directory, so creating the file fails.
        let w = DeferredFileWriter::new(dir.path());
        let _ = w.write(b"kept\n").unwrap();
        assert!(w.promote().is_err());
        assert!(!w.is_promoted());
        assert_eq!(w.buffered().unwrap(), b"kept\n");
    }

    #[test]
    fn in_memory_never_touches_disk() {
        let w = DeferredFileWriter::in_memory();
        let _ = w.write(b"x").unwrap();
        w.promote().unwrap();
        w.close().unwrap();
        assert!(w.path().is_none());
        assert!(!w.is_promoted());
        assert_eq!(w.buffered().unwrap(), b"x");
    }

    #[test]
    fn close_without_promotion_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let w = DeferredFileWriter::new(&path);
        let _ = w.write(b"x").unwrap();
        w.close().unwrap();
        assert!(!path.exists());
        let _ = w.write(b"y").unwrap();
    }

    #[test]
    fn write_after_close_errors() {
        let dir = tempfile::tempdir().unwrap();
        let w = DeferredFileWriter::new(dir.path().join("out.log"));
        w.promote().unwrap();
        w.close().unwrap();
        assert!(w.write(b"late").is_err());
    }

    #[test]
    fn io_write_for_reference() {
        let w = DeferredFileWriter::in_memory();
        let mut handle = &w;
        writeln!(handle, "hello {}", 42).unwrap();
        handle.flush().unwrap();
        assert_eq!(w.buffered().unwrap(), b"hello 42\n");
    }

    #[test]
    fn concurrent_writes_across_promotion() {
        const THREADS: usize = 8;
        const LINES: usize = 64;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("concurrent.log");
        let w = DeferredFileWriter::new(&path);

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let w = &w;
                let _ = s.spawn(move || {
                    for i in 0..LINES {
                        let _ = w.write(format!("{t}-{i}\n").as_bytes()).unwrap();
                        if t == 0 && i == LINES / 2 {
                            w.promote().unwrap();
                        }
                    }
                });
            }
        });
        w.close().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), THREADS * LINES);
        lines.sort_unstable();
        lines.dedup();
        assert_eq!(lines.len(), THREADS * LINES);
    }
}
