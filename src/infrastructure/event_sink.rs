/// Event Sinks
///
/// Thread-safe append-only line writers: the durability boundary of a
/// tracking run.
/// - `FileSink` - one lock around the file, flushed after every line
/// - `MemorySink` - in-process buffer for tests and embedding
/// - `AsyncSink` - background writer in front of another sink, with a
///   bounded `await_completion` for shutdown

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{TraceError, TraceResult};
use crate::ports::LineSink;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ═══════════════════════════════════════════════════════════════════════════
// FileSink
// ═══════════════════════════════════════════════════════════════════════════

pub struct FileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    /// Create (or truncate) the log at `path`.
    pub fn create(path: &Path) -> TraceResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self::from_file(path, file))
    }

    /// Open the log at `path` for appending, creating it if needed.
    pub fn append(path: &Path) -> TraceResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_file(path, file))
    }

    fn from_file(path: &Path, file: File) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineSink for FileSink {
    fn write_line(&self, line: &str) -> TraceResult<()> {
        let mut writer = lock(&self.writer);
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    fn flush(&self) -> TraceResult<()> {
        lock(&self.writer).flush()?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// MemorySink
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Snapshot of everything written so far.
    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.lines).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LineSink for MemorySink {
    fn write_line(&self, line: &str) -> TraceResult<()> {
        lock(&self.lines).push(line.to_string());
        Ok(())
    }

    fn flush(&self) -> TraceResult<()> {
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// AsyncSink
// ═══════════════════════════════════════════════════════════════════════════

pub struct AsyncSink {
    sender: Mutex<Option<Sender<String>>>,
    done: Mutex<Option<Receiver<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
    timed_out: Mutex<Option<(u64, usize)>>,
}

impl AsyncSink {
    /// Start a writer thread draining into `inner`.
    pub fn new(inner: Arc<dyn LineSink>) -> TraceResult<Self> {
        let (sender, receiver) = mpsc::channel::<String>();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let pending = Arc::new(AtomicUsize::new(0));
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker = {
            let pending = Arc::clone(&pending);
            let cancelled = Arc::clone(&cancelled);
            thread::Builder::new()
                .name("tracematrix-sink".to_string())
                .spawn(move || {
                    for line in receiver {
                        if cancelled.load(Ordering::Acquire) {
                            break;
                        }
                        if let Err(e) = inner.write_line(&line) {
                            warn!(target: "tracematrix::sink", "dropping line: {}", e);
                        }
                        pending.fetch_sub(1, Ordering::AcqRel);
                    }
                    if let Err(e) = inner.flush() {
                        warn!(target: "tracematrix::sink", "final flush failed: {}", e);
                    }
                    let _ = done_tx.send(());
                })?
        };

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            done: Mutex::new(Some(done_rx)),
            worker: Mutex::new(Some(worker)),
            pending,
            cancelled,
            timed_out: Mutex::new(None),
        })
    }

    /// Lines accepted but not yet handed to the inner sink.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Close the queue and wait up to `grace` for it to drain. On timeout
    /// the writer is cancelled and the number of undelivered lines reported;
    /// later calls keep reporting that timeout.
    pub fn await_completion(&self, grace: Duration) -> TraceResult<()> {
        drop(lock(&self.sender).take());

        // Held for the whole wait so a concurrent caller sees the outcome.
        let mut slot = lock(&self.done);
        let Some(done) = slot.take() else {
            return match *lock(&self.timed_out) {
                Some((ms, pending)) => Err(TraceError::Timeout { ms, pending }),
                None => Ok(()),
            };
        };

        match done.recv_timeout(grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(worker) = lock(&self.worker).take() {
                    if worker.join().is_err() {
                        warn!(target: "tracematrix::sink", "writer thread panicked");
                    }
                }
                debug!(target: "tracematrix::sink", "event sink drained");
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                self.cancelled.store(true, Ordering::Release);
                let pending = self.pending();
                warn!(
                    target: "tracematrix::sink",
                    "writer did not finish within {:?}, cancelled with {} lines pending",
                    grace,
                    pending
                );
                let ms = grace.as_millis() as u64;
                *lock(&self.timed_out) = Some((ms, pending));
                Err(TraceError::Timeout { ms, pending })
            }
        }
    }
}

impl LineSink for AsyncSink {
    fn write_line(&self, line: &str) -> TraceResult<()> {
        let sender = lock(&self.sender);
        let Some(sender) = sender.as_ref() else {
            return Err(TraceError::SinkClosed);
        };
        self.pending.fetch_add(1, Ordering::AcqRel);
        sender.send(line.to_string()).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            TraceError::SinkClosed
        })
    }

    /// Delivery is asynchronous; use `await_completion` to drain.
    fn flush(&self) -> TraceResult<()> {
        Ok(())
    }
}

impl Drop for AsyncSink {
    fn drop(&mut self) {
        drop(lock(&self.sender).take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct SlowSink;

    impl LineSink for SlowSink {
        fn write_line(&self, _line: &str) -> TraceResult<()> {
            thread::sleep(Duration::from_millis(200));
            Ok(())
        }

        fn flush(&self) -> TraceResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_file_sink_concurrent_writers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("calls.log");
        let sink = Arc::new(FileSink::create(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for i in 0..100 {
                        sink.write_line(&format!("{}#m::{}#t::{}", i, i, t)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 800);
        assert!(lines.iter().all(|l| l.split('#').count() == 3));
    }

    #[test]
    fn test_file_sink_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("calls.log");
        FileSink::create(&path).unwrap().write_line("1#a#t").unwrap();
        FileSink::append(&path).unwrap().write_line("2#b#t").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1#a#t\n2#b#t\n");
    }

    #[test]
    fn test_async_sink_drains_on_completion() {
        let memory = Arc::new(MemorySink::default());
        let sink = AsyncSink::new(memory.clone()).unwrap();
        for i in 0..50 {
            sink.write_line(&format!("{}#m#t", i)).unwrap();
        }
        sink.await_completion(Duration::from_secs(5)).unwrap();
        assert_eq!(memory.len(), 50);
        assert_eq!(memory.lines()[49], "49#m#t");
        assert!(matches!(sink.write_line("late"), Err(TraceError::SinkClosed)));
    }

    #[test]
    fn test_async_sink_times_out() {
        let sink = AsyncSink::new(Arc::new(SlowSink)).unwrap();
        for _ in 0..10 {
            sink.write_line("1#m#t").unwrap();
        }
        let result = sink.await_completion(Duration::from_millis(50));
        match result {
            Err(TraceError::Timeout { ms, pending }) => {
                assert_eq!(ms, 50);
                assert!(pending > 0);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_async_sink_timeout_is_sticky() {
        let sink = AsyncSink::new(Arc::new(SlowSink)).unwrap();
        for _ in 0..10 {
            sink.write_line("1#m#t").unwrap();
        }
        let first = sink.await_completion(Duration::from_millis(50));
        let second = sink.await_completion(Duration::from_secs(5));
        match (first, second) {
            (
                Err(TraceError::Timeout { ms: a, pending: p }),
                Err(TraceError::Timeout { ms: b, pending: q }),
            ) => {
                assert_eq!((a, p), (b, q));
                assert_eq!(b, 50);
            }
            other => panic!("expected two timeouts, got {:?}", other),
        }
    }

    #[test]
    fn test_async_sink_second_await_after_drain_is_ok() {
        let memory = Arc::new(MemorySink::default());
        let sink = AsyncSink::new(memory.clone()).unwrap();
        sink.write_line("1#m#t").unwrap();
        sink.await_completion(Duration::from_secs(5)).unwrap();
        sink.await_completion(Duration::from_secs(5)).unwrap();
    }
}
