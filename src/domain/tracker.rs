//! Call Tracker
//!
//! Attributes every tracked call to the test case that is active on the
//! calling thread. Each registered thread owns a `ThreadStack` holding an
//! atomic depth counter and a handle to its owning `TestCase`; threads spawned
//! during a test inherit the parent's test case and current depth.
//!
//! All entry points are safe to call concurrently from any thread. The
//! thread map is a `DashMap`, so lookups for one key never wait on a bulk
//! removal of another test's keys beyond a single shard lock.
//!
//! Known gap: `end_test_case` unmaps every thread of the test at once. A
//! worker that outlives its test method finds no mapping afterwards and its
//! calls are dropped rather than misattributed.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::domain::call_record::CallRecord;
use crate::ports::LineSink;

/// Logical thread identity used as the thread map key.
pub type ThreadKey = u64;

static NEXT_THREAD_KEY: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_KEY: Cell<Option<ThreadKey>> = const { Cell::new(None) };
}

/// Reserve a fresh key, e.g. for a thread that has not started yet.
pub fn allocate_thread_key() -> ThreadKey {
    NEXT_THREAD_KEY.fetch_add(1, Ordering::Relaxed)
}

/// Key of the calling thread, assigned on first use and never reused.
pub fn current_thread_key() -> ThreadKey {
    THREAD_KEY.with(|slot| match slot.get() {
        Some(key) => key,
        None => {
            let key = allocate_thread_key();
            slot.set(Some(key));
            key
        }
    })
}

/// Bind a key reserved by the parent to the calling thread.
pub fn adopt_thread_key(key: ThreadKey) {
    THREAD_KEY.with(|slot| slot.set(Some(key)));
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Deepest depth that is still recorded; `0` means unlimited.
    pub depth_limit: usize,
    /// Enables the test-name check in `end_test_case` and verbose drop logs.
    pub debug: bool,
}

/// One executing test and the observations of every thread it owns.
#[derive(Debug)]
pub struct TestCase {
    name: String,
    calls: Mutex<Vec<(String, usize)>>,
    threads: Mutex<Vec<ThreadKey>>,
    flushed: AtomicBool,
}

impl TestCase {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Mutex::new(Vec::new()),
            threads: Mutex::new(Vec::new()),
            flushed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn record(&self, method: &str, depth: usize) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((method.to_string(), depth));
    }

    /// Add `thread` to this test and run `install` under the same lock
    /// `take_threads` uses, unless the test has already been flushed. A
    /// thread is therefore either seen by the flushing `end_test_case` or
    /// never installed.
    fn register(&self, thread: ThreadKey, install: impl FnOnce()) -> bool {
        let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        if self.flushed.load(Ordering::Acquire) {
            return false;
        }
        threads.push(thread);
        install();
        true
    }

    fn take_calls(&self) -> Vec<(String, usize)> {
        std::mem::take(&mut *self.calls.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn take_threads(&self) -> Vec<ThreadKey> {
        std::mem::take(&mut *self.threads.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Per-thread call-stack state.
#[derive(Debug)]
pub struct ThreadStack {
    thread: ThreadKey,
    depth: AtomicUsize,
    owner: Arc<TestCase>,
}

impl ThreadStack {
    fn new(thread: ThreadKey, depth: usize, owner: Arc<TestCase>) -> Self {
        Self {
            thread,
            depth: AtomicUsize::new(depth),
            owner,
        }
    }

    pub fn thread(&self) -> ThreadKey {
        self.thread
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub fn owner(&self) -> &TestCase {
        &self.owner
    }

    fn enter(&self) -> usize {
        self.depth.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns `false` if the counter was already zero.
    fn exit(&self) -> bool {
        self.depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| d.checked_sub(1))
            .is_ok()
    }
}

pub struct CallTracker {
    threads: DashMap<ThreadKey, Arc<ThreadStack>>,
    depth_limit: AtomicUsize,
    debug: bool,
    sink: Arc<dyn LineSink>,
}

impl CallTracker {
    pub fn new(config: TrackerConfig, sink: Arc<dyn LineSink>) -> Self {
        Self {
            threads: DashMap::new(),
            depth_limit: AtomicUsize::new(config.depth_limit),
            debug: config.debug,
            sink,
        }
    }

    /// Start a test on `thread`, replacing any stale mapping for that key.
    pub fn begin_test_case(&self, test_name: &str, thread: ThreadKey) {
        let test = Arc::new(TestCase::new(test_name));
        let stack = Arc::new(ThreadStack::new(thread, 0, Arc::clone(&test)));
        let mut stale = None;
        test.register(thread, || stale = self.threads.insert(thread, stack));
        if let Some(stale) = stale {
            if self.debug {
                debug!(
                    target: "tracematrix::tracker",
                    "thread {} was still mapped to {}, overwritten by {}",
                    thread,
                    stale.owner.name,
                    test_name
                );
            }
        }
    }

    /// Flush the test owning `thread` and unmap every thread it owns.
    ///
    /// # Panics
    ///
    /// In debug mode, panics if `test_name` differs from the owning test:
    /// begin/end probes fired out of order.
    pub fn end_test_case(&self, test_name: &str, thread: ThreadKey) {
        let Some(stack) = self.lookup(thread) else {
            if self.debug {
                debug!(target: "tracematrix::tracker", "end of {} on unmapped thread {}", test_name, thread);
            }
            return;
        };
        let test = Arc::clone(&stack.owner);

        if self.debug && test.name != test_name {
            panic!(
                "end_test_case({}) on thread {} but the active test is {}",
                test_name, thread, test.name
            );
        }

        if test.flushed.swap(true, Ordering::AcqRel) {
            return;
        }

        for (method, depth) in test.take_calls() {
            let record = CallRecord::new(depth, method, test.name.as_str());
            if let Err(e) = self.sink.write_line(&record.to_line()) {
                warn!(target: "tracematrix::tracker", "dropping record for {}: {}", test.name, e);
            }
        }

        for key in test.take_threads() {
            self.threads
                .remove_if(&key, |_, mapped| Arc::ptr_eq(&mapped.owner, &test));
        }
    }

    pub fn push_method(&self, method: &str, thread: ThreadKey) {
        let Some(stack) = self.lookup(thread) else {
            if self.debug {
                debug!(target: "tracematrix::tracker", "push {} on unmapped thread {}", method, thread);
            }
            return;
        };
        let depth = stack.enter();
        let limit = self.depth_limit();
        if limit == 0 || depth <= limit {
            stack.owner.record(method, depth);
        }
    }

    pub fn pop_method(&self, method: &str, thread: ThreadKey) {
        let Some(stack) = self.lookup(thread) else {
            if self.debug {
                debug!(target: "tracematrix::tracker", "pop {} on unmapped thread {}", method, thread);
            }
            return;
        };
        if !stack.exit() {
            warn!(target: "tracematrix::tracker", "unbalanced pop of {} on thread {}", method, thread);
        }
    }

    /// Attribute `child` to the parent's test, starting at the parent's
    /// current depth. No-op if the parent runs under no test.
    pub fn new_thread(&self, parent: ThreadKey, child: ThreadKey) {
        let Some(parent_stack) = self.lookup(parent) else {
            if self.debug {
                debug!(target: "tracematrix::tracker", "thread {} spawned outside any test", child);
            }
            return;
        };
        let owner = Arc::clone(&parent_stack.owner);
        let stack = Arc::new(ThreadStack::new(child, parent_stack.depth(), Arc::clone(&owner)));
        let registered = owner.register(child, || {
            self.threads.insert(child, stack);
        });
        if !registered && self.debug {
            debug!(target: "tracematrix::tracker", "thread {} spawned after {} ended", child, owner.name);
        }
    }

    pub fn set_depth_limit(&self, limit: usize) {
        self.depth_limit.store(limit, Ordering::Relaxed);
    }

    pub fn depth_limit(&self) -> usize {
        self.depth_limit.load(Ordering::Relaxed)
    }

    pub fn active_thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Current depth of `thread`, if it is mapped.
    pub fn depth_of(&self, thread: ThreadKey) -> Option<usize> {
        self.threads.get(&thread).map(|stack| stack.depth())
    }

    /// Name of the test `thread` is attributed to, if any.
    pub fn test_of(&self, thread: ThreadKey) -> Option<String> {
        self.threads.get(&thread).map(|stack| stack.owner.name.clone())
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    // Clone the Arc so the shard lock is released before any further work.
    fn lookup(&self, thread: ThreadKey) -> Option<Arc<ThreadStack>> {
        self.threads.get(&thread).map(|entry| Arc::clone(entry.value()))
    }
}
