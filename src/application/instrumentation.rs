//! Instrumentation boundary.
//!
//! Wraps a tracker and a test classifier behind scoped guards: entering a
//! test begins a test case, entering anything else pushes a method, and the
//! returned guard fires exactly one matching end or pop when it goes out of
//! scope, including while unwinding from a panic.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::domain::tracker::{adopt_thread_key, allocate_thread_key, current_thread_key, CallTracker, ThreadKey};
use crate::ports::TestClassifier;

pub struct Instrumentation {
    tracker: Arc<CallTracker>,
    classifier: Arc<dyn TestClassifier>,
}

impl Instrumentation {
    pub fn new(tracker: Arc<CallTracker>, classifier: Arc<dyn TestClassifier>) -> Self {
        Self { tracker, classifier }
    }

    pub fn tracker(&self) -> &Arc<CallTracker> {
        &self.tracker
    }

    /// Notify entry into `name` on the calling thread.
    #[must_use = "the call is exited when the guard is dropped"]
    pub fn enter(&self, name: &str) -> ProbeGuard {
        let thread = current_thread_key();
        let kind = if self.classifier.is_test(name) {
            self.tracker.begin_test_case(name, thread);
            ProbeKind::TestCase
        } else {
            self.tracker.push_method(name, thread);
            ProbeKind::Method
        };
        ProbeGuard {
            tracker: Arc::clone(&self.tracker),
            name: name.to_string(),
            thread,
            kind,
        }
    }

    /// Enter `name` as a test case regardless of the classifier.
    #[must_use = "the test case ends when the guard is dropped"]
    pub fn enter_test(&self, name: &str) -> ProbeGuard {
        let thread = current_thread_key();
        self.tracker.begin_test_case(name, thread);
        ProbeGuard {
            tracker: Arc::clone(&self.tracker),
            name: name.to_string(),
            thread,
            kind: ProbeKind::TestCase,
        }
    }

    /// Spawn a thread attributed to the caller's current test, if any.
    /// The child is registered before its body starts.
    pub fn spawn<F, T>(&self, f: F) -> JoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let child = self.register_child(current_thread_key());
        thread::spawn(move || {
            adopt_thread_key(child);
            f()
        })
    }

    pub(crate) fn register_child(&self, parent: ThreadKey) -> ThreadKey {
        let child = allocate_thread_key();
        self.tracker.new_thread(parent, child);
        child
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeKind {
    TestCase,
    Method,
}

/// Exits the tracked call on drop.
pub struct ProbeGuard {
    tracker: Arc<CallTracker>,
    name: String,
    thread: ThreadKey,
    kind: ProbeKind,
}

impl ProbeGuard {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_test_case(&self) -> bool {
        self.kind == ProbeKind::TestCase
    }
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        match self.kind {
            ProbeKind::TestCase => self.tracker.end_test_case(&self.name, self.thread),
            ProbeKind::Method => self.tracker.pop_method(&self.name, self.thread),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tracker::TrackerConfig;
    use crate::infrastructure::{MemorySink, PatternClassifier};
    use std::panic::{self, AssertUnwindSafe};

    fn instrumentation() -> (Instrumentation, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let tracker = Arc::new(CallTracker::new(TrackerConfig::default(), sink.clone()));
        (
            Instrumentation::new(tracker, Arc::new(PatternClassifier::new())),
            sink,
        )
    }

    #[test]
    fn test_guards_route_by_classifier() {
        let (probe, sink) = instrumentation();
        {
            let test = probe.enter("shop::tests::adds_item");
            assert!(test.is_test_case());
            let _outer = probe.enter("shop::Cart::add");
            let _inner = probe.enter("shop::Cart::recount");
        }
        assert_eq!(
            sink.lines(),
            vec![
                "1#shop::Cart::add#shop::tests::adds_item".to_string(),
                "2#shop::Cart::recount#shop::tests::adds_item".to_string(),
            ]
        );
        assert_eq!(probe.tracker().active_thread_count(), 0);
    }

    #[test]
    fn test_pop_fires_on_panic() {
        let (probe, _) = instrumentation();
        let _test = probe.enter_test("suite::panicky");
        let thread = current_thread_key();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _call = probe.enter("lib::explode");
            panic!("boom");
        }));

        assert!(result.is_err());
        assert_eq!(probe.tracker().depth_of(thread), Some(0));
    }

    #[test]
    fn test_spawned_thread_inherits_test() {
        let (probe, sink) = instrumentation();
        {
            let _test = probe.enter_test("suite::spawns");
            let _call = probe.enter("lib::dispatch");
            let tracker = Arc::clone(probe.tracker());
            probe
                .spawn(move || {
                    let me = current_thread_key();
                    tracker.push_method("lib::work", me);
                    tracker.pop_method("lib::work", me);
                })
                .join()
                .unwrap();
        }
        let mut lines = sink.lines();
        lines.sort();
        assert_eq!(
            lines,
            vec![
                "1#lib::dispatch#suite::spawns".to_string(),
                "2#lib::work#suite::spawns".to_string(),
            ]
        );
    }
}
