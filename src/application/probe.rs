//! Process-wide probe surface for instrumented code.
//!
//! This is the only global in the crate: a slot holding the installed
//! `Instrumentation`. Probe calls made while nothing is installed are no-ops,
//! so instrumented code can run unchanged outside a tracking session.

use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use crate::application::instrumentation::{Instrumentation, ProbeGuard};
use crate::domain::tracker::{adopt_thread_key, current_thread_key};

static ACTIVE: RwLock<Option<Arc<Instrumentation>>> = RwLock::new(None);

/// Install `instrumentation`, returning the previously installed one.
pub fn install(instrumentation: Arc<Instrumentation>) -> Option<Arc<Instrumentation>> {
    ACTIVE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(instrumentation)
}

pub fn uninstall() -> Option<Arc<Instrumentation>> {
    ACTIVE.write().unwrap_or_else(PoisonError::into_inner).take()
}

pub fn installed() -> Option<Arc<Instrumentation>> {
    ACTIVE.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Notify entry into `name`; `None` when no instrumentation is installed.
#[must_use = "the call is exited when the guard is dropped"]
pub fn enter(name: &str) -> Option<ProbeGuard> {
    installed().map(|instrumentation| instrumentation.enter(name))
}

/// `std::thread::spawn` that keeps test attribution across the boundary.
pub fn spawn<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match installed() {
        Some(instrumentation) => {
            let child = instrumentation.register_child(current_thread_key());
            thread::spawn(move || {
                adopt_thread_key(child);
                f()
            })
        }
        None => thread::spawn(f),
    }
}
