//! Tracking session lifecycle.
//!
//! `start` opens the call log behind an asynchronous writer and builds the
//! tracker; `shutdown` drains pending writes within the configured grace
//! period so a later aggregation reads a complete file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::application::instrumentation::Instrumentation;
use crate::domain::tracker::CallTracker;
use crate::infrastructure::config::TraceConfig;
use crate::infrastructure::{AsyncSink, FileSink};
use crate::ports::TestClassifier;

pub struct TraceSession {
    config: TraceConfig,
    sink: Arc<AsyncSink>,
    instrumentation: Arc<Instrumentation>,
}

impl TraceSession {
    pub fn start(config: TraceConfig, classifier: Arc<dyn TestClassifier>) -> Result<Self> {
        let file = FileSink::create(&config.log_path)
            .with_context(|| format!("Failed to open call log {}", config.log_path.display()))?;
        let sink = Arc::new(AsyncSink::new(Arc::new(file)).context("Failed to start event sink")?);
        let tracker = Arc::new(CallTracker::new(config.tracker_config(), sink.clone()));
        let instrumentation = Arc::new(Instrumentation::new(tracker, classifier));

        info!(
            target: "tracematrix",
            "tracking session started: log={}, depth_limit={}",
            config.log_path.display(),
            config.depth_limit
        );

        Ok(Self {
            config,
            sink,
            instrumentation,
        })
    }

    pub fn instrumentation(&self) -> &Arc<Instrumentation> {
        &self.instrumentation
    }

    pub fn tracker(&self) -> &Arc<CallTracker> {
        self.instrumentation.tracker()
    }

    /// Run `body` as the test case `name` on the calling thread.
    pub fn run_test<T>(&self, name: &str, body: impl FnOnce() -> T) -> T {
        let _guard = self.instrumentation.enter_test(name);
        body()
    }

    /// Drain the log and return its path.
    pub fn shutdown(self) -> Result<PathBuf> {
        let active = self.tracker().active_thread_count();
        if active > 0 {
            warn!(target: "tracematrix", "shutting down with {} threads still mapped", active);
        }
        self.sink
            .await_completion(self.config.shutdown_grace())
            .context("Call log did not drain before shutdown")?;
        info!(target: "tracematrix", "tracking session finished: {}", self.config.log_path.display());
        Ok(self.config.log_path)
    }
}
