// Infrastructure implementations for TraceMatrix.

pub mod concurrency;
pub mod config;
pub mod event_sink;
pub mod logging;

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;

use crate::api::dto::MatrixDto;
use crate::domain::execution::ExecutionData;
use crate::domain::partition::Partition;
use crate::ports::{OutputExporter, TestClassifier};

pub use event_sink::{AsyncSink, FileSink, MemorySink};

/// Name-based test detection: a `tests` module segment, a `test_` prefixed
/// last segment, or an explicitly listed name.
#[derive(Debug, Default, Clone)]
pub struct PatternClassifier {
    explicit: HashSet<String>,
}

impl PatternClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tests<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            explicit: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl TestClassifier for PatternClassifier {
    fn is_test(&self, qualified_name: &str) -> bool {
        if self.explicit.contains(qualified_name) {
            return true;
        }
        let mut segments: Vec<&str> = qualified_name.split("::").collect();
        let Some(last) = segments.pop() else {
            return false;
        };
        last.starts_with("test_") || segments.iter().any(|s| *s == "tests")
    }
}

pub struct JsonExporter;

impl OutputExporter for JsonExporter {
    fn export(&self, data: &ExecutionData, partitions: &[Partition<'_>], path: &Path) -> anyhow::Result<()> {
        let dto = MatrixDto::new(data, partitions);
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &dto)
            .context("Failed to write coverage matrix")?;
        writer.flush().context("Failed to flush coverage matrix")?;
        Ok(())
    }
}
