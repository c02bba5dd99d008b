use std::path::Path;

use crate::domain::execution::ExecutionData;
use crate::domain::partition::Partition;
use crate::error::TraceResult;

/// Append-only line stream shared by every tracked thread.
/// Implementations must be thread-safe (Send + Sync) and must never
/// interleave two lines.
pub trait LineSink: Send + Sync {
    fn write_line(&self, line: &str) -> TraceResult<()>;
    fn flush(&self) -> TraceResult<()>;
}

/// Decides whether a qualified name denotes a test case or target code.
pub trait TestClassifier: Send + Sync {
    fn is_test(&self, qualified_name: &str) -> bool;
}

impl<F> TestClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_test(&self, qualified_name: &str) -> bool {
        self(qualified_name)
    }
}

pub trait OutputExporter {
    fn export(&self, data: &ExecutionData, partitions: &[Partition<'_>], path: &Path) -> anyhow::Result<()>;
}
