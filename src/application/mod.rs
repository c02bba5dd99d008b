pub mod instrumentation;
pub mod probe;
pub mod session;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::domain::aggregator::Aggregator;
use crate::domain::execution::ExecutionData;
use crate::domain::partition::Partitioner;
use crate::ports::OutputExporter;

pub use instrumentation::{Instrumentation, ProbeGuard};
pub use session::TraceSession;

/// Summary of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeReport {
    pub records: usize,
    pub skipped_lines: usize,
    pub methods: usize,
    pub tests: usize,
    pub partitions: usize,
    pub largest_partition: usize,
}

pub struct AnalyzeUsecase<'a> {
    pub exporter: &'a dyn OutputExporter,
}

impl<'a> AnalyzeUsecase<'a> {
    /// Call log -> coverage model -> sub-matrices -> export.
    pub fn run(&self, log_path: &Path, export_path: &Path) -> Result<AnalyzeReport> {
        let mut aggregator = Aggregator::new();
        aggregator
            .read_file(log_path)
            .with_context(|| format!("Failed to read call log {}", log_path.display()))?;
        let (records, skipped_lines) = (aggregator.accepted(), aggregator.skipped());
        let data: ExecutionData = aggregator.finish();

        let partitions = Partitioner::new(&data).partition();
        self.exporter.export(&data, &partitions, export_path)?;

        let report = AnalyzeReport {
            records,
            skipped_lines,
            methods: data.method_count(),
            tests: data.test_count(),
            partitions: partitions.len(),
            largest_partition: partitions.iter().map(|p| p.matrix_size()).max().unwrap_or(0),
        };
        info!(target: "tracematrix", "{:?}", report);
        Ok(report)
    }
}
