/// Trace Aggregator.
/// Turns the persisted call log into an `ExecutionData` coverage model.
///
/// Corrupted lines never abort a run: they are logged, counted and skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::call_record::CallRecord;
use crate::domain::execution::ExecutionData;
use crate::error::TraceResult;

#[derive(Debug, Default)]
pub struct Aggregator {
    data: ExecutionData,
    accepted: usize,
    skipped: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_call(&mut self, record: &CallRecord) {
        self.data.add_call(record);
        self.accepted += 1;
    }

    /// Parse and add one line. Returns `false` if the line was skipped.
    pub fn add_line(&mut self, line: &str) -> bool {
        if line.trim().is_empty() {
            return false;
        }
        match CallRecord::parse_line(line) {
            Ok(record) => {
                self.add_call(&record);
                true
            }
            Err(e) => {
                warn!(target: "tracematrix::aggregate", "skipping line: {}", e);
                self.skipped += 1;
                false
            }
        }
    }

    /// Parse lines in parallel, then fold them in their original order.
    pub fn add_lines(&mut self, lines: &[String]) {
        let parsed: Vec<Option<CallRecord>> = lines
            .par_iter()
            .map(|line| {
                if line.trim().is_empty() {
                    return None;
                }
                match CallRecord::parse_line(line) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(target: "tracematrix::aggregate", "skipping line: {}", e);
                        None
                    }
                }
            })
            .collect();

        for (line, record) in lines.iter().zip(parsed) {
            match record {
                Some(record) => self.add_call(&record),
                None if line.trim().is_empty() => {}
                None => self.skipped += 1,
            }
        }
    }

    /// Only I/O failures propagate; a line that is not valid UTF-8 is
    /// skipped like any other malformed record.
    pub fn read_from<R: BufRead>(&mut self, reader: R) -> TraceResult<()> {
        let mut lines = Vec::new();
        for chunk in reader.split(b'\n') {
            match String::from_utf8(chunk?) {
                Ok(line) => lines.push(line),
                Err(e) => {
                    warn!(target: "tracematrix::aggregate", "skipping line: {}", e);
                    self.skipped += 1;
                }
            }
        }
        self.add_lines(&lines);
        Ok(())
    }

    pub fn read_file(&mut self, path: &Path) -> TraceResult<()> {
        let file = File::open(path)?;
        self.read_from(BufReader::new(file))?;
        debug!(
            target: "tracematrix::aggregate",
            "read {}: {} records, {} skipped",
            path.display(),
            self.accepted,
            self.skipped
        );
        Ok(())
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn data(&self) -> &ExecutionData {
        &self.data
    }

    pub fn finish(self) -> ExecutionData {
        self.data
    }
}

/// Aggregate a whole log in one call.
pub fn aggregate_lines(lines: &[String]) -> ExecutionData {
    let mut aggregator = Aggregator::new();
    aggregator.add_lines(lines);
    aggregator.finish()
}
