//! Execution Data Model
//!
//! The aggregated coverage relation of one run: every target method that was
//! observed, and for each one the test cases that reached it together with
//! the depths at which they did.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::call_record::CallRecord;
use crate::domain::range::DepthRange;

/// A target method and the tests that exercised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedMethod {
    name: String,
    /// test name -> depths at which that test reached this method
    callers: BTreeMap<String, DepthRange>,
    depth: DepthRange,
}

impl ExecutedMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            callers: BTreeMap::new(),
            depth: DepthRange::empty(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record that `test` reached this method at `depth`.
    pub fn add_caller(&mut self, test: &str, depth: usize) {
        match self.callers.get_mut(test) {
            Some(range) => range.extend_to_include(depth),
            None => {
                self.callers.insert(test.to_string(), DepthRange::single(depth));
            }
        }
        self.depth.extend_to_include(depth);
    }

    pub fn was_called_by(&self, test: &str) -> bool {
        self.callers.contains_key(test)
    }

    pub fn caller_range(&self, test: &str) -> Option<DepthRange> {
        self.callers.get(test).copied()
    }

    pub fn callers(&self) -> impl Iterator<Item = (&str, DepthRange)> + '_ {
        self.callers.iter().map(|(test, range)| (test.as_str(), *range))
    }

    pub fn caller_count(&self) -> usize {
        self.callers.len()
    }

    /// Depth range across every caller.
    pub fn depth_range(&self) -> DepthRange {
        self.depth
    }
}

/// The full aggregate for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionData {
    methods: BTreeMap<String, ExecutedMethod>,
    test_names: BTreeSet<String>,
}

impl ExecutionData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_call(&mut self, record: &CallRecord) {
        self.test_names.insert(record.caller_test.clone());
        self.methods
            .entry(record.callee_method.clone())
            .or_insert_with(|| ExecutedMethod::new(record.callee_method.clone()))
            .add_caller(&record.caller_test, record.depth);
    }

    /// Register a test without any call, e.g. one whose calls were all
    /// above the depth limit.
    pub fn add_test(&mut self, test: impl Into<String>) {
        self.test_names.insert(test.into());
    }

    /// All target methods, ordered by name.
    pub fn all_target_methods(&self) -> impl Iterator<Item = &ExecutedMethod> + '_ {
        self.methods.values()
    }

    pub fn all_test_cases(&self) -> &BTreeSet<String> {
        &self.test_names
    }

    pub fn target_method(&self, name: &str) -> Option<&ExecutedMethod> {
        self.methods.get(name)
    }

    /// Test names that reached `method`, empty if the method is unknown.
    pub fn tests_for(&self, method: &str) -> Vec<&str> {
        self.methods
            .get(method)
            .map(|m| m.callers().map(|(test, _)| test).collect())
            .unwrap_or_default()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn test_count(&self) -> usize {
        self.test_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.test_names.is_empty()
    }
}
