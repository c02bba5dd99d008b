//! Coverage Matrix Partitioning
//!
//! Splits the method x test coverage relation into maximal connected
//! sub-matrices. The relation is treated as an implicit bipartite graph with
//! an edge `(m, t)` whenever `m.was_called_by(t)`; each component is found
//! by a breadth-first sweep that removes nodes from their pools as it goes.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::domain::execution::{ExecutedMethod, ExecutionData};

/// One disjoint sub-matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<'a> {
    methods: Vec<&'a ExecutedMethod>,
    tests: BTreeSet<String>,
}

impl<'a> Partition<'a> {
    pub fn methods(&self) -> &[&'a ExecutedMethod] {
        &self.methods
    }

    pub fn method_names(&self) -> Vec<&'a str> {
        self.methods.iter().map(|m| m.name()).collect()
    }

    pub fn tests(&self) -> &BTreeSet<String> {
        &self.tests
    }

    /// Area of the dense `methods x tests` rectangle, not the edge count.
    pub fn matrix_size(&self) -> usize {
        self.methods.len() * self.tests.len()
    }
}

pub struct Partitioner<'a> {
    data: &'a ExecutionData,
}

impl<'a> Partitioner<'a> {
    pub fn new(data: &'a ExecutionData) -> Self {
        Self { data }
    }

    /// Compute all maximal connected components, ordered by their smallest
    /// method name. Tests that reached no recorded method appear in none.
    pub fn partition(&self) -> Vec<Partition<'a>> {
        let data: &'a ExecutionData = self.data;

        let mut remaining_methods: BTreeMap<&'a str, &'a ExecutedMethod> = data
            .all_target_methods()
            .map(|m| (m.name(), m))
            .collect();
        let mut remaining_tests: BTreeSet<&'a str> =
            data.all_test_cases().iter().map(String::as_str).collect();

        // test -> methods it reached
        let mut reached: BTreeMap<&'a str, Vec<&'a str>> = BTreeMap::new();
        for method in data.all_target_methods() {
            for (test, _) in method.callers() {
                reached.entry(test).or_default().push(method.name());
            }
        }

        let mut partitions = Vec::new();

        while let Some((_, seed)) = remaining_methods.pop_first() {
            let mut methods = Vec::new();
            let mut tests = BTreeSet::new();
            let mut frontier: VecDeque<&'a ExecutedMethod> = VecDeque::from([seed]);
            let mut absorbed_tests: VecDeque<&'a str> = VecDeque::new();

            while !frontier.is_empty() || !absorbed_tests.is_empty() {
                while let Some(method) = frontier.pop_front() {
                    methods.push(method);
                    for (test, _) in method.callers() {
                        if remaining_tests.remove(test) {
                            tests.insert(test.to_string());
                            absorbed_tests.push_back(test);
                        } else {
                            debug_assert!(
                                tests.contains(test),
                                "test {} of method {} is in neither the pool nor the component",
                                test,
                                method.name()
                            );
                        }
                    }
                }

                while let Some(test) = absorbed_tests.pop_front() {
                    let Some(callees) = reached.get(test) else {
                        continue;
                    };
                    for name in callees {
                        if let Some(method) = remaining_methods.remove(name) {
                            frontier.push_back(method);
                        }
                    }
                }
            }

            methods.sort_by(|a, b| a.name().cmp(b.name()));
            partitions.push(Partition { methods, tests });
        }

        partitions
    }
}
