use serde::{Deserialize, Serialize};

use crate::domain::execution::{ExecutedMethod, ExecutionData};
use crate::domain::partition::Partition;

#[derive(Debug, Serialize, Deserialize)]
pub struct MatrixDto {
    pub tests: Vec<String>,
    pub methods: Vec<MethodDto>,
    pub partitions: Vec<PartitionDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MethodDto {
    pub name: String,
    pub min_depth: Option<usize>,
    pub max_depth: Option<usize>,
    pub callers: Vec<CallerDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallerDto {
    pub test: String,
    pub min_depth: Option<usize>,
    pub max_depth: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PartitionDto {
    pub methods: Vec<String>,
    pub tests: Vec<String>,
    pub matrix_size: usize,
}

impl MatrixDto {
    pub fn new(data: &ExecutionData, partitions: &[Partition<'_>]) -> Self {
        Self {
            tests: data.all_test_cases().iter().cloned().collect(),
            methods: data.all_target_methods().map(MethodDto::from).collect(),
            partitions: partitions.iter().map(PartitionDto::from).collect(),
        }
    }
}

impl From<&ExecutedMethod> for MethodDto {
    fn from(method: &ExecutedMethod) -> Self {
        let depth = method.depth_range();
        MethodDto {
            name: method.name().to_string(),
            min_depth: depth.min(),
            max_depth: depth.max(),
            callers: method
                .callers()
                .map(|(test, range)| CallerDto {
                    test: test.to_string(),
                    min_depth: range.min(),
                    max_depth: range.max(),
                })
                .collect(),
        }
    }
}

impl From<&Partition<'_>> for PartitionDto {
    fn from(partition: &Partition<'_>) -> Self {
        PartitionDto {
            methods: partition.method_names().into_iter().map(str::to_string).collect(),
            tests: partition.tests().iter().cloned().collect(),
            matrix_size: partition.matrix_size(),
        }
    }
}
