// Domain model and algorithms for TraceMatrix.

pub mod aggregator;
pub mod call_record;
pub mod execution;
pub mod partition;
pub mod range;
pub mod tracker;
