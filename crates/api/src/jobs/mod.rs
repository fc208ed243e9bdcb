//! Background job scheduler and job implementations.

mod operation_metrics;
mod pool_metrics;
mod scheduler;

pub use operation_metrics::OperationMetricsJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
