//! Background workers consuming the job bus.

pub mod job_worker;

pub use job_worker::{
    JobOutcome, JobWorker, JobWorkerHandle, WorkerError, WorkerStats, run_subscribed,
};
