use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: io::Error,
    },

    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },
}
