use std::{
    mem,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::JoinHandle,
};

use tracing::{info, warn};

use crate::{
    client::{MapReduceClient, OutputPair},
    context::{InputSequence, JobContext, OutputSequence},
    error::JobError,
    lock,
    state::JobState,
};

/// Owner of a running or finished job.
///
/// Dropping the handle waits for the workers, `close` does the same and
/// reports how they ended.
pub struct JobHandle<C: MapReduceClient> {
    context: Arc<JobContext<C>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    joined: AtomicBool,
}

/// Spawns `worker_count` workers running `client` over `input`; reduce
/// results are appended to `output` as they complete.
pub fn start<C: MapReduceClient>(
    client: C,
    input: impl Into<InputSequence<C::K1, C::V1>>,
    output: OutputSequence<C::K3, C::V3>,
    worker_count: usize,
) -> Result<JobHandle<C>, JobError> {
    if worker_count == 0 {
        return Err(JobError::InvalidWorkerCount);
    }

    let context = Arc::new(JobContext::new(client, input.into(), output, worker_count));
    info!(
        job = %context.id,
        workers = worker_count,
        inputs = context.input.len(),
        "starting job"
    );
    let workers = context.spawn_workers()?;

    Ok(JobHandle {
        context,
        workers: Mutex::new(workers),
        joined: AtomicBool::new(false),
    })
}

/// Runs a job to completion and hands back its output.
pub fn run_job<C: MapReduceClient>(
    client: C,
    input: impl Into<InputSequence<C::K1, C::V1>>,
    worker_count: usize,
) -> Result<Vec<OutputPair<C::K3, C::V3>>, JobError> {
    let output = OutputSequence::default();
    start(client, input, Arc::clone(&output), worker_count)?.close()?;
    let pairs = mem::take(&mut *lock(&output));
    Ok(pairs)
}

impl<C: MapReduceClient> JobHandle<C> {
    /// Blocks until every worker has finished. Only the first call joins the
    /// threads; later calls return at once.
    pub fn wait(&self) -> Result<(), JobError> {
        if self.joined.load(Ordering::Acquire) {
            return Ok(());
        }

        let mut workers = lock(&self.workers);
        let mut result = Ok(());
        for (worker, handle) in mem::take(&mut *workers).into_iter().enumerate() {
            if handle.join().is_err() {
                warn!(job = %self.context.id, worker, "worker panicked");
                if result.is_ok() {
                    result = Err(JobError::WorkerPanicked { worker });
                }
            }
        }

        if !self.joined.swap(true, Ordering::AcqRel) {
            info!(job = %self.context.id, state = %self.state(), "job finished");
        }
        result
    }

    pub fn state(&self) -> JobState {
        self.context.tracker.snapshot()
    }

    pub fn worker_count(&self) -> usize {
        self.context.worker_count()
    }

    pub fn close(self) -> Result<(), JobError> {
        self.wait()
    }
}

impl<C: MapReduceClient> Drop for JobHandle<C> {
    fn drop(&mut self) {
        let _ = self.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::{IntermediatePair, MapEmitter, ReduceEmitter},
        state::Stage,
    };
    use std::time::{Duration, Instant};

    /// Emits each input key once; reduce reports the group size.
    struct Count;

    impl MapReduceClient for Count {
        type K1 = u32;
        type V1 = ();
        type K2 = u32;
        type V2 = ();
        type K3 = u32;
        type V3 = usize;

        fn map(&self, key: &u32, _: &(), emitter: &MapEmitter<'_, u32, ()>) {
            emitter.emit2(*key, ());
        }

        fn reduce(
            &self,
            group: &[IntermediatePair<u32, ()>],
            emitter: &ReduceEmitter<'_, u32, usize>,
        ) {
            emitter.emit3(group[0].0, group.len());
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        let output = OutputSequence::default();
        let result = start(Count, vec![(1u32, ())], output, 0);
        assert!(matches!(result, Err(JobError::InvalidWorkerCount)));
    }

    #[test]
    fn test_second_wait_returns_immediately() {
        let output = OutputSequence::default();
        let job = start(Count, vec![(1u32, ()), (2, ())], Arc::clone(&output), 3).unwrap();

        job.wait().unwrap();
        assert!(lock(&job.workers).is_empty());

        let started = Instant::now();
        job.wait().unwrap();
        assert!(started.elapsed() < Duration::from_millis(100));
        job.close().unwrap();

        assert_eq!(lock(&output).len(), 2);
    }

    #[test]
    fn test_finished_job_is_in_reduce() {
        let output = OutputSequence::default();
        let job = start(Count, vec![(7u32, ()), (7, ())], output, 2).unwrap();
        job.wait().unwrap();

        assert_eq!(
            job.state(),
            JobState {
                stage: Stage::Reduce,
                percentage: 100.0
            }
        );
        assert_eq!(job.worker_count(), 2);
    }

    #[test]
    fn test_empty_input() {
        let output = run_job(Count, Vec::<(u32, ())>::new(), 4).unwrap();
        assert!(output.is_empty());
    }

    struct Explode;

    impl MapReduceClient for Explode {
        type K1 = u32;
        type V1 = ();
        type K2 = u32;
        type V2 = ();
        type K3 = u32;
        type V3 = ();

        fn map(&self, key: &u32, _: &(), emitter: &MapEmitter<'_, u32, ()>) {
            emitter.emit2(*key, ());
        }

        fn reduce(&self, _: &[IntermediatePair<u32, ()>], _: &ReduceEmitter<'_, u32, ()>) {
            panic!("reduce failed");
        }
    }

    #[test]
    fn test_panicking_reduce_is_reported() {
        let result = run_job(Explode, vec![(1u32, ())], 1);
        assert!(matches!(result, Err(JobError::WorkerPanicked { worker: 0 })));
    }
}
