use std::{
    io,
    sync::{Arc, Barrier, Condvar, Mutex, OnceLock, PoisonError},
    thread::{self, JoinHandle},
};

use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    client::{InputPair, IntermediatePair, MapReduceClient, OutputPair},
    distributor::WorkDistributor,
    error::JobError,
    lock,
    state::JobStateTracker,
    worker::Worker,
};

pub type InputSequence<K, V> = Arc<[InputPair<K, V>]>;
pub type OutputSequence<K, V> = Arc<Mutex<Vec<OutputPair<K, V>>>>;
pub type KeyGroups<K, V> = Vec<Vec<IntermediatePair<K, V>>>;

type WorkerMain = Box<dyn FnOnce() + Send + 'static>;

/// Everything the workers of one job share.
pub(crate) struct JobContext<C: MapReduceClient> {
    pub id: Uuid,
    pub client: C,
    pub input: InputSequence<C::K1, C::V1>,
    pub output: OutputSequence<C::K3, C::V3>,
    /// One slot per worker ordinal, written only by that worker until the
    /// first barrier.
    pub buffers: Vec<Mutex<Vec<IntermediatePair<C::K2, C::V2>>>>,
    /// Published by the leader before the second barrier.
    pub groups: OnceLock<KeyGroups<C::K2, C::V2>>,
    pub input_claims: WorkDistributor,
    pub group_claims: WorkDistributor,
    pub tracker: JobStateTracker,
    pub barrier: Barrier,
    pub gate: LaunchGate,
}

impl<C: MapReduceClient> JobContext<C> {
    pub fn new(
        client: C,
        input: InputSequence<C::K1, C::V1>,
        output: OutputSequence<C::K3, C::V3>,
        worker_count: usize,
    ) -> Self {
        let input_total = input.len();
        Self {
            id: Uuid::new_v4(),
            client,
            input,
            output,
            buffers: (0..worker_count).map(|_| Mutex::default()).collect(),
            groups: OnceLock::new(),
            input_claims: WorkDistributor::new(),
            group_claims: WorkDistributor::new(),
            tracker: JobStateTracker::new(input_total),
            barrier: Barrier::new(worker_count),
            gate: LaunchGate::default(),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.buffers.len()
    }

    /// Spawns one thread per worker ordinal. The threads stay behind the
    /// launch gate until all of them exist; if one cannot be created the gate
    /// turns them away and they are joined before the error is returned.
    pub fn spawn_workers(self: &Arc<Self>) -> Result<Vec<JoinHandle<()>>, JobError> {
        self.spawn_with(|ordinal, run| {
            thread::Builder::new()
                .name(format!("mr-worker-{ordinal}"))
                .spawn(run)
        })
    }

    fn spawn_with<F>(self: &Arc<Self>, mut spawn: F) -> Result<Vec<JoinHandle<()>>, JobError>
    where
        F: FnMut(usize, WorkerMain) -> io::Result<JoinHandle<()>>,
    {
        let mut handles = Vec::with_capacity(self.worker_count());

        for ordinal in 0..self.worker_count() {
            let context = Arc::clone(self);
            let spawned = spawn(
                ordinal,
                Box::new(move || Worker::new(&context, ordinal).run()),
            );

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    error!(job = %self.id, worker = ordinal, %source, "failed to spawn worker");
                    self.gate.open(Launch::Abort);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(JobError::Spawn {
                        worker: ordinal,
                        source,
                    });
                }
            }
        }

        debug!(job = %self.id, workers = handles.len(), "workers spawned");
        self.gate.open(Launch::Go);
        Ok(handles)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Launch {
    #[default]
    Pending,
    Go,
    Abort,
}

/// One-shot latch holding workers until the whole pool is up.
#[derive(Debug, Default)]
pub(crate) struct LaunchGate {
    launch: Mutex<Launch>,
    opened: Condvar,
}

impl LaunchGate {
    pub fn open(&self, launch: Launch) {
        *lock(&self.launch) = launch;
        self.opened.notify_all();
    }

    /// Blocks until the gate opens and tells whether to run.
    pub fn pass(&self) -> bool {
        let launch = self
            .opened
            .wait_while(lock(&self.launch), |launch| *launch == Launch::Pending)
            .unwrap_or_else(PoisonError::into_inner);
        *launch == Launch::Go
    }
}
