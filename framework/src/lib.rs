//! In-process MapReduce over a fixed pool of worker threads.
//!
//! A job runs in three stages. Workers claim input pairs and map them into
//! their own buffers, then sort those buffers. After a barrier the leader
//! merges every buffer and groups the pairs by key while the others wait at
//! a second barrier. Finally all workers claim key groups and reduce them
//! into the shared output.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod client;
mod context;
mod distributor;
pub mod error;
mod job;
pub mod shuffle;
pub mod state;
mod worker;

pub use client::{
    InputPair, IntermediatePair, MapEmitter, MapReduceClient, OutputPair, ReduceEmitter,
};
pub use context::{InputSequence, KeyGroups, OutputSequence};
pub use distributor::WorkDistributor;
pub use error::JobError;
pub use job::{run_job, start, JobHandle};
pub use state::{JobState, Stage};

/// Locks ignoring poison. None of the engine's critical sections can be left
/// half-done by a panic, so the data behind a poisoned lock is still sound.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
