//! The contract between the engine and the code it runs.
//!
//! A client supplies `map` and `reduce`. Results leave the callbacks through
//! the emitter handed to them; the engine is the only thing that can build
//! one, so `emit2` is only reachable from `map` and `emit3` only from
//! `reduce`.

use std::sync::Mutex;

use crate::lock;

pub type InputPair<K, V> = (K, V);
pub type IntermediatePair<K, V> = (K, V);
pub type OutputPair<K, V> = (K, V);

/// Input pairs and key groups are read from every worker thread, output
/// pairs only cross threads by value.
pub trait MapReduceClient: Send + Sync + 'static {
    type K1: Send + Sync + 'static;
    type V1: Send + Sync + 'static;
    /// Intermediate keys are the only ones the engine orders.
    type K2: Ord + Send + Sync + 'static;
    type V2: Send + Sync + 'static;
    type K3: Send + 'static;
    type V3: Send + 'static;

    fn map(&self, key: &Self::K1, value: &Self::V1, emitter: &MapEmitter<'_, Self::K2, Self::V2>);

    /// `group` holds every intermediate pair whose key is equivalent to the
    /// group's first key, in the order the shuffle sorted them.
    fn reduce(
        &self,
        group: &[IntermediatePair<Self::K2, Self::V2>],
        emitter: &ReduceEmitter<'_, Self::K3, Self::V3>,
    );
}

/// Write side of one worker's intermediate buffer.
pub struct MapEmitter<'a, K, V> {
    buffer: &'a Mutex<Vec<IntermediatePair<K, V>>>,
}

impl<'a, K, V> MapEmitter<'a, K, V> {
    pub(crate) fn new(buffer: &'a Mutex<Vec<IntermediatePair<K, V>>>) -> Self {
        Self { buffer }
    }

    pub fn emit2(&self, key: K, value: V) {
        lock(self.buffer).push((key, value));
    }
}

/// Write side of the job's shared output sequence.
pub struct ReduceEmitter<'a, K, V> {
    output: &'a Mutex<Vec<OutputPair<K, V>>>,
}

impl<'a, K, V> ReduceEmitter<'a, K, V> {
    pub(crate) fn new(output: &'a Mutex<Vec<OutputPair<K, V>>>) -> Self {
        Self { output }
    }

    pub fn emit3(&self, key: K, value: V) {
        lock(self.output).push((key, value));
    }
}
