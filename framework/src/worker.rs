use tracing::{debug, info_span, trace};

use crate::{
    client::{MapEmitter, MapReduceClient, ReduceEmitter},
    context::JobContext,
    lock, shuffle,
    state::Stage,
};

/// The worker that performs the shuffle.
pub(crate) const LEADER: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Mapping,
    Sorting,
    Barrier1,
    Shuffling,
    Barrier2,
    Reducing,
    Done,
}

impl Phase {
    /// Followers skip `Shuffling` and wait for the leader at `Barrier2`.
    pub fn next(self, leader: bool) -> Phase {
        match self {
            Phase::Mapping => Phase::Sorting,
            Phase::Sorting => Phase::Barrier1,
            Phase::Barrier1 if leader => Phase::Shuffling,
            Phase::Barrier1 | Phase::Shuffling => Phase::Barrier2,
            Phase::Barrier2 => Phase::Reducing,
            Phase::Reducing | Phase::Done => Phase::Done,
        }
    }
}

pub(crate) struct Worker<'a, C: MapReduceClient> {
    context: &'a JobContext<C>,
    ordinal: usize,
}

impl<'a, C: MapReduceClient> Worker<'a, C> {
    pub fn new(context: &'a JobContext<C>, ordinal: usize) -> Self {
        Self { context, ordinal }
    }

    fn is_leader(&self) -> bool {
        self.ordinal == LEADER
    }

    pub fn run(&self) {
        let span = info_span!("worker", job = %self.context.id, worker = self.ordinal);
        let _entered = span.enter();

        if !self.context.gate.pass() {
            debug!("launch aborted");
            return;
        }

        let mut phase = Phase::Mapping;
        while phase != Phase::Done {
            debug!(?phase, "entering");
            self.step(phase);
            phase = phase.next(self.is_leader());
        }
        debug!("worker done");
    }

    fn step(&self, phase: Phase) {
        match phase {
            Phase::Mapping => self.map(),
            Phase::Sorting => self.sort(),
            Phase::Barrier1 | Phase::Barrier2 => {
                self.context.barrier.wait();
            }
            Phase::Shuffling => self.shuffle(),
            Phase::Reducing => self.reduce(),
            Phase::Done => {}
        }
    }

    fn map(&self) {
        let context = self.context;
        context.tracker.change_stage(Stage::Map);

        let emitter = MapEmitter::new(&context.buffers[self.ordinal]);
        for index in context.input_claims.claims(context.input.len()) {
            trace!(index, "claimed input");
            let (key, value) = &context.input[index];
            context.client.map(key, value, &emitter);
            context.tracker.complete(Stage::Map);
        }
    }

    fn sort(&self) {
        let mut buffer = lock(&self.context.buffers[self.ordinal]);
        buffer.sort_by(|a, b| a.0.cmp(&b.0));
        debug!(pairs = buffer.len(), "sorted intermediate buffer");
    }

    fn shuffle(&self) {
        let context = self.context;
        context.tracker.change_stage(Stage::Shuffle);

        let groups = shuffle::shuffle(&context.buffers, &context.tracker);
        if context.groups.set(groups).is_err() {
            panic!("shuffle ran more than once for job {}", context.id);
        }
    }

    fn reduce(&self) {
        let context = self.context;
        context.tracker.change_stage(Stage::Reduce);

        let groups = context.groups.get().map(Vec::as_slice).unwrap_or_default();
        let emitter = ReduceEmitter::new(&context.output);
        for index in context.group_claims.claims(groups.len()) {
            trace!(index, "claimed group");
            context.client.reduce(&groups[index], &emitter);
            context.tracker.complete(Stage::Reduce);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(leader: bool) -> Vec<Phase> {
        let mut phases = vec![Phase::Mapping];
        while let Some(&last) = phases.last().filter(|p| **p != Phase::Done) {
            phases.push(last.next(leader));
        }
        phases
    }

    #[test]
    fn test_leader_shuffles_between_barriers() {
        assert_eq!(
            walk(true),
            vec![
                Phase::Mapping,
                Phase::Sorting,
                Phase::Barrier1,
                Phase::Shuffling,
                Phase::Barrier2,
                Phase::Reducing,
                Phase::Done,
            ]
        );
    }

    #[test]
    fn test_followers_skip_shuffle() {
        assert_eq!(
            walk(false),
            vec![
                Phase::Mapping,
                Phase::Sorting,
                Phase::Barrier1,
                Phase::Barrier2,
                Phase::Reducing,
                Phase::Done,
            ]
        );
    }
}
