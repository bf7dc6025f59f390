use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use tracing::info;

use crate::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Stage {
    #[default]
    Undefined,
    Map,
    Shuffle,
    Reduce,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Undefined => "undefined",
            Stage::Map => "map",
            Stage::Shuffle => "shuffle",
            Stage::Reduce => "reduce",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JobState {
    pub stage: Stage,
    /// Share of the current stage's work that is done, in `[0, 100]`.
    pub percentage: f32,
}

impl Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:.1}%", self.stage, self.percentage)
    }
}

/// Stage and percentage bookkeeping.
///
/// Every stage has a done counter and a total. Workers report each finished
/// unit through [`JobStateTracker::complete`], which bumps the counter and
/// recomputes the percentage while holding the state lock, so readers never
/// see a percentage that belongs to another stage.
#[derive(Debug)]
pub(crate) struct JobStateTracker {
    state: Mutex<JobState>,
    mapped: AtomicUsize,
    shuffled: AtomicUsize,
    reduced: AtomicUsize,
    input_total: usize,
    merged_total: AtomicUsize,
    group_total: AtomicUsize,
}

impl JobStateTracker {
    pub fn new(input_total: usize) -> Self {
        Self {
            state: Mutex::new(JobState::default()),
            mapped: AtomicUsize::new(0),
            shuffled: AtomicUsize::new(0),
            reduced: AtomicUsize::new(0),
            input_total,
            merged_total: AtomicUsize::new(0),
            group_total: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> JobState {
        *lock(&self.state)
    }

    /// Moves the job to `stage`. Late workers asking for the stage the job is
    /// already in change nothing, in particular not the percentage.
    pub fn change_stage(&self, stage: Stage) {
        let mut state = lock(&self.state);
        if state.stage == stage {
            return;
        }
        info!(from = %state.stage, to = %stage, "stage changed");
        state.stage = stage;
        state.percentage = 0.0;
    }

    /// Sets the denominator of the shuffle or reduce stage. The input total
    /// is fixed at construction.
    pub fn set_total(&self, stage: Stage, total: usize) {
        match stage {
            Stage::Shuffle => self.merged_total.store(total, Ordering::Relaxed),
            Stage::Reduce => self.group_total.store(total, Ordering::Relaxed),
            Stage::Map | Stage::Undefined => {}
        }
    }

    pub fn complete(&self, stage: Stage) {
        let mut state = lock(&self.state);
        if let Some((done, _)) = self.progress(stage) {
            done.fetch_add(1, Ordering::Relaxed);
        }
        self.recompute(&mut state);
    }

    fn recompute(&self, state: &mut JobState) {
        let Some((done, total)) = self.progress(state.stage) else {
            return;
        };
        let done = done.load(Ordering::Relaxed);
        // an overshoot means the counting is broken; leave the last value
        if done <= total {
            state.percentage = done as f32 / total as f32 * 100.0;
        }
    }

    fn progress(&self, stage: Stage) -> Option<(&AtomicUsize, usize)> {
        match stage {
            Stage::Undefined => None,
            Stage::Map => Some((&self.mapped, self.input_total)),
            Stage::Shuffle => Some((&self.shuffled, self.merged_total.load(Ordering::Relaxed))),
            Stage::Reduce => Some((&self.reduced, self.group_total.load(Ordering::Relaxed))),
        }
    }
}
