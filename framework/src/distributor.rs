use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out task indices to competing workers without locking.
///
/// The counter doubles as a ticket dispenser: every call bumps it, so once
/// it passes `limit` it keeps growing and every later caller sees `None`.
#[derive(Debug, Default)]
pub struct WorkDistributor {
    next: AtomicUsize,
}

impl WorkDistributor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim_next(&self, limit: usize) -> Option<usize> {
        // only exclusivity matters here, the barriers order everything else
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        (index < limit).then_some(index)
    }

    /// Iterator over the indices this caller manages to claim.
    pub fn claims(&self, limit: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::from_fn(move || self.claim_next(limit))
    }
}
