use std::{mem, sync::Mutex};

use tracing::debug;

use crate::{
    client::IntermediatePair,
    lock,
    state::{JobStateTracker, Stage},
};

/// Leader-only merge of every worker's buffer into key groups.
///
/// Runs between the two barriers, so no worker touches the buffers while the
/// leader drains them.
pub(crate) fn shuffle<K: Ord, V>(
    buffers: &[Mutex<Vec<IntermediatePair<K, V>>>],
    tracker: &JobStateTracker,
) -> Vec<Vec<IntermediatePair<K, V>>> {
    let merged = merge(buffers);
    tracker.set_total(Stage::Shuffle, merged.len());

    let pairs = merged.len();
    let groups = group_by_key(merged, || tracker.complete(Stage::Shuffle));
    tracker.set_total(Stage::Reduce, groups.len());

    debug!(pairs, groups = groups.len(), "shuffle done");
    groups
}

/// Concatenates the buffers, leaving them empty, and sorts the result by key.
///
/// The buffers are already sorted individually; the merged sequence is still
/// sorted from scratch.
pub fn merge<K: Ord, V>(
    buffers: &[Mutex<Vec<IntermediatePair<K, V>>>],
) -> Vec<IntermediatePair<K, V>> {
    let mut merged = Vec::new();
    for buffer in buffers {
        merged.append(&mut mem::take(&mut *lock(buffer)));
    }
    merged.sort_by(|a, b| a.0.cmp(&b.0));
    merged
}

/// Splits a key-sorted sequence into maximal runs of equivalent keys.
///
/// `on_pair` is called once for every pair placed into a group.
pub fn group_by_key<K: Ord, V>(
    sorted: Vec<IntermediatePair<K, V>>,
    mut on_pair: impl FnMut(),
) -> Vec<Vec<IntermediatePair<K, V>>> {
    let mut groups = Vec::new();
    let mut current: Vec<IntermediatePair<K, V>> = Vec::new();

    for pair in sorted {
        if matches!(current.last(), Some((last, _)) if *last < pair.0) {
            groups.push(mem::take(&mut current));
        }
        current.push(pair);
        on_pair();
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}
