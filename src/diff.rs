use std::collections::HashMap;

use crate::property::{Interface, Snapshot};

/// Name of the elapsed-position property, which changes on every tick while playing.
pub const POSITION: &str = "Position";

/// The properties whose value differs from the previous snapshot.
pub type ChangeSet = Snapshot;

/// Remembers the last snapshot of each interface in order to report only what changed.
///
/// Snapshots are compared by value, so re-reading an identical metadata map does not count as a
/// change.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    previous: HashMap<Interface, Snapshot>,
}

impl SnapshotCache {
    /// An empty cache; the first diff of every interface reports everything.
    pub fn new() -> Self {
        SnapshotCache::default()
    }

    /// Compare `current` against the stored snapshot of `interface` and store `current`.
    ///
    /// The stored snapshot is replaced even when nothing changed, so a value that flips back
    /// between two diffs is compared against the immediately preceding one. When
    /// `suppress_position` is set the position is never part of the result.
    pub fn diff(
        &mut self,
        interface: Interface,
        current: Snapshot,
        suppress_position: bool,
    ) -> ChangeSet {
        let mut changes = changed(self.previous.get(&interface), &current);
        if suppress_position {
            changes.remove(POSITION);
        }
        self.previous.insert(interface, current);
        changes
    }

    /// Store `snapshot` as the baseline of `interface` without computing a diff.
    pub fn prime(&mut self, interface: Interface, snapshot: Snapshot) {
        self.previous.insert(interface, snapshot);
    }
}

/// Returns the entries of `current` that are new or differ from `previous`.
pub fn changed(previous: Option<&Snapshot>, current: &Snapshot) -> ChangeSet {
    current
        .iter()
        .filter(|(name, value)| previous.and_then(|p| p.get(*name)) != Some(*value))
        .map(|(name, value)| (*name, value.clone()))
        .collect()
}
