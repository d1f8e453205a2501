use std::collections::HashSet;
use std::sync::Mutex;

use bson::oid::ObjectId;

/// The in-process set of screenshot ids awaiting counter reconciliation
/// (spec §4.8's `requestStatsUpdate`). Drained by the five-minute cron.
#[derive(Default)]
pub struct DirtySet {
    ids: Mutex<HashSet<ObjectId>>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, id: ObjectId) {
        self.ids.lock().expect("dirty set mutex poisoned").insert(id);
    }

    /// Empties the set and returns everything that was in it.
    pub fn drain(&self) -> Vec<ObjectId> {
        std::mem::take(&mut *self.ids.lock().expect("dirty set mutex poisoned"))
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_set_and_dedupes() {
        let set = DirtySet::new();
        let id = ObjectId::new();
        set.mark(id);
        set.mark(id);

        let drained = set.drain();
        assert_eq!(drained, vec![id]);
        assert!(set.drain().is_empty());
    }
}
