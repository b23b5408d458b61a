//! Per-session identity tracking.
//!
//! The tracker maps heap handles to record ids. Ids are assigned from 1 in
//! first-visit order and never reused within a session.

use std::collections::HashMap;

use tangle_types::{Handle, RecordId};

/// Handle to record-id table for one encode session.
#[derive(Debug)]
pub struct IdentityTracker {
    ids: HashMap<Handle, RecordId>,
    next: u64,
}

impl Default for IdentityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            next: 1,
        }
    }

    /// The id for `handle`, allocating the next one on first sight.
    ///
    /// The flag is `true` when the id was allocated by this call.
    pub fn id_for(&mut self, handle: Handle) -> (RecordId, bool) {
        if let Some(id) = self.ids.get(&handle) {
            return (*id, false);
        }
        let id = RecordId::new(self.next);
        self.next += 1;
        self.ids.insert(handle, id);
        (id, true)
    }

    /// The id for `handle`, if one was already allocated.
    pub fn get(&self, handle: Handle) -> Option<RecordId> {
        self.ids.get(&handle).copied()
    }

    /// Number of ids allocated so far.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
