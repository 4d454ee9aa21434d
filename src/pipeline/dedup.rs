//! Per-stage duplicate suppression.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::models::TrackId;

/// Set of track ids with a pending task in one stage.
///
/// An id is inserted when its task is submitted and removed when the
/// returned [`DedupPermit`] is dropped, which happens when the task finishes
/// whether it succeeded, failed or panicked.
#[derive(Debug, Clone, Default)]
pub struct DedupGuard {
    pending: Arc<Mutex<HashSet<TrackId>>>,
}

impl DedupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id` for a new task. Returns None if a task for `id` is
    /// already pending.
    pub fn try_acquire(&self, id: TrackId) -> Option<DedupPermit> {
        let inserted = self.pending.lock().unwrap().insert(id);
        inserted.then(|| DedupPermit {
            id,
            pending: self.pending.clone(),
        })
    }

    pub fn is_pending(&self, id: TrackId) -> bool {
        self.pending.lock().unwrap().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Proof that a task for `id` is pending. Releases the id on drop.
#[derive(Debug)]
pub struct DedupPermit {
    id: TrackId,
    pending: Arc<Mutex<HashSet<TrackId>>>,
}

impl DedupPermit {
    pub fn id(&self) -> TrackId {
        self.id
    }
}

impl Drop for DedupPermit {
    fn drop(&mut self) {
        // Ignore poisoning, release must always happen
        let mut pending = match self.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending.remove(&self.id);
    }
}
