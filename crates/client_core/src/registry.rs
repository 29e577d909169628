//! Last-known authoritative pod positions, keyed and ordered by pod id.

use std::collections::BTreeMap;

use shared::domain::{Pod, PodId};

/// What a remote update did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// The pod is under local drag; the update was dropped.
    Suppressed,
    Inserted,
    Moved,
    Unchanged,
}

impl RemoteOutcome {
    pub fn changed_state(self) -> bool {
        matches!(self, RemoteOutcome::Inserted | RemoteOutcome::Moved)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PodRegistry {
    pods: BTreeMap<PodId, Pod>,
}

impl PodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a position pushed by the server. `dragged` is the pod under
    /// local control, whose position the stream must not overwrite.
    pub fn apply_remote(&mut self, pod: Pod, dragged: Option<PodId>) -> RemoteOutcome {
        if dragged == Some(pod.id) {
            return RemoteOutcome::Suppressed;
        }

        match self.pods.get_mut(&pod.id) {
            None => {
                self.pods.insert(pod.id, pod);
                RemoteOutcome::Inserted
            }
            Some(existing) if existing.same_position(&pod) => RemoteOutcome::Unchanged,
            Some(existing) => {
                existing.x = pod.x;
                existing.y = pod.y;
                RemoteOutcome::Moved
            }
        }
    }

    /// Writes a locally dragged position. Returns false for unknown pods.
    pub fn set_local_position(&mut self, id: PodId, x: f64, y: f64) -> bool {
        match self.pods.get_mut(&id) {
            Some(pod) => {
                pod.x = x;
                pod.y = y;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: PodId) -> Option<&Pod> {
        self.pods.get(&id)
    }

    pub fn contains(&self, id: PodId) -> bool {
        self.pods.contains_key(&id)
    }

    /// Pods in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Pod> {
        self.pods.values()
    }

    pub fn to_vec(&self) -> Vec<Pod> {
        self.pods.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }
}
