//! Local manual-control sessions over a single pod.

use shared::domain::PodId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DragError {
    #[error("pod {active} is already being dragged")]
    SessionActive { active: PodId },
    #[error("pod {0} is not known to the registry")]
    UnknownPod(PodId),
}

/// Pointer position in client (viewport) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerPosition {
    pub client_x: f64,
    pub client_y: f64,
}

/// Top-left corner of the dashboard container in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerOrigin {
    pub left: f64,
    pub top: f64,
}

impl ContainerOrigin {
    pub fn relative(&self, pointer: PointerPosition) -> (f64, f64) {
        (pointer.client_x - self.left, pointer.client_y - self.top)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DragController {
    session: Option<PodId>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<PodId> {
        self.session
    }

    pub fn begin(&mut self, pod_id: PodId) -> Result<(), DragError> {
        match self.session {
            Some(active) if active != pod_id => Err(DragError::SessionActive { active }),
            _ => {
                self.session = Some(pod_id);
                Ok(())
            }
        }
    }

    /// Position the dragged pod should take for this pointer sample, if a
    /// session is active.
    pub fn track(
        &self,
        pointer: PointerPosition,
        origin: ContainerOrigin,
    ) -> Option<(PodId, f64, f64)> {
        let id = self.session?;
        let (x, y) = origin.relative(pointer);
        Some((id, x, y))
    }

    pub fn release(&mut self) -> Option<PodId> {
        self.session.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_pod_cannot_start_while_session_active() {
        let mut drag = DragController::new();
        drag.begin(PodId(1)).expect("first drag");
        assert_eq!(
            drag.begin(PodId(2)),
            Err(DragError::SessionActive { active: PodId(1) })
        );
        assert_eq!(drag.active(), Some(PodId(1)));
        drag.begin(PodId(1)).expect("same pod re-press keeps session");
    }

    #[test]
    fn track_is_relative_to_container_and_stays_fractional() {
        let mut drag = DragController::new();
        let origin = ContainerOrigin {
            left: 20.0,
            top: 8.5,
        };
        let pointer = PointerPosition {
            client_x: 120.25,
            client_y: 60.0,
        };
        assert_eq!(drag.track(pointer, origin), None);

        drag.begin(PodId(4)).expect("drag");
        assert_eq!(drag.track(pointer, origin), Some((PodId(4), 100.25, 51.5)));
    }

    #[test]
    fn release_is_idempotent() {
        let mut drag = DragController::new();
        drag.begin(PodId(3)).expect("drag");
        assert_eq!(drag.release(), Some(PodId(3)));
        assert_eq!(drag.release(), None);
        assert_eq!(drag.active(), None);
    }
}
