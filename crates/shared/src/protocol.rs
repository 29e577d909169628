//! Wire shapes exchanged with the mission server.

use serde::{Deserialize, Serialize};

use crate::domain::{Formation, Pod, PodId};

pub const POD_UPDATE_EVENT: &str = "pod_update";
pub const FORMATION_UPDATE_EVENT: &str = "formation_update";

pub const STREAM_ROUTE: &str = "/stream";
pub const FORMATION_ROUTE: &str = "/formation";
pub const UPDATE_POD_ROUTE: &str = "/update_pod";

/// `data` of a `pod_update` stream event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodUpdatePayload {
    pub pod: Pod,
}

/// `data` of a `formation_update` stream event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationUpdatePayload {
    pub formation: Formation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationRequest {
    pub formation: Formation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationAccepted {
    pub status: String,
    pub formation: Formation,
}

/// Position persisted after a manual relocation. Coordinates are whole
/// pixels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodPositionUpdate {
    pub id: PodId,
    pub x: i64,
    pub y: i64,
}

impl PodPositionUpdate {
    pub fn rounded_from(pod: &Pod) -> Self {
        Self {
            id: pod.id,
            x: pod.x.round() as i64,
            y: pod.y.round() as i64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodPositionAccepted {
    pub status: String,
    pub id: PodId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pod_update_payload_matches_stream_shape() {
        let payload: PodUpdatePayload =
            serde_json::from_str(r#"{"pod":{"id":4,"x":120.5,"y":300}}"#).expect("json");
        assert_eq!(payload.pod, Pod::new(PodId(4), 120.5, 300.0));
    }

    #[test]
    fn position_update_rounds_half_away_from_zero() {
        let update = PodPositionUpdate::rounded_from(&Pod::new(PodId(2), 10.5, 99.49));
        assert_eq!(update, PodPositionUpdate { id: PodId(2), x: 11, y: 99 });
        assert_eq!(
            serde_json::to_value(update).expect("json"),
            serde_json::json!({ "id": 2, "x": 11, "y": 99 })
        );
    }
}
