use rand::rngs::SmallRng;
use shared::{
    domain::{Formation, Pod, PodId},
    protocol::PodPositionUpdate,
};

use crate::layout::{self, random_point};

const INITIAL_FORMATION: &str = "FREEFORM";

#[derive(Debug, Clone)]
struct FleetPod {
    id: PodId,
    x: f64,
    y: f64,
    target: (f64, f64),
    // Last whole-pixel position pushed to stream subscribers.
    emitted: (i64, i64),
}

impl FleetPod {
    fn wire_position(&self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }

    fn to_pod(&self) -> Pod {
        let (x, y) = self.wire_position();
        Pod::new(self.id, x as f64, y as f64)
    }
}

/// Authoritative pod positions and the formation they are drifting toward.
pub struct Fleet {
    pods: Vec<FleetPod>,
    formation: Formation,
    drift_factor: f64,
    rng: SmallRng,
}

impl Fleet {
    pub fn new(pod_count: usize, drift_factor: f64, mut rng: SmallRng) -> Self {
        let pods = (0..pod_count)
            .map(|index| {
                let (x, y) = random_point(&mut rng);
                FleetPod {
                    id: PodId(index as i64),
                    x,
                    y,
                    target: (x, y),
                    emitted: (x.round() as i64, y.round() as i64),
                }
            })
            .collect();

        Self {
            pods,
            formation: Formation::from(INITIAL_FORMATION),
            drift_factor: drift_factor.clamp(f64::EPSILON, 1.0),
            rng,
        }
    }

    pub fn formation(&self) -> &Formation {
        &self.formation
    }

    /// Every pod at its wire position, in id order.
    pub fn pods(&self) -> Vec<Pod> {
        self.pods.iter().map(FleetPod::to_pod).collect()
    }

    /// Switches formation and, for catalog formations, retargets every pod.
    pub fn set_formation(&mut self, formation: Formation) {
        if let Some(targets) = layout::layout(&formation, self.pods.len(), &mut self.rng) {
            for (pod, target) in self.pods.iter_mut().zip(targets) {
                pod.target = target;
            }
        }
        self.formation = formation;
    }

    /// Pins a pod where an operator dropped it. Returns false for an unknown id.
    pub fn relocate(&mut self, update: PodPositionUpdate) -> bool {
        let Some(pod) = self.pods.iter_mut().find(|pod| pod.id == update.id) else {
            return false;
        };
        pod.x = update.x as f64;
        pod.y = update.y as f64;
        pod.target = (pod.x, pod.y);
        self.formation = Formation::Random;
        true
    }

    /// Moves every pod a step toward its target and returns the pods whose
    /// wire position changed since they were last reported.
    pub fn step(&mut self) -> Vec<Pod> {
        let drift = self.drift_factor;
        let mut changed = Vec::new();
        for pod in &mut self.pods {
            pod.x += (pod.target.0 - pod.x) * drift;
            pod.y += (pod.target.1 - pod.y) * drift;
            let position = pod.wire_position();
            if position != pod.emitted {
                pod.emitted = position;
                changed.push(pod.to_pod());
            }
        }
        changed
    }
}

#[cfg(test)]
#[path = "tests/fleet_tests.rs"]
mod tests;
