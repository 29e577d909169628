//! Proximity links drawn between nearby pods.

use shared::domain::{Pod, PodId};

pub const DEFAULT_LINK_THRESHOLD: f64 = 150.0;
pub const MIN_LINK_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PodLink {
    pub from: PodId,
    pub to: PodId,
    pub distance: f64,
    /// Stroke weight in `[MIN_LINK_WEIGHT, 1.0]`, heavier for closer pods.
    pub weight: f64,
}

/// Two pods are linked when strictly closer than `threshold`.
pub fn is_connected(a: &Pod, b: &Pod, threshold: f64) -> bool {
    a.distance_to(b) < threshold
}

pub fn link_weight(distance: f64, threshold: f64) -> f64 {
    ((threshold - distance) / threshold).max(MIN_LINK_WEIGHT)
}

/// Every connected unordered pair once. `pods` is expected in ascending id
/// order, and links come out in that order.
pub fn links(pods: &[Pod], threshold: f64) -> Vec<PodLink> {
    let mut out = Vec::new();
    for (i, a) in pods.iter().enumerate() {
        for b in &pods[i + 1..] {
            let distance = a.distance_to(b);
            if distance < threshold {
                out.push(PodLink {
                    from: a.id,
                    to: b.id,
                    distance,
                    weight: link_weight(distance, threshold),
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod(id: i64, x: f64, y: f64) -> Pod {
        Pod::new(PodId(id), x, y)
    }

    #[test]
    fn connectivity_boundary_is_exclusive() {
        let origin = pod(1, 0.0, 0.0);
        assert!(is_connected(&origin, &pod(2, 100.0, 0.0), DEFAULT_LINK_THRESHOLD));
        assert!(!is_connected(&origin, &pod(2, 200.0, 0.0), DEFAULT_LINK_THRESHOLD));
        assert!(!is_connected(&origin, &pod(2, 90.0, 120.0), DEFAULT_LINK_THRESHOLD));
        assert!(is_connected(&origin, &pod(2, 149.999, 0.0), DEFAULT_LINK_THRESHOLD));
    }

    #[test]
    fn links_list_each_pair_once_with_floor_weight() {
        let pods = vec![pod(1, 0.0, 0.0), pod(2, 30.0, 40.0), pod(3, 0.0, 140.0), pod(4, 900.0, 900.0)];
        let found = links(&pods, DEFAULT_LINK_THRESHOLD);

        let pairs: Vec<_> = found.iter().map(|link| (link.from.0, link.to.0)).collect();
        assert_eq!(pairs, vec![(1, 2), (1, 3), (2, 3)]);
        assert!((found[0].weight - 100.0 / 150.0).abs() < 1e-9);
        assert_eq!(found[1].weight, MIN_LINK_WEIGHT);
    }
}
