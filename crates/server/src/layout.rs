//! Target positions for each catalog formation.

use std::f64::consts::{PI, TAU};

use rand::Rng;
use shared::domain::Formation;

pub const FIELD_MIN_X: f64 = 50.0;
pub const FIELD_MAX_X: f64 = 850.0;
pub const FIELD_MIN_Y: f64 = 100.0;
pub const FIELD_MAX_Y: f64 = 600.0;

const CENTER_X: f64 = (FIELD_MIN_X + FIELD_MAX_X) / 2.0;
const CENTER_Y: f64 = (FIELD_MIN_Y + FIELD_MAX_Y) / 2.0;
const RADIUS: f64 = 220.0;
const STAR_INNER_RATIO: f64 = 0.45;
const LINE_HALF_WIDTH: f64 = 350.0;
const PARABOLA_HALF_WIDTH: f64 = 300.0;
const PARABOLA_DEPTH: f64 = 300.0;

/// Returns one target per pod, or `None` when the formation has no layout
/// and pods keep their current targets.
pub fn layout(formation: &Formation, count: usize, rng: &mut impl Rng) -> Option<Vec<(f64, f64)>> {
    let points = match formation {
        Formation::Circle => (0..count).map(|i| circle_point(i, count)).collect(),
        Formation::Star => {
            let vertices = star_vertices();
            (0..count).map(|i| star_point(&vertices, i, count)).collect()
        }
        Formation::X => (0..count).map(|i| x_point(i, count)).collect(),
        Formation::Line => (0..count)
            .map(|i| {
                let t = spread(i, count);
                (CENTER_X - LINE_HALF_WIDTH + 2.0 * LINE_HALF_WIDTH * t, CENTER_Y)
            })
            .collect(),
        Formation::Parabola => (0..count).map(|i| parabola_point(i, count)).collect(),
        Formation::Random => (0..count).map(|_| random_point(rng)).collect(),
        Formation::Custom(_) => return None,
    };
    Some(points)
}

pub fn random_point(rng: &mut impl Rng) -> (f64, f64) {
    (
        rng.gen_range(FIELD_MIN_X..=FIELD_MAX_X).round(),
        rng.gen_range(FIELD_MIN_Y..=FIELD_MAX_Y).round(),
    )
}

/// Evenly spaced parameter in `[0, 1]`; a single pod sits in the middle.
fn spread(index: usize, count: usize) -> f64 {
    if count <= 1 {
        0.5
    } else {
        index as f64 / (count - 1) as f64
    }
}

fn circle_point(index: usize, count: usize) -> (f64, f64) {
    let angle = TAU * index as f64 / count.max(1) as f64 - PI / 2.0;
    (CENTER_X + RADIUS * angle.cos(), CENTER_Y + RADIUS * angle.sin())
}

fn star_vertices() -> [(f64, f64); 10] {
    let mut vertices = [(0.0, 0.0); 10];
    for (k, vertex) in vertices.iter_mut().enumerate() {
        let radius = if k % 2 == 0 {
            RADIUS
        } else {
            RADIUS * STAR_INNER_RATIO
        };
        let angle = -PI / 2.0 + PI * k as f64 / 5.0;
        *vertex = (CENTER_X + radius * angle.cos(), CENTER_Y + radius * angle.sin());
    }
    vertices
}

// Pods walk the star outline at equal steps.
fn star_point(vertices: &[(f64, f64); 10], index: usize, count: usize) -> (f64, f64) {
    let position = vertices.len() as f64 * index as f64 / count.max(1) as f64;
    let edge = position.floor() as usize % vertices.len();
    let frac = position - position.floor();
    let (ax, ay) = vertices[edge];
    let (bx, by) = vertices[(edge + 1) % vertices.len()];
    (ax + (bx - ax) * frac, ay + (by - ay) * frac)
}

fn x_point(index: usize, count: usize) -> (f64, f64) {
    let first_arm = count.div_ceil(2);
    let (slot, arm_len, direction) = if index < first_arm {
        (index, first_arm, 1.0)
    } else {
        (index - first_arm, count - first_arm, -1.0)
    };
    let t = spread(slot, arm_len);
    let dx = -RADIUS + 2.0 * RADIUS * t;
    (CENTER_X + dx, CENTER_Y + direction * dx)
}

fn parabola_point(index: usize, count: usize) -> (f64, f64) {
    let dx = -PARABOLA_HALF_WIDTH + 2.0 * PARABOLA_HALF_WIDTH * spread(index, count);
    let a = PARABOLA_DEPTH / (PARABOLA_HALF_WIDTH * PARABOLA_HALF_WIDTH);
    (CENTER_X + dx, CENTER_Y - PARABOLA_DEPTH / 2.0 + a * dx * dx)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::SmallRng, SeedableRng};

    use super::*;

    fn in_field((x, y): (f64, f64)) -> bool {
        (FIELD_MIN_X..=FIELD_MAX_X).contains(&x) && (FIELD_MIN_Y..=FIELD_MAX_Y).contains(&y)
    }

    #[test]
    fn every_catalog_formation_yields_one_target_per_pod_inside_the_field() {
        let mut rng = SmallRng::seed_from_u64(3);
        for formation in Formation::CATALOG {
            let points = layout(&formation, 15, &mut rng).expect("catalog layout");
            assert_eq!(points.len(), 15, "{formation}");
            assert!(points.iter().copied().all(in_field), "{formation}");
        }
    }

    #[test]
    fn custom_formation_has_no_layout() {
        let mut rng = SmallRng::seed_from_u64(3);
        assert!(layout(&Formation::from("DELTA"), 15, &mut rng).is_none());
    }

    #[test]
    fn circle_keeps_pods_at_constant_radius() {
        let mut rng = SmallRng::seed_from_u64(3);
        let points = layout(&Formation::Circle, 8, &mut rng).expect("layout");
        for (x, y) in points {
            let r = (x - CENTER_X).hypot(y - CENTER_Y);
            assert!((r - RADIUS).abs() < 1e-9);
        }
    }

    #[test]
    fn line_is_a_single_horizontal_row() {
        let mut rng = SmallRng::seed_from_u64(3);
        let points = layout(&Formation::Line, 5, &mut rng).expect("layout");
        assert!(points.iter().all(|(_, y)| *y == CENTER_Y));
        assert_eq!(points[0].0, CENTER_X - LINE_HALF_WIDTH);
        assert_eq!(points[4].0, CENTER_X + LINE_HALF_WIDTH);
    }

    #[test]
    fn single_pod_layouts_do_not_divide_by_zero() {
        let mut rng = SmallRng::seed_from_u64(3);
        for formation in Formation::CATALOG {
            let points = layout(&formation, 1, &mut rng).expect("layout");
            assert!(points[0].0.is_finite() && points[0].1.is_finite());
        }
    }
}
