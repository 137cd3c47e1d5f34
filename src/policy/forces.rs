//! Pairwise force kernels used by the relaxation engine.
//!
//! Every kernel returns the force acting on the node at `from`. Distances
//! below `min_distance` yield a zero force rather than a division by zero.

use crate::types::Vec2;

/// Spring along the pair with rest length `rest`.
///
/// ```text
/// F = stiffness * weight * (|to - from| - rest) * unit(to - from)
/// ```
///
/// Positive when stretched (pulls together), negative when compressed.
pub fn spring(from: Vec2, to: Vec2, rest: f64, stiffness: f64, weight: f64, min_distance: f64) -> Vec2 {
    let delta = to - from;
    let dist = delta.length();
    if dist < min_distance {
        return Vec2::ZERO;
    }
    delta * (stiffness * weight * (dist - rest) / dist)
}

/// Proximity attraction with a repulsive floor.
///
/// Same form as [`spring`] with the floor as rest length: beyond the floor
/// it only attracts, inside it pushes apart so neighbors never collapse.
pub fn surface_pull(from: Vec2, to: Vec2, floor: f64, attraction: f64, weight: f64, min_distance: f64) -> Vec2 {
    spring(from, to, floor, attraction, weight, min_distance)
}

/// Inverse-square repulsion away from `other`, capped at `cap`.
pub fn repulsion(from: Vec2, other: Vec2, strength: f64, cap: f64, min_distance: f64) -> Vec2 {
    let delta = from - other;
    let dist = delta.length();
    if dist < min_distance {
        return Vec2::ZERO;
    }
    let magnitude = (strength / (dist * dist)).min(cap);
    delta * (magnitude / dist)
}

/// Linear pull toward a target point (seed or centroid).
pub fn linear_pull(from: Vec2, target: Vec2, strength: f64) -> Vec2 {
    (target - from) * strength
}
