//! Multi-pass offset repair over a collection of device periodicities:
//! occupancy table, four-pass acceptance ladder, and the minimisation
//! re-pass that collapses redundant moves.

pub mod avoider;
pub mod periodicity;

pub use avoider::CollisionAvoider;
pub use periodicity::{DeviceId, DevicePeriodicity};

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: usize, b: usize) -> usize {
    a / gcd(a, b) * b
}

/// Fraction of `p1`'s schedule that would coincide with `p2`'s schedule, for
/// diagnostic/test harness use; not on the Collision Avoider's main path.
pub fn overlap_fraction(p1: usize, p2: usize, o1: usize, o2: usize) -> f64 {
    let offset_gap = o1.abs_diff(o2);
    let divisor = gcd(p1, p2);
    if offset_gap % divisor == 0 {
        p2 as f64 / lcm(p1, p2) as f64
    } else {
        0.0
    }
}
