//! Multi-pass offset repair over a collection of device periodicities.

use crate::periodicity::DevicePeriodicity;
use slot_model::{DataRate, SlotModelError};

/// Acceptance thresholds for the four collision-avoidance passes, strictly
/// non-decreasing.
const ACCEPTANCE_LADDER: [f64; 4] = [0.0, 0.25, 0.75, f64::INFINITY];

/// Multi-pass offset repair over a collection of device periodicities.
///
/// `sync_other_periodicities` controls the optional, off-by-default
/// extension where moving one `(p, o)` of a device also shifts that
/// device's other periodicities by the same absolute amount. The source
/// engine carried this logic commented out with a TODO; the rewrite leaves
/// it as a specified extension rather than silently enabling it.
#[derive(Debug, Clone, Copy)]
pub struct CollisionAvoider {
    pub sync_other_periodicities: bool,
}

impl Default for CollisionAvoider {
    fn default() -> Self {
        Self { sync_other_periodicities: false }
    }
}

impl CollisionAvoider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite each record's `o`, `change`, and `change_this_round` in place
    /// to reduce average per-slot occupancy, subject to the per-device
    /// bounded-push constraint `K(DR)`.
    ///
    /// An empty `periodicities` is a no-op. Rejects an out-of-range
    /// `data_rate` at the boundary.
    pub fn avoid(
        &self,
        periodicities: &mut Vec<DevicePeriodicity>,
        data_rate: u8,
    ) -> Result<(), SlotModelError> {
        let dr = DataRate::from_index(data_rate).ok_or(SlotModelError::InvalidDataRate(data_rate))?;
        if periodicities.is_empty() {
            return Ok(());
        }

        let n = dr.slots_per_day();
        let k = dr.max_push() as i64;

        periodicities.sort_by(|a, b| a.p.cmp(&b.p).then(a.o.cmp(&b.o)));
        for record in periodicities.iter_mut() {
            record.change_this_round = 0;
        }

        let mut occupancy = vec![0u32; n];
        for record in periodicities.iter() {
            for slot in schedule_slots(record.p, record.o, n) {
                occupancy[slot] += 1;
            }
        }

        for (pass_index, &accept) in ACCEPTANCE_LADDER.iter().enumerate() {
            let mut moved_this_pass = 0usize;
            for idx in 0..periodicities.len() {
                let (p, o, change) = {
                    let record = &periodicities[idx];
                    (record.p, record.o, record.change)
                };

                let own_overlap = measure_overlap(&occupancy, p, o, n, true);
                if own_overlap < 1.0 {
                    continue;
                }

                // The window is anchored at the device's original offset
                // (o - change), so any accepted raw_m stays within K(DR) of
                // it. raw_m itself is never wrapped; only the candidate slot
                // used to probe occupancy is reduced onto the ring [0, p).
                let origin = o as i64 - change as i64;
                let mut best_raw: Option<i64> = None;
                let mut best_candidate: Option<usize> = None;
                let mut best_overlap = own_overlap;
                for raw_m in origin..=(origin + k) {
                    if raw_m == o as i64 {
                        continue;
                    }
                    let candidate = raw_m.rem_euclid(p as i64) as usize;
                    let candidate_overlap = measure_overlap(&occupancy, p, candidate, n, false);
                    if candidate_overlap < best_overlap {
                        best_overlap = candidate_overlap;
                        best_raw = Some(raw_m);
                        best_candidate = Some(candidate);
                    }
                    if best_overlap == 0.0 {
                        break;
                    }
                }

                if let (Some(raw_m_star), Some(m_star)) = (best_raw, best_candidate) {
                    if m_star != o && best_overlap <= accept {
                        for slot in schedule_slots(p, o, n) {
                            occupancy[slot] -= 1;
                        }
                        for slot in schedule_slots(p, m_star, n) {
                            occupancy[slot] += 1;
                        }

                        // raw_m_star ranges over origin..=origin+k, so this
                        // is always in [0, k]; never derive change from the
                        // ring-reduced m_star, which can make the delta
                        // swing far outside that range and underflow the u16.
                        let change_new = (raw_m_star - origin) as u16;
                        let round_delta = change_new as i64 - change as i64;
                        {
                            let record = &mut periodicities[idx];
                            record.o = m_star;
                            record.change = change_new;
                            record.change_this_round += round_delta as i32;
                        }
                        moved_this_pass += 1;

                        if self.sync_other_periodicities {
                            sync_sibling_periodicities(periodicities, idx, round_delta, &mut occupancy, n);
                        }
                    }
                }
            }
            tracing::debug!(pass = pass_index, accept, moved = moved_this_pass, "collision-avoidance pass complete");
        }

        minimise_moved_device_count(periodicities, k);

        let moved = periodicities.iter().filter(|r| r.change_this_round != 0).count();
        let max_occupancy = occupancy.iter().copied().max().unwrap_or(0);
        tracing::info!(moved, max_occupancy, "collision avoidance complete");

        Ok(())
    }
}

/// Every in-range slot `l*p + o` for `l = 0 ..= N/p`.
fn schedule_slots(p: usize, o: usize, n: usize) -> impl Iterator<Item = usize> {
    (0..=(n / p)).filter_map(move |l| {
        let slot = l * p + o;
        (slot < n).then_some(slot)
    })
}

/// Average per-slot occupancy of the schedule `(p, o)`. When
/// `subtract_self` is set, each slot's own contribution is discounted
/// (used for a record measuring overlap against its own current offset);
/// unset when probing an offset the device doesn't hold yet.
fn measure_overlap(occupancy: &[u32], p: usize, o: usize, n: usize, subtract_self: bool) -> f64 {
    let mut sum = 0i64;
    let mut count = 0usize;
    for slot in schedule_slots(p, o, n) {
        sum += occupancy[slot] as i64 - if subtract_self { 1 } else { 0 };
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// When a device's `(p, o)` moves by `delta`, shift the device's other
/// periodicities by the same absolute amount. Disabled by default; see
/// [`CollisionAvoider::sync_other_periodicities`].
fn sync_sibling_periodicities(
    periodicities: &mut [DevicePeriodicity],
    moved_idx: usize,
    delta: i64,
    occupancy: &mut [u32],
    n: usize,
) {
    let uid = periodicities[moved_idx].uid;
    for k in 0..periodicities.len() {
        if k == moved_idx || periodicities[k].uid != uid {
            continue;
        }
        let (p, o) = (periodicities[k].p, periodicities[k].o);
        for slot in schedule_slots(p, o, n) {
            occupancy[slot] -= 1;
        }
        let new_o = (o as i64 + delta).rem_euclid(p as i64) as usize;
        for slot in schedule_slots(p, new_o, n) {
            occupancy[slot] += 1;
        }
        let record = &mut periodicities[k];
        record.o = new_o;
        // Clamp rather than cast raw: a sibling's own change has no window
        // of its own to anchor against, so a negative delta must not be
        // allowed to underflow the u16 the way the unclamped cast did.
        record.change = (record.change as i64 + delta).max(0) as u16;
        record.change_this_round += delta as i32;
    }
}

/// Collapse pairs of same-period moves into one whenever legal, reducing
/// the number of devices that actually end up moved.
fn minimise_moved_device_count(periodicities: &mut [DevicePeriodicity], k: i64) {
    let len = periodicities.len();
    for i in 0..len {
        for j in (i + 1)..len {
            let (p_i, o_i, change_i, change_this_round_i) = {
                let record = &periodicities[i];
                (record.p, record.o, record.change, record.change_this_round)
            };
            let (p_j, o_j, change_this_round_j) = {
                let record = &periodicities[j];
                (record.p, record.o, record.change_this_round)
            };

            let transferable = p_i == p_j
                && (o_i as i64 + change_this_round_j as i64) == o_j as i64
                && (change_i as i64 + change_this_round_j as i64) <= k
                && change_this_round_i != 0
                && change_this_round_j != 0;
            if !transferable {
                continue;
            }

            {
                let left = &mut periodicities[i];
                left.o = (left.o as i64 + change_this_round_j as i64) as usize;
                // Bounded by the `transferable` guard above: change_i +
                // change_this_round_j <= k, and both addends are >= 0.
                left.change = (left.change as i64 + change_this_round_j as i64) as u16;
                left.change_this_round += change_this_round_j;
            }
            {
                let right = &mut periodicities[j];
                right.o = (right.o as i64 - change_this_round_j as i64) as usize;
                // change_this_round_j is exactly this round's contribution to
                // right.change (change_this_round always mirrors the sum of
                // per-move increments to change), so this recovers right's
                // change from before this invocation and can never go
                // negative — unlike subtracting a raw, unrelated delta.
                right.change = (right.change as i64 - change_this_round_j as i64) as u16;
                right.change_this_round = 0;
            }
        }
    }
}
