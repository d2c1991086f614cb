//! The greedy periodicity-mining loop: candidate finder + local scored
//! search + subset pruning, iterated until the observation is explained.

use crate::candidate_finder::find_candidate;
use crate::scorer::score;
use correlator::CorrelatorEngine;
use slot_model::{DataRate, SlotModelError};
use std::collections::HashSet;

/// Width of the local offset search window around a rough candidate: the
/// Miner considers up to `2 * LOCAL_SEARCH_WIDTH` offsets per iteration.
pub const LOCAL_SEARCH_WIDTH: usize = 10;

/// Owns the [`CorrelatorEngine`] the Candidate Finder drives and exposes the
/// boundary-checked `mine` entry point.
pub struct Miner {
    engine: CorrelatorEngine,
}

impl Miner {
    pub fn new() -> Self {
        Self { engine: CorrelatorEngine::new() }
    }

    /// Mine `observation` for a minimal covering set of `(period, offset)`
    /// pairs under the false-positive/true-positive trade-off `alpha`.
    ///
    /// Rejects an out-of-range `data_rate` or a length-mismatched
    /// `observation` at the boundary; every other condition (a flat
    /// observation, a degenerate `(1, 0)` candidate, a numerically unstable
    /// zero-lag pick) is handled internally and never surfaces as an error.
    pub fn mine(
        &self,
        observation: &[bool],
        alpha: f64,
        data_rate: u8,
    ) -> Result<Vec<(usize, usize)>, SlotModelError> {
        let dr = DataRate::from_index(data_rate).ok_or(SlotModelError::InvalidDataRate(data_rate))?;
        let expected = dr.slots_per_day();
        if observation.len() != expected {
            return Err(SlotModelError::LengthMismatch { expected, actual: observation.len() });
        }
        Ok(self.mine_unchecked(observation, alpha, dr))
    }

    /// The algorithm proper, assuming `observation.len() == dr.slots_per_day()`.
    fn mine_unchecked(&self, observation: &[bool], alpha: f64, dr: DataRate) -> Vec<(usize, usize)> {
        let n = dr.slots_per_day();
        if !observation.iter().any(|&bit| bit) {
            return Vec::new();
        }

        let abs_t = observation.iter().filter(|&&bit| bit).count();
        let abs_f = n - abs_t;

        let mut observation_filter = observation.to_vec();
        let mut covered = vec![false; n];
        let mut selected: Vec<(usize, usize)> = Vec::new();

        loop {
            let (period, rough_offset) = find_candidate(&self.engine, &observation_filter, dr);
            let window = local_search_window(rough_offset, period, LOCAL_SEARCH_WIDTH);

            let (best_index, best_score) = window
                .iter()
                .enumerate()
                .map(|(index, &candidate)| (index, score(candidate, &covered, observation, alpha, abs_t, abs_f)))
                .fold((0usize, f64::NEG_INFINITY), |best, current| {
                    if current.1 > best.1 {
                        current
                    } else {
                        best
                    }
                });

            if best_score <= 0.0 {
                break;
            }

            let chosen = window[best_index];
            let (l, i) = chosen;
            tracing::debug!(
                period = l,
                offset = i,
                score = best_score,
                remaining_ones = observation_filter.iter().filter(|&&b| b).count(),
                "mining iteration accepted a candidate"
            );

            selected.push(chosen);

            let mut x = i;
            while x < n {
                if !covered[x] {
                    covered[x] = true;
                    observation_filter[x] = false;
                }
                x += l;
            }

            // Subset pruning: a finer periodicity subsumed by the one just
            // picked is redundant and is dropped from the result.
            selected.retain(|&(other_l, other_i)| {
                (other_l, other_i) == chosen || !(other_l % l == 0 && other_i % l == i)
            });

            if !observation_filter.iter().any(|&bit| bit) {
                break;
            }
        }

        selected
    }
}

impl Default for Miner {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the local candidate window: up to `2 * width` offsets on the ring
/// `[0, period)` centred on `rough_offset`, deduplicated and in the order
/// they'd first appear walking the window left to right (so the "first
/// index wins" tie-break in the caller is deterministic).
fn local_search_window(rough_offset: usize, period: usize, width: usize) -> Vec<(usize, usize)> {
    let mut seen = HashSet::with_capacity(2 * width);
    let mut offsets = Vec::with_capacity(2 * width);
    for delta in -(width as i64)..(width as i64) {
        let raw = rough_offset as i64 + delta;
        let wrapped = raw.rem_euclid(period as i64) as usize;
        if seen.insert(wrapped) {
            offsets.push(wrapped);
        }
    }
    offsets.into_iter().map(|o| (period, o)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn union_of_periodicities(n: usize, periodicities: &[(usize, usize)]) -> Vec<bool> {
        let mut observation = vec![false; n];
        for &(p, o) in periodicities {
            let mut x = o;
            while x < n {
                observation[x] = true;
                x += p;
            }
        }
        observation
    }

    #[test]
    fn local_search_window_covers_the_non_wrapping_case() {
        let window = local_search_window(500, 1000, LOCAL_SEARCH_WIDTH);
        let offsets: Vec<usize> = window.iter().map(|&(_, o)| o).collect();
        assert_eq!(offsets.len(), 20);
        assert_eq!(offsets, (490..510).collect::<Vec<_>>());
    }

    #[test]
    fn local_search_window_wraps_at_the_low_end() {
        // rough_offset close to 0: the deficit wraps to the high end.
        let window = local_search_window(3, 1000, LOCAL_SEARCH_WIDTH);
        let offsets: Vec<usize> = window.iter().map(|&(_, o)| o).collect();
        assert!(offsets.contains(&995));
        assert!(offsets.contains(&999));
        assert!(offsets.contains(&12));
        assert_eq!(offsets.len(), 20);
    }

    #[test]
    fn local_search_window_wraps_at_the_high_end() {
        let window = local_search_window(997, 1000, LOCAL_SEARCH_WIDTH);
        let offsets: Vec<usize> = window.iter().map(|&(_, o)| o).collect();
        assert!(offsets.contains(&0));
        assert!(offsets.contains(&6));
        assert!(offsets.contains(&987));
        assert_eq!(offsets.len(), 20);
    }

    #[test]
    fn flat_zero_observation_mines_nothing() {
        let miner = Miner::new();
        let observation = vec![false; DataRate::Dr0.slots_per_day()];
        let result = miner.mine(&observation, 0.5, 0).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn all_ones_observation_mines_the_degenerate_pair_and_halts() {
        let miner = Miner::new();
        let observation = vec![true; DataRate::Dr0.slots_per_day()];
        let result = miner.mine(&observation, 0.5, 0).unwrap();
        assert_eq!(result, vec![(1, 0)]);
    }

    #[test]
    fn invalid_data_rate_is_rejected_at_the_boundary() {
        let miner = Miner::new();
        let observation = vec![false; 10];
        let err = miner.mine(&observation, 0.5, 6).unwrap_err();
        assert_eq!(err, SlotModelError::InvalidDataRate(6));
    }

    #[test]
    fn length_mismatch_is_rejected_at_the_boundary() {
        let miner = Miner::new();
        let observation = vec![false; 10];
        let err = miner.mine(&observation, 0.5, 0).unwrap_err();
        assert_eq!(
            err,
            SlotModelError::LengthMismatch { expected: DataRate::Dr0.slots_per_day(), actual: 10 }
        );
    }

    #[test]
    fn recovers_two_coprime_periodicities() {
        let miner = Miner::new();
        let dr = DataRate::Dr5;
        let n = dr.slots_per_day();
        let wanted = [(989usize, 564usize), (600usize, 101usize)];
        let observation = union_of_periodicities(n, &wanted);

        let mined = miner.mine(&observation, 0.8, dr.as_index()).unwrap();

        let mut mined_sorted = mined.clone();
        mined_sorted.sort();
        let mut wanted_sorted = wanted.to_vec();
        wanted_sorted.sort();
        assert_eq!(mined_sorted, wanted_sorted);
    }

    #[test]
    fn no_selected_pair_is_subsumed_by_another() {
        let miner = Miner::new();
        let dr = DataRate::Dr5;
        let n = dr.slots_per_day();
        let wanted = [(989usize, 564usize), (600usize, 101usize)];
        let observation = union_of_periodicities(n, &wanted);
        let mined = miner.mine(&observation, 0.8, dr.as_index()).unwrap();

        for &(l, i) in &mined {
            for &(l_prime, i_prime) in &mined {
                if (l, i) == (l_prime, i_prime) {
                    continue;
                }
                let subsumed = l_prime % l == 0 && i_prime % l == i;
                assert!(!subsumed, "({l_prime}, {i_prime}) is subsumed by ({l}, {i})");
            }
        }
    }

    use proptest::prelude::*;

    proptest! {
        // Each case drives a full greedy mining loop (FFT-backed), so keep
        // the sample count and input density both small.
        #![proptest_config(ProptestConfig::with_cases(8))]

        /// Whatever `mine` returns satisfies the data model's offset
        /// invariant and never contains a pair subsumed by another.
        #[test]
        fn mined_pairs_are_in_range_and_subsumption_free(
            observation in prop::collection::vec(prop::bool::weighted(0.05), DataRate::Dr0.slots_per_day()),
            alpha in 0.0f64..1.0,
        ) {
            let miner = Miner::new();
            let mined = miner.mine(&observation, alpha, DataRate::Dr0.as_index()).unwrap();
            let n = DataRate::Dr0.slots_per_day();

            for &(p, o) in &mined {
                prop_assert!(p >= 1 && p < n);
                prop_assert!(o < p);
            }
            for &(l, i) in &mined {
                for &(l_prime, i_prime) in &mined {
                    if (l, i) == (l_prime, i_prime) {
                        continue;
                    }
                    let subsumed = l_prime % l == 0 && i_prime % l == i;
                    prop_assert!(!subsumed, "({l_prime}, {i_prime}) is subsumed by ({l}, {i})");
                }
            }
        }
    }
}
