//! Proposes a coarse `(period, offset)` candidate from an observation by way
//! of the [`correlator::CorrelatorEngine`].

use correlator::CorrelatorEngine;
use slot_model::DataRate;

/// Find a candidate `(p, o)` periodicity in `observation` for the given data
/// rate.
///
/// Autocorrelates `observation` with itself and tracks the maximum two-lag
/// sum `A[i] + A[i-1]` over positive lags; this stabilises the peak pick
/// against off-by-one integerisation of a non-integer true period. If no lag
/// beats the zero floor, returns the degenerate `(1, 0)` ("every slot")
/// candidate. Otherwise builds a synthetic impulse train of the found period
/// and correlates it against `observation` to recover the offset.
pub fn find_candidate(engine: &CorrelatorEngine, observation: &[bool], dr: DataRate) -> (usize, usize) {
    let n = dr.slots_per_day();
    let autocorr = engine.autocorrelate(dr, observation);
    let mid = n - 1;

    let mut max_two_lag_sum = 0.0f32;
    let mut period: Option<usize> = None;
    for i in (mid + 2)..=(2 * n - 2) {
        let two_lag_sum = autocorr[i] + autocorr[i - 1];
        if two_lag_sum > max_two_lag_sum {
            max_two_lag_sum = two_lag_sum;
            period = Some(if autocorr[i] >= autocorr[i - 1] {
                i - mid
            } else {
                i - 1 - mid
            });
        }
    }
    let p = match period {
        Some(p) => p,
        None => return (1, 0),
    };

    let mut impulse_train = vec![false; n];
    let mut slot = 0;
    while slot < n {
        impulse_train[slot] = true;
        slot += p;
    }

    let impulse_corr = engine.correlate(dr, observation, &impulse_train);
    let mut max_val = 0.0f32;
    let mut offset = 0usize;
    for i in mid..=(2 * n - 2) {
        if impulse_corr[i] > max_val {
            max_val = impulse_corr[i];
            offset = i - mid;
        }
    }

    (p, offset)
}
