//! The TiCom scoring function: a weighted trade-off between newly-covered
//! transmissions and newly-covered idle slots.

/// Score a `(period, offset)` candidate against `observation`, given the
/// slots already claimed by previously-selected candidates (`covered`).
///
/// `alpha` trades off true positives against false positives: `0.0` only
/// rewards coverage, `1.0` only penalises it. `abs_t`/`abs_f` are the total
/// count of 1s/0s in `observation`; a zero denominator contributes `0.0` for
/// that term rather than propagating a NaN (the Miner only reaches this
/// after ruling out a flat-zero observation, and `abs_f == 0` only occurs
/// once `observation` is already fully explained).
pub fn score(
    candidate: (usize, usize),
    covered: &[bool],
    observation: &[bool],
    alpha: f64,
    abs_t: usize,
    abs_f: usize,
) -> f64 {
    let (period, offset) = candidate;
    debug_assert!(offset < period);

    let mut true_positives = 0usize;
    let mut false_positives = 0usize;
    let mut x = offset;
    while x < observation.len() {
        if !covered[x] {
            if observation[x] {
                true_positives += 1;
            } else {
                false_positives += 1;
            }
        }
        x += period;
    }

    let tp_term = if abs_t == 0 {
        0.0
    } else {
        (1.0 - alpha) * (true_positives as f64 / abs_t as f64)
    };
    let fp_term = if abs_f == 0 {
        0.0
    } else {
        alpha * (false_positives as f64 / abs_f as f64)
    };
    tp_term - fp_term
}
