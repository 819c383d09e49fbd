//! Conditional p-values and their distance to uniformity
//!
//! Under the true effect `θ`, the probability of seeing an effect at least as
//! large as `d` given that it was significant is uniformly distributed across
//! the significant findings. The p-curve estimate is the `θ` that makes these
//! pp-values look most uniform.

use metabias_core::normal;

/// Conditional p-value of a significant effect `d` under true effect `theta`
///
/// `pp(θ; d, se) = Φ((θ − d)/se) / Φ(θ/se − z)`, with `z` the significance
/// threshold used to select the effects. A denominator that underflows to 0
/// gives 0; the result is clamped to `[0, 1]`.
pub fn pp_value(theta: f64, effect_size: f64, std_error: f64, z_critical: f64) -> f64 {
    let numerator = normal::cdf((theta - effect_size) / std_error);
    let denominator = normal::cdf(theta / std_error - z_critical);
    if denominator <= 0.0 {
        return 0.0;
    }
    (numerator / denominator).clamp(0.0, 1.0)
}

/// Kolmogorov–Smirnov distance between a sample and U(0, 1)
///
/// `D = max_i max(i/n − u₍ᵢ₎, u₍ᵢ₎ − (i−1)/n)` over the sorted sample.
/// An empty sample has distance 0.
pub fn ks_distance_uniform(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len() as f64;
    sorted
        .iter()
        .enumerate()
        .map(|(i, &u)| {
            let above = (i + 1) as f64 / n - u;
            let below = u - i as f64 / n;
            above.max(below)
        })
        .fold(0.0, f64::max)
}

/// KS distance of the pp-values of `significant` at `theta`
pub(crate) fn pp_ks_distance(theta: f64, significant: &[(f64, f64)], z_critical: f64) -> f64 {
    let pp: Vec<f64> = significant
        .iter()
        .map(|&(d, se)| pp_value(theta, d, se, z_critical))
        .collect();
    ks_distance_uniform(&pp)
}
