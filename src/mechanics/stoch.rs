/// Stochastic mechanics: sampling helpers over `bevy_prng::WyRand`.
/// Each environment owns its stream, so helpers take `&mut WyRand`
/// directly; nothing here keeps state of its own.
use bevy_prng::WyRand;
use rand_core::RngCore;

/// Uniform in [0, 1) from the top 53 bits.
#[inline]
pub fn unit(rng: &mut WyRand) -> f64 {
    ((rng.next_u64() >> 11) as f64) / ((1u64 << 53) as f64)
}

/// Uniform in [lo, hi). Returns `lo` when the range is empty.
#[inline]
pub fn uniform(rng: &mut WyRand, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return lo;
    }
    lo + unit(rng) * (hi - lo)
}

/// Uniform index in [0, n). `n` must be non-zero.
#[inline]
pub fn index(rng: &mut WyRand, n: usize) -> usize {
    debug_assert!(n > 0);
    ((unit(rng) * n as f64) as usize).min(n - 1)
}

/// Uniform choice over a non-empty slice.
#[inline]
pub fn choice<'a, T>(rng: &mut WyRand, items: &'a [T]) -> &'a T {
    &items[index(rng, items.len())]
}

/// Gaussian(0,1) via Box–Muller.
#[inline]
pub fn gaussian01(rng: &mut WyRand) -> f64 {
    // 1 - u keeps the log argument in (0, 1].
    let u1 = 1.0 - unit(rng);
    let u2 = unit(rng);
    let r = (-2.0 * u1.ln()).sqrt();
    let t = 2.0 * std::f64::consts::PI * u2;
    r * t.cos()
}

/// Adds independent N(0, sigma²) noise to every channel. No-op for sigma = 0.
pub fn add_noise(obs: &mut [f64], sigma: f64, rng: &mut WyRand) {
    if sigma <= 0.0 {
        return;
    }
    for x in obs.iter_mut() {
        *x += sigma * gaussian01(rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::SeedableRng;

    fn rng(seed: u64) -> WyRand {
        WyRand::from_seed(seed.to_le_bytes())
    }

    #[test]
    fn uniform_stays_in_range() {
        let mut r = rng(7);
        for _ in 0..10_000 {
            let x = uniform(&mut r, 13_000.0, 13_001.0);
            assert!((13_000.0..13_001.0).contains(&x));
        }
        assert_eq!(uniform(&mut r, 5.0, 5.0), 5.0);
    }

    #[test]
    fn choice_covers_every_item() {
        let mut r = rng(11);
        let items = [0usize, 1, 2, 3];
        let mut seen = [0usize; 4];
        for _ in 0..4_000 {
            seen[*choice(&mut r, &items)] += 1;
        }
        assert!(seen.iter().all(|&c| c > 800), "skewed choice: {seen:?}");
    }

    #[test]
    fn gaussian_is_roughly_standard() {
        let mut r = rng(3);
        let n = 20_000;
        let xs: Vec<f64> = (0..n).map(|_| gaussian01(&mut r)).collect();
        let mean = xs.iter().sum::<f64>() / n as f64;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.05, "var {var}");
    }

    #[test]
    fn zero_sigma_leaves_observation_alone() {
        let mut r = rng(1);
        let mut obs = [1.0, 0.0, 0.5];
        add_noise(&mut obs, 0.0, &mut r);
        assert_eq!(obs, [1.0, 0.0, 0.5]);
    }
}
