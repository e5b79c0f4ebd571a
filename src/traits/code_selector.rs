use rand::seq::index::sample;

/// Strategy for choosing which unsold code units fulfil an order.
///
/// `select` returns exactly `quantity` distinct indices into a candidate pool of `pool_size` unsold units. Callers
/// guarantee `quantity <= pool_size` (the authoritative stock check happens first, inside the same unit of work),
/// and implementations guarantee the returned indices are distinct and in-range. Beyond that, selection order is
/// deliberately unspecified.
pub trait CodeSelector: Send + Sync {
    fn select(&self, pool_size: usize, quantity: usize) -> Vec<usize>;
}

/// The production strategy: a uniform-random sample without replacement, so no buyer can predict which codes an
/// order will receive.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformRandomSelector;

impl CodeSelector for UniformRandomSelector {
    fn select(&self, pool_size: usize, quantity: usize) -> Vec<usize> {
        let mut rng = rand::thread_rng();
        sample(&mut rng, pool_size, quantity.min(pool_size)).into_vec()
    }
}

/// Deterministic strategy that picks the oldest unsold units first. Used by tests that need to know in advance
/// which codes an order will be given.
#[derive(Debug, Clone, Copy, Default)]
pub struct OldestFirstSelector;

impl CodeSelector for OldestFirstSelector {
    fn select(&self, pool_size: usize, quantity: usize) -> Vec<usize> {
        (0..quantity.min(pool_size)).collect()
    }
}
