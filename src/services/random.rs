/// Stubbable source of uniform randomness
pub trait Random: Send + Sync {
    /// Uniform draw in `[0, 1)`
    fn pick(&self) -> f64;
}

/// Thread-local PRNG draw
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl Random for ThreadRandom {
    fn pick(&self) -> f64 {
        let num = rand::random::<f64>();
        tracing::debug!(num, "drew a random number");
        num
    }
}
