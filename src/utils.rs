use rand::{rngs::StdRng, SeedableRng};

/// Builds the random number generator used by a search.
///
/// # Parameters
/// - `seed`: `Some(seed)` gives a reproducible generator. `None` seeds the
///           generator from the operating system, so runs differ.
///
/// # Returns
/// A new `StdRng` instance.
///
/// # Examples
/// ```rust
/// use rand::Rng;
/// use uct_grid::utils::rng_from_seed;
/// let a: u64 = rng_from_seed(Some(7)).random();
/// let b: u64 = rng_from_seed(Some(7)).random();
/// assert_eq!(a, b);
/// ```
pub fn rng_from_seed(seed: Option<u64>) -> StdRng{
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng()
    }
}
