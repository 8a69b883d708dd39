// Seeded row sampling for prototype runs on a slice of a large snapshot.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

/// Pick `n` distinct row indices out of `len`, reproducibly for a given seed.
///
/// The indices come back ascending, so a sample keeps the input's relative
/// row order. Asking for at least `len` rows returns every row.
pub fn sample_indices(len: usize, n: usize, seed: u64) -> Vec<usize> {
    if n >= len {
        return (0..len).collect();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, len, n).into_vec();
    picked.sort_unstable();
    picked
}
