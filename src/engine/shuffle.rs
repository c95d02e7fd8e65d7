// src/engine/shuffle.rs

use rand::Rng;

/// Returns a uniformly-random permutation of `items` without touching the
/// caller's list, so a later re-fetch still sees the stored order.
///
/// Classic Fisher-Yates: walk from the last index down to 1 and swap with a
/// uniformly chosen index in [0, i]. Empty and single-element inputs come
/// back unchanged.
pub fn shuffle<T: Clone, R: Rng>(rng: &mut R, items: &[T]) -> Vec<T> {
    let mut shuffled = items.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = rng.gen_range(0..=i);
        shuffled.swap(i, j);
    }
    shuffled
}
