use rand::Rng;

/// Fresh playstyle of length `2k` with components drawn uniformly from `[0, 1)`.
///
/// An all-zero start would give every warrior the same playstyle gradient.
pub fn initialize_playstyle<R: Rng + ?Sized>(rng: &mut R, k: usize) -> Vec<f64> {
    (0..2 * k).map(|_| rng.random::<f64>()).collect()
}

/// Repairs `playstyle` to length `2k` in place: short vectors are padded with uniform
/// `[0, 1)` draws, long ones truncated. Vectors that already have the right length are
/// left untouched, existing components are never re-drawn.
///
/// Returns whether the vector changed.
pub fn normalize_playstyle<R: Rng + ?Sized>(playstyle: &mut Vec<f64>, k: usize, rng: &mut R) -> bool {
    let target = 2 * k;

    if playstyle.len() == target {
        return false;
    }

    if playstyle.len() > target {
        playstyle.truncate(target);
    } else {
        let missing = target - playstyle.len();
        playstyle.extend((0..missing).map(|_| rng.random::<f64>()));
    }

    true
}
