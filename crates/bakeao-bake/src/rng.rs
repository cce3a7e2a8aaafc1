//! Deterministic per-sample hashing.
//!
//! Pure functions: `texel_hash(x, y, subsample, seed) -> u32`.
//! No state, no atomics, so samples can be integrated in any order on any
//! thread and still produce identical results.

/// Hash a texel coordinate, sub-sample index and seed into a pseudo-random u32.
pub(crate) fn texel_hash(x: u32, y: u32, subsample: u32, seed: u32) -> u32 {
    // Combine inputs into a single state using prime multipliers
    let mut state = x
        .wrapping_mul(0x9E3779B9)
        .wrapping_add(y.wrapping_mul(0x517CC1B7))
        .wrapping_add(subsample.wrapping_mul(0x6C62272E))
        .wrapping_add(seed.wrapping_mul(0x2545F491));
    mix(&mut state);
    state
}

/// Derive an independent stream from an existing hash.
pub(crate) fn rehash(hash: u32, salt: u32) -> u32 {
    let mut state = hash ^ salt.wrapping_mul(0x27D4EB2F);
    mix(&mut state);
    state
}

// PCG-style mixing rounds
fn mix(state: &mut u32) {
    *state ^= *state >> 16;
    *state = state.wrapping_mul(0x45D9F3B);
    *state ^= *state >> 16;
    *state = state.wrapping_mul(0x45D9F3B);
    *state ^= *state >> 16;
}

/// Convert a hash value to a float in [0, 1).
pub(crate) fn hash_to_float(hash: u32) -> f32 {
    (hash >> 8) as f32 / 16_777_216.0 // 2^24
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(texel_hash(5, 10, 3, 42), texel_hash(5, 10, 3, 42));
    }

    #[test]
    fn test_different_inputs_differ() {
        let vals = [
            texel_hash(0, 0, 0, 0),
            texel_hash(1, 0, 0, 0),
            texel_hash(0, 1, 0, 0),
            texel_hash(0, 0, 1, 0),
            texel_hash(0, 0, 0, 1),
        ];
        for i in 0..vals.len() {
            for j in (i + 1)..vals.len() {
                assert_ne!(vals[i], vals[j], "hash collision at indices {i}, {j}");
            }
        }
    }

    #[test]
    fn test_distribution() {
        let mut low_count = 0u32;
        for x in 0..100 {
            for y in 0..100 {
                if texel_hash(x, y, 0, 0) < u32::MAX / 2 {
                    low_count += 1;
                }
            }
        }
        let low_frac = low_count as f32 / 10_000.0;
        assert!(
            low_frac > 0.4 && low_frac < 0.6,
            "poor distribution: {low_frac}"
        );
    }

    #[test]
    fn test_hash_to_float_range() {
        for i in 0..1000 {
            let f = hash_to_float(texel_hash(i, 0, 0, 0));
            assert!((0.0..1.0).contains(&f), "out of range: {f}");
        }
    }

    #[test]
    fn test_rehash_decorrelates() {
        let h = texel_hash(3, 4, 0, 7);
        assert_ne!(rehash(h, 0), rehash(h, 1));
        assert_eq!(rehash(h, 1), rehash(h, 1));
    }
}
