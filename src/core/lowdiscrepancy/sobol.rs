use crate::core::base::*;
use crate::core::misc::*;

/// The Owen-scrambled Sobol backend works in blocks of four
/// dimensions; each block past the first is padded in with its own
/// scramble seed.
pub const SOBOL_BLOCK_DIMENSIONS: u32 = 4;

/// Random-access evaluation of the shared Sobol sequence at
/// (index, dimension).
#[inline]
pub fn sobol_sample(index: u64, dim: u32) -> Float {
    let block = dim / SOBOL_BLOCK_DIMENSIONS;
    let v = sobol_burley::sample((index & 0xffff_ffff) as u32, dim % SOBOL_BLOCK_DIMENSIONS, block);
    return Float::min(v as Float, ONE_MINUS_EPSILON);
}

/// Cranley-Patterson rotation: add a fixed offset modulo 1.
#[inline]
pub fn cranley_patterson(v: Float, r: Float) -> Float {
    return modulo_1(v + r);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range() {
        for index in 0..512 {
            for dim in 0..16 {
                let v = sobol_sample(index, dim);
                assert!((0.0..1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_first_dimension_stratified() {
        // The first 8 points of any Sobol dimension cover all 1/8
        // strata exactly once.
        for dim in 0..4 {
            let mut v: Vec<Float> = (0..8).map(|i| sobol_sample(i, dim)).collect();
            v.sort_by(|a, b| a.partial_cmp(b).unwrap());
            for (i, x) in v.iter().enumerate() {
                assert!(
                    *x >= (i as Float) / 8.0 && *x < ((i + 1) as Float) / 8.0,
                    "dim {} value {} outside stratum {}",
                    dim,
                    x,
                    i
                );
            }
        }
    }

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(cranley_patterson(0.75, 0.5), 0.25);
        assert_eq!(cranley_patterson(0.25, 0.5), 0.75);
    }
}
