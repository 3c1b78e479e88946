use crate::core::base::*;
use crate::core::misc::*;
use crate::core::rng::RNG;

use std::sync::LazyLock;

/// Period of the shared quasi-random table; prime so the stride walk
/// below visits every slot.
pub const ROTATION_PERIOD: u32 = 8191;
// Primitive root mod 8191; the multiplicative walk covers 1..8190.
const ROTATION_MULT: u64 = 884;

// Built at most once per process; concurrent first users block until
// the build is done.
static ROTATION_TABLE: LazyLock<Vec<Float>> = LazyLock::new(|| {
    let mut table = vec![0.0 as Float; ROTATION_PERIOD as usize];
    let mut state: u64 = 1;
    for v in table.iter_mut() {
        *v = (state as Float) / (ROTATION_PERIOD as Float);
        state = (state * ROTATION_MULT) % (ROTATION_PERIOD as u64);
    }
    table
});

/// A view of the shared quasi-random table with a per-instance random
/// rotation added modulo 1, so independent instances are decorrelated
/// while each instance's own stream stays low-discrepancy.
///
/// The cursor advances by one stride (the instance's dimension count)
/// per step; once a full period has been consumed, the rotation vector
/// is redrawn from the caller's entropy source.
#[derive(Debug, Clone)]
pub struct RotatedSequence {
    dims: u32,
    base: u32,
    rotation: Vec<Float>,
}

impl RotatedSequence {
    pub fn new(dims: u32, rng: &mut RNG) -> Self {
        let dims = u32::max(dims, 1);
        let rotation = (0..dims).map(|_| rng.uniform_float()).collect();
        RotatedSequence {
            dims,
            base: 0,
            rotation,
        }
    }

    pub fn base(&self) -> u32 {
        return self.base;
    }

    pub fn advance(&mut self, rng: &mut RNG) {
        let next = self.base + self.dims;
        if next >= ROTATION_PERIOD || ROTATION_PERIOD - next < self.dims {
            for r in self.rotation.iter_mut() {
                *r = rng.uniform_float();
            }
            self.base = 0;
        } else {
            self.base = next;
        }
    }

    /// Value at `offset` relative to the current cursor.
    pub fn get(&self, offset: u32) -> Float {
        let table = &*ROTATION_TABLE;
        let pos = ((self.base + offset) % ROTATION_PERIOD) as usize;
        return modulo_1(table[pos] + self.rotation[(offset % self.dims) as usize]);
    }

    /// Value at `offset`, addressed by an epoch `origin` and a step
    /// `key` instead of the moving cursor. Reads with equal arguments
    /// return equal values for the lifetime of the rotation vector,
    /// which is what makes deferred mutation replay exact.
    pub fn get_keyed(&self, origin: u32, key: u32, offset: u32) -> Float {
        let table = &*ROTATION_TABLE;
        let pos = ((origin as u64 + (key as u64) * (self.dims as u64) + offset as u64)
            % (ROTATION_PERIOD as u64)) as usize;
        return modulo_1(table[pos] + self.rotation[(offset % self.dims) as usize]);
    }
}
