use rand::{RngExt, SeedableRng, rngs::StdRng};

use crate::{PackSet, encoding::Encoding};

/// Builds a set by inserting every value in order.
pub fn mkset(values: impl IntoIterator<Item = i64>) -> PackSet {
    let mut set = PackSet::new();
    for value in values {
        set.insert(value);
    }
    set
}

/// Assembles a raw blob by hand, bypassing `PackSet`, so validator tests do
/// not depend on the code they are checking. `width` must be 2, 4, or 8;
/// elements are written as-is, in the given order.
pub fn mkblob(width: u32, elems: &[i64]) -> Vec<u8> {
    let encoding = Encoding::from_wire(width).unwrap();
    let mut blob = Vec::with_capacity(8 + elems.len() * encoding.width());
    blob.extend_from_slice(&width.to_le_bytes());
    blob.extend_from_slice(&(elems.len() as u32).to_le_bytes());
    blob.resize(8 + elems.len() * encoding.width(), 0);
    for (pos, &value) in elems.iter().enumerate() {
        encoding.put(&mut blob[8..], pos, value);
    }
    blob
}

/// Deterministic value generator spanning all three width bands.
pub struct SetGen {
    rng: StdRng,
}

impl SetGen {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// Values drawn evenly from the 16, 32, and 64-bit bands; duplicates
    /// possible.
    pub fn mixed(&mut self, len: usize) -> Vec<i64> {
        (0..len)
            .map(|_| match self.rng.random_range(0..3u8) {
                0 => self.rng.random_range(i16::MIN as i64..=i16::MAX as i64),
                1 => self.rng.random_range(i32::MIN as i64..=i32::MAX as i64),
                _ => self.rng.random(),
            })
            .collect()
    }
}
