/// The fixed byte width used to store every element of a set.
///
/// A set starts at [`Encoding::Int16`] and only ever widens: once a value
/// forces an upgrade, the wider encoding is kept for the rest of the set's
/// lifetime, even if later removals would let it fit a narrower one again.
///
/// The discriminant is the wire tag: the element width in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Encoding {
    Int16 = 2,
    Int32 = 4,
    Int64 = 8,
}

impl Encoding {
    /// Element width in bytes.
    #[inline]
    pub const fn width(self) -> usize {
        self as usize
    }

    /// The narrowest encoding whose signed range contains `value`.
    #[inline]
    pub const fn for_value(value: i64) -> Self {
        if value >= i16::MIN as i64 && value <= i16::MAX as i64 {
            Encoding::Int16
        } else if value >= i32::MIN as i64 && value <= i32::MAX as i64 {
            Encoding::Int32
        } else {
            Encoding::Int64
        }
    }

    /// Decodes a wire tag. Returns `None` for anything but 2, 4, or 8;
    /// the tag is attacker-controlled when it comes from a blob.
    #[inline]
    pub const fn from_wire(raw: u32) -> Option<Self> {
        match raw {
            2 => Some(Encoding::Int16),
            4 => Some(Encoding::Int32),
            8 => Some(Encoding::Int64),
            _ => None,
        }
    }

    /// Reads the element at `pos` from an element buffer.
    ///
    /// This and [`Encoding::put`] are the only places that touch wire byte
    /// order; elements are little-endian two's-complement at every width.
    #[inline]
    pub(crate) fn get(self, elems: &[u8], pos: usize) -> i64 {
        let at = pos * self.width();
        match self {
            Encoding::Int16 => {
                let raw: [u8; 2] = elems[at..at + 2].try_into().unwrap();
                i16::from_le_bytes(raw) as i64
            }
            Encoding::Int32 => {
                let raw: [u8; 4] = elems[at..at + 4].try_into().unwrap();
                i32::from_le_bytes(raw) as i64
            }
            Encoding::Int64 => {
                let raw: [u8; 8] = elems[at..at + 8].try_into().unwrap();
                i64::from_le_bytes(raw)
            }
        }
    }

    /// Writes `value` into the slot at `pos`, narrowing to this width.
    ///
    /// The caller guarantees `value` fits this encoding's signed range.
    #[inline]
    pub(crate) fn put(self, elems: &mut [u8], pos: usize, value: i64) {
        let at = pos * self.width();
        match self {
            Encoding::Int16 => elems[at..at + 2].copy_from_slice(&(value as i16).to_le_bytes()),
            Encoding::Int32 => elems[at..at + 4].copy_from_slice(&(value as i32).to_le_bytes()),
            Encoding::Int64 => elems[at..at + 8].copy_from_slice(&value.to_le_bytes()),
        }
    }
}
