use std::{collections::TryReserveError, fmt::Debug};

use bytes::{BufMut, Bytes};
use rand::RngExt as _;
use thiserror::Error;
use zerocopy::{FromBytes, IntoBytes};

use crate::{
    PackSetRef,
    codec::{self, DecodeErr, Encodable, HEADER_SIZE, Header},
    encoding::Encoding,
};

/// A sorted set of unique `i64` values stored at the smallest fixed width
/// that fits every member.
///
/// The set starts out storing 16-bit values and upgrades itself to 32 or 64
/// bits the moment a value outside the current range is inserted. Upgrades
/// are one-way: removing the value that forced the upgrade does not narrow
/// the encoding again.
///
/// The in-memory representation is exactly the wire blob (header followed by
/// packed little-endian elements), so [`PackSet::as_bytes`] is free and
/// serialization is a copy.
///
/// # Examples
///
/// ```
/// use packset::{Encoding, PackSet};
///
/// let mut set = PackSet::new();
/// assert!(set.insert(100));
/// assert!(set.insert(40000)); // forces an upgrade to 32-bit storage
/// assert!(!set.insert(100)); // duplicate
///
/// assert_eq!(set.encoding(), Encoding::Int32);
/// assert!(set.contains(40000));
/// assert_eq!(set.iter().collect::<Vec<_>>(), vec![100, 40000]);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct PackSet {
    buf: Vec<u8>,
}

/// The buffer could not grow to hold another element.
///
/// Surfaced by [`PackSet::try_insert`] so the host decides whether to abort,
/// retry, or propagate; [`PackSet::insert`] is the abort-style shorthand.
#[derive(Debug, Error)]
#[error("failed to grow set buffer")]
pub struct AllocError(#[from] TryReserveError);

/// Binary search over a packed element buffer.
///
/// Returns `Ok(position)` when `value` is present, otherwise
/// `Err(insertion point)`. Values beyond either end are resolved without
/// touching the interior: appends and prepends dominate sorted workloads.
pub(crate) fn locate(
    encoding: Encoding,
    elems: &[u8],
    len: usize,
    value: i64,
) -> Result<usize, usize> {
    if len == 0 {
        return Err(0);
    }
    if value > encoding.get(elems, len - 1) {
        return Err(len);
    }
    if value < encoding.get(elems, 0) {
        return Err(0);
    }

    let mut min = 0usize;
    let mut max = len - 1;
    while min <= max {
        let mid = (min + max) >> 1;
        let cur = encoding.get(elems, mid);
        if value > cur {
            min = mid + 1;
        } else if value < cur {
            // mid > 0 here: value >= the first element was checked above
            max = mid - 1;
        } else {
            return Ok(mid);
        }
    }
    Err(min)
}

impl PackSet {
    /// Creates an empty set at the narrowest (16-bit) encoding.
    pub fn new() -> Self {
        Self {
            buf: Header::new(Encoding::Int16, 0).as_bytes().to_vec(),
        }
    }

    /// Deep-validates `data` and copies it into an owned set.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeErr> {
        codec::validate(data, true)?;
        Ok(Self { buf: data.to_vec() })
    }

    /// Number of elements in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.header().length()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current element width. Never decreases over the set's lifetime.
    #[inline]
    pub fn encoding(&self) -> Encoding {
        // the tag is only ever written from an Encoding, so it decodes
        self.header().encoding().unwrap()
    }

    /// The exact byte length of the wire blob: header + `len * width`.
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.buf.len()
    }

    /// The wire blob itself. Valid input for [`codec::validate`] whenever
    /// the set is non-empty.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the element at `position` in ascending order.
    ///
    /// # Panics
    ///
    /// Panics if `position >= self.len()`; guard with [`PackSet::len`].
    pub fn get(&self, position: usize) -> i64 {
        assert!(
            position < self.len(),
            "position {position} out of range for set of length {}",
            self.len()
        );
        self.encoding().get(self.elems(), position)
    }

    pub fn first(&self) -> Option<i64> {
        (!self.is_empty()).then(|| self.get(0))
    }

    pub fn last(&self) -> Option<i64> {
        (!self.is_empty()).then(|| self.get(self.len() - 1))
    }

    /// Returns true if `value` is a member of the set.
    ///
    /// Values wider than the current encoding cannot be present, so they are
    /// rejected without searching.
    pub fn contains(&self, value: i64) -> bool {
        Encoding::for_value(value) <= self.encoding()
            && locate(self.encoding(), self.elems(), self.len(), value).is_ok()
    }

    /// Returns a uniformly random member drawn with `rng`.
    ///
    /// # Panics
    ///
    /// Panics if the set is empty.
    pub fn random<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        assert!(!self.is_empty(), "random member of an empty set");
        self.get(rng.random_range(0..self.len()))
    }

    /// Iterates the members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        let encoding = self.encoding();
        let elems = self.elems();
        (0..self.len()).map(move |pos| encoding.get(elems, pos))
    }

    /// Inserts `value`, upgrading the encoding if it does not fit.
    ///
    /// Returns `Ok(true)` if the value was inserted and `Ok(false)` if it
    /// was already present, in which case the set is untouched byte for
    /// byte. Fails only when the buffer cannot grow.
    pub fn try_insert(&mut self, value: i64) -> Result<bool, AllocError> {
        let required = Encoding::for_value(value);
        if required > self.encoding() {
            // out of the current range, so it cannot already be present
            self.upgrade_insert(value, required)?;
            return Ok(true);
        }
        match locate(self.encoding(), self.elems(), self.len(), value) {
            Ok(_) => Ok(false),
            Err(position) => {
                self.splice_in(position, value)?;
                Ok(true)
            }
        }
    }

    /// Like [`PackSet::try_insert`], but treats allocation failure as fatal.
    ///
    /// # Panics
    ///
    /// Panics if the buffer cannot grow.
    pub fn insert(&mut self, value: i64) -> bool {
        match self.try_insert(value) {
            Ok(inserted) => inserted,
            Err(err) => panic!("{err}"),
        }
    }

    /// Removes `value` if present. Returns true if the set changed.
    ///
    /// The encoding is deliberately left alone even when the removed value
    /// was the only one requiring the current width; widths are sticky.
    pub fn remove(&mut self, value: i64) -> bool {
        if Encoding::for_value(value) > self.encoding() {
            return false;
        }
        let encoding = self.encoding();
        let len = self.len();
        let Ok(position) = locate(encoding, self.elems(), len, value) else {
            return false;
        };

        let width = encoding.width();
        self.elems_mut()
            .copy_within((position + 1) * width..len * width, position * width);
        self.buf.truncate(HEADER_SIZE + (len - 1) * width);
        self.set_len(len - 1);
        true
    }

    /// Encodes this set into a [`PackSetRef`] for zero-copy reads.
    ///
    /// Fails with [`DecodeErr::Empty`] for an empty set: an empty set has a
    /// live in-memory form but no valid wire form.
    pub fn encode_to_ref(&self) -> Result<PackSetRef<Bytes>, DecodeErr> {
        PackSetRef::from_bytes(self.encode_to_bytes())
    }

    #[inline]
    fn header(&self) -> &Header {
        // buf always starts with a full header
        Header::ref_from_bytes(&self.buf[..HEADER_SIZE]).unwrap()
    }

    #[inline]
    fn header_mut(&mut self) -> &mut Header {
        Header::mut_from_bytes(&mut self.buf[..HEADER_SIZE]).unwrap()
    }

    #[inline]
    fn elems(&self) -> &[u8] {
        &self.buf[HEADER_SIZE..]
    }

    #[inline]
    fn elems_mut(&mut self) -> &mut [u8] {
        &mut self.buf[HEADER_SIZE..]
    }

    fn set_len(&mut self, len: usize) {
        self.header_mut().set_length(len as u32);
    }

    fn grow(&mut self, additional: usize) -> Result<(), AllocError> {
        self.buf.try_reserve_exact(additional)?;
        self.buf.resize(self.buf.len() + additional, 0);
        Ok(())
    }

    /// Opens a slot at `position` and writes `value` at the current width.
    fn splice_in(&mut self, position: usize, value: i64) -> Result<(), AllocError> {
        let encoding = self.encoding();
        let width = encoding.width();
        let len = self.len();

        self.grow(width)?;
        let elems = self.elems_mut();
        // overlapping tail move; copy_within is memmove, so the shifted
        // range is read before it is overwritten
        elems.copy_within(position * width..len * width, (position + 1) * width);
        encoding.put(elems, position, value);
        self.set_len(len + 1);
        Ok(())
    }

    /// Widens the set to `new_encoding` and inserts `value` at one end.
    ///
    /// An upgrade-triggering value lies outside the old representable range,
    /// so it sorts below every current member when negative and above every
    /// current member otherwise.
    fn upgrade_insert(&mut self, value: i64, new_encoding: Encoding) -> Result<(), AllocError> {
        let old_encoding = self.encoding();
        let len = self.len();
        let prepend = usize::from(value < 0);

        let new_size = HEADER_SIZE + (len + 1) * new_encoding.width();
        self.grow(new_size - self.buf.len())?;
        self.header_mut().set_encoding(new_encoding);

        let elems = self.elems_mut();
        // re-encode back to front: the new width is strictly wider, so a
        // front-to-back pass would overwrite narrow slots not yet read
        for pos in (0..len).rev() {
            let v = old_encoding.get(elems, pos);
            new_encoding.put(elems, pos + prepend, v);
        }
        let slot = if prepend == 1 { 0 } else { len };
        new_encoding.put(elems, slot, value);

        self.set_len(len + 1);
        Ok(())
    }
}

impl Default for PackSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for PackSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: Vec<_> = self.iter().take(10).collect();
        f.debug_struct("PackSet")
            .field("encoding", &self.encoding())
            .field("len", &self.len())
            .field("prefix", &prefix)
            .finish()
    }
}

impl FromIterator<i64> for PackSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let mut set = PackSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<i64> for PackSet {
    fn extend<I: IntoIterator<Item = i64>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl PartialEq<&[i64]> for PackSet {
    fn eq(&self, other: &&[i64]) -> bool {
        itertools::equal(self.iter(), other.iter().copied())
    }
}

impl Encodable for PackSet {
    #[inline]
    fn encoded_size(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.buf);
    }
}
