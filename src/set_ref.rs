use std::{fmt::Debug, ops::Deref};

use bytes::BufMut;
use zerocopy::FromBytes;

use crate::{
    PackSet,
    codec::{self, DecodeErr, Encodable, HEADER_SIZE, Header},
    encoding::Encoding,
    set::locate,
};

/// A read-only set view over an encoded blob, queried without decoding.
///
/// `PackSetRef` wraps any byte container (`Vec<u8>`, [`bytes::Bytes`], a
/// borrowed slice, a memory-mapped region) and answers membership queries
/// directly against the wire form. Construction deep-validates the blob, so
/// every later read can trust the header and the sort order.
#[derive(Clone)]
pub struct PackSetRef<B> {
    data: B,
}

impl<B> PackSetRef<B> {
    #[inline]
    pub fn inner(&self) -> &B {
        &self.data
    }

    #[inline]
    pub fn into_inner(self) -> B {
        self.data
    }
}

impl<B: Deref<Target = [u8]>> PackSetRef<B> {
    /// Deep-validates `data` and wraps it. See [`codec::validate`] for the
    /// rejection taxonomy; untrusted input belongs here, not in
    /// [`PackSet::from_bytes`]-style copies, when reads are all that's
    /// needed.
    pub fn from_bytes(data: B) -> Result<Self, DecodeErr> {
        codec::validate(&data, true)?;
        Ok(Self { data })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.header().length()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        // validation rejects zero-length blobs, but keep the std pairing
        self.len() == 0
    }

    #[inline]
    pub fn encoding(&self) -> Encoding {
        // validated at construction
        self.header().encoding().unwrap()
    }

    pub fn contains(&self, value: i64) -> bool {
        Encoding::for_value(value) <= self.encoding()
            && locate(self.encoding(), self.elems(), self.len(), value).is_ok()
    }

    /// Returns the element at `position` in ascending order.
    ///
    /// # Panics
    ///
    /// Panics if `position >= self.len()`.
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

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        let encoding = self.encoding();
        let elems = self.elems();
        (0..self.len()).map(move |pos| encoding.get(elems, pos))
    }

    /// Copies the blob into an owned, mutable [`PackSet`].
    pub fn to_packset(&self) -> PackSet {
        // already validated, so the copy cannot fail
        PackSet::from_bytes(&self.data).unwrap()
    }

    #[inline]
    fn header(&self) -> &Header {
        Header::ref_from_bytes(&self.data[..HEADER_SIZE]).unwrap()
    }

    #[inline]
    fn elems(&self) -> &[u8] {
        &self.data[HEADER_SIZE..]
    }
}

impl<B: Deref<Target = [u8]>> Debug for PackSetRef<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: Vec<_> = self.iter().take(10).collect();
        f.debug_struct("PackSetRef")
            .field("encoding", &self.encoding())
            .field("len", &self.len())
            .field("prefix", &prefix)
            .finish()
    }
}

impl<B: Deref<Target = [u8]>> Encodable for PackSetRef<B> {
    #[inline]
    fn encoded_size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn encode<T: BufMut>(&self, buf: &mut T) {
        buf.put_slice(&self.data);
    }
}

impl<B: Deref<Target = [u8]>> PartialEq<PackSet> for PackSetRef<B> {
    fn eq(&self, other: &PackSet) -> bool {
        self.data[..] == *other.as_bytes()
    }
}

impl<B: Deref<Target = [u8]>> PartialEq<PackSetRef<B>> for PackSet {
    fn eq(&self, other: &PackSetRef<B>) -> bool {
        other == self
    }
}

impl<B: Deref<Target = [u8]>, B2: Deref<Target = [u8]>> PartialEq<PackSetRef<B2>>
    for PackSetRef<B>
{
    fn eq(&self, other: &PackSetRef<B2>) -> bool {
        self.data[..] == other.data[..]
    }
}
