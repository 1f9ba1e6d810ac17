use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;
use zerocopy::{
    ConvertError, FromBytes, Immutable, IntoBytes, KnownLayout, LittleEndian, U32, Unaligned,
};

use crate::encoding::Encoding;

/// Byte length of the blob header: 4-byte encoding tag + 4-byte length.
pub const HEADER_SIZE: usize = std::mem::size_of::<Header>();

/// The wire header at the front of every encoded set.
///
/// Both fields are little-endian on the wire regardless of host byte order.
#[derive(FromBytes, IntoBytes, Immutable, Unaligned, KnownLayout)]
#[repr(C)]
pub(crate) struct Header {
    encoding: U32<LittleEndian>,
    length: U32<LittleEndian>,
}

impl Header {
    pub(crate) fn new(encoding: Encoding, length: u32) -> Self {
        Self {
            encoding: (encoding as u32).into(),
            length: length.into(),
        }
    }

    /// Decodes the encoding tag; `None` if it is not one of {2, 4, 8}.
    pub(crate) fn encoding(&self) -> Option<Encoding> {
        Encoding::from_wire(self.encoding.get())
    }

    pub(crate) fn length(&self) -> usize {
        self.length.get() as usize
    }

    pub(crate) fn set_encoding(&mut self, encoding: Encoding) {
        self.encoding.set(encoding as u32);
    }

    pub(crate) fn set_length(&mut self, length: u32) {
        self.length.set(length);
    }
}

/// Why a blob was rejected by [`validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeErr {
    #[error("not enough bytes for a header")]
    Length,

    #[error("encoding tag is not 2, 4, or 8")]
    Encoding,

    #[error("declared length does not match the buffer size")]
    SizeMismatch,

    #[error("zero-length set")]
    Empty,

    #[error("elements are not strictly ascending")]
    Unsorted,
}

impl<A, S, V> From<ConvertError<A, S, V>> for DecodeErr {
    fn from(err: ConvertError<A, S, V>) -> Self {
        match err {
            ConvertError::Alignment(_) => panic!("all zerocopy transmutations must be unaligned"),
            ConvertError::Size(_) => DecodeErr::Length,
            ConvertError::Validity(_) => DecodeErr::Encoding,
        }
    }
}

/// Checks that `data` is a structurally well-formed encoded set.
///
/// The slice length is the declared blob size: the header must claim exactly
/// `HEADER_SIZE + length * encoding` bytes. Zero-length blobs are rejected
/// even though a live [`crate::PackSet`] may be empty; an empty set has no
/// wire form.
///
/// With `deep`, every element is decoded and checked to be strictly greater
/// than its predecessor — the only check that catches corruption behind a
/// consistent header.
///
/// All reads stay inside `data` no matter what the header claims; this
/// function never panics on adversarial input.
pub fn validate(data: &[u8], deep: bool) -> Result<(), DecodeErr> {
    if data.len() < HEADER_SIZE {
        return Err(DecodeErr::Length);
    }
    let (header, elems) = data.split_at(HEADER_SIZE);
    let header = Header::ref_from_bytes(header)?;

    let encoding = header.encoding().ok_or(DecodeErr::Encoding)?;
    let length = header.length();
    if length == 0 {
        return Err(DecodeErr::Empty);
    }
    // the length field is untrusted, so the multiply must not wrap
    let expected = length
        .checked_mul(encoding.width())
        .ok_or(DecodeErr::SizeMismatch)?;
    if elems.len() != expected {
        return Err(DecodeErr::SizeMismatch);
    }

    if deep {
        let mut prev = encoding.get(elems, 0);
        for pos in 1..length {
            let cur = encoding.get(elems, pos);
            if cur <= prev {
                return Err(DecodeErr::Unsorted);
            }
            prev = cur;
        }
    }

    Ok(())
}

/// Types with a canonical wire form.
pub trait Encodable {
    /// Exact byte length of the encoded form.
    fn encoded_size(&self) -> usize;

    /// Writes the encoded form into `buf`.
    fn encode<B: BufMut>(&self, buf: &mut B);

    fn encode_to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_size());
        self.encode(&mut buf);
        buf.freeze()
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;

    use crate::{
        Encodable, PackSet,
        codec::{DecodeErr, HEADER_SIZE, validate},
        testutil::{SetGen, mkblob, mkset},
    };

    #[test]
    fn test_roundtrip_deep() {
        let mut setgen = SetGen::new(0xDEAD_BEEF);
        for set in [
            mkset([100]),
            mkset([100, 40000]),
            mkset([100, 40000, 5_000_000_000]),
            mkset(setgen.mixed(512)),
        ] {
            let blob = set.encode_to_bytes();
            assert_eq!(blob.len(), set.encoded_size());
            assert_eq!(validate(&blob, true), Ok(()));
        }
    }

    #[test]
    fn test_truncated_header() {
        for len in 0..HEADER_SIZE {
            let blob = vec![0u8; len];
            assert_matches!(
                validate(&blob, false),
                Err(DecodeErr::Length),
                "failed for truncated buffer of size {}",
                len
            );
        }
    }

    #[test]
    fn test_bad_encoding_tag() {
        for tag in [0u32, 1, 3, 5, 6, 7, 9, 255, u32::MAX] {
            let mut blob = mkblob(2, &[1, 2]);
            blob[..4].copy_from_slice(&tag.to_le_bytes());
            assert_matches!(
                validate(&blob, false),
                Err(DecodeErr::Encoding),
                "failed for tag {}",
                tag
            );
        }
    }

    #[test]
    fn test_length_mismatch() {
        // header claims 3 elements, buffer only holds 2
        let mut blob = mkblob(2, &[1, 2]);
        blob[4..8].copy_from_slice(&3u32.to_le_bytes());
        assert_matches!(validate(&blob, false), Err(DecodeErr::SizeMismatch));

        // trailing padding is tampering too
        let mut blob = mkblob(2, &[1, 2]);
        blob.push(0);
        assert_matches!(validate(&blob, false), Err(DecodeErr::SizeMismatch));

        // truncated element section
        let mut blob = mkblob(2, &[1, 2]);
        blob.pop();
        assert_matches!(validate(&blob, false), Err(DecodeErr::SizeMismatch));
    }

    #[test]
    fn test_huge_length_claim_stays_in_bounds() {
        let mut blob = mkblob(8, &[1]);
        blob[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        assert_matches!(validate(&blob, true), Err(DecodeErr::SizeMismatch));
    }

    #[test]
    fn test_zero_length_rejected() {
        let blob = mkblob(2, &[]);
        assert_eq!(blob.len(), HEADER_SIZE);
        assert_matches!(validate(&blob, false), Err(DecodeErr::Empty));

        // the owned type happily exists empty; only the wire form is invalid
        assert!(PackSet::new().is_empty());
    }

    #[test]
    fn test_unsorted_rejected_deep_only() {
        for elems in [&[2i64, 1][..], &[1, 1], &[5, 3, 9], &[-1, -1]] {
            let blob = mkblob(2, elems);
            assert_eq!(validate(&blob, false), Ok(()), "shallow accepts {elems:?}");
            assert_matches!(
                validate(&blob, true),
                Err(DecodeErr::Unsorted),
                "deep rejects {:?}",
                elems
            );
        }
    }

    #[test]
    fn test_blob_byteorder() {
        let blob = mkset([0x01_00, -2]).encode_to_bytes();
        assert_eq!(
            blob.as_ref(),
            &[
                0x02, 0x00, 0x00, 0x00, // encoding = 2
                0x02, 0x00, 0x00, 0x00, // length = 2
                0xFE, 0xFF, // -2
                0x00, 0x01, // 256
            ]
        );
    }
}
