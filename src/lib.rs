//! Packset is a sorted set of unique `i64` values stored in a single
//! contiguous buffer at the smallest of three fixed widths (16, 32, or
//! 64-bit) sufficient for its current members.
//!
//! ## Key features:
//!
//! - **Width upgrades**: a set starts at 16-bit storage and widens itself on
//!   demand when an out-of-range value is inserted. Widening is one-way;
//!   removals never narrow the encoding.
//!
//! - **Blob-identical memory layout**: the in-memory form is exactly the
//!   wire form (an 8-byte header followed by packed little-endian
//!   elements), so persisting or transmitting a set is a plain byte copy.
//!
//! - **Defensive decoding**: [`codec::validate`] structurally verifies
//!   untrusted blobs without ever reading out of bounds, and
//!   [`PackSetRef`] answers queries against a validated blob zero-copy.

pub mod codec;
mod encoding;
mod set;
mod set_ref;

#[cfg(test)]
mod testutil;

pub use codec::{DecodeErr, Encodable};
pub use encoding::Encoding;
pub use set::{AllocError, PackSet};
pub use set_ref::PackSetRef;
