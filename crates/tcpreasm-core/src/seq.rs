//! TCP sequence number arithmetic
//!
//! Sequence numbers live in a 32-bit modular space, so ordering is only
//! meaningful relative to a reference point within half the space.
//! Comparison follows RFC 1982 serial number arithmetic.

/// Half of the sequence space, `2^(SERIAL_BITS - 1)` per RFC 1982.
pub const SEQ_HALF_SPACE: u32 = 1 << 31;

/// Circular ordering of two sequence numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeqOrdering {
    /// Both values are identical
    Equal,
    /// The left value precedes the right one
    Before,
    /// The left value follows the right one
    After,
}

/// Compare `a` against `b` in circular sequence space
///
/// `a` is `Before` `b` when the forward distance from `a` to `b` is less than
/// [`SEQ_HALF_SPACE`]. Values exactly half the space apart resolve to `After`.
///
/// ```
/// use tcpreasm_core::seq::{compare, SeqOrdering};
///
/// assert_eq!(compare(0xFFFF_FFFE, 2), SeqOrdering::Before);
/// assert_eq!(compare(2, 0xFFFF_FFFE), SeqOrdering::After);
/// ```
#[inline]
pub fn compare(a: u32, b: u32) -> SeqOrdering {
    if a == b {
        SeqOrdering::Equal
    } else if b.wrapping_sub(a) < SEQ_HALF_SPACE {
        SeqOrdering::Before
    } else {
        SeqOrdering::After
    }
}

/// Advance `seq` by `len` bytes, wrapping modulo 2^32
#[inline]
pub fn seq_add(seq: u32, len: usize) -> u32 {
    // Lengths are bounded by 32 bits; truncation is the modular add.
    seq.wrapping_add(len as u32)
}

/// Forward distance from `from` to `to`, modulo 2^32
#[inline]
pub fn distance(from: u32, to: u32) -> u32 {
    to.wrapping_sub(from)
}
