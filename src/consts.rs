//! Wire-format sizes and implementation-defined bounds.
//!
//! The sizes here are part of the binary contract in [`crate::codec`]; the
//! bounds are local caps this implementation adds to resolve the dimension
//! question the source protocol left open (see `DESIGN.md`).

/// Size in bytes of a `PostfixExpression` header on the wire (see
/// [`crate::codec::PostfixReader`]).
pub const POSTFIX_HEADER_SIZE: usize = 4;

/// Size in bytes of a `Path` header on the wire (see
/// [`crate::codec::PathReader`]).
pub const PATH_HEADER_SIZE: usize = 4;

/// Size in bytes of one [`crate::codec::PathSegmentHeader`] on the wire.
pub const PATH_SEGMENT_HEADER_SIZE: usize = 8;

/// Sentinel returned by [`crate::path_eval::path_segment_at`] when no segment
/// is active for the queried time.
pub const NO_SEGMENT: u8 = 0xFF;

/// Upper bound on the number of `f32` elements a single op's scratch
/// temporary (`Transpose`, `MulMat`, `Lut`) may occupy.
///
/// Matrix side lengths on the wire are `u8`, so a single side is bounded by
/// `u8::MAX`. Without a cap, `MulMat`'s `arows * bcols` (or `Transpose`'s
/// `rows * cols`) could reach `255 * 255 = 65025` elements from a single
/// three-byte instruction, none of which round-trips through the bounded
/// stack. This cap exists purely to bound the scratch allocation; it has no
/// effect on programs whose matrices fit the caller's stack capacity anyway.
pub const MAX_SCRATCH_ELEMENTS: usize = 1 << 14;
