//! Evaluation status taxonomy.
//!
//! `EvalStatus` is the only return type a core evaluation produces; its
//! variants have stable ordinal positions (`Ok` is always `0`) because
//! callers across language boundaries treat this as a small integer, not a
//! serialized enum. Codec `read()` failures are a separate boolean concern
//! (see [`crate::codec`]) and never construct an `EvalStatus`.

use thiserror::Error;

/// Resulting status of a [`crate::interpreter::EvalContext::eval`] or
/// [`crate::path_eval::path_eval`] call.
///
/// Ordinal positions are part of the wire contract with external callers
/// (§6): `Ok, UndefinedOperation, IllegalOperation, StackOverflow,
/// StackUnderflow, IntLiteralsUnderflow, FloatLiteralsUnderflow`. Do not
/// reorder existing variants; append new ones at the end if ever needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[repr(u8)]
pub enum EvalStatus {
    /// Normal completion.
    #[error("ok")]
    Ok = 0,
    /// Unknown opcode byte, or `PathEval` queried before the first segment.
    #[error("undefined operation")]
    UndefinedOperation = 1,
    /// A structurally invalid operand (e.g. a `Lut` with zero rows or
    /// columns), or a path segment's inline expression failed to parse.
    #[error("illegal operation")]
    IllegalOperation = 2,
    /// Pushing would exceed the stack's capacity.
    #[error("stack overflow")]
    StackOverflow = 3,
    /// Fewer stack elements are present than the operation requires.
    #[error("stack underflow")]
    StackUnderflow = 4,
    /// An opcode needed an integer literal that was not present.
    #[error("integer literal stream underflow")]
    IntLiteralsUnderflow = 5,
    /// An opcode (explicit `Push`, or an implicit-push operand) needed float
    /// literals that were not present.
    #[error("float literal stream underflow")]
    FloatLiteralsUnderflow = 6,
}

impl EvalStatus {
    /// True if this status represents successful completion.
    #[inline]
    pub const fn is_ok(self) -> bool {
        matches!(self, EvalStatus::Ok)
    }
}

/// Shorthand for a fallible step inside the interpreter; `Err` carries the
/// fault that should be returned from `eval` immediately.
pub type EvalResult<T> = Result<T, EvalStatus>;
