//! A postfix expression virtual machine and timeline evaluator for motion
//! and lighting control.
//!
//! The core is a small, bounded-stack VM (see [`interpreter`]) that runs a
//! flat instruction stream decoded from a [`codec::PostfixReader`]. A
//! [`codec::PathReader`] layers a timeline of such expressions on top,
//! selecting which one is active for a given 32-bit timestamp.
//!
//! The three functions at the crate root — [`postfix_eval`],
//! [`path_segment_at`], [`path_eval`] — are the external callable surface:
//! they take raw wire bytes directly, the way a caller across a language
//! boundary would. The [`path_eval`] *module* holds the same operations
//! built on an already-parsed [`codec::PathReader`], for callers evaluating
//! the same path repeatedly who don't want to re-validate its structure on
//! every call.
//!
//! Every entry point here is allocation-free on the hot path and never
//! panics on malformed input — malformed wire bytes surface as
//! [`error::EvalStatus::IllegalOperation`] (or the sentinel
//! [`consts::NO_SEGMENT`] for `path_segment_at`), and a malformed *or*
//! out-of-resources program surfaces as an [`error::EvalStatus`] from `eval`.

pub mod codec;
pub mod consts;
pub mod error;
pub mod interpreter;
pub mod opcode;
pub mod path_eval;
pub mod stack;

pub use codec::{PathFlags, PathReader, PathSegmentHeader, PathWriter, PostfixReader, PostfixWriter};
pub use consts::NO_SEGMENT;
pub use error::{EvalResult, EvalStatus};
pub use opcode::Op;
pub use stack::PostfixStack;

/// Parse `expr_bytes` as a `PostfixExpression` and run it to completion
/// against `stack`. A buffer that fails to parse is
/// [`EvalStatus::IllegalOperation`].
pub fn postfix_eval(expr_bytes: &[u8], stack: &mut PostfixStack<'_>) -> EvalStatus {
    match PostfixReader::read(expr_bytes) {
        Some(expr) => stack.eval(&expr),
        None => EvalStatus::IllegalOperation,
    }
}

/// Parse `path_bytes` as a `Path` and return the index of the segment
/// active at time `t`, or [`NO_SEGMENT`] if parsing fails or the path has
/// no segments.
pub fn path_segment_at(path_bytes: &[u8], t: u32) -> u8 {
    match PathReader::read(path_bytes) {
        Some(path) => path_eval::path_segment_at(&path, t),
        None => NO_SEGMENT,
    }
}

/// Parse `path_bytes` as a `Path` and run the segment active at time `t`
/// against `stack`. A buffer that fails to parse is
/// [`EvalStatus::IllegalOperation`].
pub fn path_eval(path_bytes: &[u8], t: u32, stack: &mut PostfixStack<'_>) -> EvalStatus {
    match PathReader::read(path_bytes) {
        Some(path) => path_eval::path_eval(&path, t, stack),
        None => EvalStatus::IllegalOperation,
    }
}

/// Prelude re-exporting the types most callers need: the stack, the two
/// readers/writers, and the status/opcode enums.
pub mod prelude {
    pub use crate::{
        path_eval, path_segment_at, postfix_eval, EvalResult, EvalStatus, Op, PathFlags,
        PathReader, PathSegmentHeader, PathWriter, PostfixReader, PostfixStack, PostfixWriter,
        NO_SEGMENT,
    };
}
