//! Timeline evaluation over a [`PathReader`]: pick the active segment for a
//! given 32-bit timestamp and run its expression.
//!
//! Timestamps are compared using [`u32::wrapping_sub`] against an origin,
//! never as signed integers or floats. The origin is `0` unless the
//! header's `OVERFLOW` flag is set, in which case it is the first segment's
//! `start_time` — shifting the origin only when the time axis actually
//! wraps keeps "query precedes the first segment" distinguishable from
//! "query wrapped around to the last segment".

use crate::codec::{PathFlags, PathReader};
use crate::consts::NO_SEGMENT;
use crate::error::EvalStatus;
use crate::interpreter::vector::upper_bound;
use crate::stack::PostfixStack;

/// Milliseconds per second used to convert a segment-relative timestamp
/// into the single float seed pushed before a segment's expression runs.
const MILLIS_PER_SECOND: f32 = 1000.0;

/// Return the index of the segment active at time `t`, or
/// [`crate::consts::NO_SEGMENT`] if `path` has no segments or `t` precedes
/// the first one.
#[tracing::instrument(level = "trace", skip(path))]
pub fn path_segment_at(path: &PathReader<'_>, t: u32) -> u8 {
    let n = path.segment_size();
    if n == 0 {
        tracing::trace!("empty path, no active segment");
        return NO_SEGMENT;
    }
    let origin = if path.flags().contains(PathFlags::OVERFLOW) {
        path.segment_header(0).start_time
    } else {
        0
    };
    let shifted_t = t.wrapping_sub(origin);
    let idx = upper_bound(n as usize, |i| {
        let start = path.segment_header(i as u16).start_time;
        start.wrapping_sub(origin) > shifted_t
    });
    if idx == 0 {
        tracing::trace!(origin, "query precedes first segment");
        return NO_SEGMENT;
    }
    let segment = (idx - 1) as u8;
    tracing::trace!(segment, origin, "segment selected");
    segment
}

/// Run the segment active at time `t`, seeding the stack with the elapsed
/// time (in seconds) since that segment's `start_time` before its
/// expression executes. A `Path` with no segments has no active segment at
/// any time, which is an [`EvalStatus::UndefinedOperation`].
#[tracing::instrument(level = "trace", skip(path, stack))]
pub fn path_eval(path: &PathReader<'_>, t: u32, stack: &mut PostfixStack<'_>) -> EvalStatus {
    let idx = path_segment_at(path, t);
    if idx == NO_SEGMENT {
        return EvalStatus::UndefinedOperation;
    }

    let header = path.segment_header(idx as u16);
    let elapsed_ms = t.wrapping_sub(header.start_time);
    let seconds = elapsed_ms as f32 / MILLIS_PER_SECOND;

    let Some(expr) = path.segment_expr(idx as u16) else {
        // `PathReader::read` already validated every segment parses; this
        // is unreachable for any reader obtained that way.
        return EvalStatus::UndefinedOperation;
    };

    stack.clear();
    if !stack.push(seconds) {
        return EvalStatus::StackOverflow;
    }
    tracing::trace!(segment = idx, seconds, "running segment expression");
    stack.eval(&expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PathWriter;
    use crate::opcode::Op;

    fn build_two_segment_path() -> Vec<u8> {
        let mut writer = PathWriter::new();
        writer.add_segment(1_000).push(&[1.0]);
        writer.add_segment(5_000).push(&[2.0]);
        writer.to_vec()
    }

    #[test]
    fn empty_path_has_no_active_segment() {
        let writer = PathWriter::new();
        let buf = writer.to_vec();
        let reader = PathReader::read(&buf).unwrap();
        assert_eq!(path_segment_at(&reader, 0), NO_SEGMENT);

        let mut data = [0.0f32; 4];
        let mut stack = PostfixStack::new(&mut data);
        assert_eq!(path_eval(&reader, 0, &mut stack), EvalStatus::UndefinedOperation);
        assert!(stack.is_empty());
    }

    #[test]
    fn selects_segment_covering_the_timestamp() {
        let buf = build_two_segment_path();
        let reader = PathReader::read(&buf).unwrap();

        assert_eq!(path_segment_at(&reader, 1_000), 0);
        assert_eq!(path_segment_at(&reader, 4_999), 0);
        assert_eq!(path_segment_at(&reader, 5_000), 1);
        assert_eq!(path_segment_at(&reader, 50_000), 1);
    }

    #[test]
    fn eval_seeds_elapsed_seconds_and_runs_segment_expression() {
        let mut writer = PathWriter::new();
        let seg = writer.add_segment(1_000);
        seg.append_op(Op::Add);
        let buf = writer.to_vec();
        let reader = PathReader::read(&buf).unwrap();

        let mut data = [0.0f32; 4];
        let mut stack = PostfixStack::new(&mut data);
        // t - start_time = 2500ms -> 2.5s seed, then `add` needs a second
        // operand already on the stack; here it underflows deliberately.
        let status = path_eval(&reader, 3_500, &mut stack);
        assert_eq!(status, EvalStatus::StackUnderflow);
    }

    #[test]
    fn query_before_the_first_segment_is_no_segment_when_not_wrapped() {
        let buf = build_two_segment_path();
        let reader = PathReader::read(&buf).unwrap();
        assert_eq!(reader.flags(), crate::codec::PathFlags::empty());
        assert_eq!(path_segment_at(&reader, 500), NO_SEGMENT);

        let mut data = [0.0f32; 4];
        let mut stack = PostfixStack::new(&mut data);
        assert_eq!(path_eval(&reader, 500, &mut stack), EvalStatus::UndefinedOperation);
    }

    #[test]
    fn wraparound_timestamp_still_selects_correctly() {
        let mut writer = PathWriter::new();
        writer.add_segment(u32::MAX - 1000).push(&[1.0]);
        writer.add_segment(1000).push(&[2.0]);
        let buf = writer.to_vec();
        let reader = PathReader::read(&buf).unwrap();

        assert_eq!(path_segment_at(&reader, u32::MAX - 500), 0);
        assert_eq!(path_segment_at(&reader, 500), 0);
        assert_eq!(path_segment_at(&reader, 1000), 1);
        assert_eq!(path_segment_at(&reader, 50_000), 1);
    }
}
