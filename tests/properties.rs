//! Universally-quantified properties over the stack primitives and the VM's
//! involutive/self-inverse operations.

use postfix_vm::prelude::*;
use quickcheck_macros::quickcheck;

fn eval_ops(writer: &PostfixWriter, initial: &[f32]) -> Vec<f32> {
    let buf = writer.to_vec();
    let mut data = vec![0.0f32; initial.len() + 64];
    let mut stack = PostfixStack::new(&mut data);
    for &v in initial {
        assert!(stack.push(v));
    }
    let status = postfix_eval(&buf, &mut stack);
    assert_eq!(status, EvalStatus::Ok);
    stack.as_slice().to_vec()
}

// Bound inputs to a sane range so float comparisons after a handful of
// arithmetic ops stay exact (everything here is pure data movement, not
// arithmetic, so no rounding is actually introduced — but NaN/inf payloads
// would make `==` comparisons meaningless).
fn sanitize(values: Vec<f32>) -> Vec<f32> {
    values
        .into_iter()
        .map(|v| if v.is_finite() { v.clamp(-1e6, 1e6) } else { 0.0 })
        .take(16)
        .collect()
}

#[quickcheck]
fn push_then_read_round_trips(values: Vec<f32>) -> bool {
    let values = sanitize(values);
    let mut writer = PostfixWriter::new();
    writer.push(&values);
    eval_ops(&writer, &[]) == values
}

#[quickcheck]
fn rotl_then_rotr_is_identity(values: Vec<f32>) -> bool {
    let values = sanitize(values);
    if values.is_empty() {
        return true;
    }
    let mut writer = PostfixWriter::new();
    writer.push(&values);
    writer.append_op(Op::RotL);
    writer.append_int(values.len() as u8);
    writer.append_op(Op::RotR);
    writer.append_int(values.len() as u8);
    eval_ops(&writer, &[]) == values
}

#[quickcheck]
fn rev_twice_is_identity(values: Vec<f32>) -> bool {
    let values = sanitize(values);
    if values.is_empty() {
        return true;
    }
    let mut writer = PostfixWriter::new();
    writer.push(&values);
    writer.append_op(Op::Rev);
    writer.append_int(values.len() as u8);
    writer.append_op(Op::Rev);
    writer.append_int(values.len() as u8);
    eval_ops(&writer, &[]) == values
}

#[quickcheck]
fn transpose_twice_is_identity(rows: u8, cols: u8) -> bool {
    let rows = (rows % 6).max(1) as usize;
    let cols = (cols % 6).max(1) as usize;
    let values: Vec<f32> = (0..rows * cols).map(|i| i as f32).collect();

    let mut writer = PostfixWriter::new();
    writer.push(&values);
    writer.append_op(Op::Transpose);
    writer.append_int(rows as u8);
    writer.append_int((cols as u8) << 1);
    writer.append_op(Op::Transpose);
    writer.append_int(cols as u8);
    writer.append_int((rows as u8) << 1);

    eval_ops(&writer, &[]) == values
}

#[quickcheck]
fn dup_zero_then_pop_is_identity(values: Vec<f32>) -> bool {
    let values = sanitize(values);
    if values.is_empty() {
        return true;
    }
    let mut writer = PostfixWriter::new();
    writer.push(&values);
    writer.append_op(Op::Dup);
    writer.append_int(0);
    writer.append_op(Op::Pop);
    writer.append_int(1);
    eval_ops(&writer, &[]) == values
}

#[test]
fn failed_evaluation_leaves_stack_unchanged() {
    let mut writer = PostfixWriter::new();
    writer.append_op(Op::Pop); // missing its int literal operand
    let buf = writer.to_vec();

    let mut data = [0.0f32; 4];
    let mut stack = PostfixStack::new(&mut data);
    stack.push(1.0);
    stack.push(2.0);

    let status = postfix_eval(&buf, &mut stack);
    assert_eq!(status, EvalStatus::IntLiteralsUnderflow);
    assert_eq!(stack.as_slice(), &[1.0, 2.0]);
}
