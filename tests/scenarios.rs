//! Concrete evaluation scenarios, one test per named case.

use postfix_vm::prelude::*;

fn eval_with(writer: &PostfixWriter, data: &mut [f32], initial: &[f32]) -> (EvalStatus, Vec<f32>) {
    let buf = writer.to_vec();
    let mut stack = PostfixStack::new(data);
    for &v in initial {
        stack.push(v);
    }
    let status = postfix_eval(&buf, &mut stack);
    (status, stack.as_slice().to_vec())
}

#[test]
fn s1_empty_expression_leaves_stack_untouched() {
    let writer = PostfixWriter::new();
    let mut data = [0.0f32; 4];
    let (status, stack) = eval_with(&writer, &mut data, &[42.0]);
    assert_eq!(status, EvalStatus::Ok);
    assert_eq!(stack, vec![42.0]);
}

#[test]
fn s2_push_then_add() {
    let mut writer = PostfixWriter::new();
    writer.push(&[1.0, 2.0]);
    writer.append_op(Op::Add);
    let mut data = [0.0f32; 8];
    let (status, stack) = eval_with(&writer, &mut data, &[42.0]);
    assert_eq!(status, EvalStatus::Ok);
    assert_eq!(stack, vec![42.0, 3.0]);
}

#[test]
fn s3_lut_boundary_interpolates_between_rows() {
    let mut writer = PostfixWriter::new();
    writer.push(&[4.0]);
    writer.push(&[0.0, 1.0, 2.0, 3.0, 2.0, 4.0, 3.0, 7.0, 6.0, 8.0, 2.0, 0.0]);
    writer.append_op(Op::Lut);
    writer.append_int(3);
    writer.append_int(4 << 1);
    let mut data = [0.0f32; 16];
    let (status, stack) = eval_with(&writer, &mut data, &[]);
    assert_eq!(status, EvalStatus::Ok);
    assert_eq!(stack, vec![6.0, 2.5, 3.5]);
}

#[test]
fn s4_transpose_with_implicit_push() {
    let mut writer = PostfixWriter::new();
    writer.append_op(Op::Transpose);
    writer.append_int(2);
    writer.append_int((3 << 1) | 1);
    for v in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
        writer.append_float(v);
    }
    let mut data = [0.0f32; 16];
    let (status, stack) = eval_with(&writer, &mut data, &[0.0]);
    assert_eq!(status, EvalStatus::Ok);
    assert_eq!(stack, vec![0.0, 1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
}

#[test]
fn s5_patheval_selects_segment_and_seeds_elapsed_seconds() {
    let mut writer = PathWriter::new();
    writer.add_segment(1000);
    let seg = writer.add_segment(2000);
    seg.pop(1);
    seg.push(&[99.0]);
    let buf = writer.to_vec();

    let mut data = [0.0f32; 4];
    let mut stack = PostfixStack::new(&mut data);
    assert_eq!(path_eval(&buf, 1750, &mut stack), EvalStatus::Ok);
    assert_eq!(stack.as_slice(), &[0.75]);

    let mut data = [0.0f32; 4];
    let mut stack = PostfixStack::new(&mut data);
    assert_eq!(path_eval(&buf, 2100, &mut stack), EvalStatus::Ok);
    assert_eq!(stack.as_slice(), &[99.0]);
}

#[test]
fn s6_patheval_with_no_segments_is_undefined_operation() {
    let writer = PathWriter::new();
    let buf = writer.to_vec();

    let mut data = [0.0f32; 4];
    let mut stack = PostfixStack::new(&mut data);
    assert_eq!(path_eval(&buf, 123_456, &mut stack), EvalStatus::UndefinedOperation);
}
