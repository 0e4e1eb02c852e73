//! The postfix instruction interpreter.
//!
//! [`EvalContext`] walks a decoded [`PostfixReader`] once, opcode by
//! opcode, mutating a caller-owned [`PostfixStack`]. See the op table in
//! the crate's design notes for the full operation semantics; this module
//! is the single source of truth for their exact behavior.

pub(crate) mod vector;

use crate::codec::PostfixReader;
use crate::consts::MAX_SCRATCH_ELEMENTS;
use crate::error::EvalStatus;
use crate::opcode::Op;
use crate::stack::PostfixStack;

/// Cursor state plus a borrowed expression and stack; one `EvalContext` per
/// `eval` call.
pub struct EvalContext<'e, 's, 'a> {
    expr: &'e PostfixReader<'e>,
    stack: &'s mut PostfixStack<'a>,
    op_pos: usize,
    i_pos: usize,
    f_pos: usize,
}

macro_rules! bail {
    ($status:expr) => {{
        let status = $status;
        if !status.is_ok() {
            return status;
        }
    }};
}

macro_rules! try_pop {
    ($self:expr) => {
        match $self.stack.pop() {
            Ok(v) => v,
            Err(status) => return status,
        }
    };
}

impl<'e, 's, 'a> EvalContext<'e, 's, 'a> {
    pub fn new(expr: &'e PostfixReader<'e>, stack: &'s mut PostfixStack<'a>) -> Self {
        EvalContext {
            expr,
            stack,
            op_pos: 0,
            i_pos: 0,
            f_pos: 0,
        }
    }

    fn geti(&mut self) -> Result<u8, EvalStatus> {
        if self.i_pos >= self.expr.i_size() as usize {
            return Err(EvalStatus::IntLiteralsUnderflow);
        }
        let v = self.expr.int_at(self.i_pos as u8);
        self.i_pos += 1;
        Ok(v)
    }

    /// Consume `n` floats from the literal stream and push them.
    fn pushf(&mut self, n: u32) -> EvalStatus {
        let remaining = self.expr.f_size() as usize - self.f_pos;
        if n as usize > remaining {
            return EvalStatus::FloatLiteralsUnderflow;
        }
        let expr = self.expr;
        let base = self.f_pos;
        let status = self
            .stack
            .push_from(n as usize, |k| expr.float_at((base + k) as u16));
        if status.is_ok() {
            self.f_pos += n as usize;
        }
        status
    }

    /// Pure half of the implicit-push decode: the size `n` in `arg`'s upper
    /// bits, above the low `instances` push-count bits. Callers that need to
    /// validate `n` (dimension caps, illegal-operand checks) before any
    /// literals are pulled from the float stream use this instead of
    /// `implicit_push`, which mutates the stack.
    fn decode_count(arg: u8, instances: u8) -> u8 {
        arg >> instances
    }

    /// Mutating half of the implicit-push decode: if `arg`'s low
    /// `instances` bits (the push-count) are nonzero, pulls
    /// `push_count * multiple * n` floats off the literal stream and pushes
    /// them, where `n = Self::decode_count(arg, instances)`.
    fn implicit_push(&mut self, arg: u8, multiple: u32, instances: u8) -> EvalStatus {
        let mask = (1u8 << instances) - 1;
        let push_count = arg & mask;
        let n = Self::decode_count(arg, instances);
        if push_count > 0 {
            let size = push_count as u32 * multiple * n as u32;
            return self.pushf(size);
        }
        EvalStatus::Ok
    }

    /// Run every opcode in the expression to completion, or until a fault.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn eval(&mut self) -> EvalStatus {
        while self.op_pos < self.expr.op_size() as usize {
            let raw = self.expr.op_at(self.op_pos as u8);
            self.op_pos += 1;
            let Ok(op) = Op::try_from(raw) else {
                return EvalStatus::UndefinedOperation;
            };
            tracing::trace!(?op, "dispatch");
            let status = self.exec(op);
            if !status.is_ok() {
                return status;
            }
        }
        EvalStatus::Ok
    }

    fn exec(&mut self, op: Op) -> EvalStatus {
        match op {
            Op::Push => {
                let n = match self.geti() {
                    Ok(n) => n,
                    Err(status) => return status,
                };
                self.pushf(n as u32)
            }
            Op::Pop => {
                let n = match self.geti() {
                    Ok(n) => n,
                    Err(status) => return status,
                };
                match self.stack.pop_n(n as usize) {
                    Ok(_) => EvalStatus::Ok,
                    Err(status) => status,
                }
            }
            Op::Dup => {
                let n = match self.geti() {
                    Ok(n) => n as usize,
                    Err(status) => return status,
                };
                if self.stack.len() <= n {
                    return EvalStatus::StackUnderflow;
                }
                let idx = self.stack.len() - 1 - n;
                let v = self.stack.slice(idx, 1)[0];
                if self.stack.push(v) {
                    EvalStatus::Ok
                } else {
                    EvalStatus::StackOverflow
                }
            }
            Op::RotL => {
                let n = match self.geti() {
                    Ok(n) => n as usize,
                    Err(status) => return status,
                };
                if n > 1 {
                    let start = match self.stack.peek_n(n) {
                        Ok(s) => s,
                        Err(status) => return status,
                    };
                    self.stack.slice_mut(start, n).rotate_left(1);
                }
                EvalStatus::Ok
            }
            Op::RotR => {
                let n = match self.geti() {
                    Ok(n) => n as usize,
                    Err(status) => return status,
                };
                if n > 1 {
                    let start = match self.stack.peek_n(n) {
                        Ok(s) => s,
                        Err(status) => return status,
                    };
                    self.stack.slice_mut(start, n).rotate_right(1);
                }
                EvalStatus::Ok
            }
            Op::Rev => {
                let n = match self.geti() {
                    Ok(n) => n as usize,
                    Err(status) => return status,
                };
                let start = match self.stack.peek_n(n) {
                    Ok(s) => s,
                    Err(status) => return status,
                };
                self.stack.slice_mut(start, n).reverse();
                EvalStatus::Ok
            }
            Op::Transpose => self.exec_transpose(),
            Op::Add => self.exec_binary(|a, b| a + b),
            Op::Sub => self.exec_binary(|a, b| a - b),
            Op::Mul => self.exec_binary(|a, b| a * b),
            Op::MulAdd => self.exec_ternary(|a, b, c| a + b * c),
            Op::Div => self.exec_binary(|a, b| a / b),
            Op::Mod => self.exec_binary(|a, b| a % b),
            Op::Neg => self.exec_unary(|v| -v),
            Op::Abs => self.exec_unary(f32::abs),
            Op::Inv => self.exec_unary(|v| 1.0 / v),
            Op::Sqrt => self.exec_unary(f32::sqrt),
            Op::Exp => self.exec_unary(f32::exp),
            Op::Ln => self.exec_unary(f32::ln),
            Op::Sin => self.exec_unary(f32::sin),
            Op::Cos => self.exec_unary(f32::cos),
            Op::Tan => self.exec_unary(f32::tan),
            Op::Asin => self.exec_unary(f32::asin),
            Op::Acos => self.exec_unary(f32::acos),
            Op::Pow => self.exec_binary(f32::powf),
            Op::Atan2 => {
                bail!(self.require_depth(2));
                let x = try_pop!(self);
                let y = try_pop!(self);
                self.push_result(y.atan2(x))
            }
            Op::PolyVec => self.exec_poly_vec(),
            Op::PolyMat => self.exec_poly_mat(),
            Op::AddVec => self.exec_vec_vec(|a, b| a + b),
            Op::SubVec => self.exec_vec_vec(|a, b| a - b),
            Op::MulVec => self.exec_vec_vec(|a, b| a * b),
            Op::MulAddVec => self.exec_mul_add_vec(),
            Op::ScaleVec => self.exec_scale_vec(),
            Op::NegVec => self.exec_neg_vec(),
            Op::NormVec => self.exec_norm_vec(),
            Op::MulMat => self.exec_mul_mat(),
            Op::Lerp => self.exec_lerp(),
            Op::Lut => self.exec_lut(),
        }
    }

    /// Validate that at least `n` values are live before any of an op's
    /// several pops run, so a later pop can never underflow after an
    /// earlier one has already mutated the stack. Per the underflow
    /// ordering contract, a failed op must leave the stack exactly as it
    /// found it.
    fn require_depth(&self, n: usize) -> EvalStatus {
        if self.stack.len() < n {
            EvalStatus::StackUnderflow
        } else {
            EvalStatus::Ok
        }
    }

    fn exec_unary(&mut self, f: impl FnOnce(f32) -> f32) -> EvalStatus {
        bail!(self.require_depth(1));
        let v = try_pop!(self);
        self.push_result(f(v))
    }

    fn exec_binary(&mut self, f: impl FnOnce(f32, f32) -> f32) -> EvalStatus {
        bail!(self.require_depth(2));
        let b = try_pop!(self);
        let a = try_pop!(self);
        self.push_result(f(a, b))
    }

    fn exec_ternary(&mut self, f: impl FnOnce(f32, f32, f32) -> f32) -> EvalStatus {
        bail!(self.require_depth(3));
        let c = try_pop!(self);
        let b = try_pop!(self);
        let a = try_pop!(self);
        self.push_result(f(a, b, c))
    }

    fn push_result(&mut self, v: f32) -> EvalStatus {
        if self.stack.push(v) {
            EvalStatus::Ok
        } else {
            EvalStatus::StackOverflow
        }
    }

    fn exec_transpose(&mut self) -> EvalStatus {
        let rows = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let cols_raw = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let cols = Self::decode_count(cols_raw, 1);
        let (rows, cols) = (rows as usize, cols as usize);
        let total = rows * cols;
        if total > MAX_SCRATCH_ELEMENTS {
            return EvalStatus::StackOverflow;
        }
        bail!(self.implicit_push(cols_raw, rows as u32, 1));
        let start = match self.stack.pop_n(total) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let src = self.stack.slice(start, total).to_vec();
        let mut dst = vec![0.0f32; total];
        vector::transpose(&src, &mut dst, rows, cols);
        self.stack.push_slice(&dst)
    }

    fn exec_poly_vec(&mut self) -> EvalStatus {
        let arg = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let n = Self::decode_count(arg, 1) as usize;
        bail!(self.implicit_push(arg, 1, 1));
        bail!(self.require_depth(n + 1));
        let start = match self.stack.pop_n(n) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let coeff = self.stack.slice(start, n).to_vec();
        let t = try_pop!(self);
        let mut result = 0.0f32;
        let mut p = 1.0f32;
        for c in coeff {
            result += c * p;
            p *= t;
        }
        self.push_result(result)
    }

    fn exec_poly_mat(&mut self) -> EvalStatus {
        let rows = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let cols_raw = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let cols = Self::decode_count(cols_raw, 1);
        let (rows, cols) = (rows as usize, cols as usize);
        let total = rows * cols;
        if total > MAX_SCRATCH_ELEMENTS {
            return EvalStatus::StackOverflow;
        }
        bail!(self.implicit_push(cols_raw, rows as u32, 1));
        bail!(self.require_depth(total + 1));
        let start = match self.stack.pop_n(total) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let coeff = self.stack.slice(start, total).to_vec();
        let t = try_pop!(self);

        let mut result = vec![0.0f32; cols];
        for (j, slot) in result.iter_mut().enumerate() {
            let mut r = 0.0f32;
            let mut p = 1.0f32;
            for i in 0..rows {
                r += coeff[cols * i + j] * p;
                p *= t;
            }
            *slot = r;
        }

        let result_start = self.stack.len();
        bail!(self.stack.alloc(cols));
        self.stack.slice_mut(result_start, cols).copy_from_slice(&result);
        EvalStatus::Ok
    }

    fn exec_vec_vec(&mut self, f: impl Fn(f32, f32) -> f32) -> EvalStatus {
        let arg = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let n = Self::decode_count(arg, 1) as usize;
        bail!(self.implicit_push(arg, 1, 1));
        bail!(self.require_depth(2 * n));
        let rhs_start = match self.stack.pop_n(n) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let rhs = self.stack.slice(rhs_start, n).to_vec();
        let lhs_start = match self.stack.peek_n(n) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let lhs = self.stack.slice_mut(lhs_start, n);
        for (l, r) in lhs.iter_mut().zip(rhs.iter()) {
            *l = f(*l, *r);
        }
        EvalStatus::Ok
    }

    fn exec_mul_add_vec(&mut self) -> EvalStatus {
        let arg = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let n = Self::decode_count(arg, 2) as usize;
        bail!(self.implicit_push(arg, 1, 2));
        bail!(self.require_depth(3 * n));
        let c_start = match self.stack.pop_n(n) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let c = self.stack.slice(c_start, n).to_vec();
        let b_start = match self.stack.pop_n(n) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let b = self.stack.slice(b_start, n).to_vec();
        let a_start = match self.stack.peek_n(n) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let a = self.stack.slice_mut(a_start, n);
        for i in 0..n {
            a[i] = a[i] * b[i] + c[i];
        }
        EvalStatus::Ok
    }

    fn exec_scale_vec(&mut self) -> EvalStatus {
        let arg = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let n = Self::decode_count(arg, 1) as usize;
        bail!(self.implicit_push(arg, 1, 1));
        bail!(self.require_depth(n + 1));
        let v_start = match self.stack.pop_n(n) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let v = self.stack.slice(v_start, n).to_vec();
        let scalar = try_pop!(self);

        let result: Vec<f32> = v.iter().map(|x| scalar * x).collect();
        let result_start = self.stack.len();
        bail!(self.stack.alloc(n));
        self.stack.slice_mut(result_start, n).copy_from_slice(&result);
        EvalStatus::Ok
    }

    fn exec_neg_vec(&mut self) -> EvalStatus {
        let arg = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let n = Self::decode_count(arg, 1) as usize;
        bail!(self.implicit_push(arg, 1, 1));
        let start = match self.stack.peek_n(n) {
            Ok(s) => s,
            Err(status) => return status,
        };
        for v in self.stack.slice_mut(start, n) {
            *v = -*v;
        }
        EvalStatus::Ok
    }

    fn exec_norm_vec(&mut self) -> EvalStatus {
        let arg = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let n = Self::decode_count(arg, 1) as usize;
        bail!(self.implicit_push(arg, 1, 1));
        let start = match self.stack.pop_n(n) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let sum_sq: f32 = self.stack.slice(start, n).iter().map(|x| x * x).sum();
        self.push_result(sum_sq.sqrt())
    }

    fn exec_mul_mat(&mut self) -> EvalStatus {
        let arows = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let brows = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let bcols_raw = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let bcols = Self::decode_count(bcols_raw, 1);
        let (arows, brows, bcols) = (arows as usize, brows as usize, bcols as usize);
        if arows * brows > MAX_SCRATCH_ELEMENTS
            || brows * bcols > MAX_SCRATCH_ELEMENTS
            || arows * bcols > MAX_SCRATCH_ELEMENTS
        {
            return EvalStatus::StackOverflow;
        }
        bail!(self.implicit_push(bcols_raw, brows as u32, 1));
        bail!(self.require_depth(arows * brows + brows * bcols));
        let b_start = match self.stack.pop_n(brows * bcols) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let b = self.stack.slice(b_start, brows * bcols).to_vec();
        let a_start = match self.stack.pop_n(arows * brows) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let a = self.stack.slice(a_start, arows * brows).to_vec();

        let mut dst = vec![0.0f32; arows * bcols];
        vector::matmul(&a, &b, &mut dst, arows, brows, bcols);
        self.stack.push_slice(&dst)
    }

    fn exec_lerp(&mut self) -> EvalStatus {
        let arg = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let n = Self::decode_count(arg, 2) as usize;
        bail!(self.implicit_push(arg, 1, 2));
        bail!(self.require_depth(2 * n + 1));
        let v1_start = match self.stack.pop_n(n) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let v1 = self.stack.slice(v1_start, n).to_vec();
        let v0_start = match self.stack.pop_n(n) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let v0 = self.stack.slice(v0_start, n).to_vec();
        let t = try_pop!(self);

        let result: Vec<f32> = (0..n).map(|i| (1.0 - t) * v0[i] + t * v1[i]).collect();
        let result_start = self.stack.len();
        bail!(self.stack.alloc(n));
        self.stack.slice_mut(result_start, n).copy_from_slice(&result);
        EvalStatus::Ok
    }

    fn exec_lut(&mut self) -> EvalStatus {
        let rows = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let cols_raw = match self.geti() {
            Ok(n) => n,
            Err(status) => return status,
        };
        let cols = Self::decode_count(cols_raw, 1);
        if rows < 1 || cols < 1 {
            return EvalStatus::IllegalOperation;
        }
        let (rows, cols) = (rows as usize, cols as usize);
        let total = rows * cols;
        if total > MAX_SCRATCH_ELEMENTS {
            return EvalStatus::StackOverflow;
        }
        bail!(self.implicit_push(cols_raw, rows as u32, 1));
        bail!(self.require_depth(total + 1));
        let start = match self.stack.pop_n(total) {
            Ok(s) => s,
            Err(status) => return status,
        };
        let table = self.stack.slice(start, total).to_vec();
        let t = try_pop!(self);

        let n = cols - 1;
        let mut result = vec![0.0f32; n];
        vector::lut_lookup(&table, rows, cols, t, &mut result);

        let result_start = self.stack.len();
        bail!(self.stack.alloc(n));
        self.stack.slice_mut(result_start, n).copy_from_slice(&result);
        EvalStatus::Ok
    }
}
