//! The postfix instruction set.
//!
//! Each opcode is a single wire byte. Operand counts (how many integer
//! literals and stack values each consumes) are described alongside the
//! variant; the authoritative behavior lives in
//! [`crate::interpreter::EvalContext::eval`].

use strum::EnumCount;

/// One decoded opcode byte.
///
/// Discriminants are part of the wire format and must never be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount)]
#[repr(u8)]
pub enum Op {
    /// `push n` — pull `n` floats off the literal stream, push them in
    /// order.
    Push = 1,
    /// `pop n` — discard the top `n` stack values.
    Pop = 2,
    /// `dup n` — duplicate the element at depth `n` (`0` = top).
    Dup = 3,
    /// `rotl n` — rotate the top `n` values left by one; no-op if `n <= 1`.
    RotL = 4,
    /// `rotr n` — rotate the top `n` values right by one; no-op if `n <= 1`.
    RotR = 5,
    /// `rev n` — reverse the top `n` values in place.
    Rev = 6,
    /// `transpose rows cols*` — pop a row-major `rows x cols` matrix, push
    /// its transpose. `cols` carries an implicit-push bit.
    Transpose = 7,
    /// `[a b] -> [a + b]`.
    Add = 8,
    /// `[a b] -> [a - b]`.
    Sub = 9,
    /// `[a b] -> [a * b]`.
    Mul = 10,
    /// `[a b c] -> [a + b*c]` (fused multiply-add).
    MulAdd = 11,
    /// `[a b] -> [a / b]`, IEEE semantics.
    Div = 12,
    /// `[a b] -> [fmod(a, b)]`.
    Mod = 13,
    /// `[a] -> [-a]`.
    Neg = 14,
    /// `[a] -> [|a|]`.
    Abs = 15,
    /// `[a] -> [1/a]`.
    Inv = 16,
    /// `[b e] -> [b^e]`.
    Pow = 17,
    /// `[a] -> [sqrt(a)]`.
    Sqrt = 18,
    /// `[a] -> [exp(a)]`.
    Exp = 19,
    /// `[a] -> [ln(a)]`.
    Ln = 20,
    /// `[a] -> [sin(a)]`.
    Sin = 21,
    /// `[a] -> [cos(a)]`.
    Cos = 22,
    /// `[a] -> [tan(a)]`.
    Tan = 23,
    /// `[a] -> [asin(a)]`.
    Asin = 24,
    /// `[a] -> [acos(a)]`.
    Acos = 25,
    /// `[y x] -> [atan2(y, x)]`; `y` is the deeper operand.
    Atan2 = 26,
    /// `addvec n*` — elementwise add of two length-`n` vectors; rhs is
    /// topmost, lhs is mutated in place.
    AddVec = 27,
    /// `subvec n*` — elementwise subtract, same shape as `AddVec`.
    SubVec = 28,
    /// `mulvec n*` — elementwise multiply, same shape as `AddVec`.
    MulVec = 29,
    /// `muladdvec n**` — `[a b c] -> [a*b + c]` elementwise; two-bit
    /// implicit-push selects whether `b`, `c`, both, or neither are drawn
    /// from literals.
    MulAddVec = 30,
    /// `scalevec n*` — `[s v] -> [s*v]`.
    ScaleVec = 31,
    /// `negvec n*` — negate the top `n` values in place.
    NegVec = 32,
    /// `normvec n*` — `[v] -> [||v||_2]` (length-1 result).
    NormVec = 33,
    /// `mulmat arows brows bcols*` — `[A(arows x brows) B(brows x bcols)]
    /// -> [A*B (arows x bcols)]`.
    MulMat = 34,
    /// `polyvec n*` — `[t c0..c_{n-1}] -> [sum(ck * t^k)]`.
    PolyVec = 35,
    /// `polymat rows cols*` — `[t M(rows x cols)] -> [row vector of length
    /// cols, c_j = sum(M_ij * t^i)]`.
    PolyMat = 36,
    /// `lerp n**` — `[t v0 v1] -> [(1-t)*v0 + t*v1]`, length `n`.
    Lerp = 37,
    /// `lut rows cols*` — piecewise-linear table lookup; see
    /// [`crate::interpreter::vector::lut_lookup`].
    Lut = 38,
}

/// Total number of defined opcodes; used only for diagnostics/tests, not for
/// wire-format decisions.
pub const OP_COUNT: usize = Op::COUNT;

impl TryFrom<u8> for Op {
    type Error = ();

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            1 => Op::Push,
            2 => Op::Pop,
            3 => Op::Dup,
            4 => Op::RotL,
            5 => Op::RotR,
            6 => Op::Rev,
            7 => Op::Transpose,
            8 => Op::Add,
            9 => Op::Sub,
            10 => Op::Mul,
            11 => Op::MulAdd,
            12 => Op::Div,
            13 => Op::Mod,
            14 => Op::Neg,
            15 => Op::Abs,
            16 => Op::Inv,
            17 => Op::Pow,
            18 => Op::Sqrt,
            19 => Op::Exp,
            20 => Op::Ln,
            21 => Op::Sin,
            22 => Op::Cos,
            23 => Op::Tan,
            24 => Op::Asin,
            25 => Op::Acos,
            26 => Op::Atan2,
            27 => Op::AddVec,
            28 => Op::SubVec,
            29 => Op::MulVec,
            30 => Op::MulAddVec,
            31 => Op::ScaleVec,
            32 => Op::NegVec,
            33 => Op::NormVec,
            34 => Op::MulMat,
            35 => Op::PolyVec,
            36 => Op::PolyMat,
            37 => Op::Lerp,
            38 => Op::Lut,
            _ => return Err(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_defined_byte() {
        for byte in 1u8..=38 {
            let op = Op::try_from(byte).expect("defined opcode");
            assert_eq!(op as u8, byte);
        }
    }

    #[test]
    fn rejects_zero_and_out_of_range() {
        assert!(Op::try_from(0).is_err());
        assert!(Op::try_from(39).is_err());
        assert!(Op::try_from(255).is_err());
    }
}
