// CPU elementwise kernels
//
// Kernels work on plain contiguous slices in logical order. The engine copies
// operands out of their tensors first (so strided views and aliasing are
// already resolved) and hands the returned buffer to `FuncOpts::write_result`.
//
// Large inputs are processed with rayon. Results are identical either way:
// each output element depends only on the inputs at the same index.

use rayon::prelude::*;
use vole_core::{bail, Error, Result, Side, WithDType};

/// Default element count above which kernels run in parallel.
pub const PAR_THRESHOLD: usize = 100_000;

/// The arithmetic families the CPU engine implements elementwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Pow => "pow",
        }
    }

    /// `lhs op rhs`. Integer results that do not fit fail with
    /// `IntegerOverflow`; floats follow IEEE semantics.
    #[inline]
    pub fn apply<T: WithDType>(self, lhs: T, rhs: T) -> Result<T> {
        let out = match self {
            BinaryOp::Add => lhs.checked_add(rhs),
            BinaryOp::Sub => lhs.checked_sub(rhs),
            BinaryOp::Mul => lhs.checked_mul(rhs),
            BinaryOp::Div => lhs.checked_div(rhs),
            BinaryOp::Pow => lhs.checked_pow(rhs),
        };
        out.ok_or(Error::IntegerOverflow { op: self.name() })
    }
}

/// Reject right-hand operands that have no integer result: zero divisors
/// and negative exponents. Float types are never rejected.
fn check_rhs<T: WithDType>(op: BinaryOp, rhs: &[T]) -> Result<()> {
    if T::DTYPE.is_float() {
        return Ok(());
    }
    match op {
        BinaryOp::Div if rhs.iter().any(|d| d.is_zero()) => bail!("integer division by zero"),
        BinaryOp::Pow if rhs.iter().any(|e| *e < T::zero()) => {
            bail!("negative exponent in integer pow")
        }
        _ => Ok(()),
    }
}

/// `lhs[i] op rhs[i]` for equal-length slices.
pub fn binary<T: WithDType>(
    op: BinaryOp,
    lhs: &[T],
    rhs: &[T],
    par_threshold: usize,
) -> Result<Vec<T>> {
    if lhs.len() != rhs.len() {
        return Err(Error::msg(format!(
            "{}: operand lengths differ ({} vs {})",
            op.name(),
            lhs.len(),
            rhs.len()
        )));
    }
    check_rhs(op, rhs)?;
    if lhs.len() >= par_threshold {
        lhs.par_iter()
            .zip(rhs.par_iter())
            .map(|(&a, &b)| op.apply(a, b))
            .collect()
    } else {
        lhs.iter()
            .zip(rhs.iter())
            .map(|(&a, &b)| op.apply(a, b))
            .collect()
    }
}

/// `data[i] op s` for `Side::Left`, `s op data[i]` for `Side::Right`.
pub fn binary_scalar<T: WithDType>(
    op: BinaryOp,
    data: &[T],
    s: T,
    side: Side,
    par_threshold: usize,
) -> Result<Vec<T>> {
    match side {
        Side::Left => check_rhs(op, std::slice::from_ref(&s))?,
        Side::Right => check_rhs(op, data)?,
    }
    let f = |x: T| match side {
        Side::Left => op.apply(x, s),
        Side::Right => op.apply(s, x),
    };
    if data.len() >= par_threshold {
        data.par_iter().map(|&x| f(x)).collect()
    } else {
        data.iter().map(|&x| f(x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply() {
        assert_eq!(BinaryOp::Add.apply(2.0f64, 3.0).unwrap(), 5.0);
        assert_eq!(BinaryOp::Sub.apply(2i64, 3).unwrap(), -1);
        assert_eq!(BinaryOp::Mul.apply(2.0f32, 3.0).unwrap(), 6.0);
        assert_eq!(BinaryOp::Div.apply(7i64, 2).unwrap(), 3);
        assert_eq!(BinaryOp::Pow.apply(2.0f64, 10.0).unwrap(), 1024.0);
        assert_eq!(BinaryOp::Pow.apply(3i64, 3).unwrap(), 27);
    }

    #[test]
    fn test_integer_overflow_is_error() {
        let err = BinaryOp::Div.apply(i64::MIN, -1).unwrap_err();
        assert!(matches!(err, Error::IntegerOverflow { op: "div" }));
        assert!(BinaryOp::Add.apply(i64::MAX, 1).is_err());
        assert!(BinaryOp::Sub.apply(i64::MIN, 1).is_err());
        assert!(BinaryOp::Mul.apply(i64::MAX / 2 + 1, 2).is_err());
        assert!(BinaryOp::Pow.apply(2i64, 63).is_err());
        assert_eq!(BinaryOp::Add.apply(i64::MAX - 1, 1).unwrap(), i64::MAX);
    }

    #[test]
    fn test_integer_pow_is_exact() {
        assert_eq!(
            BinaryOp::Pow.apply(3i64, 39).unwrap(),
            4_052_555_153_018_976_267
        );
        assert!(binary_scalar(BinaryOp::Pow, &[2i64], -1, Side::Left, PAR_THRESHOLD).is_err());
        assert!(binary(BinaryOp::Pow, &[2i64, 2], &[1, -2], PAR_THRESHOLD).is_err());
        // negative base is fine
        assert_eq!(
            binary_scalar(BinaryOp::Pow, &[-2i64], 3, Side::Left, PAR_THRESHOLD).unwrap(),
            vec![-8]
        );
    }

    #[test]
    fn test_overflow_fails_on_parallel_path() {
        let a = vec![1i64; 64];
        let mut b = vec![1i64; 64];
        b[40] = i64::MAX;
        let err = binary(BinaryOp::Add, &a, &b, 1).unwrap_err();
        assert!(matches!(err, Error::IntegerOverflow { op: "add" }));
    }

    #[test]
    fn test_binary() {
        let out = binary(BinaryOp::Sub, &[5.0f64, 7.0], &[1.0, 2.0], PAR_THRESHOLD).unwrap();
        assert_eq!(out, vec![4.0, 5.0]);
        assert!(binary(BinaryOp::Add, &[1.0f64], &[1.0, 2.0], PAR_THRESHOLD).is_err());
    }

    #[test]
    fn test_scalar_side_order() {
        let t = [1.0f64, 2.0, 3.0];
        let right = binary_scalar(BinaryOp::Sub, &t, 5.0, Side::Right, PAR_THRESHOLD).unwrap();
        let left = binary_scalar(BinaryOp::Sub, &t, 5.0, Side::Left, PAR_THRESHOLD).unwrap();
        assert_eq!(right, vec![4.0, 3.0, 2.0]);
        assert_eq!(left, vec![-4.0, -3.0, -2.0]);

        let pow = binary_scalar(BinaryOp::Pow, &t, 2.0, Side::Right, PAR_THRESHOLD).unwrap();
        assert_eq!(pow, vec![2.0, 4.0, 8.0]);
    }

    #[test]
    fn test_integer_division_by_zero() {
        assert!(binary(BinaryOp::Div, &[1i64, 2], &[1, 0], PAR_THRESHOLD).is_err());
        assert!(binary_scalar(BinaryOp::Div, &[1i64, 2], 0, Side::Left, PAR_THRESHOLD).is_err());
        assert!(binary_scalar(BinaryOp::Div, &[1i64, 0], 4, Side::Right, PAR_THRESHOLD).is_err());
        // dividend zero is fine
        assert_eq!(
            binary_scalar(BinaryOp::Div, &[0i64, 6], 3, Side::Left, PAR_THRESHOLD).unwrap(),
            vec![0, 2]
        );
    }

    #[test]
    fn test_float_division_by_zero_is_inf() {
        let out = binary(BinaryOp::Div, &[1.0f32], &[0.0], PAR_THRESHOLD).unwrap();
        assert!(out[0].is_infinite());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let a: Vec<f64> = (0..1000).map(|v| v as f64).collect();
        let b: Vec<f64> = (0..1000).map(|v| (v % 13) as f64 + 1.0).collect();
        for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div] {
            let seq = binary(op, &a, &b, usize::MAX).unwrap();
            let par = binary(op, &a, &b, 1).unwrap();
            assert_eq!(seq, par, "{}", op.name());
        }
    }
}
