// Elementwise dispatch - Add, Sub, Mul, Div, Pow
//
// Each entry point accepts any mix of tensor and scalar operands:
//
//   add(&a, &b, &opts)   tensor + tensor   dtypes and shapes must match exactly
//   add(&a, 2.0, &opts)  tensor + scalar   Side::Left
//   add(2.0, &a, &opts)  scalar + tensor   Side::Right
//
// For two tensors the capability is looked up on a's engine first and on b's
// engine second. With one tensor only that tensor's engine is consulted.
// There is no fallback beyond that: an engine that lacks the capability
// fails the call with `CapabilityUnsupported`.
//
// With `FuncOpts::in_place` the first tensor operand (the only tensor in
// the mixed case, whichever side it is on) is overwritten and the returned
// tensor aliases it.

use crate::engine::Capability;
use crate::error::{Error, Result};
use crate::operand::{Operand, Roles};
use crate::options::FuncOpts;
use crate::tensor::Tensor;
use crate::validate;

fn unsupported(engines: &[&Tensor], capability: Capability) -> Error {
    let mut names: Vec<&str> = engines.iter().map(|t| t.engine().name()).collect();
    names.dedup();
    Error::CapabilityUnsupported {
        engine: names.join(", "),
        capability,
    }
}

macro_rules! elementwise_entry {
    ($(#[$doc:meta])* $name:ident, $scalar_name:ident, $probe:ident, $cap:expr) => {
        $(#[$doc])*
        pub fn $name<'a>(
            a: impl Into<Operand<'a>>,
            b: impl Into<Operand<'a>>,
            opts: &FuncOpts,
        ) -> Result<Tensor> {
            opts.validate()?;
            match Roles::resolve(a.into(), b.into())? {
                Roles::Tensors(a, b) => {
                    validate::same_dtype(a, b)?;
                    validate::same_shape(a, b)?;
                    let cap = a
                        .engine()
                        .$probe()
                        .or_else(|| b.engine().$probe())
                        .ok_or_else(|| unsupported(&[a, b], $cap))?;
                    tracing::trace!(
                        op = stringify!($name),
                        shape = %a.shape(),
                        dtype = %a.dtype(),
                        in_place = opts.is_in_place(),
                        "dispatching tensor-tensor op"
                    );
                    cap.$name(a, b, opts)
                }
                Roles::Mixed { tensor, scalar, side } => {
                    validate::scalar_dtype(tensor, &scalar)?;
                    let cap = tensor
                        .engine()
                        .$probe()
                        .ok_or_else(|| unsupported(&[tensor], $cap))?;
                    tracing::trace!(
                        op = stringify!($scalar_name),
                        engine = tensor.engine().name(),
                        side = ?side,
                        in_place = opts.is_in_place(),
                        "dispatching tensor-scalar op"
                    );
                    cap.$scalar_name(tensor, scalar, side, opts)
                }
            }
        }
    };
}

elementwise_entry!(
    /// Elementwise `a + b`.
    add, add_scalar, adder, Capability::Add
);
elementwise_entry!(
    /// Elementwise `a - b`. Operand order is preserved: `sub(5.0, &t)` is
    /// `5 - t`, `sub(&t, 5.0)` is `t - 5`.
    sub, sub_scalar, suber, Capability::Sub
);
elementwise_entry!(
    /// Elementwise `a * b`.
    mul, mul_scalar, muler, Capability::Mul
);
elementwise_entry!(
    /// Elementwise `a / b`. Integer division by zero is an error.
    div, div_scalar, diver, Capability::Div
);
elementwise_entry!(
    /// Elementwise `a ^ b`.
    pow, pow_scalar, power, Capability::Pow
);
