//! Property-based tests for the CPU elementwise kernels.

use proptest::prelude::*;
use vole_core::{arith, FuncOpts, Tensor};
use vole_cpu::CpuEngine;

fn pair() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (1usize..64).prop_flat_map(|n| {
        (
            prop::collection::vec(-1e6f64..1e6, n),
            prop::collection::vec(-1e6f64..1e6, n),
        )
    })
}

fn cpu(data: Vec<f64>) -> Tensor {
    let n = data.len();
    CpuEngine::from_vec(data, n).unwrap()
}

proptest! {
    #[test]
    fn prop_add_then_sub_restores((a, b) in pair()) {
        let (ta, tb) = (cpu(a.clone()), cpu(b));
        let opts = FuncOpts::new();
        let back = arith::sub(&arith::add(&ta, &tb, &opts).unwrap(), &tb, &opts).unwrap();
        for (x, y) in back.to_vec::<f64>().unwrap().iter().zip(&a) {
            prop_assert!((x - y).abs() <= 1e-9 * y.abs().max(1.0), "{} vs {}", x, y);
        }
    }

    /// `s - t` and `t - s` are negations of each other.
    #[test]
    fn prop_scalar_sub_is_antisymmetric((a, _) in pair(), s in -1e3f64..1e3) {
        let t = cpu(a);
        let opts = FuncOpts::new();
        let right = arith::sub(s, &t, &opts).unwrap().to_vec::<f64>().unwrap();
        let left = arith::sub(&t, s, &opts).unwrap().to_vec::<f64>().unwrap();
        for (r, l) in right.iter().zip(&left) {
            prop_assert_eq!(*r, -*l);
        }
    }

    /// Integer add/sub round trips exactly.
    #[test]
    fn prop_integer_roundtrip(a in prop::collection::vec(-1_000_000i64..1_000_000, 1..32), k in -1000i64..1000) {
        let n = a.len();
        let t = CpuEngine::from_vec(a.clone(), n).unwrap();
        let opts = FuncOpts::new();
        let back = arith::sub(&arith::add(&t, k, &opts).unwrap(), k, &opts).unwrap();
        prop_assert_eq!(back.to_vec::<i64>().unwrap(), a);
    }
}
