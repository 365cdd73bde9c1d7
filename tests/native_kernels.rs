//! Встроенные ядра на настоящем драйвере OpenCL
//!
//! Собирается только с `--features opencl`. Без видеокарты тест завершается сразу.
#![cfg(feature = "opencl")]

use opencl_matmul::matrix::{CpuOperations, EmbeddedKernels, GpuOperations, GpuVariant, Matrix, Operations};
use opencl_matmul::opencl::{ComputeApi, NativeOpenCl};
use opencl_matmul::DispatchError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::Rc;

#[test]
fn embedded_kernels_match_reference() {
    let mut rng = StdRng::seed_from_u64(7);
    let cases = [
        (Matrix::random(1, 1, 20, &mut rng), Matrix::random(1, 1, 20, &mut rng)),
        (Matrix::random(1, 6, 20, &mut rng), Matrix::random(11, 1, 20, &mut rng)),
        (Matrix::random(13, 17, 20, &mut rng), Matrix::random(19, 13, 20, &mut rng)),
    ];

    for variant in GpuVariant::ALL {
        let api: Rc<dyn ComputeApi> = Rc::new(NativeOpenCl);
        let gpu = match GpuOperations::new(api, variant, &EmbeddedKernels) {
            Ok(gpu) => gpu,
            Err(DispatchError::NoGpuDeviceFound) => {
                eprintln!("no OpenCL GPU available, skipping");
                return;
            }
            Err(error) => panic!("variant {} failed to build: {}", variant, error),
        };
        for (lhs, rhs) in &cases {
            let expected = CpuOperations.multiply(lhs, rhs).unwrap();
            let actual = gpu.multiply(lhs, rhs).unwrap();
            assert_eq!(
                actual,
                expected,
                "variant {} on {} for {}x{}",
                variant,
                gpu.device_name(),
                lhs.width(),
                lhs.height()
            );
        }
    }
}
