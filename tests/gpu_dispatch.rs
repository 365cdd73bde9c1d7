//! GPU-конвейер поверх эмулятора: результаты, ошибки и освобождение ресурсов

use opencl_matmul::matrix::{
    CpuOperations, EmbeddedKernels, GpuOperations, GpuVariant, KernelSource, Matrix, Operations,
};
use opencl_matmul::opencl::emulator::{EmulatedDevice, EmulatedOpenCl, FailurePoint};
use opencl_matmul::opencl::{ComputeApi, ResourceKind};
use opencl_matmul::DispatchError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::Rc;

fn emulated(emulator: EmulatedOpenCl) -> (Rc<EmulatedOpenCl>, Rc<dyn ComputeApi>) {
    let emulator = Rc::new(emulator);
    let api: Rc<dyn ComputeApi> = emulator.clone();
    (emulator, api)
}

struct BrokenKernels(&'static str);

impl KernelSource for BrokenKernels {
    fn source(&self, _name: &str) -> Result<String, DispatchError> {
        Ok(self.0.to_string())
    }
}

#[test]
fn every_variant_matches_reference() {
    let mut rng = StdRng::seed_from_u64(2024);
    let cases = [
        (Matrix::random(1, 1, 20, &mut rng), Matrix::random(1, 1, 20, &mut rng)),
        (Matrix::random(1, 6, 20, &mut rng), Matrix::random(11, 1, 20, &mut rng)),
        (Matrix::random(13, 17, 20, &mut rng), Matrix::random(19, 13, 20, &mut rng)),
        (Matrix::filled(8, 3, 2.0), Matrix::filled(4, 8, 3.0)),
    ];

    for variant in GpuVariant::ALL {
        let (emulator, api) = emulated(EmulatedOpenCl::with_gpu());
        let gpu = GpuOperations::new(api, variant, &EmbeddedKernels).unwrap();
        for (lhs, rhs) in &cases {
            let expected = CpuOperations.multiply(lhs, rhs).unwrap();
            let actual = gpu.multiply(lhs, rhs).unwrap();
            assert_eq!(actual, expected, "variant {} on {}x{}", variant, lhs.width(), lhs.height());
            assert_eq!((actual.width(), actual.height()), (rhs.width(), lhs.height()));
        }
        drop(gpu);
        assert_eq!(emulator.live_objects(), 0, "variant {} leaked objects", variant);
        assert_eq!(emulator.invalid_releases(), 0);
    }
}

#[test]
fn no_gpu_leaves_nothing_alive() {
    for emulator in [
        EmulatedOpenCl::with_devices(vec![EmulatedDevice::cpu("Only CPU")]),
        EmulatedOpenCl::without_platform(),
    ] {
        let (emulator, api) = emulated(emulator);
        let error = GpuOperations::new(api, GpuVariant::Naive, &EmbeddedKernels).err();
        assert!(matches!(error, Some(DispatchError::NoGpuDeviceFound)));
        assert_eq!(emulator.live_objects(), 0);
    }
}

#[test]
fn malformed_source_reports_build_log() {
    let (emulator, api) = emulated(EmulatedOpenCl::with_gpu());
    let kernels = BrokenKernels("__kernel void matrix_mul(__global float* lhs) {\n    float x = 0;\n");
    match GpuOperations::new(api, GpuVariant::Naive, &kernels).err() {
        Some(DispatchError::ProgramBuildFailed { name, diagnostic, .. }) => {
            assert_eq!(name, "naive");
            assert!(!diagnostic.trim().is_empty());
            assert!(diagnostic.contains("expected '}'"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(emulator.created(ResourceKind::Kernel), 0);
    assert_eq!(emulator.created(ResourceKind::Buffer), 0);
    assert_eq!(emulator.live_objects(), 0);
}

#[test]
fn setup_failures_release_earlier_handles() {
    let cases = [
        (FailurePoint::CreateContext, "ContextCreationFailed"),
        (FailurePoint::CreateQueue, "QueueCreationFailed"),
        (FailurePoint::CreateProgram, "ProgramBuildFailed"),
    ];
    for (point, kind) in cases {
        let (emulator, api) = emulated(EmulatedOpenCl::with_gpu());
        emulator.fail_at(point);
        let error = GpuOperations::new(api, GpuVariant::Transposed, &EmbeddedKernels)
            .err()
            .unwrap();
        assert_eq!(error.kind(), kind);
        assert!(error.is_setup());
        assert_eq!(emulator.live_objects(), 0, "{:?} leaked objects", point);
    }
}

#[test]
fn per_call_failures_keep_only_instance_objects() {
    let cases = [
        (FailurePoint::CreateKernel, "KernelCreationFailed"),
        (FailurePoint::CreateBuffer, "BufferCreationFailed"),
        (FailurePoint::SetKernelArg { index: 3 }, "ArgumentBindFailed"),
        (FailurePoint::Enqueue, "DispatchFailed"),
        (FailurePoint::ReadBuffer, "ReadbackFailed"),
    ];
    let lhs = Matrix::filled(4, 2, 1.0);
    let rhs = Matrix::filled(3, 4, 1.0);

    for variant in [GpuVariant::Naive, GpuVariant::Transposed] {
        for (point, kind) in cases {
            let (emulator, api) = emulated(EmulatedOpenCl::with_gpu());
            let gpu = GpuOperations::new(api, variant, &EmbeddedKernels).unwrap();
            emulator.fail_at(point);

            let error = gpu.multiply(&lhs, &rhs).unwrap_err();
            assert_eq!(error.kind(), kind, "{} at {:?}", variant, point);
            assert_eq!(emulator.live_objects(), 3, "{} at {:?}", variant, point);
            assert_eq!(emulator.live(ResourceKind::Program), 1);

            // ошибка вызова не портит экземпляр
            emulator.clear_failures();
            assert_eq!(gpu.multiply(&lhs, &rhs).unwrap(), Matrix::filled(3, 2, 4.0));

            drop(gpu);
            assert_eq!(emulator.live_objects(), 0);
            assert_eq!(emulator.invalid_releases(), 0);
        }
    }
}

#[test]
fn bind_failure_names_argument() {
    let (emulator, api) = emulated(EmulatedOpenCl::with_gpu());
    let gpu = GpuOperations::new(api, GpuVariant::Dot, &EmbeddedKernels).unwrap();
    emulator.fail_at(FailurePoint::SetKernelArg { index: 4 });
    match gpu.multiply(&Matrix::filled(2, 2, 1.0), &Matrix::filled(2, 2, 1.0)) {
        Err(DispatchError::ArgumentBindFailed { entry_point, argument_index, .. }) => {
            assert_eq!(entry_point, "matrix_mul");
            assert_eq!(argument_index, 4);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn transposed_plan_chains_two_launches() {
    let (emulator, api) = emulated(EmulatedOpenCl::with_gpu());
    let gpu = GpuOperations::new(api, GpuVariant::Transposed, &EmbeddedKernels).unwrap();
    let lhs = Matrix::filled(3, 2, 1.0);
    let rhs = Matrix::filled(5, 3, 2.0);
    gpu.multiply(&lhs, &rhs).unwrap();

    let launches = emulator.launches();
    assert_eq!(launches.len(), 2);
    assert_eq!(launches[0].entry_point, "matrix_transpose");
    assert_eq!(launches[0].global_work_size, [5, 3]);
    assert!(launches[0].scalar_args.is_empty());
    assert!(launches[0].wait_list.is_empty());

    assert_eq!(launches[1].entry_point, "matrix_mul");
    assert_eq!(launches[1].global_work_size, [5, 2]);
    assert_eq!(launches[1].wait_list, vec![launches[0].event]);

    // события освобождены вместе с остальными объектами вызова
    assert_eq!(emulator.live(ResourceKind::Event), 0);
    assert_eq!(emulator.live_objects(), 3);
}

#[test]
fn dimension_arguments_follow_operands() {
    for variant in GpuVariant::ALL {
        let (emulator, api) = emulated(EmulatedOpenCl::with_gpu());
        let gpu = GpuOperations::new(api, variant, &EmbeddedKernels).unwrap();
        gpu.multiply(&Matrix::filled(3, 2, 1.0), &Matrix::filled(5, 3, 1.0)).unwrap();

        let launches = emulator.launches();
        let multiply = launches.last().unwrap();
        assert_eq!(multiply.entry_point, "matrix_mul");
        assert_eq!(multiply.scalar_args, vec![3, 5], "variant {}", variant);
        assert_eq!(multiply.global_work_size, [5, 2]);
    }
}

#[test]
fn program_built_once_across_calls() {
    let (emulator, api) = emulated(EmulatedOpenCl::with_gpu());
    let gpu = GpuOperations::new(api, GpuVariant::Transposed, &EmbeddedKernels).unwrap();
    let matrix = Matrix::filled(2, 2, 1.0);
    for _ in 0..4 {
        gpu.multiply(&matrix, &matrix).unwrap();
    }
    assert_eq!(emulator.created(ResourceKind::Program), 1);
    assert_eq!(emulator.created(ResourceKind::Kernel), 8);
    assert_eq!(emulator.created(ResourceKind::Buffer), 16);
    assert!(emulator.last_program_source().unwrap().contains("matrix_transpose"));
}
