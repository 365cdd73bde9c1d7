//! Прогон вариантов, замер времени и сверка с эталоном

use super::config::{Shape, TimingMode};
use super::report::{BenchmarkReport, Measurement, Outcome, ShapeRun};
use crate::error::DispatchError;
use crate::matrix::{
    compare_results, CpuOperations, GpuOperations, KernelSource, Matrix, MatrixType, Operations,
    Variant,
};
use crate::opencl::api::ComputeApi;
use crate::utils::{mean_duration, measure_time};
use indicatif::ProgressBar;
use rand::Rng;
use std::rc::Rc;
use std::time::Duration;

/// Создаёт реализацию умножения по имени варианта
pub trait OperationFactory {
    fn create(&self, variant: Variant) -> Result<Box<dyn Operations>, DispatchError>;
}

/// Эталон на CPU и GPU-варианты поверх заданного OpenCL
pub struct OpenClFactory {
    api: Rc<dyn ComputeApi>,
    kernels: Box<dyn KernelSource>,
}

impl OpenClFactory {
    pub fn new(api: Rc<dyn ComputeApi>, kernels: Box<dyn KernelSource>) -> Self {
        OpenClFactory { api, kernels }
    }
}

impl OperationFactory for OpenClFactory {
    fn create(&self, variant: Variant) -> Result<Box<dyn Operations>, DispatchError> {
        match variant {
            Variant::Reference => Ok(Box::new(CpuOperations)),
            Variant::Gpu(gpu) => {
                let operations = GpuOperations::new(self.api.clone(), gpu, &*self.kernels)?;
                Ok(Box::new(operations))
            }
        }
    }
}

pub struct Harness<F> {
    factory: F,
    timing: TimingMode,
    iterations: usize,
}

impl<F: OperationFactory> Harness<F> {
    pub fn new(factory: F, timing: TimingMode, iterations: usize) -> Self {
        Harness {
            factory,
            timing,
            iterations: iterations.max(1),
        }
    }

    /// Последний результат варианта и среднее время вызова
    fn measure(&self, variant: Variant, lhs: &Matrix, rhs: &Matrix) -> Result<(Matrix, Duration), DispatchError> {
        let (operations, construction) = measure_time(|| self.factory.create(variant));
        let operations = operations?;

        let mut total = match self.timing {
            TimingMode::CallOnly => Duration::ZERO,
            TimingMode::ConstructAndCall => construction,
        };

        let (result, elapsed) = measure_time(|| operations.multiply(lhs, rhs));
        let mut result = result?;
        total += elapsed;
        for _ in 1..self.iterations {
            let (next, elapsed) = measure_time(|| operations.multiply(lhs, rhs));
            result = next?;
            total += elapsed;
        }

        Ok((result, mean_duration(total, self.iterations)))
    }

    /// Прогоняет эталон и все варианты на одной паре матриц
    ///
    /// Ошибка эталона прерывает прогон; ошибка варианта записывается
    /// в отчёт, и остальные варианты продолжают работу.
    pub fn run_inputs(&self, lhs: &Matrix, rhs: &Matrix, variants: &[Variant]) -> Result<ShapeRun, DispatchError> {
        let (expected, reference_time) = self.measure(Variant::Reference, lhs, rhs)?;
        log::debug!("Reference finished in {:?}", reference_time);

        let entries = variants
            .iter()
            .map(|&variant| match self.measure(variant, lhs, rhs) {
                Ok((actual, elapsed)) => {
                    let outcome = match compare_results(&expected, &actual) {
                        None => Outcome::Matched,
                        Some(mismatch) => {
                            log::warn!(
                                "Variant {} differs from reference in {} elements",
                                variant,
                                mismatch.differing_elements
                            );
                            Outcome::Mismatched(mismatch)
                        }
                    };
                    Measurement {
                        variant,
                        seconds: Some(elapsed.as_secs_f64()),
                        outcome,
                    }
                }
                Err(error) => {
                    log::warn!("Skipping variant {}: {}", variant, error);
                    Measurement {
                        variant,
                        seconds: None,
                        outcome: Outcome::Failed(error),
                    }
                }
            })
            .collect();

        Ok(ShapeRun {
            lhs: Shape::new(lhs.width(), lhs.height()),
            rhs: Shape::new(rhs.width(), rhs.height()),
            reference_seconds: reference_time.as_secs_f64(),
            entries,
        })
    }

    /// Для каждой формы строит левый операнд из `input`, правый получает транспонированием
    pub fn run<R: Rng + ?Sized>(
        &self,
        shapes: &[Shape],
        input: MatrixType,
        variants: &[Variant],
        rng: &mut R,
        progress: &ProgressBar,
    ) -> Result<BenchmarkReport, DispatchError> {
        let mut report = BenchmarkReport::new(self.timing, self.iterations);
        for shape in shapes {
            progress.set_message(format!("{}x{}", shape.width, shape.height));
            let lhs = input.build(shape.width, shape.height, rng);
            let rhs = lhs.transpose();
            report.push(self.run_inputs(&lhs, &rhs, variants)?);
            progress.inc(1);
        }
        progress.finish_and_clear();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::GpuVariant;
    use std::cell::Cell;

    /// Фабрика, считающая созданные реализации
    struct CountingFactory {
        created: Cell<usize>,
    }

    struct Doubling;

    impl Operations for Doubling {
        fn name(&self) -> &str {
            "doubling"
        }

        fn multiply(&self, lhs: &Matrix, rhs: &Matrix) -> Result<Matrix, DispatchError> {
            let product = CpuOperations.multiply(lhs, rhs)?;
            let doubled = product.as_slice().iter().map(|v| v * 2.0).collect();
            Ok(Matrix::from_elements(product.width(), product.height(), doubled))
        }
    }

    impl OperationFactory for CountingFactory {
        fn create(&self, variant: Variant) -> Result<Box<dyn Operations>, DispatchError> {
            self.created.set(self.created.get() + 1);
            match variant {
                Variant::Reference | Variant::Gpu(GpuVariant::Naive) => Ok(Box::new(CpuOperations)),
                Variant::Gpu(GpuVariant::Dot) => Ok(Box::new(Doubling)),
                Variant::Gpu(_) => Err(DispatchError::NoGpuDeviceFound),
            }
        }
    }

    fn harness(iterations: usize) -> Harness<CountingFactory> {
        Harness::new(CountingFactory { created: Cell::new(0) }, TimingMode::CallOnly, iterations)
    }

    #[test]
    fn records_each_outcome() {
        let harness = harness(3);
        let lhs = Matrix::filled(3, 2, 1.0);
        let rhs = lhs.transpose();
        let variants = [
            Variant::Gpu(GpuVariant::Naive),
            Variant::Gpu(GpuVariant::Dot),
            Variant::Gpu(GpuVariant::Transposed),
        ];
        let run = harness.run_inputs(&lhs, &rhs, &variants).unwrap();

        assert_eq!(run.lhs, Shape::new(3, 2));
        assert_eq!(run.rhs, Shape::new(2, 3));
        assert!(matches!(run.entries[0].outcome, Outcome::Matched));
        assert!(matches!(run.entries[1].outcome, Outcome::Mismatched(_)));
        assert!(matches!(run.entries[2].outcome, Outcome::Failed(DispatchError::NoGpuDeviceFound)));
        assert!(run.entries[2].seconds.is_none());
        // одна реализация на вариант, независимо от числа итераций
        assert_eq!(harness.factory.created.get(), 4);
    }

    #[test]
    fn reference_failure_aborts() {
        let harness = harness(1);
        let result = harness.run_inputs(&Matrix::new(3, 2), &Matrix::new(3, 2), &Variant::all_gpu());
        assert!(matches!(result, Err(DispatchError::ShapeMismatch { .. })));
    }

    #[test]
    fn zero_iterations_run_once() {
        let harness = harness(0);
        let lhs = Matrix::filled(1, 1, 3.0);
        let run = harness.run_inputs(&lhs, &lhs, &[Variant::Reference]).unwrap();
        assert!(matches!(run.entries[0].outcome, Outcome::Matched));
    }
}
