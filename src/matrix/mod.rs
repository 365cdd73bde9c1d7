//! Модуль для работы с матрицами
//!
//! Предоставляет:
//! - Типы матриц
//! - Операции над матрицами
//! - GPU-ускоренные реализации

mod types;
pub mod gpu;
pub mod kernels;
pub mod operations;
pub mod variant;

pub use gpu::GpuOperations;
pub use kernels::{EmbeddedKernels, KernelDirectory, KernelSource};
pub use operations::{compare_results, CpuOperations, Mismatch, Operations};
pub use types::{Matrix, MatrixType};
pub use variant::{DispatchPlan, GpuVariant, Variant};
