//! OpenCL-accelerated matrix multiplication benchmark

pub mod benchmark;
pub mod error;
pub mod matrix;
pub mod opencl;
pub mod utils;

// Реэкспортируем макросы на уровень крейта
#[macro_use]
mod macros {
    /// Макрос для обработки кодов возврата OpenCL
    ///
    /// Выполняет вызов в `unsafe` и превращает код в `Result<(), ClStatus>`.
    #[macro_export]
    macro_rules! cl_check {
        ($expr:expr) => {{
            let code = unsafe { $expr };
            $crate::opencl::status::ClStatus::check(code)
        }};
    }
}

// Реэкспорт основных типов для удобства
pub use error::DispatchError;
pub use matrix::{CpuOperations, GpuOperations, GpuVariant, Matrix, MatrixType, Operations, Variant};
