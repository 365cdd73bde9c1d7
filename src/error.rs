//! Ошибки конвейера умножения

use crate::opencl::status::ClStatus;

/// Ошибка при создании GPU-операции или во время умножения
///
/// Ошибки настройки ([`DispatchError::is_setup`]) делают вариант
/// непригодным; ошибки запуска прерывают только текущий вызов.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no GPU device found on the first OpenCL platform")]
    NoGpuDeviceFound,

    #[error("failed to create OpenCL context: {status}")]
    ContextCreationFailed { status: ClStatus },

    #[error("failed to create command queue: {status}")]
    QueueCreationFailed { status: ClStatus },

    #[error("kernel source '{name}' is unavailable: {reason}")]
    KernelSourceUnavailable { name: String, reason: String },

    #[error("failed to build program '{name}': {status}\n{diagnostic}")]
    ProgramBuildFailed { name: String, status: ClStatus, diagnostic: String },

    #[error("failed to create kernel '{entry_point}': {status}")]
    KernelCreationFailed { entry_point: String, status: ClStatus },

    #[error("failed to allocate {bytes}-byte device buffer: {status}")]
    BufferCreationFailed { bytes: usize, status: ClStatus },

    #[error("failed to bind argument {argument_index} of kernel '{entry_point}': {status}")]
    ArgumentBindFailed { entry_point: String, argument_index: u32, status: ClStatus },

    #[error("failed to dispatch kernel '{entry_point}': {status}")]
    DispatchFailed { entry_point: String, status: ClStatus },

    #[error("failed to read back result buffer: {status}")]
    ReadbackFailed { status: ClStatus },

    #[error("cannot multiply a matrix with {lhs_width} columns by a matrix with {rhs_height} rows")]
    ShapeMismatch { lhs_width: usize, rhs_height: usize },
}

impl DispatchError {
    /// Ошибка возникла при создании варианта, а не при вызове `multiply`
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            DispatchError::NoGpuDeviceFound
                | DispatchError::ContextCreationFailed { .. }
                | DispatchError::QueueCreationFailed { .. }
                | DispatchError::KernelSourceUnavailable { .. }
                | DispatchError::ProgramBuildFailed { .. }
                | DispatchError::KernelCreationFailed { .. }
        )
    }

    /// Короткое имя вида ошибки для отчётов
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::NoGpuDeviceFound => "NoGpuDeviceFound",
            DispatchError::ContextCreationFailed { .. } => "ContextCreationFailed",
            DispatchError::QueueCreationFailed { .. } => "QueueCreationFailed",
            DispatchError::KernelSourceUnavailable { .. } => "KernelSourceUnavailable",
            DispatchError::ProgramBuildFailed { .. } => "ProgramBuildFailed",
            DispatchError::KernelCreationFailed { .. } => "KernelCreationFailed",
            DispatchError::BufferCreationFailed { .. } => "BufferCreationFailed",
            DispatchError::ArgumentBindFailed { .. } => "ArgumentBindFailed",
            DispatchError::DispatchFailed { .. } => "DispatchFailed",
            DispatchError::ReadbackFailed { .. } => "ReadbackFailed",
            DispatchError::ShapeMismatch { .. } => "ShapeMismatch",
        }
    }
}
