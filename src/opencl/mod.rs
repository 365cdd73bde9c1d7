//! Модуль для работы с OpenCL
//!
//! Содержит низкоуровневые привязки, безопасные дескрипторы объектов
//! и программный эмулятор для запуска без видеокарты

pub mod api;
#[cfg(feature = "opencl")]
pub mod bindings;
pub mod callbacks;
pub mod device;
pub mod emulator;
pub mod handle;
#[cfg(feature = "opencl")]
pub mod native;
pub mod status;
pub mod types;
pub mod utils;

pub use api::{ComputeApi, KernelArg, ResourceKind};
pub use device::{enumerate_first_platform, select_gpu_device, DeviceDescriptor};
pub use emulator::EmulatedOpenCl;
#[cfg(feature = "opencl")]
pub use native::NativeOpenCl;
pub use status::ClStatus;
