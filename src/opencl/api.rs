//! Граница между конвейером и реализацией OpenCL
//!
//! Конвейер умножения работает только через [`ComputeApi`]. Нативная
//! реализация вызывает драйвер через FFI, эмулятор исполняет известные
//! ядра на хосте.

use super::status::ClStatus;
use super::types::*;
use std::ffi::c_void;
use std::fmt;

/// Вид объекта OpenCL, которым владеет дескриптор
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Context,
    CommandQueue,
    Program,
    Kernel,
    Buffer,
    Event,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Context => "context",
            ResourceKind::CommandQueue => "command queue",
            ResourceKind::Program => "program",
            ResourceKind::Kernel => "kernel",
            ResourceKind::Buffer => "buffer",
            ResourceKind::Event => "event",
        };
        f.write_str(name)
    }
}

/// Значение аргумента ядра
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KernelArg {
    Buffer(cl_mem),
    Int(cl_int),
}

/// Набор вызовов OpenCL, нужных конвейеру умножения
///
/// Методы повторяют одноимённые функции OpenCL, но возвращают
/// `Result` вместо кода ошибки через out-параметр.
pub trait ComputeApi {
    /// Идентификаторы доступных платформ
    fn platform_ids(&self) -> Result<Vec<cl_platform_id>, ClStatus>;

    /// Все устройства платформы (`CL_DEVICE_TYPE_ALL`)
    fn device_ids(&self, platform: cl_platform_id) -> Result<Vec<cl_device_id>, ClStatus>;

    fn device_type(&self, device: cl_device_id) -> Result<cl_device_type, ClStatus>;

    fn device_name(&self, device: cl_device_id) -> Result<String, ClStatus>;

    fn create_context(&self, device: cl_device_id) -> Result<cl_context, ClStatus>;

    /// Очередь команд с порядком исполнения in-order
    fn create_command_queue(
        &self,
        context: cl_context,
        device: cl_device_id,
    ) -> Result<cl_command_queue, ClStatus>;

    fn create_program_with_source(
        &self,
        context: cl_context,
        source: &str,
    ) -> Result<cl_program, ClStatus>;

    fn build_program(&self, program: cl_program, device: cl_device_id) -> Result<(), ClStatus>;

    /// Лог компиляции, не длиннее `capacity` байт
    fn program_build_log(
        &self,
        program: cl_program,
        device: cl_device_id,
        capacity: usize,
    ) -> Result<String, ClStatus>;

    fn create_kernel(&self, program: cl_program, name: &str) -> Result<cl_kernel, ClStatus>;

    /// Буфер размером `size` байт; `host` копируется при создании
    fn create_buffer(
        &self,
        context: cl_context,
        flags: cl_mem_flags,
        size: usize,
        host: Option<&[f32]>,
    ) -> Result<cl_mem, ClStatus>;

    fn set_kernel_arg(&self, kernel: cl_kernel, index: cl_uint, value: KernelArg)
        -> Result<(), ClStatus>;

    /// Двумерный запуск ядра; возвращает событие завершения
    fn enqueue_nd_range_kernel(
        &self,
        queue: cl_command_queue,
        kernel: cl_kernel,
        global_work_size: [usize; 2],
        wait_list: &[cl_event],
    ) -> Result<cl_event, ClStatus>;

    /// Блокирующее чтение всего буфера в `out`
    fn enqueue_read_buffer(
        &self,
        queue: cl_command_queue,
        buffer: cl_mem,
        out: &mut [f32],
    ) -> Result<(), ClStatus>;

    fn release(&self, kind: ResourceKind, object: *mut c_void) -> ClStatus;
}
