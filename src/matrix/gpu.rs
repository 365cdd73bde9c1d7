//! GPU-ускоренные реализации умножения
//!
//! Контекст, очередь и собранная программа создаются один раз при
//! конструировании и живут вместе с объектом. Ядра и буферы создаются
//! заново в каждом вызове `multiply` и освобождаются при выходе из него,
//! в том числе по ошибке.

use super::kernels::KernelSource;
use super::operations::{check_shapes, Operations};
use super::types::Matrix;
use super::variant::{DispatchPlan, GpuVariant, MULTIPLY_ENTRY, TRANSPOSE_ENTRY};
use crate::error::DispatchError;
use crate::opencl::api::{ComputeApi, KernelArg};
use crate::opencl::device::{enumerate_first_platform, select_gpu_device};
use crate::opencl::handle::{
    BufferHandle, ContextHandle, EventHandle, KernelHandle, ProgramHandle, QueueHandle,
};
use crate::opencl::status::ClStatus;
use crate::opencl::types::*;
use std::rc::Rc;

/// Максимальный размер лога компиляции в ошибке сборки
pub const BUILD_LOG_CAPACITY: usize = 2048;

/// Умножение на видеокарте по плану запуска варианта
pub struct GpuOperations {
    variant: GpuVariant,
    device_name: String,
    // Порядок полей задаёт порядок освобождения: программа, очередь, контекст
    program: ProgramHandle,
    queue: QueueHandle,
    context: ContextHandle,
    api: Rc<dyn ComputeApi>,
}

impl GpuOperations {
    /// Выбирает видеокарту, создаёт контекст и очередь, собирает программу варианта
    pub fn new(
        api: Rc<dyn ComputeApi>,
        variant: GpuVariant,
        kernels: &dyn KernelSource,
    ) -> Result<Self, DispatchError> {
        let devices = enumerate_first_platform(&*api)?;
        let selected = select_gpu_device(&devices)?;
        let device = selected.id;
        log::debug!("Selected GPU device: {}", selected.name);

        let context = api
            .create_context(device)
            .map(|raw| ContextHandle::wrap(&api, raw))
            .map_err(|status| DispatchError::ContextCreationFailed { status })?;

        let queue = api
            .create_command_queue(context.get(), device)
            .map(|raw| QueueHandle::wrap(&api, raw))
            .map_err(|status| DispatchError::QueueCreationFailed { status })?;

        let name = variant.kernel_source_name();
        let source = kernels.source(name)?;
        let program = build_program(&api, &context, device, name, &source)?;

        log::info!("Prepared {} multiply on {}", variant, selected.name);
        Ok(GpuOperations {
            variant,
            device_name: selected.name.clone(),
            program,
            queue,
            context,
            api,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    fn create_kernel(&self, entry_point: &str) -> Result<KernelHandle, DispatchError> {
        self.api
            .create_kernel(self.program.get(), entry_point)
            .map(|raw| KernelHandle::wrap(&self.api, raw))
            .map_err(|status| DispatchError::KernelCreationFailed {
                entry_point: entry_point.to_string(),
                status,
            })
    }

    /// Буфер с копией данных хоста
    fn upload(&self, data: &[f32]) -> Result<BufferHandle, DispatchError> {
        let bytes = std::mem::size_of_val(data);
        self.api
            .create_buffer(
                self.context.get(),
                CL_MEM_READ_WRITE | CL_MEM_COPY_HOST_PTR,
                bytes,
                Some(data),
            )
            .map(|raw| BufferHandle::wrap(&self.api, raw))
            .map_err(|status| DispatchError::BufferCreationFailed { bytes, status })
    }

    /// Неинициализированный буфер на `elements` значений
    fn allocate(&self, elements: usize) -> Result<BufferHandle, DispatchError> {
        let bytes = elements * std::mem::size_of::<f32>();
        self.api
            .create_buffer(self.context.get(), CL_MEM_READ_WRITE, bytes, None)
            .map(|raw| BufferHandle::wrap(&self.api, raw))
            .map_err(|status| DispatchError::BufferCreationFailed { bytes, status })
    }

    /// Привязывает сначала буферы, затем целочисленные размеры
    fn bind_arguments(
        &self,
        kernel: &KernelHandle,
        entry_point: &str,
        buffers: &[&BufferHandle],
        scalars: &[usize],
    ) -> Result<(), DispatchError> {
        let bind_failed = |index: usize, status: ClStatus| DispatchError::ArgumentBindFailed {
            entry_point: entry_point.to_string(),
            argument_index: index as u32,
            status,
        };

        let values = buffers
            .iter()
            .map(|buffer| Ok(KernelArg::Buffer(buffer.get())))
            .chain(scalars.iter().map(|&scalar| {
                cl_int::try_from(scalar)
                    .map(KernelArg::Int)
                    .map_err(|_| ClStatus(CL_INVALID_ARG_VALUE))
            }));

        for (index, value) in values.enumerate() {
            let value = value.map_err(|status| bind_failed(index, status))?;
            self.api
                .set_kernel_arg(kernel.get(), index as cl_uint, value)
                .map_err(|status| bind_failed(index, status))?;
        }
        Ok(())
    }

    fn launch(
        &self,
        kernel: &KernelHandle,
        entry_point: &str,
        global_work_size: [usize; 2],
        wait_for: Option<&EventHandle>,
    ) -> Result<EventHandle, DispatchError> {
        let wait_list: Vec<cl_event> = wait_for.map(|event| event.get()).into_iter().collect();
        log::debug!(
            "Launching {} over {}x{} (waits on {} events)",
            entry_point,
            global_work_size[0],
            global_work_size[1],
            wait_list.len()
        );
        self.api
            .enqueue_nd_range_kernel(self.queue.get(), kernel.get(), global_work_size, &wait_list)
            .map(|raw| EventHandle::wrap(&self.api, raw))
            .map_err(|status| DispatchError::DispatchFailed {
                entry_point: entry_point.to_string(),
                status,
            })
    }
}

/// Создаёт и собирает программу; при ошибке сборки забирает лог компилятора
fn build_program(
    api: &Rc<dyn ComputeApi>,
    context: &ContextHandle,
    device: cl_device_id,
    name: &str,
    source: &str,
) -> Result<ProgramHandle, DispatchError> {
    let program = api
        .create_program_with_source(context.get(), source)
        .map(|raw| ProgramHandle::wrap(api, raw))
        .map_err(|status| DispatchError::ProgramBuildFailed {
            name: name.to_string(),
            status,
            diagnostic: format!("program object creation failed: {}", status),
        })?;

    if let Err(status) = api.build_program(program.get(), device) {
        let log = api
            .program_build_log(program.get(), device, BUILD_LOG_CAPACITY)
            .unwrap_or_default();
        let diagnostic = if log.trim().is_empty() {
            format!("compiler returned {} without a build log", status)
        } else {
            log
        };
        log::debug!("Build log for '{}':\n{}", name, diagnostic);
        return Err(DispatchError::ProgramBuildFailed {
            name: name.to_string(),
            status,
            diagnostic,
        });
    }

    log::debug!("Built program '{}'", name);
    Ok(program)
}

impl Operations for GpuOperations {
    fn name(&self) -> &str {
        self.variant.kernel_source_name()
    }

    fn multiply(&self, lhs: &Matrix, rhs: &Matrix) -> Result<Matrix, DispatchError> {
        check_shapes(lhs, rhs)?;

        let width = rhs.width();
        let height = lhs.height();
        // Общая размерность и ширина результата, одинаково для всех планов
        let dimensions = [lhs.width(), rhs.width()];

        let plan = self.variant.dispatch_plan();
        let multiply_kernel = self.create_kernel(MULTIPLY_ENTRY)?;
        let transpose_kernel = match plan {
            DispatchPlan::TransposeRhs => Some(self.create_kernel(TRANSPOSE_ENTRY)?),
            DispatchPlan::Single => None,
        };

        let lhs_buffer = self.upload(lhs.as_slice())?;
        let rhs_buffer = self.upload(rhs.as_slice())?;
        let out_buffer = self.allocate(width * height)?;

        let _done = match transpose_kernel {
            None => {
                self.bind_arguments(
                    &multiply_kernel,
                    MULTIPLY_ENTRY,
                    &[&lhs_buffer, &rhs_buffer, &out_buffer],
                    &dimensions,
                )?;
                self.launch(&multiply_kernel, MULTIPLY_ENTRY, [width, height], None)?
            }
            Some(transpose_kernel) => {
                let transposed_buffer = self.allocate(rhs.len())?;
                self.bind_arguments(
                    &transpose_kernel,
                    TRANSPOSE_ENTRY,
                    &[&rhs_buffer, &transposed_buffer],
                    &[],
                )?;
                let transposed = self.launch(
                    &transpose_kernel,
                    TRANSPOSE_ENTRY,
                    [rhs.width(), rhs.height()],
                    None,
                )?;

                self.bind_arguments(
                    &multiply_kernel,
                    MULTIPLY_ENTRY,
                    &[&lhs_buffer, &transposed_buffer, &out_buffer],
                    &dimensions,
                )?;
                self.launch(&multiply_kernel, MULTIPLY_ENTRY, [width, height], Some(&transposed))?
            }
        };

        let mut data = vec![0.0f32; width * height];
        self.api
            .enqueue_read_buffer(self.queue.get(), out_buffer.get(), &mut data)
            .map_err(|status| DispatchError::ReadbackFailed { status })?;

        Ok(Matrix::from_elements(width, height, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::kernels::EmbeddedKernels;
    use crate::opencl::api::ResourceKind;
    use crate::opencl::emulator::EmulatedOpenCl;

    fn emulated() -> (Rc<EmulatedOpenCl>, Rc<dyn ComputeApi>) {
        let emulator = Rc::new(EmulatedOpenCl::with_gpu());
        let api: Rc<dyn ComputeApi> = emulator.clone();
        (emulator, api)
    }

    #[test]
    fn instance_resources_live_until_drop() {
        let (emulator, api) = emulated();
        let gpu = GpuOperations::new(api, GpuVariant::Naive, &EmbeddedKernels).unwrap();
        assert_eq!(gpu.device_name(), "Emulated GPU");
        assert_eq!(emulator.live(ResourceKind::Context), 1);
        assert_eq!(emulator.live(ResourceKind::CommandQueue), 1);
        assert_eq!(emulator.live(ResourceKind::Program), 1);

        let lhs = Matrix::filled(4, 3, 2.0);
        let rhs = Matrix::filled(5, 4, 3.0);
        let result = gpu.multiply(&lhs, &rhs).unwrap();
        assert_eq!(result, Matrix::filled(5, 3, 24.0));
        assert_eq!(emulator.live_objects(), 3);

        drop(gpu);
        assert_eq!(emulator.live_objects(), 0);
        assert_eq!(emulator.invalid_releases(), 0);
    }

    #[test]
    fn program_is_built_once_per_instance() {
        let (emulator, api) = emulated();
        let gpu = GpuOperations::new(api, GpuVariant::Dot, &EmbeddedKernels).unwrap();
        let lhs = Matrix::filled(2, 2, 1.0);
        for _ in 0..3 {
            gpu.multiply(&lhs, &lhs).unwrap();
        }
        assert_eq!(emulator.created(ResourceKind::Program), 1);
        assert_eq!(emulator.created(ResourceKind::Kernel), 3);
    }

    #[test]
    fn shape_mismatch_creates_nothing() {
        let (emulator, api) = emulated();
        let gpu = GpuOperations::new(api, GpuVariant::Naive, &EmbeddedKernels).unwrap();
        let result = gpu.multiply(&Matrix::new(3, 2), &Matrix::new(3, 2));
        assert!(matches!(result, Err(DispatchError::ShapeMismatch { .. })));
        assert_eq!(emulator.created(ResourceKind::Kernel), 0);
        assert_eq!(emulator.created(ResourceKind::Buffer), 0);
    }
}
