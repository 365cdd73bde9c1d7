//! Реализация [`ComputeApi`] поверх системной библиотеки OpenCL

use super::api::{ComputeApi, KernelArg, ResourceKind};
use super::bindings::*;
use super::callbacks::log_context_error;
use super::status::ClStatus;
use super::types::*;
use super::utils::{to_c_string, truncate_log};
use crate::cl_check;
use std::ffi::c_void;
use std::ptr;

/// Вызовы драйвера OpenCL через FFI
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeOpenCl;

impl NativeOpenCl {
    pub fn new() -> Self {
        NativeOpenCl
    }

    fn device_info_bytes(&self, device: cl_device_id, param: cl_device_info) -> Result<Vec<u8>, ClStatus> {
        let mut size = 0usize;
        cl_check!(clGetDeviceInfo(device, param, 0, ptr::null_mut(), &mut size))?;
        let mut value = vec![0u8; size];
        cl_check!(clGetDeviceInfo(
            device,
            param,
            size,
            value.as_mut_ptr() as *mut c_void,
            ptr::null_mut()
        ))?;
        Ok(value)
    }
}

/// Проверяет объект, созданный функцией с out-параметром кода ошибки
fn created<T>(object: *mut T, error: cl_int) -> Result<*mut T, ClStatus> {
    ClStatus::check(error)?;
    if object.is_null() {
        return Err(ClStatus(CL_INVALID_VALUE));
    }
    Ok(object)
}

impl ComputeApi for NativeOpenCl {
    fn platform_ids(&self) -> Result<Vec<cl_platform_id>, ClStatus> {
        let mut count = 0;
        cl_check!(clGetPlatformIDs(0, ptr::null_mut(), &mut count))?;
        let mut platforms = vec![ptr::null_mut(); count as usize];
        cl_check!(clGetPlatformIDs(count, platforms.as_mut_ptr(), ptr::null_mut()))?;
        Ok(platforms)
    }

    fn device_ids(&self, platform: cl_platform_id) -> Result<Vec<cl_device_id>, ClStatus> {
        let mut count = 0;
        cl_check!(clGetDeviceIDs(platform, CL_DEVICE_TYPE_ALL, 0, ptr::null_mut(), &mut count))?;
        let mut devices = vec![ptr::null_mut(); count as usize];
        cl_check!(clGetDeviceIDs(
            platform,
            CL_DEVICE_TYPE_ALL,
            count,
            devices.as_mut_ptr(),
            ptr::null_mut()
        ))?;
        Ok(devices)
    }

    fn device_type(&self, device: cl_device_id) -> Result<cl_device_type, ClStatus> {
        let mut device_type: cl_device_type = 0;
        cl_check!(clGetDeviceInfo(
            device,
            CL_DEVICE_TYPE,
            std::mem::size_of::<cl_device_type>(),
            &mut device_type as *mut _ as *mut c_void,
            ptr::null_mut()
        ))?;
        Ok(device_type)
    }

    fn device_name(&self, device: cl_device_id) -> Result<String, ClStatus> {
        let bytes = self.device_info_bytes(device, CL_DEVICE_NAME)?;
        Ok(truncate_log(&bytes, bytes.len()))
    }

    fn create_context(&self, device: cl_device_id) -> Result<cl_context, ClStatus> {
        let mut error = 0;
        let context = unsafe {
            clCreateContext(
                ptr::null(),
                1,
                &device,
                Some(log_context_error),
                ptr::null_mut(),
                &mut error,
            )
        };
        created(context, error)
    }

    fn create_command_queue(
        &self,
        context: cl_context,
        device: cl_device_id,
    ) -> Result<cl_command_queue, ClStatus> {
        let mut error = 0;
        let queue = unsafe { clCreateCommandQueue(context, device, 0, &mut error) };
        created(queue, error)
    }

    fn create_program_with_source(
        &self,
        context: cl_context,
        source: &str,
    ) -> Result<cl_program, ClStatus> {
        let mut error = 0;
        let text = source.as_ptr() as *const std::os::raw::c_char;
        let length = source.len();
        let program = unsafe { clCreateProgramWithSource(context, 1, &text, &length, &mut error) };
        created(program, error)
    }

    fn build_program(&self, program: cl_program, device: cl_device_id) -> Result<(), ClStatus> {
        cl_check!(clBuildProgram(program, 1, &device, ptr::null(), None, ptr::null_mut()))
    }

    fn program_build_log(
        &self,
        program: cl_program,
        device: cl_device_id,
        capacity: usize,
    ) -> Result<String, ClStatus> {
        let mut log_size = 0usize;
        cl_check!(clGetProgramBuildInfo(
            program,
            device,
            CL_PROGRAM_BUILD_LOG,
            0,
            ptr::null_mut(),
            &mut log_size
        ))?;
        let mut build_log = vec![0u8; log_size];
        cl_check!(clGetProgramBuildInfo(
            program,
            device,
            CL_PROGRAM_BUILD_LOG,
            log_size,
            build_log.as_mut_ptr() as *mut c_void,
            ptr::null_mut()
        ))?;
        Ok(truncate_log(&build_log, capacity))
    }

    fn create_kernel(&self, program: cl_program, name: &str) -> Result<cl_kernel, ClStatus> {
        let name = to_c_string(name)?;
        let mut error = 0;
        let kernel = unsafe { clCreateKernel(program, name.as_ptr(), &mut error) };
        created(kernel, error)
    }

    fn create_buffer(
        &self,
        context: cl_context,
        flags: cl_mem_flags,
        size: usize,
        host: Option<&[f32]>,
    ) -> Result<cl_mem, ClStatus> {
        let host_ptr = match host {
            Some(data) => {
                if std::mem::size_of_val(data) != size {
                    return Err(ClStatus(CL_INVALID_BUFFER_SIZE));
                }
                // С CL_MEM_COPY_HOST_PTR драйвер только читает эту память
                data.as_ptr() as *mut c_void
            }
            None => ptr::null_mut(),
        };
        let mut error = 0;
        let buffer = unsafe { clCreateBuffer(context, flags, size, host_ptr, &mut error) };
        created(buffer, error)
    }

    fn set_kernel_arg(&self, kernel: cl_kernel, index: cl_uint, value: KernelArg) -> Result<(), ClStatus> {
        match value {
            KernelArg::Buffer(mem) => cl_check!(clSetKernelArg(
                kernel,
                index,
                std::mem::size_of::<cl_mem>(),
                &mem as *const _ as *const c_void
            )),
            KernelArg::Int(scalar) => cl_check!(clSetKernelArg(
                kernel,
                index,
                std::mem::size_of::<cl_int>(),
                &scalar as *const _ as *const c_void
            )),
        }
    }

    fn enqueue_nd_range_kernel(
        &self,
        queue: cl_command_queue,
        kernel: cl_kernel,
        global_work_size: [usize; 2],
        wait_list: &[cl_event],
    ) -> Result<cl_event, ClStatus> {
        let mut event: cl_event = ptr::null_mut();
        let wait_ptr = if wait_list.is_empty() { ptr::null() } else { wait_list.as_ptr() };
        cl_check!(clEnqueueNDRangeKernel(
            queue,
            kernel,
            2,
            ptr::null(),
            global_work_size.as_ptr(),
            ptr::null(),
            wait_list.len() as cl_uint,
            wait_ptr,
            &mut event
        ))?;
        Ok(event)
    }

    fn enqueue_read_buffer(
        &self,
        queue: cl_command_queue,
        buffer: cl_mem,
        out: &mut [f32],
    ) -> Result<(), ClStatus> {
        cl_check!(clEnqueueReadBuffer(
            queue,
            buffer,
            CL_TRUE,
            0,
            std::mem::size_of_val(out),
            out.as_mut_ptr() as *mut c_void,
            0,
            ptr::null(),
            ptr::null_mut()
        ))
    }

    fn release(&self, kind: ResourceKind, object: *mut c_void) -> ClStatus {
        let code = unsafe {
            match kind {
                ResourceKind::Context => clReleaseContext(object),
                ResourceKind::CommandQueue => clReleaseCommandQueue(object),
                ResourceKind::Program => clReleaseProgram(object),
                ResourceKind::Kernel => clReleaseKernel(object),
                ResourceKind::Buffer => clReleaseMemObject(object),
                ResourceKind::Event => clReleaseEvent(object),
            }
        };
        ClStatus(code)
    }
}
