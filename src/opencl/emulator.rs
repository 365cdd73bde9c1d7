//! Программная реализация OpenCL для запуска без видеокарты
//!
//! Эмулятор учитывает каждый живой объект, поэтому тесты могут проверить,
//! что после ошибки ничего не утекло. Ядра не компилируются: по имени точки
//! входа исполняется эквивалентный код на хосте.
//!
//! - `matrix_mul(a, b, c, k, n)` считает `c[y*n+x] = Σ a[y*k+j] * b[j*n+x]`
//!   в порядке возрастания `j`. Если программа также экспортирует
//!   `matrix_transpose`, второй операнд читается транспонированным:
//!   `b[x*k+j]`.
//! - `matrix_transpose(src, dst)` берёт размеры из глобальной сетки:
//!   `dst[x*h+y] = src[y*w+x]`.
//!
//! Неинициализированные буферы заполнены NaN, так что непрочитанная
//! ядром ячейка результата сразу видна при сравнении.

use super::api::{ComputeApi, KernelArg, ResourceKind};
use super::status::ClStatus;
use super::types::*;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ffi::c_void;

const PLATFORM_ID: usize = 0x0F00_0000;
const DEVICE_BASE: usize = 0x1000_0000;

/// Устройство эмулятора
#[derive(Debug, Clone, PartialEq)]
pub struct EmulatedDevice {
    pub name: String,
    pub device_type: cl_device_type,
}

impl EmulatedDevice {
    pub fn gpu(name: &str) -> Self {
        EmulatedDevice { name: name.to_string(), device_type: CL_DEVICE_TYPE_GPU }
    }

    pub fn cpu(name: &str) -> Self {
        EmulatedDevice { name: name.to_string(), device_type: CL_DEVICE_TYPE_CPU }
    }
}

/// Точка, в которой эмулятор может вернуть ошибку
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    PlatformQuery,
    CreateContext,
    CreateQueue,
    CreateProgram,
    CreateKernel,
    CreateBuffer,
    SetKernelArg { index: cl_uint },
    Enqueue,
    ReadBuffer,
}

impl FailurePoint {
    fn status(self) -> ClStatus {
        let code = match self {
            FailurePoint::PlatformQuery => CL_PLATFORM_NOT_FOUND_KHR,
            FailurePoint::CreateContext => CL_DEVICE_NOT_AVAILABLE,
            FailurePoint::CreateQueue => CL_OUT_OF_HOST_MEMORY,
            FailurePoint::CreateProgram => CL_OUT_OF_HOST_MEMORY,
            FailurePoint::CreateKernel => CL_OUT_OF_RESOURCES,
            FailurePoint::CreateBuffer => CL_MEM_OBJECT_ALLOCATION_FAILURE,
            FailurePoint::SetKernelArg { .. } => CL_INVALID_ARG_VALUE,
            FailurePoint::Enqueue => CL_OUT_OF_RESOURCES,
            FailurePoint::ReadBuffer => CL_OUT_OF_RESOURCES,
        };
        ClStatus(code)
    }
}

/// Запись об одном запуске ядра
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRecord {
    pub entry_point: String,
    pub global_work_size: [usize; 2],
    pub scalar_args: Vec<cl_int>,
    pub wait_list: Vec<cl_event>,
    pub event: cl_event,
}

#[derive(Debug)]
enum Object {
    Context,
    Queue,
    Program { entry_points: Vec<String>, built: bool, log: String, source: String },
    Kernel { entry_point: String, reads_transposed: bool, args: BTreeMap<cl_uint, KernelArg> },
    Buffer { data: Vec<f32> },
    Event,
}

impl Object {
    fn kind(&self) -> ResourceKind {
        match self {
            Object::Context => ResourceKind::Context,
            Object::Queue => ResourceKind::CommandQueue,
            Object::Program { .. } => ResourceKind::Program,
            Object::Kernel { .. } => ResourceKind::Kernel,
            Object::Buffer { .. } => ResourceKind::Buffer,
            Object::Event => ResourceKind::Event,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    next_id: usize,
    objects: HashMap<usize, Object>,
    failures: HashSet<FailurePoint>,
    launches: Vec<LaunchRecord>,
    created: HashMap<ResourceKind, usize>,
    invalid_releases: usize,
}

impl State {
    fn insert(&mut self, object: Object) -> *mut c_void {
        self.next_id += 1;
        let id = self.next_id;
        *self.created.entry(object.kind()).or_default() += 1;
        self.objects.insert(id, object);
        id as *mut c_void
    }

    fn fail(&self, point: FailurePoint) -> Result<(), ClStatus> {
        if self.failures.contains(&point) {
            Err(point.status())
        } else {
            Ok(())
        }
    }

    fn expect(&self, raw: *mut c_void, kind: ResourceKind, invalid: cl_int) -> Result<&Object, ClStatus> {
        match self.objects.get(&(raw as usize)) {
            Some(object) if object.kind() == kind => Ok(object),
            _ => Err(ClStatus(invalid)),
        }
    }

    fn buffer(&self, arg: Option<&KernelArg>) -> Result<&[f32], ClStatus> {
        match arg {
            Some(KernelArg::Buffer(mem)) => match self.expect(*mem, ResourceKind::Buffer, CL_INVALID_MEM_OBJECT)? {
                Object::Buffer { data } => Ok(data),
                _ => Err(ClStatus(CL_INVALID_MEM_OBJECT)),
            },
            _ => Err(ClStatus(CL_INVALID_KERNEL_ARGS)),
        }
    }

    fn buffer_mut(&mut self, mem: cl_mem) -> Result<&mut Vec<f32>, ClStatus> {
        match self.objects.get_mut(&(mem as usize)) {
            Some(Object::Buffer { data }) => Ok(data),
            _ => Err(ClStatus(CL_INVALID_MEM_OBJECT)),
        }
    }
}

/// Эмулируемая платформа OpenCL
#[derive(Debug)]
pub struct EmulatedOpenCl {
    devices: Vec<EmulatedDevice>,
    has_platform: bool,
    state: RefCell<State>,
}

impl EmulatedOpenCl {
    /// Платформа с заданным списком устройств
    pub fn with_devices(devices: Vec<EmulatedDevice>) -> Self {
        EmulatedOpenCl {
            devices,
            has_platform: true,
            state: RefCell::new(State::default()),
        }
    }

    /// Процессор и видеокарта, именно в таком порядке
    pub fn with_gpu() -> Self {
        Self::with_devices(vec![
            EmulatedDevice::cpu("Emulated CPU"),
            EmulatedDevice::gpu("Emulated GPU"),
        ])
    }

    /// Система, в которой не установлено ни одной платформы
    pub fn without_platform() -> Self {
        EmulatedOpenCl {
            devices: Vec::new(),
            has_platform: false,
            state: RefCell::new(State::default()),
        }
    }

    pub fn fail_at(&self, point: FailurePoint) {
        self.state.borrow_mut().failures.insert(point);
    }

    pub fn clear_failures(&self) {
        self.state.borrow_mut().failures.clear();
    }

    /// Число неосвобождённых объектов всех видов
    pub fn live_objects(&self) -> usize {
        self.state.borrow().objects.len()
    }

    pub fn live(&self, kind: ResourceKind) -> usize {
        self.state
            .borrow()
            .objects
            .values()
            .filter(|object| object.kind() == kind)
            .count()
    }

    /// Сколько объектов данного вида было создано за всё время
    pub fn created(&self, kind: ResourceKind) -> usize {
        self.state.borrow().created.get(&kind).copied().unwrap_or(0)
    }

    /// Попытки освободить несуществующий или уже освобождённый объект
    pub fn invalid_releases(&self) -> usize {
        self.state.borrow().invalid_releases
    }

    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.state.borrow().launches.clone()
    }

    /// Исходный текст последней созданной программы
    pub fn last_program_source(&self) -> Option<String> {
        let state = self.state.borrow();
        state
            .objects
            .iter()
            .filter_map(|(id, object)| match object {
                Object::Program { source, .. } => Some((*id, source.clone())),
                _ => None,
            })
            .max_by_key(|(id, _)| *id)
            .map(|(_, source)| source)
    }

    fn device_index(&self, device: cl_device_id) -> Result<usize, ClStatus> {
        let index = (device as usize).wrapping_sub(DEVICE_BASE);
        if index < self.devices.len() {
            Ok(index)
        } else {
            Err(ClStatus(CL_INVALID_DEVICE))
        }
    }
}

/// Имена функций, помеченных `__kernel`
fn kernel_entry_points(source: &str) -> Vec<String> {
    source
        .split("__kernel")
        .skip(1)
        .filter_map(|rest| {
            let signature = rest.split('(').next()?;
            let name = signature.split_whitespace().last()?;
            Some(name.to_string())
        })
        .collect()
}

/// Проверяет исходник так, как это сделал бы компилятор, и возвращает лог ошибок
fn check_source(source: &str) -> Result<Vec<String>, String> {
    let mut depth: i64 = 0;
    for (line_no, line) in source.lines().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return Err(format!("<source>:{}: error: extraneous closing brace ('}}')", line_no + 1));
            }
        }
    }
    if depth != 0 {
        return Err(format!("<source>:{}: error: expected '}}' at end of input", source.lines().count()));
    }
    let entry_points = kernel_entry_points(source);
    if entry_points.is_empty() {
        return Err("<source>: error: program contains no __kernel functions".to_string());
    }
    Ok(entry_points)
}

fn kernel_arity(entry_point: &str) -> Option<cl_uint> {
    match entry_point {
        "matrix_mul" => Some(5),
        "matrix_transpose" => Some(2),
        _ => None,
    }
}

fn scalar(arg: Option<&KernelArg>) -> Result<usize, ClStatus> {
    match arg {
        Some(KernelArg::Int(value)) if *value >= 0 => Ok(*value as usize),
        Some(KernelArg::Int(_)) => Err(ClStatus(CL_INVALID_ARG_VALUE)),
        _ => Err(ClStatus(CL_INVALID_KERNEL_ARGS)),
    }
}

impl ComputeApi for EmulatedOpenCl {
    fn platform_ids(&self) -> Result<Vec<cl_platform_id>, ClStatus> {
        self.state.borrow().fail(FailurePoint::PlatformQuery)?;
        if !self.has_platform {
            return Err(ClStatus(CL_PLATFORM_NOT_FOUND_KHR));
        }
        Ok(vec![PLATFORM_ID as cl_platform_id])
    }

    fn device_ids(&self, platform: cl_platform_id) -> Result<Vec<cl_device_id>, ClStatus> {
        if !self.has_platform || platform as usize != PLATFORM_ID {
            return Err(ClStatus(CL_INVALID_PLATFORM));
        }
        if self.devices.is_empty() {
            return Err(ClStatus(CL_DEVICE_NOT_FOUND));
        }
        Ok((0..self.devices.len())
            .map(|index| (DEVICE_BASE + index) as cl_device_id)
            .collect())
    }

    fn device_type(&self, device: cl_device_id) -> Result<cl_device_type, ClStatus> {
        Ok(self.devices[self.device_index(device)?].device_type)
    }

    fn device_name(&self, device: cl_device_id) -> Result<String, ClStatus> {
        Ok(self.devices[self.device_index(device)?].name.clone())
    }

    fn create_context(&self, device: cl_device_id) -> Result<cl_context, ClStatus> {
        self.device_index(device)?;
        let mut state = self.state.borrow_mut();
        state.fail(FailurePoint::CreateContext)?;
        Ok(state.insert(Object::Context))
    }

    fn create_command_queue(
        &self,
        context: cl_context,
        device: cl_device_id,
    ) -> Result<cl_command_queue, ClStatus> {
        self.device_index(device)?;
        let mut state = self.state.borrow_mut();
        state.expect(context, ResourceKind::Context, CL_INVALID_CONTEXT)?;
        state.fail(FailurePoint::CreateQueue)?;
        Ok(state.insert(Object::Queue))
    }

    fn create_program_with_source(
        &self,
        context: cl_context,
        source: &str,
    ) -> Result<cl_program, ClStatus> {
        let mut state = self.state.borrow_mut();
        state.expect(context, ResourceKind::Context, CL_INVALID_CONTEXT)?;
        state.fail(FailurePoint::CreateProgram)?;
        if source.is_empty() {
            return Err(ClStatus(CL_INVALID_VALUE));
        }
        Ok(state.insert(Object::Program {
            entry_points: Vec::new(),
            built: false,
            log: String::new(),
            source: source.to_string(),
        }))
    }

    fn build_program(&self, program: cl_program, device: cl_device_id) -> Result<(), ClStatus> {
        self.device_index(device)?;
        let mut state = self.state.borrow_mut();
        match state.objects.get_mut(&(program as usize)) {
            Some(Object::Program { entry_points, built, log, source }) => match check_source(source) {
                Ok(found) => {
                    *entry_points = found;
                    *built = true;
                    log.clear();
                    Ok(())
                }
                Err(message) => {
                    *log = message;
                    Err(ClStatus(CL_BUILD_PROGRAM_FAILURE))
                }
            },
            _ => Err(ClStatus(CL_INVALID_PROGRAM)),
        }
    }

    fn program_build_log(
        &self,
        program: cl_program,
        device: cl_device_id,
        capacity: usize,
    ) -> Result<String, ClStatus> {
        self.device_index(device)?;
        let state = self.state.borrow();
        match state.expect(program, ResourceKind::Program, CL_INVALID_PROGRAM)? {
            Object::Program { log, .. } => {
                let mut end = log.len().min(capacity);
                while !log.is_char_boundary(end) {
                    end -= 1;
                }
                Ok(log[..end].to_string())
            }
            _ => Err(ClStatus(CL_INVALID_PROGRAM)),
        }
    }

    fn create_kernel(&self, program: cl_program, name: &str) -> Result<cl_kernel, ClStatus> {
        let mut state = self.state.borrow_mut();
        let (known, reads_transposed) =
            match state.expect(program, ResourceKind::Program, CL_INVALID_PROGRAM)? {
                Object::Program { entry_points, built: true, .. } => (
                    entry_points.iter().any(|entry| entry == name),
                    name == "matrix_mul" && entry_points.iter().any(|entry| entry == "matrix_transpose"),
                ),
                _ => return Err(ClStatus(CL_INVALID_PROGRAM_EXECUTABLE)),
            };
        if !known {
            return Err(ClStatus(CL_INVALID_KERNEL_NAME));
        }
        state.fail(FailurePoint::CreateKernel)?;
        Ok(state.insert(Object::Kernel {
            entry_point: name.to_string(),
            reads_transposed,
            args: BTreeMap::new(),
        }))
    }

    fn create_buffer(
        &self,
        context: cl_context,
        flags: cl_mem_flags,
        size: usize,
        host: Option<&[f32]>,
    ) -> Result<cl_mem, ClStatus> {
        let mut state = self.state.borrow_mut();
        state.expect(context, ResourceKind::Context, CL_INVALID_CONTEXT)?;
        state.fail(FailurePoint::CreateBuffer)?;
        let elements = size / std::mem::size_of::<f32>();
        if size == 0 || size % std::mem::size_of::<f32>() != 0 {
            return Err(ClStatus(CL_INVALID_BUFFER_SIZE));
        }
        let copy_host = flags & CL_MEM_COPY_HOST_PTR != 0;
        let data = match host {
            Some(host) if copy_host && host.len() == elements => host.to_vec(),
            None if !copy_host => vec![f32::NAN; elements],
            _ => return Err(ClStatus(CL_INVALID_VALUE)),
        };
        Ok(state.insert(Object::Buffer { data }))
    }

    fn set_kernel_arg(&self, kernel: cl_kernel, index: cl_uint, value: KernelArg) -> Result<(), ClStatus> {
        let mut state = self.state.borrow_mut();
        if let KernelArg::Buffer(mem) = value {
            state.expect(mem, ResourceKind::Buffer, CL_INVALID_MEM_OBJECT)?;
        }
        state.fail(FailurePoint::SetKernelArg { index })?;
        match state.objects.get_mut(&(kernel as usize)) {
            Some(Object::Kernel { entry_point, args, .. }) => {
                if kernel_arity(entry_point).map_or(true, |arity| index >= arity) {
                    return Err(ClStatus(CL_INVALID_ARG_INDEX));
                }
                args.insert(index, value);
                Ok(())
            }
            _ => Err(ClStatus(CL_INVALID_KERNEL)),
        }
    }

    fn enqueue_nd_range_kernel(
        &self,
        queue: cl_command_queue,
        kernel: cl_kernel,
        global_work_size: [usize; 2],
        wait_list: &[cl_event],
    ) -> Result<cl_event, ClStatus> {
        let mut state = self.state.borrow_mut();
        state.expect(queue, ResourceKind::CommandQueue, CL_INVALID_COMMAND_QUEUE)?;
        for event in wait_list {
            state.expect(*event, ResourceKind::Event, CL_INVALID_EVENT_WAIT_LIST)?;
        }
        state.fail(FailurePoint::Enqueue)?;
        if global_work_size.contains(&0) {
            return Err(ClStatus(CL_INVALID_GLOBAL_WORK_SIZE));
        }

        let (entry_point, reads_transposed, args) =
            match state.expect(kernel, ResourceKind::Kernel, CL_INVALID_KERNEL)? {
                Object::Kernel { entry_point, reads_transposed, args } => {
                    (entry_point.clone(), *reads_transposed, args.clone())
                }
                _ => return Err(ClStatus(CL_INVALID_KERNEL)),
            };
        let [width, height] = global_work_size;

        let (output, result) = match entry_point.as_str() {
            "matrix_mul" => {
                let a = state.buffer(args.get(&0))?;
                let b = state.buffer(args.get(&1))?;
                let c = state.buffer(args.get(&2))?;
                let k = scalar(args.get(&3))?;
                let n = scalar(args.get(&4))?;
                let mut result = c.to_vec();
                for y in 0..height {
                    for x in 0..width {
                        let mut sum = 0.0f32;
                        for j in 0..k {
                            let b_index = if reads_transposed { x * k + j } else { j * n + x };
                            let (Some(lhs), Some(rhs)) = (a.get(y * k + j), b.get(b_index)) else {
                                return Err(ClStatus(CL_OUT_OF_RESOURCES));
                            };
                            sum += lhs * rhs;
                        }
                        *result.get_mut(y * n + x).ok_or(ClStatus(CL_OUT_OF_RESOURCES))? = sum;
                    }
                }
                (args.get(&2).copied(), result)
            }
            "matrix_transpose" => {
                let src = state.buffer(args.get(&0))?;
                let dst = state.buffer(args.get(&1))?;
                let mut result = dst.to_vec();
                for y in 0..height {
                    for x in 0..width {
                        let value = *src.get(y * width + x).ok_or(ClStatus(CL_OUT_OF_RESOURCES))?;
                        *result.get_mut(x * height + y).ok_or(ClStatus(CL_OUT_OF_RESOURCES))? = value;
                    }
                }
                (args.get(&1).copied(), result)
            }
            _ => return Err(ClStatus(CL_INVALID_KERNEL)),
        };

        if let Some(KernelArg::Buffer(mem)) = output {
            *state.buffer_mut(mem)? = result;
        }

        let scalar_args = args
            .values()
            .filter_map(|arg| match arg {
                KernelArg::Int(value) => Some(*value),
                KernelArg::Buffer(_) => None,
            })
            .collect();
        let event = state.insert(Object::Event);
        state.launches.push(LaunchRecord {
            entry_point,
            global_work_size,
            scalar_args,
            wait_list: wait_list.to_vec(),
            event,
        });
        Ok(event)
    }

    fn enqueue_read_buffer(
        &self,
        queue: cl_command_queue,
        buffer: cl_mem,
        out: &mut [f32],
    ) -> Result<(), ClStatus> {
        let state = self.state.borrow();
        state.expect(queue, ResourceKind::CommandQueue, CL_INVALID_COMMAND_QUEUE)?;
        state.fail(FailurePoint::ReadBuffer)?;
        match state.expect(buffer, ResourceKind::Buffer, CL_INVALID_MEM_OBJECT)? {
            Object::Buffer { data } if data.len() >= out.len() => {
                out.copy_from_slice(&data[..out.len()]);
                Ok(())
            }
            _ => Err(ClStatus(CL_INVALID_VALUE)),
        }
    }

    fn release(&self, kind: ResourceKind, object: *mut c_void) -> ClStatus {
        let mut state = self.state.borrow_mut();
        let id = object as usize;
        if state.objects.get(&id).map(Object::kind) == Some(kind) {
            state.objects.remove(&id);
            return ClStatus::SUCCESS;
        }
        state.invalid_releases += 1;
        let code = match kind {
            ResourceKind::Context => CL_INVALID_CONTEXT,
            ResourceKind::CommandQueue => CL_INVALID_COMMAND_QUEUE,
            ResourceKind::Program => CL_INVALID_PROGRAM,
            ResourceKind::Kernel => CL_INVALID_KERNEL,
            ResourceKind::Buffer => CL_INVALID_MEM_OBJECT,
            ResourceKind::Event => CL_INVALID_EVENT,
        };
        ClStatus(code)
    }
}
