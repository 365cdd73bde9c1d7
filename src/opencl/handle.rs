//! Дескрипторы объектов OpenCL с освобождением при выходе из области видимости

use super::api::{ComputeApi, ResourceKind};
use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// Вид ресурса на уровне типов
pub trait Resource {
    const KIND: ResourceKind;
}

macro_rules! resource_kinds {
    ($($name:ident => $kind:ident),* $(,)?) => {
        $(
            #[derive(Debug)]
            pub enum $name {}

            impl Resource for $name {
                const KIND: ResourceKind = ResourceKind::$kind;
            }
        )*
    };
}

resource_kinds! {
    Context => Context,
    CommandQueue => CommandQueue,
    Program => Program,
    Kernel => Kernel,
    Buffer => Buffer,
    Event => Event,
}

/// Единоличный владелец одного объекта OpenCL
///
/// Объект освобождается ровно один раз в `Drop`. Дескриптор нельзя
/// клонировать, поэтому повторное освобождение невозможно.
pub struct Handle<K: Resource> {
    raw: *mut c_void,
    api: Rc<dyn ComputeApi>,
    _kind: PhantomData<K>,
}

pub type ContextHandle = Handle<Context>;
pub type QueueHandle = Handle<CommandQueue>;
pub type ProgramHandle = Handle<Program>;
pub type KernelHandle = Handle<Kernel>;
pub type BufferHandle = Handle<Buffer>;
pub type EventHandle = Handle<Event>;

impl<K: Resource> Handle<K> {
    /// Берёт во владение только что созданный объект
    pub fn wrap(api: &Rc<dyn ComputeApi>, raw: *mut c_void) -> Self {
        Handle {
            raw,
            api: Rc::clone(api),
            _kind: PhantomData,
        }
    }

    pub fn get(&self) -> *mut c_void {
        self.raw
    }

    pub fn kind(&self) -> ResourceKind {
        K::KIND
    }
}

impl<K: Resource> Drop for Handle<K> {
    fn drop(&mut self) {
        let status = self.api.release(K::KIND, self.raw);
        if !status.is_success() {
            log::warn!("Failed to release OpenCL {}: {}", K::KIND, status);
        }
    }
}

impl<K: Resource> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &K::KIND)
            .field("raw", &self.raw)
            .finish()
    }
}
