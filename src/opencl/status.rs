//! Коды состояния OpenCL

use super::types::*;
use serde::Serialize;
use std::fmt;

/// Код возврата функции OpenCL с символьным именем при выводе
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ClStatus(pub cl_int);

impl ClStatus {
    pub const SUCCESS: ClStatus = ClStatus(CL_SUCCESS);

    pub fn is_success(self) -> bool {
        self.0 == CL_SUCCESS
    }

    /// Превращает код возврата в `Result`
    pub fn check(code: cl_int) -> Result<(), ClStatus> {
        if code == CL_SUCCESS {
            Ok(())
        } else {
            Err(ClStatus(code))
        }
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            CL_SUCCESS => "CL_SUCCESS",
            CL_DEVICE_NOT_FOUND => "CL_DEVICE_NOT_FOUND",
            CL_DEVICE_NOT_AVAILABLE => "CL_DEVICE_NOT_AVAILABLE",
            CL_COMPILER_NOT_AVAILABLE => "CL_COMPILER_NOT_AVAILABLE",
            CL_MEM_OBJECT_ALLOCATION_FAILURE => "CL_MEM_OBJECT_ALLOCATION_FAILURE",
            CL_OUT_OF_RESOURCES => "CL_OUT_OF_RESOURCES",
            CL_OUT_OF_HOST_MEMORY => "CL_OUT_OF_HOST_MEMORY",
            CL_BUILD_PROGRAM_FAILURE => "CL_BUILD_PROGRAM_FAILURE",
            CL_INVALID_VALUE => "CL_INVALID_VALUE",
            CL_INVALID_DEVICE_TYPE => "CL_INVALID_DEVICE_TYPE",
            CL_INVALID_PLATFORM => "CL_INVALID_PLATFORM",
            CL_INVALID_DEVICE => "CL_INVALID_DEVICE",
            CL_INVALID_CONTEXT => "CL_INVALID_CONTEXT",
            CL_INVALID_COMMAND_QUEUE => "CL_INVALID_COMMAND_QUEUE",
            CL_INVALID_MEM_OBJECT => "CL_INVALID_MEM_OBJECT",
            CL_INVALID_BINARY => "CL_INVALID_BINARY",
            CL_INVALID_BUILD_OPTIONS => "CL_INVALID_BUILD_OPTIONS",
            CL_INVALID_PROGRAM => "CL_INVALID_PROGRAM",
            CL_INVALID_PROGRAM_EXECUTABLE => "CL_INVALID_PROGRAM_EXECUTABLE",
            CL_INVALID_KERNEL_NAME => "CL_INVALID_KERNEL_NAME",
            CL_INVALID_KERNEL => "CL_INVALID_KERNEL",
            CL_INVALID_ARG_INDEX => "CL_INVALID_ARG_INDEX",
            CL_INVALID_ARG_VALUE => "CL_INVALID_ARG_VALUE",
            CL_INVALID_ARG_SIZE => "CL_INVALID_ARG_SIZE",
            CL_INVALID_KERNEL_ARGS => "CL_INVALID_KERNEL_ARGS",
            CL_INVALID_WORK_DIMENSION => "CL_INVALID_WORK_DIMENSION",
            CL_INVALID_WORK_GROUP_SIZE => "CL_INVALID_WORK_GROUP_SIZE",
            CL_INVALID_EVENT_WAIT_LIST => "CL_INVALID_EVENT_WAIT_LIST",
            CL_INVALID_EVENT => "CL_INVALID_EVENT",
            CL_INVALID_BUFFER_SIZE => "CL_INVALID_BUFFER_SIZE",
            CL_INVALID_GLOBAL_WORK_SIZE => "CL_INVALID_GLOBAL_WORK_SIZE",
            CL_PLATFORM_NOT_FOUND_KHR => "CL_PLATFORM_NOT_FOUND_KHR",
            _ => "CL_UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ClStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

impl From<cl_int> for ClStatus {
    fn from(code: cl_int) -> Self {
        ClStatus(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_symbolic_name_and_code() {
        assert_eq!(
            ClStatus(CL_INVALID_KERNEL_ARGS).to_string(),
            "CL_INVALID_KERNEL_ARGS (-52)"
        );
        assert_eq!(ClStatus(-9999).to_string(), "CL_UNKNOWN_ERROR (-9999)");
    }

    #[test]
    fn check_maps_success_to_ok() {
        assert!(ClStatus::check(CL_SUCCESS).is_ok());
        assert_eq!(
            ClStatus::check(CL_OUT_OF_RESOURCES),
            Err(ClStatus(CL_OUT_OF_RESOURCES))
        );
    }
}
