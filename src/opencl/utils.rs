//! Вспомогательные функции для OpenCL

use super::status::ClStatus;
use super::types::CL_INVALID_VALUE;
use std::ffi::CString;

/// Преобразует строку в null-terminated строку для C
pub fn to_c_string(s: &str) -> Result<CString, ClStatus> {
    CString::new(s).map_err(|_| ClStatus(CL_INVALID_VALUE))
}

/// Обрезает лог компиляции до `capacity` байт по границе символа
pub fn truncate_log(bytes: &[u8], capacity: usize) -> String {
    let end = bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(bytes.len())
        .min(capacity);
    let text = String::from_utf8_lossy(&bytes[..end]);
    text.trim_end().to_string()
}
