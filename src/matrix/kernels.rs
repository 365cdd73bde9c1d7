//! OpenCL ядра для матричных операций
//!
//! Все ядра принимают аргументы в одном порядке: буферы, затем
//! `k` (общая размерность, ширина левой матрицы) и `n` (ширина результата).
//! Сумма копится в `f32` с выключенным FP_CONTRACT, чтобы результат
//! совпадал с эталоном на CPU бит в бит.

use crate::error::DispatchError;
use std::fs;
use std::path::PathBuf;

/// Один поток на элемент результата
pub static NAIVE_KERNEL: &str = r#"
#pragma OPENCL FP_CONTRACT OFF

__kernel void matrix_mul(
    __global const float* lhs,
    __global const float* rhs,
    __global float* out,
    const int k,
    const int n
) {
    const int x = get_global_id(0);
    const int y = get_global_id(1);

    float sum = 0.0f;
    for (int j = 0; j < k; j++) {
        sum += lhs[y * k + j] * rhs[j * n + x];
    }
    out[y * n + x] = sum;
}
"#;

/// Транспонирование правой матрицы и умножение по строкам обеих
pub static TRANSPOSED_KERNEL: &str = r#"
#pragma OPENCL FP_CONTRACT OFF

__kernel void matrix_transpose(
    __global const float* src,
    __global float* dst
) {
    const int x = get_global_id(0);
    const int y = get_global_id(1);
    const int width = get_global_size(0);
    const int height = get_global_size(1);

    dst[x * height + y] = src[y * width + x];
}

__kernel void matrix_mul(
    __global const float* lhs,
    __global const float* rhs_t,
    __global float* out,
    const int k,
    const int n
) {
    const int x = get_global_id(0);
    const int y = get_global_id(1);

    float sum = 0.0f;
    for (int j = 0; j < k; j++) {
        sum += lhs[y * k + j] * rhs_t[x * k + j];
    }
    out[y * n + x] = sum;
}
"#;

/// Скалярное произведение блоками по четыре элемента
pub static DOT_KERNEL: &str = r#"
#pragma OPENCL FP_CONTRACT OFF

__kernel void matrix_mul(
    __global const float* lhs,
    __global const float* rhs,
    __global float* out,
    const int k,
    const int n
) {
    const int x = get_global_id(0);
    const int y = get_global_id(1);
    const int blocks = k / 4;

    float sum = 0.0f;
    for (int b = 0; b < blocks; b++) {
        const int j = b * 4;
        float4 row = (float4)(lhs[y * k + j], lhs[y * k + j + 1], lhs[y * k + j + 2], lhs[y * k + j + 3]);
        float4 col = (float4)(rhs[j * n + x], rhs[(j + 1) * n + x], rhs[(j + 2) * n + x], rhs[(j + 3) * n + x]);
        sum += dot(row, col);
    }
    for (int j = blocks * 4; j < k; j++) {
        sum += lhs[y * k + j] * rhs[j * n + x];
    }
    out[y * n + x] = sum;
}
"#;

/// Векторные загрузки `vload4` строки левой матрицы
pub static WIDE_VECTOR_KERNEL: &str = r#"
#pragma OPENCL FP_CONTRACT OFF

__kernel void matrix_mul(
    __global const float* lhs,
    __global const float* rhs,
    __global float* out,
    const int k,
    const int n
) {
    const int x = get_global_id(0);
    const int y = get_global_id(1);
    const int blocks = k / 4;
    __global const float* row = lhs + y * k;

    float4 acc = (float4)(0.0f);
    for (int b = 0; b < blocks; b++) {
        const int j = b * 4;
        float4 a = vload4(0, row + j);
        float4 c = (float4)(rhs[j * n + x], rhs[(j + 1) * n + x], rhs[(j + 2) * n + x], rhs[(j + 3) * n + x]);
        acc += a * c;
    }
    float sum = (acc.x + acc.y) + (acc.z + acc.w);
    for (int j = blocks * 4; j < k; j++) {
        sum += row[j] * rhs[j * n + x];
    }
    out[y * n + x] = sum;
}
"#;

/// Левая матрица в константной памяти устройства
pub static CONSTANT_KERNEL: &str = r#"
#pragma OPENCL FP_CONTRACT OFF

__kernel void matrix_mul(
    __constant float* lhs,
    __global const float* rhs,
    __global float* out,
    const int k,
    const int n
) {
    const int x = get_global_id(0);
    const int y = get_global_id(1);

    float sum = 0.0f;
    for (int j = 0; j < k; j++) {
        sum += lhs[y * k + j] * rhs[j * n + x];
    }
    out[y * n + x] = sum;
}
"#;

/// Источник текста OpenCL-программ по имени варианта
pub trait KernelSource {
    fn source(&self, name: &str) -> Result<String, DispatchError>;
}

/// Ядра, встроенные в бинарник
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedKernels;

impl KernelSource for EmbeddedKernels {
    fn source(&self, name: &str) -> Result<String, DispatchError> {
        let source = match name {
            "naive" => NAIVE_KERNEL,
            "transposed" => TRANSPOSED_KERNEL,
            "dot" => DOT_KERNEL,
            "wide-vector" => WIDE_VECTOR_KERNEL,
            "constant" => CONSTANT_KERNEL,
            _ => {
                return Err(DispatchError::KernelSourceUnavailable {
                    name: name.to_string(),
                    reason: "no embedded kernel with this name".to_string(),
                })
            }
        };
        Ok(source.to_string())
    }
}

/// Ядра из файлов `<каталог>/<имя>.cl`
#[derive(Debug, Clone)]
pub struct KernelDirectory {
    root: PathBuf,
}

impl KernelDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        KernelDirectory { root: root.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.cl", name))
    }
}

impl KernelSource for KernelDirectory {
    fn source(&self, name: &str) -> Result<String, DispatchError> {
        let path = self.path_for(name);
        fs::read_to_string(&path).map_err(|e| DispatchError::KernelSourceUnavailable {
            name: name.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::variant::GpuVariant;

    #[test]
    fn every_variant_has_embedded_source() {
        for variant in GpuVariant::ALL {
            let source = EmbeddedKernels.source(variant.kernel_source_name()).unwrap();
            for entry in variant.dispatch_plan().entry_points() {
                assert!(source.contains(&format!("__kernel void {}(", entry)));
            }
        }
    }

    #[test]
    fn unknown_name_is_reported() {
        assert!(matches!(
            EmbeddedKernels.source("tiled"),
            Err(DispatchError::KernelSourceUnavailable { .. })
        ));
    }

    #[test]
    fn directory_reads_named_file() {
        let root = std::env::temp_dir().join(format!("opencl_matmul_kernels_{}", std::process::id()));
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("naive.cl"), NAIVE_KERNEL).unwrap();

        let kernels = KernelDirectory::new(&root);
        assert_eq!(kernels.source("naive").unwrap(), NAIVE_KERNEL);
        match kernels.source("dot") {
            Err(DispatchError::KernelSourceUnavailable { name, reason }) => {
                assert_eq!(name, "dot");
                assert!(reason.contains("dot.cl"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        fs::remove_dir_all(&root).unwrap();
    }
}
