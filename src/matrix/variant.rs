//! Варианты умножения и планы запуска ядер

use serde::{Deserialize, Serialize};
use std::fmt;

/// Точка входа основного ядра умножения
pub const MULTIPLY_ENTRY: &str = "matrix_mul";
/// Точка входа ядра транспонирования
pub const TRANSPOSE_ENTRY: &str = "matrix_transpose";

/// Сколько ядер запускает вариант и в каком порядке
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPlan {
    /// Один запуск `matrix_mul`
    Single,
    /// `matrix_transpose` над правым операндом, затем `matrix_mul`,
    /// ожидающий событие транспонирования
    TransposeRhs,
}

impl DispatchPlan {
    pub fn entry_points(self) -> &'static [&'static str] {
        match self {
            DispatchPlan::Single => &[MULTIPLY_ENTRY],
            DispatchPlan::TransposeRhs => &[TRANSPOSE_ENTRY, MULTIPLY_ENTRY],
        }
    }
}

/// GPU-вариант умножения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GpuVariant {
    Naive,
    Transposed,
    Dot,
    WideVector,
    Constant,
}

impl GpuVariant {
    pub const ALL: [GpuVariant; 5] = [
        GpuVariant::Naive,
        GpuVariant::Transposed,
        GpuVariant::Dot,
        GpuVariant::WideVector,
        GpuVariant::Constant,
    ];

    /// Имя исходника ядра, по которому его находит загрузчик
    pub fn kernel_source_name(self) -> &'static str {
        match self {
            GpuVariant::Naive => "naive",
            GpuVariant::Transposed => "transposed",
            GpuVariant::Dot => "dot",
            GpuVariant::WideVector => "wide-vector",
            GpuVariant::Constant => "constant",
        }
    }

    pub fn dispatch_plan(self) -> DispatchPlan {
        match self {
            GpuVariant::Transposed => DispatchPlan::TransposeRhs,
            _ => DispatchPlan::Single,
        }
    }
}

impl fmt::Display for GpuVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kernel_source_name())
    }
}

/// Любой вариант умножения, включая эталонный на CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Variant {
    Reference,
    Gpu(GpuVariant),
}

impl Variant {
    pub fn name(self) -> &'static str {
        match self {
            Variant::Reference => "reference",
            Variant::Gpu(gpu) => gpu.kernel_source_name(),
        }
    }

    pub fn all_gpu() -> Vec<Variant> {
        GpuVariant::ALL.iter().copied().map(Variant::Gpu).collect()
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Variant {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if name == "reference" {
            return Ok(Variant::Reference);
        }
        GpuVariant::ALL
            .iter()
            .find(|gpu| gpu.kernel_source_name() == name)
            .map(|gpu| Variant::Gpu(*gpu))
            .ok_or_else(|| format!("unknown variant '{}'", name))
    }
}

impl TryFrom<String> for Variant {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<Variant> for String {
    fn from(variant: Variant) -> Self {
        variant.name().to_string()
    }
}
