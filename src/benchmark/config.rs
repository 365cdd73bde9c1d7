//! Конфигурация запуска бенчмарка

use crate::matrix::{MatrixType, Variant};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Размер левого операнда; правый получается транспонированием
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub width: usize,
    pub height: usize,
}

impl Shape {
    pub fn new(width: usize, height: usize) -> Self {
        Shape { width, height }
    }
}

/// Что именно попадает в замер времени
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimingMode {
    /// Только вызовы `multiply`, вариант создаётся до замера
    #[default]
    CallOnly,
    /// Создание варианта плюс вызовы
    ConstructAndCall,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

/// Реализация OpenCL, на которой выполняются GPU-варианты
///
/// По умолчанию всегда `native`; эмулятор включается только явно.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    #[default]
    Native,
    Emulated,
}

/// Параметры бенчмарка; у каждого поля есть значение по умолчанию
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchmarkConfig {
    pub shapes: Vec<Shape>,
    pub input: MatrixType,
    pub seed: Option<u64>,
    pub variants: Vec<Variant>,
    pub timing: TimingMode,
    pub iterations: usize,
    pub kernel_dir: Option<PathBuf>,
    pub output: OutputFormat,
    pub backend: Backend,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            shapes: vec![Shape::new(3, 2)],
            input: MatrixType::default(),
            seed: None,
            variants: Variant::all_gpu(),
            timing: TimingMode::default(),
            iterations: 1,
            kernel_dir: None,
            output: OutputFormat::default(),
            backend: Backend::default(),
        }
    }
}

impl BenchmarkConfig {
    /// Читает и проверяет JSON-файл конфигурации
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: BenchmarkConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            bail!("iterations must be at least 1");
        }
        if self.shapes.is_empty() {
            bail!("at least one matrix shape is required");
        }
        if let Some(shape) = self.shapes.iter().find(|s| s.width == 0 || s.height == 0) {
            bail!("matrix dimensions must be positive, got {}x{}", shape.width, shape.height);
        }
        match self.input {
            MatrixType::Random { limit: 0 } => bail!("random input limit must be positive"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::GpuVariant;

    #[test]
    fn empty_object_gives_defaults() {
        let config: BenchmarkConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BenchmarkConfig::default());
        assert_eq!(config.shapes, vec![Shape::new(3, 2)]);
        assert_eq!(config.variants.len(), GpuVariant::ALL.len());
        assert_eq!(config.timing, TimingMode::CallOnly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_backend_is_native() {
        assert_eq!(Backend::default(), Backend::Native);
        assert_eq!(BenchmarkConfig::default().backend, Backend::Native);
        let config: BenchmarkConfig = serde_json::from_str(r#"{"seed": 3}"#).unwrap();
        assert_eq!(config.backend, Backend::Native);
        let config: BenchmarkConfig = serde_json::from_str(r#"{"backend": "emulated"}"#).unwrap();
        assert_eq!(config.backend, Backend::Emulated);
    }

    #[test]
    fn parses_full_config() {
        let json = r#"{
            "shapes": [{"width": 64, "height": 32}],
            "input": {"kind": "filled", "value": 2.0},
            "seed": 42,
            "variants": ["reference", "transposed"],
            "timing": "construct-and-call",
            "iterations": 5,
            "kernel_dir": "kernels",
            "output": "csv",
            "backend": "emulated"
        }"#;
        let config: BenchmarkConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.shapes, vec![Shape::new(64, 32)]);
        assert_eq!(config.input, MatrixType::Filled { value: 2.0 });
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.variants, vec![Variant::Reference, Variant::Gpu(GpuVariant::Transposed)]);
        assert_eq!(config.timing, TimingMode::ConstructAndCall);
        assert_eq!(config.iterations, 5);
        assert_eq!(config.kernel_dir, Some(PathBuf::from("kernels")));
        assert_eq!(config.output, OutputFormat::Csv);
        assert_eq!(config.backend, Backend::Emulated);
    }

    #[test]
    fn rejects_unknown_variant() {
        let result: serde_json::Result<BenchmarkConfig> = serde_json::from_str(r#"{"variants": ["tiled"]}"#);
        assert!(result.unwrap_err().to_string().contains("unknown variant 'tiled'"));
    }

    #[test]
    fn validation_errors() {
        let mut config = BenchmarkConfig { iterations: 0, ..Default::default() };
        assert!(config.validate().is_err());

        config.iterations = 1;
        config.shapes.clear();
        assert!(config.validate().is_err());

        config.shapes.push(Shape::new(0, 4));
        assert!(config.validate().unwrap_err().to_string().contains("0x4"));

        config.shapes = vec![Shape::new(2, 2)];
        config.input = MatrixType::Random { limit: 0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reports_path() {
        let path = std::env::temp_dir().join(format!("opencl_matmul_config_{}.json", std::process::id()));
        std::fs::write(&path, r#"{"iterations": 0}"#).unwrap();
        let error = BenchmarkConfig::load(&path).unwrap_err();
        assert!(error.to_string().contains("iterations"));

        std::fs::write(&path, "not json").unwrap();
        let error = BenchmarkConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", error).contains("Failed to parse config file"));
        std::fs::remove_file(&path).unwrap();
    }
}
