//! Бенчмарк вариантов умножения
//!
//! Каждый вариант сверяется с эталоном на CPU на точное равенство,
//! затем сравнивается время.

pub mod config;
pub mod harness;
pub mod report;

pub use config::{Backend, BenchmarkConfig, OutputFormat, Shape, TimingMode};
pub use harness::{Harness, OpenClFactory, OperationFactory};
pub use report::{BenchmarkReport, Measurement, Outcome, ShapeRun};
