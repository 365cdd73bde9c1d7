//! Результаты бенчмарка и их вывод

use super::config::{Shape, TimingMode};
use crate::error::DispatchError;
use crate::matrix::{Mismatch, Variant};
use prettytable::{row, Table};
use serde::{Serialize, Serializer};

/// Итог проверки одного варианта
#[derive(Debug, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "kebab-case")]
pub enum Outcome {
    Matched,
    Mismatched(Mismatch),
    Failed(#[serde(serialize_with = "serialize_error")] DispatchError),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Matched => "matched",
            Outcome::Mismatched(_) => "mismatched",
            Outcome::Failed(_) => "failed",
        }
    }

    fn summary(&self) -> String {
        match self {
            Outcome::Matched => "OK".to_string(),
            Outcome::Mismatched(mismatch) => format!(
                "Matrix mismatch: {} elements, max diff {}",
                mismatch.differing_elements, mismatch.max_difference
            ),
            Outcome::Failed(error) => format!("{}: {}", error.kind(), error),
        }
    }
}

fn serialize_error<S: Serializer>(error: &DispatchError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map([("kind", error.kind().to_string()), ("message", error.to_string())])
}

/// Замер одного варианта
#[derive(Debug, Serialize)]
pub struct Measurement {
    pub variant: Variant,
    /// Среднее время вызова; отсутствует, если вариант не отработал
    pub seconds: Option<f64>,
    pub outcome: Outcome,
}

/// Все варианты на одной паре входных матриц
#[derive(Debug, Serialize)]
pub struct ShapeRun {
    pub lhs: Shape,
    pub rhs: Shape,
    pub reference_seconds: f64,
    pub entries: Vec<Measurement>,
}

#[derive(Debug, Serialize)]
pub struct BenchmarkReport {
    pub timing: TimingMode,
    pub iterations: usize,
    pub runs: Vec<ShapeRun>,
}

impl BenchmarkReport {
    pub fn new(timing: TimingMode, iterations: usize) -> Self {
        BenchmarkReport { timing, iterations, runs: Vec::new() }
    }

    pub fn push(&mut self, run: ShapeRun) {
        self.runs.push(run);
    }

    fn entries(&self) -> impl Iterator<Item = (&ShapeRun, &Measurement)> {
        self.runs
            .iter()
            .flat_map(|run| run.entries.iter().map(move |entry| (run, entry)))
    }

    pub fn mismatch_count(&self) -> usize {
        self.entries()
            .filter(|(_, entry)| matches!(entry.outcome, Outcome::Mismatched(_)))
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.entries()
            .filter(|(_, entry)| matches!(entry.outcome, Outcome::Failed(_)))
            .count()
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["Variant", "Input", "Time, ms", "Speedup", "Result"]);
        for run in &self.runs {
            let input = format!("{}x{} * {}x{}", run.lhs.width, run.lhs.height, run.rhs.width, run.rhs.height);
            table.add_row(row![
                Variant::Reference,
                input,
                format!("{:.6}", run.reference_seconds * 1000.0),
                "1.00",
                "-"
            ]);
            for entry in &run.entries {
                let (time, speedup) = match entry.seconds {
                    Some(seconds) if seconds > 0.0 => (
                        format!("{:.6}", seconds * 1000.0),
                        format!("{:.2}", run.reference_seconds / seconds),
                    ),
                    Some(seconds) => (format!("{:.6}", seconds * 1000.0), "-".to_string()),
                    None => ("-".to_string(), "-".to_string()),
                };
                table.add_row(row![entry.variant, input, time, speedup, entry.outcome.summary()]);
            }
        }
        table
    }

    /// Строки `variant;width;height;seconds;outcome`, ширина и высота левого операнда
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("variant;width;height;seconds;outcome\n");
        for run in &self.runs {
            csv.push_str(&format!(
                "{};{};{};{:.9};reference\n",
                Variant::Reference,
                run.lhs.width,
                run.lhs.height,
                run.reference_seconds
            ));
            for entry in &run.entries {
                let seconds = entry.seconds.map(|s| format!("{:.9}", s)).unwrap_or_default();
                csv.push_str(&format!(
                    "{};{};{};{};{}\n",
                    entry.variant,
                    run.lhs.width,
                    run.lhs.height,
                    seconds,
                    entry.outcome.label()
                ));
            }
        }
        csv
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
