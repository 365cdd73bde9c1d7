//! Бенчмарк умножения матриц: эталон на CPU против GPU-вариантов
//!
//! Запуск: `opencl_matmul [config.json]`. Без файла используются
//! параметры по умолчанию.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use opencl_matmul::{
    benchmark::{Backend, BenchmarkConfig, Harness, OpenClFactory, OutputFormat},
    matrix::{EmbeddedKernels, KernelDirectory, KernelSource},
    opencl::{ComputeApi, EmulatedOpenCl},
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::Rc;

fn compute_api(backend: Backend) -> Result<Rc<dyn ComputeApi>> {
    match backend {
        Backend::Emulated => Ok(Rc::new(EmulatedOpenCl::with_gpu())),
        #[cfg(feature = "opencl")]
        Backend::Native => Ok(Rc::new(opencl_matmul::opencl::NativeOpenCl)),
        #[cfg(not(feature = "opencl"))]
        Backend::Native => anyhow::bail!("Нативный OpenCL недоступен: соберите с `--features opencl`"),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => BenchmarkConfig::load(&path)
            .with_context(|| format!("Не удалось загрузить конфигурацию {}", path))?,
        None => BenchmarkConfig::default(),
    };

    println!("Бенчмарк умножения матриц");
    println!("Бэкенд: {:?}, режим замера: {:?}, итераций: {}", config.backend, config.timing, config.iterations);

    let kernels: Box<dyn KernelSource> = match &config.kernel_dir {
        Some(dir) => Box::new(KernelDirectory::new(dir)),
        None => Box::new(EmbeddedKernels),
    };
    let factory = OpenClFactory::new(compute_api(config.backend)?, kernels);
    let harness = Harness::new(factory, config.timing, config.iterations);

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let pb = ProgressBar::new(config.shapes.len() as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
        .context("Некорректный шаблон прогресс-бара")?
        .progress_chars("#>-"));

    let report = harness
        .run(&config.shapes, config.input, &config.variants, &mut rng, &pb)
        .context("Эталонное умножение завершилось ошибкой")?;

    match config.output {
        OutputFormat::Table => {
            println!("\nРезультаты:");
            report.to_table().printstd();
        }
        OutputFormat::Csv => print!("{}", report.to_csv()),
        OutputFormat::Json => println!("{}", report.to_json().context("Не удалось сериализовать отчёт")?),
    }

    if report.mismatch_count() > 0 {
        println!("\nMatrix mismatch: {} вариантов расходятся с эталоном", report.mismatch_count());
    }
    if report.failure_count() > 0 {
        println!("Пропущено вариантов из-за ошибок: {}", report.failure_count());
    }

    Ok(())
}
