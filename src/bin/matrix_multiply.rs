//! Умножение двух матриц 10x10, заполненных двойками, одним вариантом
//!
//! Запуск: `matrix_multiply [вариант]`, по умолчанию `naive`.
use anyhow::{anyhow, Context, Result};
use opencl_matmul::{
    benchmark::{OpenClFactory, OperationFactory},
    matrix::{EmbeddedKernels, Matrix, Variant},
    opencl::ComputeApi,
    utils::measure_time,
};
use std::rc::Rc;

const MATRIX_SIZE: usize = 10;

fn main() -> Result<()> {
    env_logger::init();

    let variant: Variant = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "naive".to_string())
        .parse()
        .map_err(|e| anyhow!("{}", e))?;

    let api = native_api()?;
    let factory = OpenClFactory::new(api, Box::new(EmbeddedKernels));
    let operations = factory
        .create(variant)
        .with_context(|| format!("Не удалось подготовить вариант {}", variant))?;

    let lhs = Matrix::filled(MATRIX_SIZE, MATRIX_SIZE, 2.0);
    let rhs = Matrix::filled(MATRIX_SIZE, MATRIX_SIZE, 2.0);

    let (result, duration) = measure_time(|| operations.multiply(&lhs, &rhs));
    let result = result.context("Ошибка при умножении матриц")?;

    println!("Вариант: {}", operations.name());
    println!("Результат ({}x{}), вычислено за {:?}:", result.width(), result.height(), duration);
    print!("{}", result);

    Ok(())
}

#[cfg(feature = "opencl")]
fn native_api() -> Result<Rc<dyn ComputeApi>> {
    Ok(Rc::new(opencl_matmul::opencl::NativeOpenCl))
}

#[cfg(not(feature = "opencl"))]
fn native_api() -> Result<Rc<dyn ComputeApi>> {
    anyhow::bail!("Нативный OpenCL недоступен: соберите с `--features opencl`")
}
