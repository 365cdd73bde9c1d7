//! Плотная матрица и способы её заполнения

use ndarray::Array2;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// Плотная матрица `f32`, хранимая построчно (`index = y * width + x`)
///
/// После создания не изменяется: транспонирование и умножение
/// возвращают новые матрицы. Равенство поэлементное и точное.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    width: usize,
    height: usize,
    elements: Vec<f32>,
}

impl Matrix {
    /// Матрица, заполненная нулями
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0.0)
    }

    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        assert_dimensions(width, height);
        Matrix {
            width,
            height,
            elements: vec![value; width * height],
        }
    }

    /// Случайные целые из `[0, limit)`, сохранённые как `f32`
    ///
    /// Воспроизводимость определяется состоянием переданного генератора.
    pub fn random<R: Rng + ?Sized>(width: usize, height: usize, limit: u32, rng: &mut R) -> Self {
        assert_dimensions(width, height);
        assert!(limit > 0, "random matrix limit must be positive");
        let distribution = Uniform::new(0, limit);
        let elements = (0..width * height)
            .map(|_| distribution.sample(rng) as f32)
            .collect();
        Matrix { width, height, elements }
    }

    pub fn from_elements(width: usize, height: usize, elements: Vec<f32>) -> Self {
        assert_dimensions(width, height);
        assert_eq!(
            elements.len(),
            width * height,
            "{}x{} matrix needs {} elements",
            width,
            height,
            width * height
        );
        Matrix { width, height, elements }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.elements[y * self.width + x]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.elements
    }

    /// Размер данных в байтах
    pub fn byte_size(&self) -> usize {
        self.elements.len() * std::mem::size_of::<f32>()
    }

    pub fn transpose(&self) -> Matrix {
        let width = self.height;
        let height = self.width;
        let mut elements = vec![0.0f32; width * height];
        for y in 0..self.height {
            for x in 0..self.width {
                elements[x * width + y] = self.elements[y * self.width + x];
            }
        }
        Matrix { width, height, elements }
    }

    pub fn to_array(&self) -> Array2<f32> {
        Array2::from_shape_fn((self.height, self.width), |(y, x)| self.get(x, y))
    }
}

fn assert_dimensions(width: usize, height: usize) {
    assert!(width > 0 && height > 0, "matrix dimensions must be positive, got {}x{}", width, height);
}

impl Index<usize> for Matrix {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.elements[index]
    }
}

impl From<&Array2<f32>> for Matrix {
    fn from(array: &Array2<f32>) -> Self {
        let (height, width) = array.dim();
        Matrix::from_elements(width, height, array.iter().copied().collect())
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.elements.chunks(self.width) {
            let line: Vec<String> = row.iter().map(|value| format!("{:.2}", value)).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// Тип матриц для вычислений
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MatrixType {
    /// Матрица, заполненная одним значением
    Filled { value: f32 },
    /// Случайные целые из `[0, limit)`
    Random { limit: u32 },
}

impl Default for MatrixType {
    fn default() -> Self {
        MatrixType::Random { limit: 20 }
    }
}

impl MatrixType {
    pub fn build<R: Rng + ?Sized>(&self, width: usize, height: usize, rng: &mut R) -> Matrix {
        match *self {
            MatrixType::Filled { value } => Matrix::filled(width, height, value),
            MatrixType::Random { limit } => Matrix::random(width, height, limit, rng),
        }
    }
}
