//! Операции над матрицами

use super::types::Matrix;
use crate::error::DispatchError;
use serde::Serialize;

/// Операция умножения матриц
///
/// `lhs.width() == rhs.height()`; результат имеет ширину `rhs.width()`
/// и высоту `lhs.height()`.
pub trait Operations {
    fn name(&self) -> &str;

    fn multiply(&self, lhs: &Matrix, rhs: &Matrix) -> Result<Matrix, DispatchError>;
}

/// Проверка согласованности размеров операндов
pub fn check_shapes(lhs: &Matrix, rhs: &Matrix) -> Result<(), DispatchError> {
    if lhs.width() != rhs.height() {
        return Err(DispatchError::ShapeMismatch {
            lhs_width: lhs.width(),
            rhs_height: rhs.height(),
        });
    }
    Ok(())
}

/// CPU реализация матричного умножения
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuOperations;

impl Operations for CpuOperations {
    fn name(&self) -> &str {
        "reference"
    }

    fn multiply(&self, lhs: &Matrix, rhs: &Matrix) -> Result<Matrix, DispatchError> {
        check_shapes(lhs, rhs)?;

        let k = lhs.width();
        let width = rhs.width();
        let height = lhs.height();
        let a = lhs.as_slice();
        let b = rhs.as_slice();

        let mut data = vec![0.0f32; width * height];
        for (i, value) in data.iter_mut().enumerate() {
            let x = i % width;
            let y = i / width;
            let mut sum = 0.0f32;
            for j in 0..k {
                sum += a[y * k + j] * b[j * width + x];
            }
            *value = sum;
        }

        Ok(Matrix::from_elements(width, height, data))
    }
}

/// Расхождение результата варианта с эталоном
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    /// Количество различающихся элементов (при совпадающей форме)
    pub differing_elements: usize,
    pub first_difference: Option<usize>,
    pub max_difference: f32,
    pub expected: Matrix,
    pub actual: Matrix,
}

/// Сравнивает результат с эталоном на точное равенство
pub fn compare_results(expected: &Matrix, actual: &Matrix) -> Option<Mismatch> {
    if expected == actual {
        return None;
    }

    let same_shape = expected.width() == actual.width() && expected.height() == actual.height();
    let (differing_elements, first_difference, max_difference) = if same_shape {
        let mut count = 0;
        let mut first = None;
        let mut max_diff = 0.0f32;
        for (i, (e, a)) in expected.as_slice().iter().zip(actual.as_slice()).enumerate() {
            // NaN != NaN тоже считается расхождением
            if e != a {
                count += 1;
                first.get_or_insert(i);
                max_diff = max_diff.max((e - a).abs());
            }
        }
        (count, first, max_diff)
    } else {
        (expected.len().max(actual.len()), None, f32::INFINITY)
    };

    Some(Mismatch {
        differing_elements,
        first_difference,
        max_difference,
        expected: expected.clone(),
        actual: actual.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplies_non_square() {
        let lhs = Matrix::from_elements(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let rhs = Matrix::from_elements(2, 3, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        let result = CpuOperations.multiply(&lhs, &rhs).unwrap();
        assert_eq!(result, Matrix::from_elements(2, 2, vec![58.0, 64.0, 139.0, 154.0]));
    }

    #[test]
    fn rejects_incompatible_shapes() {
        let lhs = Matrix::new(3, 2);
        let rhs = Matrix::new(3, 2);
        match CpuOperations.multiply(&lhs, &rhs) {
            Err(DispatchError::ShapeMismatch { lhs_width, rhs_height }) => {
                assert_eq!((lhs_width, rhs_height), (3, 2));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn compare_reports_differences() {
        let expected = Matrix::from_elements(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        assert!(compare_results(&expected, &expected.clone()).is_none());

        let actual = Matrix::from_elements(2, 2, vec![1.0, 2.5, 3.0, 1.0]);
        let mismatch = compare_results(&expected, &actual).unwrap();
        assert_eq!(mismatch.differing_elements, 2);
        assert_eq!(mismatch.first_difference, Some(1));
        assert_eq!(mismatch.max_difference, 3.0);
    }

    #[test]
    fn compare_reports_shape_difference() {
        let mismatch = compare_results(&Matrix::new(2, 3), &Matrix::new(3, 2)).unwrap();
        assert_eq!(mismatch.first_difference, None);
        assert_eq!(mismatch.differing_elements, 6);
    }

    #[test]
    fn nan_never_matches() {
        let expected = Matrix::filled(1, 1, 1.0);
        let actual = Matrix::filled(1, 1, f32::NAN);
        assert!(compare_results(&expected, &actual).is_some());
    }
}
