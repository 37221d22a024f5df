use bandgap_core::{Float, Tensor, TensorError, TensorResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Rows assigned to each side of a split, in shuffled order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with `seed` and hold out `ceil(n * test_ratio)` rows.
///
/// With at least two rows, both sides are guaranteed to be non-empty.
pub fn split_indices(n: usize, test_ratio: f64, seed: u64) -> TensorResult<SplitIndices> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(TensorError::InvalidOperation(format!(
            "test_ratio must be in (0, 1), got {}",
            test_ratio
        )));
    }
    if n < 2 {
        return Err(TensorError::InvalidOperation(format!(
            "cannot split {} rows into train and test sets",
            n
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_size = ((n as f64 * test_ratio).ceil() as usize).clamp(1, n - 1);
    let test = indices.split_off(n - test_size);
    Ok(SplitIndices {
        train: indices,
        test,
    })
}

/// Split data into training and test sets.
///
/// Returns `(X_train, X_test, y_train, y_test)`.
pub fn train_test_split<T: Float>(
    x: &Tensor<T>,
    y: &Tensor<T>,
    test_ratio: f64,
    seed: u64,
) -> TensorResult<(Tensor<T>, Tensor<T>, Tensor<T>, Tensor<T>)> {
    let n = x.nrows()?;
    if n != y.numel() {
        return Err(TensorError::ShapeMismatch {
            expected: vec![n],
            got: vec![y.numel()],
        });
    }
    let SplitIndices { train, test } = split_indices(n, test_ratio, seed)?;

    Ok((
        x.select_rows(&train)?,
        x.select_rows(&test)?,
        y.select_rows(&train)?,
        y.select_rows(&test)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(n: usize) -> (Tensor<f64>, Tensor<f64>) {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (i * 2) as f64]).collect();
        let y: Vec<f64> = (0..n).map(|i| i as f64).collect();
        (Tensor::from_vec2d(&rows).unwrap(), Tensor::from_slice(&y))
    }

    #[test]
    fn test_train_test_split_sizes() {
        let (x, y) = data(10);
        let (x_train, x_test, y_train, y_test) = train_test_split(&x, &y, 0.2, 42).unwrap();

        assert_eq!(x_train.nrows().unwrap(), 8);
        assert_eq!(x_test.nrows().unwrap(), 2);
        assert_eq!(y_train.numel(), 8);
        assert_eq!(y_test.numel(), 2);
        // rows stay aligned with their labels
        for i in 0..8 {
            assert_eq!(x_train.get(&[i, 0]).unwrap(), y_train.data()[i]);
        }
    }

    #[test]
    fn test_test_size_rounds_up() {
        let idx = split_indices(11, 0.2, 1).unwrap();
        assert_eq!(idx.test.len(), 3);
        assert_eq!(idx.train.len(), 8);
    }

    #[test]
    fn test_split_is_deterministic_and_disjoint() {
        let a = split_indices(100, 0.2, 15).unwrap();
        let b = split_indices(100, 0.2, 15).unwrap();
        assert_eq!(a, b);

        let mut all: Vec<usize> = a.train.iter().chain(a.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());

        let c = split_indices(100, 0.2, 101).unwrap();
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn test_length_mismatch() {
        let (x, _) = data(5);
        let y = Tensor::from_slice(&[0.0, 1.0]);
        assert!(train_test_split(&x, &y, 0.2, 0).is_err());
    }

    #[test]
    fn test_too_few_rows() {
        assert!(split_indices(1, 0.2, 0).is_err());
        assert!(split_indices(10, 1.0, 0).is_err());
    }
}
