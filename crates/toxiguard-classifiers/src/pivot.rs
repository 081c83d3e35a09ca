//! Label-major to sample-major transpose

use toxiguard_core::{Error, LabelMatrix, PredictionResult, Result};

/// Transpose `matrix[label][sample]` into one result map per sample.
///
/// Each result holds exactly one entry per label, in label order. Fails if
/// the matrix label dimension does not match `labels`.
pub fn pivot(matrix: &LabelMatrix, labels: &[String]) -> Result<Vec<PredictionResult>> {
    if matrix.num_labels() != labels.len() {
        return Err(Error::internal(format!(
            "matrix has {} label rows but model defines {} labels",
            matrix.num_labels(),
            labels.len()
        )));
    }

    let mut results: Vec<PredictionResult> = (0..matrix.num_samples())
        .map(|_| PredictionResult::with_capacity(labels.len()))
        .collect();

    for (label, row) in labels.iter().zip(matrix.rows()) {
        for (result, &probability) in results.iter_mut().zip(row) {
            result.push(label.as_str(), probability);
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pivot_transposes() {
        let matrix = LabelMatrix::from_rows(
            vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]],
            3,
        )
        .unwrap();
        let labels = labels(&["toxic", "insult"]);

        let results = pivot(&matrix, &labels).unwrap();

        assert_eq!(results.len(), 3);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.len(), 2);
            for (j, label) in labels.iter().enumerate() {
                assert_eq!(result.get(label), matrix.get(j, i));
            }
        }
    }

    #[test]
    fn test_pivot_empty_samples() {
        let matrix = LabelMatrix::empty(2);
        let results = pivot(&matrix, &labels(&["a", "b"])).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_pivot_label_mismatch() {
        let matrix = LabelMatrix::from_rows(vec![vec![0.1]], 1).unwrap();
        let result = pivot(&matrix, &labels(&["a", "b"]));
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[test]
    fn test_pivot_grid_shapes() {
        for num_labels in 1..4 {
            for num_samples in 0..5 {
                let rows: Vec<Vec<f32>> = (0..num_labels)
                    .map(|j| {
                        (0..num_samples)
                            .map(|i| (j * 10 + i) as f32 / 100.0)
                            .collect()
                    })
                    .collect();
                let matrix = LabelMatrix::from_rows(rows, num_samples).unwrap();
                let names: Vec<String> = (0..num_labels).map(|j| format!("l{}", j)).collect();

                let results = pivot(&matrix, &names).unwrap();
                assert_eq!(results.len(), num_samples);
                for (i, result) in results.iter().enumerate() {
                    assert_eq!(result.len(), num_labels);
                    for (j, name) in names.iter().enumerate() {
                        assert_eq!(result.get(name), matrix.get(j, i));
                    }
                }
            }
        }
    }
}
