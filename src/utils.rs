// src/utils.rs

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

// Sample standard deviation (divide by n-1); undefined below two observations
pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_covariance(values, values).map(f64::sqrt)
}

// Sample covariance between two equally long series
pub fn sample_covariance(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let covariance = xs
        .iter()
        .zip(ys.iter())
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum::<f64>()
        / (n - 1.0);

    Some(covariance)
}

// Pearson correlation; a constant series correlates with nothing
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let cov = sample_covariance(xs, ys)?;
    let std_x = sample_std(xs)?;
    let std_y = sample_std(ys)?;

    if std_x == 0.0 || std_y == 0.0 {
        return Some(0.0);
    }
    Some(cov / (std_x * std_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        let result = mean(&[0.01, 0.02, 0.03]).unwrap();
        assert!((result - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_sample_std_uses_n_minus_one() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let result = sample_std(&values).unwrap();
        // Population std is 2.0; sample std is sqrt(32 / 7)
        let expected = (32.0_f64 / 7.0).sqrt();
        assert!((result - expected).abs() < 1e-12);
    }

    #[test]
    fn test_sample_std_needs_two_observations() {
        assert_eq!(sample_std(&[0.05]), None);
        assert_eq!(sample_std(&[]), None);
    }

    #[test]
    fn test_sample_covariance_length_mismatch() {
        assert_eq!(sample_covariance(&[1.0, 2.0], &[1.0]), None);
    }

    #[test]
    fn test_pearson() {
        let x = vec![0.01, -0.02, 0.03, 0.00];
        let y: Vec<f64> = x.iter().map(|v| -2.0 * v).collect();

        let result = pearson(&x, &y).unwrap();
        assert!((result + 1.0).abs() < 1e-12);

        let flat = vec![0.5, 0.5, 0.5, 0.5];
        assert_eq!(pearson(&x, &flat), Some(0.0));
    }
}
