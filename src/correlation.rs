// src/correlation.rs

use ndarray::Array2;
use std::collections::BTreeMap;

use crate::models::{ReturnTable, Symbol};
use crate::utils::pearson;

#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub symbols: Vec<Symbol>,
    pub values: Array2<f64>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.symbols.iter().position(|s| s == a)?;
        let j = self.symbols.iter().position(|s| s == b)?;
        Some(self.values[[i, j]])
    }
}

// Pearson correlation of daily returns among the given symbols, in order
pub fn correlation_matrix(returns: &ReturnTable, symbols: &[Symbol]) -> CorrelationMatrix {
    let columns: Vec<&[f64]> = symbols
        .iter()
        .map(|s| returns.column(s).unwrap_or(&[]))
        .collect();

    let n = symbols.len();
    let mut values = Array2::zeros((n, n));
    for i in 0..n {
        values[[i, i]] = 1.0;
        for j in (i + 1)..n {
            let rho = pearson(columns[i], columns[j]).unwrap_or(0.0);
            values[[i, j]] = rho;
            values[[j, i]] = rho;
        }
    }

    CorrelationMatrix {
        symbols: symbols.to_vec(),
        values,
    }
}

// Compounded return path, prod(1 + r) - 1, at each date of the table
pub fn cumulative_paths(returns: &ReturnTable, symbols: &[Symbol]) -> BTreeMap<Symbol, Vec<f64>> {
    symbols
        .iter()
        .filter_map(|symbol| {
            let column = returns.column(symbol)?;
            let mut growth = 1.0;
            let path = column
                .iter()
                .map(|r| {
                    growth *= 1.0 + r;
                    growth - 1.0
                })
                .collect();
            Some((symbol.clone(), path))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table() -> ReturnTable {
        let dates = (2..=5)
            .map(|d| NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date"))
            .collect();
        ReturnTable {
            dates,
            columns: BTreeMap::from([
                ("A".to_string(), vec![0.01, -0.02, 0.03, 0.00]),
                ("B".to_string(), vec![0.02, -0.04, 0.06, 0.00]),
                ("C".to_string(), vec![0.0, 0.0, 0.0, 0.0]),
                ("^BVSP".to_string(), vec![0.005, -0.01, 0.01, 0.002]),
            ]),
        }
    }

    #[test]
    fn test_correlation_matrix_is_symmetric_with_unit_diagonal() {
        let symbols = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let matrix = correlation_matrix(&table(), &symbols);

        assert_eq!(matrix.values.dim(), (3, 3));
        for i in 0..3 {
            assert_eq!(matrix.values[[i, i]], 1.0);
            for j in 0..3 {
                assert_eq!(matrix.values[[i, j]], matrix.values[[j, i]]);
            }
        }
        assert!((matrix.get("A", "B").unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(matrix.get("A", "C"), Some(0.0));
        assert_eq!(matrix.get("A", "^BVSP"), None);
    }

    #[test]
    fn test_cumulative_paths_compound() {
        let symbols = vec!["A".to_string()];
        let paths = cumulative_paths(&table(), &symbols);

        let path = &paths["A"];
        let expected = 1.01 * 0.98 * 1.03 - 1.0;
        assert_eq!(path.len(), 4);
        assert!((path[0] - 0.01).abs() < 1e-12);
        assert!((path[2] - expected).abs() < 1e-12);
        assert!((path[3] - expected).abs() < 1e-12);
    }
}
