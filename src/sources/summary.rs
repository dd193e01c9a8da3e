//! Summary statistics for a single source table

use crate::error::{OffenseError, Result};
use crate::preprocessing::UNKNOWN;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Descriptive statistics of a numeric column.
///
/// Standard deviation uses the sample estimator and quantiles are linearly
/// interpolated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub null_count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnSummary {
    /// Summarize a numeric column of a frame
    pub fn from_frame(df: &DataFrame, column: &str) -> Result<Self> {
        let series = df
            .column(column)
            .map_err(|_| OffenseError::FeatureNotFound(column.to_string()))?
            .as_materialized_series()
            .cast(&DataType::Float64)?;

        Self::from_chunked(column, series.f64()?)
    }

    pub fn from_values(name: &str, values: &[f64]) -> Result<Self> {
        Self::from_chunked(name, &Float64Chunked::from_slice(name.into(), values))
    }

    fn from_chunked(name: &str, ca: &Float64Chunked) -> Result<Self> {
        let count = ca.len() - ca.null_count();
        let no_values = || {
            OffenseError::DataError(format!(
                "column '{}' has no numeric values to summarize",
                name
            ))
        };

        let mean = ca.mean().ok_or_else(no_values)?;
        let min = ca.min().ok_or_else(no_values)?;
        let max = ca.max().ok_or_else(no_values)?;
        let median = ca.median().ok_or_else(no_values)?;
        let q25 = ca.quantile(0.25, QuantileMethod::Linear)?.ok_or_else(no_values)?;
        let q75 = ca.quantile(0.75, QuantileMethod::Linear)?.ok_or_else(no_values)?;
        let std = if count > 1 { ca.std(1) } else { None };

        Ok(Self {
            name: name.to_string(),
            count,
            null_count: ca.null_count(),
            mean,
            std,
            min,
            q25,
            median,
            q75,
            max,
        })
    }
}

/// Summed value for one category of a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub rows: usize,
}

impl CategoryTotal {
    /// Sum `value_column` per distinct `category_column` value, sorted by category
    pub fn collect(df: &DataFrame, category_column: &str, value_column: &str) -> Result<Vec<Self>> {
        for name in [category_column, value_column] {
            if df.column(name).is_err() {
                return Err(OffenseError::FeatureNotFound(name.to_string()));
            }
        }

        let totals = df
            .clone()
            .lazy()
            .group_by([col(category_column)
                .cast(DataType::String)
                .fill_null(lit(UNKNOWN))
                .alias("category")])
            .agg([
                col(value_column).cast(DataType::Float64).sum().alias("total"),
                len().alias("rows"),
            ])
            .sort(["category"], SortMultipleOptions::default())
            .collect()?;

        let categories = totals.column("category")?.str()?;
        let sums = totals.column("total")?.f64()?;
        let rows = totals.column("rows")?.cast(&DataType::UInt64)?;
        let rows = rows.u64()?;

        Ok(categories
            .into_iter()
            .zip(sums.into_iter())
            .zip(rows.into_iter())
            .map(|((category, total), rows)| CategoryTotal {
                category: category.unwrap_or(UNKNOWN).to_string(),
                total: total.unwrap_or(0.0),
                rows: rows.unwrap_or(0) as usize,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_matches_describe() {
        let summary = ColumnSummary::from_values("value", &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(summary.count, 4);
        assert!((summary.mean - 2.5).abs() < 1e-12);
        assert!((summary.std.unwrap() - 1.2909944487358056).abs() < 1e-12);
        assert!((summary.q25 - 1.75).abs() < 1e-12);
        assert!((summary.median - 2.5).abs() < 1e-12);
        assert!((summary.q75 - 3.25).abs() < 1e-12);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 4.0);
    }

    #[test]
    fn test_single_value_has_no_std() {
        let summary = ColumnSummary::from_values("value", &[7.0]).unwrap();
        assert!(summary.std.is_none());
        assert_eq!(summary.median, 7.0);
    }

    #[test]
    fn test_empty_values_error() {
        assert!(ColumnSummary::from_values("value", &[]).is_err());
    }

    #[test]
    fn test_from_frame_counts_nulls() {
        let df = df!("value" => &[Some(1.0), None, Some(3.0)]).unwrap();
        let summary = ColumnSummary::from_frame(&df, "value").unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.null_count, 1);
        assert_eq!(summary.mean, 2.0);
        assert_eq!(summary.median, 2.0);
    }

    #[test]
    fn test_category_totals() {
        let df = df!(
            "key" => &["Knife", "Gun", "Knife"],
            "value" => &[2.0, 5.0, 3.0]
        )
        .unwrap();

        let totals = CategoryTotal::collect(&df, "key", "value").unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].category, "Gun");
        assert_eq!(totals[1].total, 5.0);
        assert_eq!(totals[1].rows, 2);
    }

    #[test]
    fn test_category_totals_skip_null_values() {
        let df = df!(
            "Weapon" => &[Some("Knife"), None, Some("Knife"), Some("Gun")],
            "value" => &[Some(2i64), Some(4), None, Some(1)]
        )
        .unwrap();

        let totals = CategoryTotal::collect(&df, "Weapon", "value").unwrap();
        let categories: Vec<&str> = totals.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(categories, vec!["Gun", "Knife", "Unknown"]);
        assert_eq!(totals[1].total, 2.0);
        assert_eq!(totals[1].rows, 2);
        assert_eq!(totals[2].total, 4.0);
    }

    #[test]
    fn test_category_totals_missing_column() {
        let df = df!("key" => &["a"], "value" => &[1.0]).unwrap();
        assert!(matches!(
            CategoryTotal::collect(&df, "Weapon", "value"),
            Err(OffenseError::FeatureNotFound(ref c)) if c == "Weapon"
        ));
    }
}
