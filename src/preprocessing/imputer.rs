//! Missing value imputation

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Placeholder written into every absent cell
pub const UNKNOWN: &str = "Unknown";

/// Replaces absent cells with a constant string.
///
/// A column with absent cells is converted to its string representation
/// before filling. Complete columns keep their dtype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imputer {
    fill_value: String,
}

impl Default for Imputer {
    fn default() -> Self {
        Self::constant(UNKNOWN)
    }
}

impl Imputer {
    pub fn constant(fill_value: impl Into<String>) -> Self {
        Self {
            fill_value: fill_value.into(),
        }
    }

    pub fn fill_value(&self) -> &str {
        &self.fill_value
    }

    /// Fill all columns of the frame
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let columns = df
            .get_columns()
            .iter()
            .map(|column| self.fill_series(column.as_materialized_series()).map(Column::from))
            .collect::<Result<Vec<_>>>()?;

        Ok(DataFrame::new(columns)?)
    }

    fn fill_series(&self, series: &Series) -> Result<Series> {
        if series.null_count() == 0 {
            return Ok(series.clone());
        }

        let as_string = series.cast(&DataType::String)?;
        let ca = as_string.str()?;

        let filled: Vec<&str> = ca
            .into_iter()
            .map(|v| v.unwrap_or(self.fill_value.as_str()))
            .collect();

        Ok(Series::new(series.name().clone(), filled))
    }
}

/// Number of absent cells per column, skipping columns with none
pub fn missing_counts(df: &DataFrame) -> Vec<(String, usize)> {
    df.get_columns()
        .iter()
        .filter(|c| c.null_count() > 0)
        .map(|c| (c.name().to_string(), c.null_count()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_strings_and_numbers() {
        let df = df!(
            "Weapon" => &[Some("Knife"), None, Some("Gun")],
            "value" => &[Some(1i64), Some(2), None]
        )
        .unwrap();

        let filled = Imputer::default().transform(&df).unwrap();
        assert!(missing_counts(&filled).is_empty());

        let weapon: Vec<&str> = filled
            .column("Weapon")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(weapon, vec!["Knife", "Unknown", "Gun"]);

        let value = filled.column("value").unwrap().str().unwrap();
        assert_eq!(value.get(0), Some("1"));
        assert_eq!(value.get(2), Some("Unknown"));
    }

    #[test]
    fn test_complete_columns_keep_dtype() {
        let df = df!(
            "Weapon" => &[Some("Knife"), None],
            "value" => &[1i64, 2],
            "rate" => &[0.5f64, 1.5]
        )
        .unwrap();

        let filled = Imputer::default().transform(&df).unwrap();
        assert_eq!(filled.column("Weapon").unwrap().dtype(), &DataType::String);
        assert_eq!(filled.column("value").unwrap().dtype(), &DataType::Int64);
        assert_eq!(filled.column("rate").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_custom_placeholder() {
        let df = df!("a" => &[None::<&str>, Some("x")]).unwrap();
        let filled = Imputer::constant("N/A").transform(&df).unwrap();
        assert_eq!(filled.column("a").unwrap().str().unwrap().get(0), Some("N/A"));
    }

    #[test]
    fn test_missing_counts() {
        let df = df!(
            "a" => &[None::<i64>, None, Some(1)],
            "b" => &[1i64, 2, 3]
        )
        .unwrap();
        assert_eq!(missing_counts(&df), vec![("a".to_string(), 2)]);
    }
}
