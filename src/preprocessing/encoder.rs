//! Label encoding of categorical columns
//!
//! A [`CategoryCodec`] is the frozen vocabulary of one column: the sorted set
//! of distinct raw values seen at fit time, each mapped to its position.
//! [`LabelEncoders`] keeps one codec per encoded column and is returned to
//! the caller so new rows can be encoded, and codes decoded, after training.

use crate::error::{OffenseError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Bijection between the distinct values of a column and `0..k`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCodec {
    column: String,
    categories: Vec<String>,
    index: BTreeMap<String, usize>,
}

impl CategoryCodec {
    /// Build the vocabulary from raw values; codes follow sorted order
    pub fn fit<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();
        let categories: Vec<String> = distinct.into_iter().collect();
        let index = categories
            .iter()
            .enumerate()
            .map(|(code, value)| (value.clone(), code))
            .collect();

        Self {
            column: column.into(),
            categories,
            index,
        }
    }

    /// Fit on a string column of a frame
    pub fn fit_series(series: &Series) -> Result<Self> {
        let as_string = series.cast(&DataType::String)?;
        let ca = as_string.str()?;
        if ca.null_count() > 0 {
            return Err(OffenseError::DataError(format!(
                "column '{}' still has missing values; fill them before encoding",
                series.name()
            )));
        }
        Ok(Self::fit(series.name().to_string(), ca.into_iter().flatten()))
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn encode(&self, value: &str) -> Result<usize> {
        self.index
            .get(value)
            .copied()
            .ok_or_else(|| OffenseError::UnknownCategory {
                column: self.column.clone(),
                value: value.to_string(),
            })
    }

    pub fn decode(&self, code: usize) -> Result<&str> {
        self.categories
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| OffenseError::UnknownCode {
                column: self.column.clone(),
                code,
                n_categories: self.categories.len(),
            })
    }

    /// Replace raw values with their codes (Int64 column, same name)
    pub fn encode_series(&self, series: &Series) -> Result<Series> {
        let as_string = series.cast(&DataType::String)?;
        let ca = as_string.str()?;

        let codes = ca
            .into_iter()
            .map(|v| {
                let value = v.ok_or_else(|| {
                    OffenseError::DataError(format!("missing value in column '{}'", self.column))
                })?;
                self.encode(value).map(|code| code as i64)
            })
            .collect::<Result<Vec<i64>>>()?;

        Ok(Series::new(series.name().clone(), codes))
    }

    /// Map codes back to raw values (String column, same name)
    pub fn decode_series(&self, series: &Series) -> Result<Series> {
        let as_int = series.cast(&DataType::Int64)?;
        let ca = as_int.i64()?;

        let values = ca
            .into_iter()
            .map(|v| match v {
                Some(code) if code >= 0 => self.decode(code as usize).map(str::to_string),
                _ => Err(OffenseError::DataError(format!(
                    "invalid code {:?} in column '{}'",
                    v, self.column
                ))),
            })
            .collect::<Result<Vec<String>>>()?;

        Ok(Series::new(series.name().clone(), values))
    }
}

/// The codecs of one encoding run, keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoders {
    codecs: BTreeMap<String, CategoryCodec>,
}

impl LabelEncoders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, codec: CategoryCodec) {
        self.codecs.insert(codec.column().to_string(), codec);
    }

    pub fn get(&self, column: &str) -> Option<&CategoryCodec> {
        self.codecs.get(column)
    }

    /// Codec for a column, or `FeatureNotFound`
    pub fn codec(&self, column: &str) -> Result<&CategoryCodec> {
        self.get(column)
            .ok_or_else(|| OffenseError::FeatureNotFound(column.to_string()))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.codecs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Encode the named columns of a raw row, in the given order
    pub fn encode_row(&self, row: &BTreeMap<String, String>, columns: &[String]) -> Result<Vec<f64>> {
        columns
            .iter()
            .map(|column| {
                let value = row
                    .get(column)
                    .ok_or_else(|| OffenseError::FeatureNotFound(column.clone()))?;
                self.codec(column)?.encode(value).map(|code| code as f64)
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}
