//! Columnar per-unit input tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ColumnSpec;
use crate::error::{EstimationError, Result};

/// One experimental unit's observations.
///
/// `y`/`n` are the experiment-period numerator and denominator; `x`/`m` the
/// optional pre-period pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Experiment-period numerator.
    pub y: f64,
    /// Experiment-period denominator.
    pub n: f64,
    /// Pre-period numerator.
    pub x: Option<f64>,
    /// Pre-period denominator.
    pub m: Option<f64>,
}

impl UnitRecord {
    /// Unit with only experiment-period observations.
    pub fn new(y: f64, n: f64) -> Self {
        Self {
            y,
            n,
            x: None,
            m: None,
        }
    }

    /// Attach a pre-period pair.
    pub fn with_pre_period(mut self, x: f64, m: f64) -> Self {
        self.x = Some(x);
        self.m = Some(m);
        self
    }
}

/// Table of named `f64` columns, one row per unit.
///
/// All columns have the same length. Column order is not significant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<f64>>", into = "BTreeMap<String, Vec<f64>>")]
pub struct UnitTable {
    columns: BTreeMap<String, Vec<f64>>,
    rows: usize,
}

impl UnitTable {
    /// Empty table with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(name, values)` pairs.
    ///
    /// # Errors
    ///
    /// `ColumnLengthMismatch` if the columns differ in length.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (name, values) in columns {
            table.insert_column(name, values)?;
        }
        Ok(table)
    }

    /// Build a table from unit records using the names in `columns`.
    ///
    /// Experiment-period values land in the resolved experiment columns.
    /// Pre-period columns are written only when `columns` has a pre-period
    /// suffix and every record carries both `x` and `m`.
    pub fn from_records(records: &[UnitRecord], columns: &ColumnSpec) -> Self {
        let (numer, denom) = columns.experiment_columns();
        let mut table = BTreeMap::new();
        table.insert(numer, records.iter().map(|r| r.y).collect::<Vec<_>>());
        table.insert(denom, records.iter().map(|r| r.n).collect::<Vec<_>>());

        if let Some((pre_numer, pre_denom)) = columns.pre_period_columns() {
            let x: Option<Vec<f64>> = records.iter().map(|r| r.x).collect();
            let m: Option<Vec<f64>> = records.iter().map(|r| r.m).collect();
            if let (Some(x), Some(m)) = (x, m) {
                table.insert(pre_numer, x);
                table.insert(pre_denom, m);
            }
        }

        Self {
            columns: table,
            rows: records.len(),
        }
    }

    /// Add or replace a column.
    ///
    /// The first column fixes the row count of an empty table.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        let replacing_only_column = self.columns.len() == 1 && self.columns.contains_key(&name);
        if self.columns.is_empty() || replacing_only_column {
            self.rows = values.len();
        } else if values.len() != self.rows {
            return Err(EstimationError::ColumnLengthMismatch {
                column: name,
                expected: self.rows,
                actual: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Values of a column, if present.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Whether a column is present.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in lexicographic order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether the table has no units.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

impl TryFrom<BTreeMap<String, Vec<f64>>> for UnitTable {
    type Error = EstimationError;

    fn try_from(columns: BTreeMap<String, Vec<f64>>) -> Result<Self> {
        Self::from_columns(columns)
    }
}

impl From<UnitTable> for BTreeMap<String, Vec<f64>> {
    fn from(table: UnitTable) -> Self {
        table.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_columns_rejects_ragged_input() {
        let err = UnitTable::from_columns([
            ("Y", vec![1.0, 2.0, 3.0]),
            ("N", vec![10.0, 10.0]),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            EstimationError::ColumnLengthMismatch {
                column: "N".to_string(),
                expected: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn test_from_records_with_pre_period() {
        let records = [
            UnitRecord::new(1.0, 10.0).with_pre_period(2.0, 11.0),
            UnitRecord::new(3.0, 12.0).with_pre_period(4.0, 13.0),
        ];
        let spec = ColumnSpec::new("Y", "N")
            .experiment_suffix("_exp")
            .pre_period_suffix("_pre");

        let table = UnitTable::from_records(&records, &spec);

        assert_eq!(table.len(), 2);
        assert_eq!(table.column("Y_exp"), Some(&[1.0, 3.0][..]));
        assert_eq!(table.column("M_pre"), None);
        assert_eq!(table.column("N_pre"), Some(&[11.0, 13.0][..]));
    }

    #[test]
    fn test_from_records_skips_incomplete_pre_period() {
        let records = [
            UnitRecord::new(1.0, 10.0).with_pre_period(2.0, 11.0),
            UnitRecord::new(3.0, 12.0),
        ];
        let spec = ColumnSpec::new("Y", "N").pre_period_suffix("_pre");

        let table = UnitTable::from_records(&records, &spec);

        assert!(!table.has_column("Y_pre"));
        assert!(table.has_column("Y"));
    }

    #[test]
    fn test_replacing_single_column_resets_rows() {
        let mut table = UnitTable::new();
        table.insert_column("Y", vec![1.0, 2.0]).unwrap();
        table.insert_column("Y", vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_json_round_trip_validates_lengths() {
        let ok: UnitTable = serde_json::from_str(r#"{"N":[10,20],"Y":[1,2]}"#).unwrap();
        assert_eq!(ok.len(), 2);

        let bad = serde_json::from_str::<UnitTable>(r#"{"N":[10,20],"Y":[1]}"#);
        assert!(bad.is_err());
    }
}
