//! Data-reader parameters.
//!
//! [`DataReaderParams`] is an immutable description of where training and
//! evaluation data live and how to interpret them. It accepts arbitrary
//! literal values unconditionally; validation happens when a reader is
//! opened, never at configuration time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage format of the training data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataReaderType {
    /// Columnar Parquet files (the implemented format).
    Parquet,
    /// Raw binary records.
    Raw,
    /// Normalized text records.
    Norm,
}

impl fmt::Display for DataReaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataReaderType::Parquet => write!(f, "Parquet"),
            DataReaderType::Raw => write!(f, "Raw"),
            DataReaderType::Norm => write!(f, "Norm"),
        }
    }
}

/// Record checksum policy.
///
/// `Sum` is only meaningful for raw-format records; it is accepted here and
/// rejected when a reader that cannot honor it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckType {
    /// No checksum verification.
    Non,
    /// Per-record byte-sum verification.
    Sum,
}

/// Immutable data-reader configuration.
///
/// # Example
///
/// ```
/// use deepctr_data::{CheckType, DataReaderParams, DataReaderType};
///
/// let params = DataReaderParams::parquet(
///     vec!["./_file_list.txt".to_string()],
///     "./_file_list.txt".to_string(),
/// )
/// .with_check_type(CheckType::Non)
/// .with_slot_size_array(vec![381_808, 22_456, 14_763]);
///
/// assert_eq!(params.data_reader_type, DataReaderType::Parquet);
/// assert_eq!(params.slot_num(), 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataReaderParams {
    /// Storage format of the data files.
    pub data_reader_type: DataReaderType,
    /// File-list paths for training data.
    pub source: Vec<String>,
    /// File-list path for evaluation data.
    pub eval_source: String,
    /// Record checksum policy.
    pub check_type: CheckType,
    /// Per-categorical-slot cardinality, in slot order.
    pub slot_size_array: Vec<u64>,
}

impl DataReaderParams {
    /// Creates parameters for Parquet data with no checksum and no slots.
    pub fn parquet(source: Vec<String>, eval_source: String) -> Self {
        Self {
            data_reader_type: DataReaderType::Parquet,
            source,
            eval_source,
            check_type: CheckType::Non,
            slot_size_array: Vec::new(),
        }
    }

    /// Creates parameters with an explicit reader type.
    pub fn new(data_reader_type: DataReaderType, source: Vec<String>, eval_source: String) -> Self {
        Self {
            data_reader_type,
            source,
            eval_source,
            check_type: CheckType::Non,
            slot_size_array: Vec::new(),
        }
    }

    /// Sets the checksum policy.
    pub fn with_check_type(mut self, check_type: CheckType) -> Self {
        self.check_type = check_type;
        self
    }

    /// Sets the per-slot cardinality array.
    pub fn with_slot_size_array(mut self, slot_size_array: Vec<u64>) -> Self {
        self.slot_size_array = slot_size_array;
        self
    }

    /// Number of categorical slots.
    pub fn slot_num(&self) -> usize {
        self.slot_size_array.len()
    }

    /// Total vocabulary size across all slots.
    pub fn total_vocabulary(&self) -> u64 {
        self.slot_size_array.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parquet_defaults() {
        let params = DataReaderParams::parquet(
            vec!["a.txt".to_string()],
            "b.txt".to_string(),
        );
        assert_eq!(params.data_reader_type, DataReaderType::Parquet);
        assert_eq!(params.check_type, CheckType::Non);
        assert!(params.slot_size_array.is_empty());
        assert_eq!(params.slot_num(), 0);
    }

    #[test]
    fn test_accepts_arbitrary_literals() {
        // Configuration assembly never touches the filesystem, so paths that
        // do not exist are accepted here.
        let params = DataReaderParams::new(
            DataReaderType::Raw,
            vec!["/does/not/exist".to_string()],
            "/also/missing".to_string(),
        )
        .with_check_type(CheckType::Sum)
        .with_slot_size_array(vec![4, 0, 7]);

        assert_eq!(params.check_type, CheckType::Sum);
        assert_eq!(params.total_vocabulary(), 11);
    }

    #[test]
    fn test_reader_type_display() {
        assert_eq!(DataReaderType::Parquet.to_string(), "Parquet");
        assert_eq!(DataReaderType::Raw.to_string(), "Raw");
        assert_eq!(DataReaderType::Norm.to_string(), "Norm");
    }

    #[test]
    fn test_serialization_round_trip() {
        let params = DataReaderParams::parquet(
            vec!["./_file_list.txt".to_string()],
            "./_file_list.txt".to_string(),
        )
        .with_slot_size_array(vec![10, 20]);

        let json = serde_json::to_string(&params).unwrap();
        let back: DataReaderParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back.slot_size_array, vec![10, 20]);
        assert_eq!(back.eval_source, "./_file_list.txt");
    }
}
