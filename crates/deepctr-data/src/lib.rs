//! Data-reader configuration and the Parquet batch reader for deepctr.
//!
//! Training data arrives as Parquet files listed in a *file list*: a small
//! text file whose first line is the number of data files and whose
//! remaining lines are their paths. [`DataReaderParams`] describes where the
//! train and eval file lists live, the storage format, and the cardinality
//! of every categorical slot; [`ParquetReader`] turns that description into
//! a stream of fixed-shape [`CtrBatch`] minibatches.
//!
//! # Example
//!
//! ```no_run
//! use deepctr_data::{DataReaderParams, DataReaderType, ParquetReader};
//!
//! let params = DataReaderParams::parquet(
//!     vec!["./_file_list.txt".to_string()],
//!     "./_file_list.txt".to_string(),
//! )
//! .with_slot_size_array(vec![1000, 500, 200]);
//!
//! let mut reader = ParquetReader::open(&params, &params.source, 512, 13, true).unwrap();
//! while let Some(batch) = reader.next_batch().unwrap() {
//!     // consume batch
//!     # let _ = batch; break;
//! }
//! ```

#![warn(missing_docs)]

pub mod batch;
pub mod file_list;
pub mod parquet;
pub mod reader;

use thiserror::Error;

pub use batch::CtrBatch;
pub use file_list::FileList;
pub use parquet::ParquetReader;
pub use reader::{CheckType, DataReaderParams, DataReaderType};

/// Errors that can occur while configuring or reading training data.
#[derive(Debug, Error)]
pub enum DataError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A Parquet format error occurred.
    #[error("Parquet error: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),

    /// An Arrow error occurred.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// A glob pattern error occurred.
    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    /// A glob error occurred during iteration.
    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),

    /// The file list header count does not match the listed paths.
    #[error("File list {path}: header says {expected} files, found {actual}")]
    FileListCountMismatch {
        /// The file list path.
        path: String,
        /// Count declared in the header line.
        expected: usize,
        /// Number of paths actually listed.
        actual: usize,
    },

    /// The file list names no data files.
    #[error("File list {0} is empty")]
    EmptyFileList(String),

    /// The file list header is not an integer.
    #[error("File list {path}: invalid header line {header:?}")]
    InvalidFileListHeader {
        /// The file list path.
        path: String,
        /// The offending first line.
        header: String,
    },

    /// The configured reader type has no reader implementation.
    #[error("Data reader type {0} is not supported by this build")]
    UnsupportedReaderType(String),

    /// A required column is missing from the Parquet schema.
    #[error("Column not found in {file}: {column}")]
    ColumnNotFound {
        /// The data file.
        file: String,
        /// The missing column.
        column: String,
    },

    /// A column has a type the reader cannot consume.
    #[error("Unsupported data type for column '{column}': {data_type}")]
    UnsupportedDataType {
        /// The column name.
        column: String,
        /// The Arrow data type.
        data_type: String,
    },

    /// A categorical key exceeds its slot's configured cardinality.
    #[error("Key {key} out of range for slot {slot} (cardinality {cardinality})")]
    KeyOutOfRange {
        /// The slot index.
        slot: usize,
        /// The offending key.
        key: i64,
        /// The configured cardinality of the slot.
        cardinality: u64,
    },

    /// The slot-size array does not match the data layout.
    #[error("Slot configuration error: {0}")]
    SlotConfig(String),
}

/// A specialized Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;
