//! Parquet batch reader.
//!
//! [`ParquetReader`] consumes the data files named by one or more file
//! lists and yields fixed-shape [`CtrBatch`] minibatches. The expected
//! schema is one `label` column, `dense_0..dense_{d-1}` continuous columns
//! and `cat_0..cat_{m-1}` categorical columns, where `m` is the length of
//! the configured slot-size array.
//!
//! Decoding the Parquet format itself is delegated to the `parquet` and
//! `arrow` crates; this module only maps columnar record batches onto the
//! row-oriented minibatch layout the network consumes.

use std::fs::File;
use std::path::PathBuf;

use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use tracing::debug;

use crate::batch::CtrBatch;
use crate::file_list::FileList;
use crate::reader::{CheckType, DataReaderParams, DataReaderType};
use crate::{DataError, Result};

/// Number of rows pulled from the Parquet decoder at a time.
const DECODE_BATCH_SIZE: usize = 8192;

/// Streaming reader over Parquet data files.
///
/// Yields batches of exactly `batch_size` samples. A trailing partial batch
/// of a non-repeating dataset is dropped; a repeating reader rewinds to the
/// first file when the last is exhausted.
pub struct ParquetReader {
    files: Vec<PathBuf>,
    batch_size: usize,
    dense_dim: usize,
    slot_size_array: Vec<u64>,
    repeat: bool,
    file_index: usize,
    current: Option<ParquetRecordBatchReader>,
    pending_labels: Vec<f32>,
    pending_dense: Vec<f32>,
    pending_sparse: Vec<Vec<i64>>,
    rows_this_cycle: usize,
}

impl ParquetReader {
    /// Opens a reader over the file lists in `sources`.
    ///
    /// `sources` usually comes from `params.source` (training) or wraps
    /// `params.eval_source` (evaluation).
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnsupportedReaderType`] if `params` asks for a
    /// format or checksum policy this reader cannot honor, and any file-list
    /// error from [`FileList::open`].
    pub fn open(
        params: &DataReaderParams,
        sources: &[String],
        batch_size: usize,
        dense_dim: usize,
        repeat: bool,
    ) -> Result<Self> {
        if params.data_reader_type != DataReaderType::Parquet {
            return Err(DataError::UnsupportedReaderType(
                params.data_reader_type.to_string(),
            ));
        }
        if params.check_type == CheckType::Sum {
            return Err(DataError::UnsupportedReaderType(
                "Parquet with check_type Sum".to_string(),
            ));
        }

        let mut files = Vec::new();
        for source in sources {
            let list = FileList::open(source)?;
            debug!(
                "file list {} resolved to {} data files",
                list.source_path(),
                list.len()
            );
            files.extend(list.files().to_vec());
        }

        let slot_num = params.slot_num();
        Ok(Self {
            files,
            batch_size,
            dense_dim,
            slot_size_array: params.slot_size_array.clone(),
            repeat,
            file_index: 0,
            current: None,
            pending_labels: Vec::with_capacity(batch_size),
            pending_dense: Vec::with_capacity(batch_size * dense_dim),
            pending_sparse: vec![Vec::with_capacity(batch_size); slot_num],
            rows_this_cycle: 0,
        })
    }

    /// Number of data files behind this reader.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Returns the next full batch, or `None` when a non-repeating dataset
    /// is exhausted.
    pub fn next_batch(&mut self) -> Result<Option<CtrBatch>> {
        loop {
            if self.pending_labels.len() >= self.batch_size {
                return Ok(Some(self.take_pending()?));
            }

            if self.current.is_none() && !self.open_next_file()? {
                // Dataset exhausted; the trailing partial batch is dropped.
                self.pending_labels.clear();
                self.pending_dense.clear();
                for keys in &mut self.pending_sparse {
                    keys.clear();
                }
                return Ok(None);
            }

            let record_batch = match self.current.as_mut().and_then(|r| r.next()) {
                Some(batch) => batch.map_err(DataError::Arrow)?,
                None => {
                    self.current = None;
                    continue;
                }
            };
            self.append_rows(&record_batch)?;
        }
    }

    fn take_pending(&mut self) -> Result<CtrBatch> {
        let labels: Vec<f32> = self.pending_labels.drain(..self.batch_size).collect();
        let dense: Vec<f32> = self
            .pending_dense
            .drain(..self.batch_size * self.dense_dim)
            .collect();
        let sparse: Vec<Vec<i64>> = self
            .pending_sparse
            .iter_mut()
            .map(|keys| keys.drain(..self.batch_size).collect())
            .collect();
        CtrBatch::new(labels, dense, sparse, self.dense_dim)
    }

    /// Opens the next data file, rewinding once per cycle if repeating.
    fn open_next_file(&mut self) -> Result<bool> {
        if self.file_index >= self.files.len() {
            if !self.repeat || self.rows_this_cycle == 0 {
                return Ok(false);
            }
            self.file_index = 0;
            self.rows_this_cycle = 0;
        }

        let path = &self.files[self.file_index];
        self.file_index += 1;

        let file = File::open(path).map_err(DataError::Io)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(DECODE_BATCH_SIZE)
            .build()?;
        self.current = Some(reader);
        Ok(true)
    }

    fn append_rows(&mut self, batch: &RecordBatch) -> Result<()> {
        let num_rows = batch.num_rows();
        if num_rows == 0 {
            return Ok(());
        }
        let file = self.files[self.file_index.saturating_sub(1)]
            .to_string_lossy()
            .into_owned();

        let labels = float_column(batch, "label", &file)?;
        self.pending_labels.extend_from_slice(&labels);

        let mut dense_cols = Vec::with_capacity(self.dense_dim);
        for i in 0..self.dense_dim {
            dense_cols.push(float_column(batch, &format!("dense_{i}"), &file)?);
        }
        for row in 0..num_rows {
            for col in &dense_cols {
                self.pending_dense.push(col[row]);
            }
        }

        for slot in 0..self.slot_size_array.len() {
            let keys = int_column(batch, &format!("cat_{slot}"), &file)?;
            let cardinality = self.slot_size_array[slot];
            for &key in &keys {
                if key < 0 || key as u64 >= cardinality {
                    return Err(DataError::KeyOutOfRange {
                        slot,
                        key,
                        cardinality,
                    });
                }
            }
            self.pending_sparse[slot].extend_from_slice(&keys);
        }

        self.rows_this_cycle += num_rows;
        Ok(())
    }
}

/// Reads a column as f32 values, accepting float and integer storage.
fn float_column(batch: &RecordBatch, name: &str, file: &str) -> Result<Vec<f32>> {
    let index = batch
        .schema()
        .index_of(name)
        .map_err(|_| DataError::ColumnNotFound {
            file: file.to_string(),
            column: name.to_string(),
        })?;
    let column = batch.column(index);

    match column.data_type() {
        DataType::Float32 => {
            let array = column
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| unsupported(name, column.data_type()))?;
            Ok((0..array.len()).map(|i| array.value(i)).collect())
        }
        DataType::Float64 => {
            let array = column
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| unsupported(name, column.data_type()))?;
            Ok((0..array.len()).map(|i| array.value(i) as f32).collect())
        }
        DataType::Int32 => {
            let array = column
                .as_any()
                .downcast_ref::<Int32Array>()
                .ok_or_else(|| unsupported(name, column.data_type()))?;
            Ok((0..array.len()).map(|i| array.value(i) as f32).collect())
        }
        DataType::Int64 => {
            let array = column
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| unsupported(name, column.data_type()))?;
            Ok((0..array.len()).map(|i| array.value(i) as f32).collect())
        }
        other => Err(unsupported(name, other)),
    }
}

/// Reads a column as i64 keys, accepting 32- and 64-bit integer storage.
fn int_column(batch: &RecordBatch, name: &str, file: &str) -> Result<Vec<i64>> {
    let index = batch
        .schema()
        .index_of(name)
        .map_err(|_| DataError::ColumnNotFound {
            file: file.to_string(),
            column: name.to_string(),
        })?;
    let column = batch.column(index);

    match column.data_type() {
        DataType::Int64 => {
            let array = column
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| unsupported(name, column.data_type()))?;
            Ok((0..array.len()).map(|i| array.value(i)).collect())
        }
        DataType::Int32 => {
            let array = column
                .as_any()
                .downcast_ref::<Int32Array>()
                .ok_or_else(|| unsupported(name, column.data_type()))?;
            Ok((0..array.len()).map(|i| array.value(i) as i64).collect())
        }
        other => Err(unsupported(name, other)),
    }
}

fn unsupported(column: &str, data_type: &DataType) -> DataError {
    DataError::UnsupportedDataType {
        column: column.to_string(),
        data_type: data_type.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float32Array, Int64Array};
    use arrow::datatypes::{Field, Schema};
    use parquet::arrow::ArrowWriter;
    use std::io::Write;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::tempdir;

    const DENSE_DIM: usize = 2;
    const SLOT_SIZES: [u64; 2] = [100, 50];

    fn write_data_file(path: &Path, num_rows: usize, key_offset: i64) {
        let schema = Arc::new(Schema::new(vec![
            Field::new("label", DataType::Float32, false),
            Field::new("dense_0", DataType::Float32, false),
            Field::new("dense_1", DataType::Float32, false),
            Field::new("cat_0", DataType::Int64, false),
            Field::new("cat_1", DataType::Int64, false),
        ]));

        let labels: Vec<f32> = (0..num_rows).map(|i| (i % 2) as f32).collect();
        let dense0: Vec<f32> = (0..num_rows).map(|i| i as f32 * 0.1).collect();
        let dense1: Vec<f32> = (0..num_rows).map(|i| i as f32 * 0.2).collect();
        let cat0: Vec<i64> = (0..num_rows).map(|i| (key_offset + i as i64) % 100).collect();
        let cat1: Vec<i64> = (0..num_rows).map(|i| (i as i64) % 50).collect();

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Float32Array::from(labels)),
                Arc::new(Float32Array::from(dense0)),
                Arc::new(Float32Array::from(dense1)),
                Arc::new(Int64Array::from(cat0)),
                Arc::new(Int64Array::from(cat1)),
            ],
        )
        .unwrap();

        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    fn write_fixture(dir: &Path, files: usize, rows_per_file: usize) -> String {
        let mut list = format!("{files}\n");
        for i in 0..files {
            let path = dir.join(format!("part{i}.parquet"));
            write_data_file(&path, rows_per_file, i as i64);
            list.push_str(&format!("{}\n", path.display()));
        }
        let list_path = dir.join("_file_list.txt");
        let mut f = File::create(&list_path).unwrap();
        f.write_all(list.as_bytes()).unwrap();
        list_path.to_string_lossy().into_owned()
    }

    fn params(list: &str) -> DataReaderParams {
        DataReaderParams::parquet(vec![list.to_string()], list.to_string())
            .with_slot_size_array(SLOT_SIZES.to_vec())
    }

    #[test]
    fn test_reads_full_batches() {
        let dir = tempdir().unwrap();
        let list = write_fixture(dir.path(), 2, 10);
        let params = params(&list);

        let mut reader = ParquetReader::open(&params, &params.source, 4, DENSE_DIM, false).unwrap();
        assert_eq!(reader.file_count(), 2);

        let mut batches = 0;
        while let Some(batch) = reader.next_batch().unwrap() {
            assert_eq!(batch.batch_size, 4);
            assert_eq!(batch.slot_num(), 2);
            assert_eq!(batch.dense_dim, DENSE_DIM);
            batches += 1;
        }
        // 20 rows / 4 per batch = 5 full batches, nothing left over.
        assert_eq!(batches, 5);
    }

    #[test]
    fn test_drops_trailing_partial_batch() {
        let dir = tempdir().unwrap();
        let list = write_fixture(dir.path(), 1, 10);
        let params = params(&list);

        let mut reader = ParquetReader::open(&params, &params.source, 3, DENSE_DIM, false).unwrap();
        let mut batches = 0;
        while reader.next_batch().unwrap().is_some() {
            batches += 1;
        }
        // 10 rows / 3 per batch = 3 full batches, 1 row dropped.
        assert_eq!(batches, 3);
    }

    #[test]
    fn test_repeat_rewinds() {
        let dir = tempdir().unwrap();
        let list = write_fixture(dir.path(), 1, 6);
        let params = params(&list);

        let mut reader = ParquetReader::open(&params, &params.source, 4, DENSE_DIM, true).unwrap();
        // 6 rows per cycle; pulling 5 batches of 4 needs more than 3 cycles.
        for _ in 0..5 {
            let batch = reader.next_batch().unwrap();
            assert!(batch.is_some());
        }
    }

    #[test]
    fn test_rejects_non_parquet_type() {
        let dir = tempdir().unwrap();
        let list = write_fixture(dir.path(), 1, 4);
        let mut params = params(&list);
        params.data_reader_type = DataReaderType::Raw;

        let err = ParquetReader::open(&params, &params.source.clone(), 4, DENSE_DIM, false)
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, DataError::UnsupportedReaderType(_)));
    }

    #[test]
    fn test_rejects_sum_check() {
        let dir = tempdir().unwrap();
        let list = write_fixture(dir.path(), 1, 4);
        let params = params(&list).with_check_type(CheckType::Sum);

        let err = ParquetReader::open(&params, &params.source.clone(), 4, DENSE_DIM, false)
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, DataError::UnsupportedReaderType(_)));
    }

    #[test]
    fn test_key_out_of_range() {
        let dir = tempdir().unwrap();
        let list = write_fixture(dir.path(), 1, 8);
        // Shrink slot 0's cardinality below the keys present in the data.
        let params = DataReaderParams::parquet(vec![list.clone()], list)
            .with_slot_size_array(vec![3, 50]);

        let mut reader = ParquetReader::open(&params, &params.source, 4, DENSE_DIM, false).unwrap();
        let err = reader.next_batch().unwrap_err();
        assert!(matches!(err, DataError::KeyOutOfRange { slot: 0, .. }));
    }

    #[test]
    fn test_missing_column() {
        let dir = tempdir().unwrap();
        let list = write_fixture(dir.path(), 1, 4);
        let params = params(&list);

        // Ask for more dense columns than the files carry.
        let mut reader = ParquetReader::open(&params, &params.source, 2, 5, false).unwrap();
        let err = reader.next_batch().unwrap_err();
        assert!(matches!(err, DataError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_batch_contents_preserved() {
        let dir = tempdir().unwrap();
        let list = write_fixture(dir.path(), 1, 4);
        let params = params(&list);

        let mut reader = ParquetReader::open(&params, &params.source, 4, DENSE_DIM, false).unwrap();
        let batch = reader.next_batch().unwrap().unwrap();
        assert_eq!(batch.labels, vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(batch.dense_row(1), &[0.1, 0.2]);
        assert_eq!(batch.sparse[1], vec![0, 1, 2, 3]);
    }
}
