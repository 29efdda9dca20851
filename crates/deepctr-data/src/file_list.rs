//! File-list parsing.
//!
//! A file list is a small text file describing a dataset: the first line is
//! the number of data files, each following non-empty line is one data file
//! path. Entries may be glob patterns, which expand in sorted order.

use crate::{DataError, Result};
use glob::glob;
use std::path::{Path, PathBuf};

/// A parsed and validated file list.
#[derive(Debug, Clone)]
pub struct FileList {
    path: String,
    files: Vec<PathBuf>,
}

impl FileList {
    /// Opens and parses a file list.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the header line is not
    /// an integer, the declared count does not match the listed entries, or
    /// the expanded list is empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().into_owned();
        let content = std::fs::read_to_string(path.as_ref())?;

        let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
        let header = lines.next().unwrap_or("");
        let expected: usize =
            header
                .parse()
                .map_err(|_| DataError::InvalidFileListHeader {
                    path: path_str.clone(),
                    header: header.to_string(),
                })?;

        let entries: Vec<&str> = lines.collect();
        if entries.len() != expected {
            return Err(DataError::FileListCountMismatch {
                path: path_str,
                expected,
                actual: entries.len(),
            });
        }

        let mut files = Vec::new();
        for entry in entries {
            if entry.contains('*') || entry.contains('?') || entry.contains('[') {
                let mut matched: Vec<PathBuf> =
                    glob(entry)?.collect::<std::result::Result<Vec<_>, _>>()?;
                matched.sort();
                files.extend(matched);
            } else {
                files.push(PathBuf::from(entry));
            }
        }

        if files.is_empty() {
            return Err(DataError::EmptyFileList(path_str));
        }

        Ok(Self {
            path: path_str,
            files,
        })
    }

    /// The data file paths, in list order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Number of data files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the list holds no files (never true for a parsed list).
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The path this list was read from.
    pub fn source_path(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_list(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_valid_list() {
        let dir = tempdir().unwrap();
        let list = write_list(
            dir.path(),
            "_file_list.txt",
            "2\n./data/part0.parquet\n./data/part1.parquet\n",
        );

        let fl = FileList::open(&list).unwrap();
        assert_eq!(fl.len(), 2);
        assert_eq!(fl.files()[0], PathBuf::from("./data/part0.parquet"));
    }

    #[test]
    fn test_count_mismatch() {
        let dir = tempdir().unwrap();
        let list = write_list(dir.path(), "_file_list.txt", "3\na.parquet\nb.parquet\n");

        let err = FileList::open(&list).unwrap_err();
        assert!(matches!(
            err,
            DataError::FileListCountMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_header() {
        let dir = tempdir().unwrap();
        let list = write_list(dir.path(), "_file_list.txt", "nope\na.parquet\n");

        let err = FileList::open(&list).unwrap_err();
        assert!(matches!(err, DataError::InvalidFileListHeader { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = FileList::open("/nonexistent/_file_list.txt").unwrap_err();
        assert!(matches!(err, DataError::Io(_)));
    }

    #[test]
    fn test_glob_entry_expansion() {
        let dir = tempdir().unwrap();
        for i in 0..3 {
            std::fs::File::create(dir.path().join(format!("part{i}.parquet"))).unwrap();
        }
        let pattern = dir.path().join("*.parquet");
        let list = write_list(
            dir.path(),
            "_file_list.txt",
            &format!("1\n{}\n", pattern.display()),
        );

        let fl = FileList::open(&list).unwrap();
        assert_eq!(fl.len(), 3);
        // Expansion is sorted for a deterministic file order.
        assert!(fl.files()[0] < fl.files()[1]);
    }

    #[test]
    fn test_empty_list_rejected() {
        let dir = tempdir().unwrap();
        let list = write_list(dir.path(), "_file_list.txt", "0\n");

        let err = FileList::open(&list).unwrap_err();
        assert!(matches!(err, DataError::EmptyFileList(_)));
    }
}
