use crate::core::models::record::GeometryRecord;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Defines the interface for reading single-molecule geometry records.
///
/// Implementors handle the format-specific parsing; the provided methods
/// adapt files and in-memory text to the buffered-reader entry point.
pub trait GeometryFile {
    /// The error type for parsing and I/O failures.
    type Error: Error + From<io::Error>;

    /// Reads one geometry record from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is malformed or the reader fails.
    fn read_from(reader: &mut impl BufRead) -> Result<GeometryRecord, Self::Error>;

    /// Reads one geometry record from an in-memory string.
    fn read_from_str(text: &str) -> Result<GeometryRecord, Self::Error> {
        Self::read_from(&mut text.as_bytes())
    }

    /// Reads one geometry record from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<GeometryRecord, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}
