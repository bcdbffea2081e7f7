//! File I/O helpers for G-code files
//!
//! Extension checks and a streaming line reader that keeps every line's
//! original bytes, terminator included, so unchanged lines can be written
//! back verbatim.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use gcodeprep_core::PreprocessError;

/// Buffer size for reading large files (256 KB)
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Check whether `path` ends in `.{extension}` (case-insensitive)
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Fail with a format error unless `path` carries the G-code extension
pub fn ensure_gcode_file(path: &Path, extension: &str) -> Result<(), PreprocessError> {
    if has_extension(path, extension) {
        Ok(())
    } else {
        Err(PreprocessError::not_gcode(path, extension))
    }
}

/// Split a raw line into its body and its terminator (`\n`, `\r\n` or empty)
pub fn split_terminator(raw: &[u8]) -> (&[u8], &[u8]) {
    if raw.ends_with(b"\r\n") {
        raw.split_at(raw.len() - 2)
    } else if raw.ends_with(b"\n") {
        raw.split_at(raw.len() - 1)
    } else {
        (raw, &raw[raw.len()..])
    }
}

/// G-code file reader with streaming support
pub struct GcodeFileReader {
    path: PathBuf,
    file_size: u64,
}

impl GcodeFileReader {
    /// Create a new reader for an existing file
    ///
    /// # Errors
    /// Returns error if the file does not exist or is not a regular file
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = fs::metadata(&path)?;

        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Path is not a file: {}", path.display()),
            ));
        }

        Ok(Self {
            path,
            file_size: metadata.len(),
        })
    }

    /// Get file size in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Get file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream every line, terminator included, to `callback` in file order
    ///
    /// Returns the number of lines read.
    pub fn for_each_raw_line<F>(&self, mut callback: F) -> io::Result<u64>
    where
        F: FnMut(&[u8]) -> io::Result<()>,
    {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
        let mut buf = Vec::new();
        let mut lines_read = 0u64;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            callback(&buf)?;
            lines_read += 1;
        }

        Ok(lines_read)
    }

    /// Count the lines whose body (decoded lossily) satisfies `predicate`
    pub fn count_lines_matching<P>(&self, mut predicate: P) -> io::Result<u64>
    where
        P: FnMut(&str) -> bool,
    {
        let mut count = 0u64;
        self.for_each_raw_line(|raw| {
            let (body, _) = split_terminator(raw);
            if predicate(&String::from_utf8_lossy(body)) {
                count += 1;
            }
            Ok(())
        })?;
        Ok(count)
    }
}
