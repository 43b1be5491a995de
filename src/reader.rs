//! File reading with diagnosed failures.
//!
//! [`FileReader`] validates a path, reads the file, and on any failure:
//!
//! 1. annotates the failure with `Path`, `Operation` and (with the
//!    `capture_environment` feature) the machine environment
//! 2. classifies it and builds a [`DiagnosticReport`]
//! 3. records the report in its sink
//! 4. returns the failure to the caller
//!
//! ```rust
//! use failchain_diagnostics::{read_file, Category, RingBufferSink};
//!
//! let sink = RingBufferSink::new(16, 4096);
//! let err = read_file("", &sink).unwrap_err();
//!
//! assert_eq!(err.kind(), "InvalidArgument");
//! assert_eq!(sink.get_recent(1)[0].category, Category::InvalidInput);
//! ```

use crate::{DiagnosticReport, DiagnosticSink, Failure, Result, kinds};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

/// Longest accepted path, in bytes.
pub const MAX_PATH_LEN: usize = 4096;

/// Default upper bound on the size of a file read into memory (64 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 64 * 1024 * 1024;

const ORIGIN: &str = "FileReader";

/// Reader settings.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Files larger than this are rejected as `NotSupported`.
    pub max_bytes: u64,
    /// Value of the `Operation` annotation on failures.
    pub operation: Cow<'static, str>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            operation: Cow::Borrowed("ReadFile"),
        }
    }
}

impl ReaderConfig {
    /// Set the size limit.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Set the operation label.
    pub fn with_operation(mut self, operation: impl Into<Cow<'static, str>>) -> Self {
        self.operation = operation.into();
        self
    }
}

/// Reads whole files and reports every failure to a sink.
#[derive(Debug)]
pub struct FileReader<S: DiagnosticSink> {
    config: ReaderConfig,
    sink: S,
}

impl<S: DiagnosticSink> FileReader<S> {
    /// Create a reader reporting to `sink`.
    pub fn new(config: ReaderConfig, sink: S) -> Self {
        Self { config, sink }
    }

    /// Settings in effect.
    #[inline]
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Sink receiving failure reports.
    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Read the whole file at `path`.
    ///
    /// # Errors
    ///
    /// | Condition                      | Kind                |
    /// |--------------------------------|---------------------|
    /// | empty, blank or NUL in path    | `InvalidArgument`   |
    /// | path over [`MAX_PATH_LEN`]     | `PathTooLong`       |
    /// | parent directory missing       | `DirectoryNotFound` |
    /// | file missing                   | `FileNotFound`      |
    /// | path is a directory            | `NotSupported`      |
    /// | file over `max_bytes`          | `NotSupported`      |
    /// | any other I/O error            | mapped io kind      |
    ///
    /// I/O failures carry the underlying `io::Error` as their cause. The
    /// failure has already been reported when it is returned.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = path.as_ref();
        self.try_read(path).map_err(|mut failure| {
            self.enrich(&mut failure, path);
            self.report(&mut failure);
            failure
        })
    }

    fn try_read(&self, path: &Path) -> Result<Vec<u8>> {
        validate_path(path)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(Failure::new(
                    kinds::DIRECTORY_NOT_FOUND.name(),
                    format!("Could not find a part of the path '{}'.", path.display()),
                )
                .with_origin(ORIGIN));
            }
        }

        let metadata = fs::metadata(path).map_err(|err| io_failure(path, err))?;
        if metadata.is_dir() {
            return Err(Failure::new(
                kinds::NOT_SUPPORTED.name(),
                format!("The path '{}' names a directory, not a file.", path.display()),
            )
            .with_origin(ORIGIN));
        }
        if metadata.len() > self.config.max_bytes {
            return Err(self.too_large(path, metadata.len()));
        }

        let file = File::open(path).map_err(|err| io_failure(path, err))?;
        let mut bytes = Vec::with_capacity(usize::try_from(metadata.len()).unwrap_or(0));
        file.take(self.config.max_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|err| io_failure(path, err))?;

        // The file may have grown since the metadata call.
        let read = bytes.len() as u64;
        if read > self.config.max_bytes {
            return Err(self.too_large(path, read));
        }
        Ok(bytes)
    }

    fn too_large(&self, path: &Path, size: u64) -> Failure {
        Failure::new(
            kinds::NOT_SUPPORTED.name(),
            format!(
                "The file '{}' is larger than the {} byte limit.",
                path.display(),
                self.config.max_bytes
            ),
        )
        .with_origin(ORIGIN)
        .with_annotation("FileSize", size)
        .with_annotation("MaxBytes", self.config.max_bytes)
    }

    fn enrich(&self, failure: &mut Failure, path: &Path) {
        failure
            .annotate("Path", path.display().to_string())
            .annotate("Operation", self.config.operation.clone());

        #[cfg(feature = "capture_environment")]
        crate::annotate_environment(failure);
    }

    fn report(&self, failure: &mut Failure) {
        let outcome = DiagnosticReport::new(&*failure).map(|report| self.sink.record(&report));
        if let Err(fault) = outcome {
            failure.annotate(kinds::DIAGNOSTIC_FAULT, fault.to_string());
        }
    }
}

/// Read the whole file at `path` with the default configuration.
pub fn read_file(path: impl AsRef<Path>, sink: &dyn DiagnosticSink) -> Result<Vec<u8>> {
    FileReader::new(ReaderConfig::default(), sink).read(path)
}

fn validate_path(path: &Path) -> Result<()> {
    let raw = path.as_os_str();

    if raw.to_string_lossy().trim().is_empty() {
        return Err(Failure::new(
            kinds::INVALID_ARGUMENT.name(),
            "The path is empty or contains only white space.",
        )
        .with_origin(ORIGIN));
    }
    if raw.as_encoded_bytes().contains(&0) {
        return Err(Failure::new(
            kinds::INVALID_ARGUMENT.name(),
            "The path contains a NUL character.",
        )
        .with_origin(ORIGIN));
    }
    if raw.len() > MAX_PATH_LEN {
        return Err(Failure::new(
            kinds::PATH_TOO_LONG.name(),
            format!("The path is {} bytes long; the limit is {MAX_PATH_LEN}.", raw.len()),
        )
        .with_origin(ORIGIN)
        .with_annotation("PathLength", raw.len()));
    }
    Ok(())
}

fn io_failure(path: &Path, err: io::Error) -> Failure {
    let message = match err.kind() {
        io::ErrorKind::NotFound => format!("Could not find file '{}'.", path.display()),
        io::ErrorKind::PermissionDenied => {
            format!("Access to the path '{}' is denied.", path.display())
        }
        _ => format!("Could not read file '{}'.", path.display()),
    };
    Failure::new(kinds::for_io_error(err.kind()).name(), message)
        .with_origin(ORIGIN)
        .with_cause(Failure::from_io(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Category, RingBufferSink};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn scratch_path(name: &str) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "failchain-reader-{}-{n}-{name}",
            std::process::id()
        ))
    }

    fn reader() -> FileReader<RingBufferSink> {
        FileReader::new(ReaderConfig::default(), RingBufferSink::new(16, 4096))
    }

    #[test]
    fn reads_existing_file() {
        let path = scratch_path("ok.txt");
        fs::write(&path, b"hello").unwrap();

        let reader = reader();
        assert_eq!(reader.read(&path).unwrap(), b"hello");
        assert!(reader.sink().is_empty());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn blank_path_is_invalid_argument() {
        let reader = reader();
        let err = reader.read("   ").unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
        assert_eq!(err.category(), Category::InvalidInput);
        assert_eq!(reader.sink().len(), 1);
    }

    #[test]
    fn nul_byte_is_invalid_argument() {
        let err = reader().read("bad\0name").unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn long_path_is_rejected() {
        let long = "a".repeat(MAX_PATH_LEN + 1);
        let err = reader().read(&long).unwrap_err();
        assert_eq!(err.kind(), "PathTooLong");
        assert_eq!(err.category(), Category::PathOrIOProblem);
    }

    #[test]
    fn missing_file_keeps_io_cause() {
        let path = scratch_path("missing.txt");
        let reader = reader();
        let err = reader.read(&path).unwrap_err();

        assert_eq!(err.kind(), "FileNotFound");
        let cause = err.cause().unwrap();
        assert_eq!(cause.origin(), Some("std::io"));
        assert_eq!(
            cause.annotations().get("IoErrorKind").map(|v| v.to_string()),
            Some("NotFound".to_owned())
        );

        let entry = &reader.sink().get_recent(1)[0];
        assert_eq!(entry.category, Category::NotFound);
        assert_eq!(entry.depth, 2);
    }

    #[test]
    fn missing_parent_is_directory_not_found() {
        let path = scratch_path("no-such-dir").join("file.txt");
        let err = reader().read(&path).unwrap_err();
        assert_eq!(err.kind(), "DirectoryNotFound");
    }

    #[test]
    fn directory_is_not_supported() {
        let err = reader().read(std::env::temp_dir()).unwrap_err();
        assert_eq!(err.kind(), "NotSupported");
    }

    #[test]
    fn oversized_file_is_not_supported() {
        let path = scratch_path("big.bin");
        fs::write(&path, vec![0u8; 64]).unwrap();

        let reader = FileReader::new(
            ReaderConfig::default().with_max_bytes(16),
            RingBufferSink::new(4, 4096),
        );
        let err = reader.read(&path).unwrap_err();
        assert_eq!(err.kind(), "NotSupported");
        assert_eq!(
            err.annotations().get("FileSize").map(|v| v.to_string()),
            Some("64".to_owned())
        );

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn failure_is_annotated_with_path_and_operation() {
        let reader = FileReader::new(
            ReaderConfig::default().with_operation("LoadSettings"),
            RingBufferSink::new(4, 4096),
        );
        let err = reader.read("").unwrap_err();

        assert_eq!(
            err.annotations().get("Operation").map(|v| v.to_string()),
            Some("LoadSettings".to_owned())
        );
        assert!(err.annotations().contains_key("Path"));
        #[cfg(feature = "capture_environment")]
        assert!(err.annotations().contains_key("CurrentDirectory"));
    }

    #[test]
    fn read_file_accepts_dyn_sink() {
        let sink = RingBufferSink::new(4, 4096);
        let path = scratch_path("absent");
        let err = read_file(&path, &sink).unwrap_err();
        assert_eq!(err.kind(), "FileNotFound");
        assert_eq!(sink.len(), 1);
    }
}
