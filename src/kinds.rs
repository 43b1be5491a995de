//! Known failure kinds and the classification table.
//!
//! # Taxonomy
//!
//! Each known kind is declared once, under the category it belongs to. The
//! declaration order below is the order of [`CLASSIFICATION_TABLE`], which
//! classification consults exactly once per failure.
//!
//! | category        | kinds                                                   |
//! |-----------------|---------------------------------------------------------|
//! | InvalidInput    | InvalidArgument, MissingArgument, ArgumentOutOfRange    |
//! | PathOrIOProblem | PathTooLong, DirectoryNotFound, IoFailure               |
//! | NotFound        | FileNotFound                                            |
//! | Unsupported     | NotSupported                                            |
//! | AccessDenied    | UnauthorizedAccess, SecurityViolation                   |
//!
//! Every other kind, including [`DIAGNOSTIC_FAULT`] and [`FOREIGN_ERROR`],
//! classifies as `Unknown`.

use crate::{define_failure_kinds, Category};
use std::fmt;
use std::io;

/// A known kind name paired with its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FailureKind {
    name: &'static str,
    category: Category,
}

impl FailureKind {
    /// Declare a kind. Used by [`define_failure_kinds!`](crate::define_failure_kinds).
    #[inline]
    pub const fn new(name: &'static str, category: Category) -> Self {
        Self { name, category }
    }

    /// Kind identifier as stored on a [`crate::Failure`].
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Category this kind classifies to.
    #[inline]
    pub const fn category(&self) -> Category {
        self.category
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.category)
    }
}

// -----------------------------------------------------------------------------
// Argument validation
// -----------------------------------------------------------------------------
define_failure_kinds! {
    Category::InvalidInput => {
        /// An argument had an invalid value.
        INVALID_ARGUMENT = "InvalidArgument",
        /// A required argument was absent.
        MISSING_ARGUMENT = "MissingArgument",
        /// An argument was outside its permitted range.
        ARGUMENT_OUT_OF_RANGE = "ArgumentOutOfRange",
    }
}

// -----------------------------------------------------------------------------
// Path and I/O
// -----------------------------------------------------------------------------
define_failure_kinds! {
    Category::PathOrIOProblem => {
        /// The path exceeds the supported length.
        PATH_TOO_LONG = "PathTooLong",
        /// A directory in the path does not exist.
        DIRECTORY_NOT_FOUND = "DirectoryNotFound",
        /// Generic I/O failure.
        IO_FAILURE = "IoFailure",
    }
}

define_failure_kinds! {
    Category::NotFound => {
        /// The file does not exist.
        FILE_NOT_FOUND = "FileNotFound",
    }
}

define_failure_kinds! {
    Category::Unsupported => {
        /// The operation is not supported for this target.
        NOT_SUPPORTED = "NotSupported",
    }
}

// -----------------------------------------------------------------------------
// Authorization
// -----------------------------------------------------------------------------
define_failure_kinds! {
    Category::AccessDenied => {
        /// The caller lacks permission.
        UNAUTHORIZED_ACCESS = "UnauthorizedAccess",
        /// A security policy rejected the operation.
        SECURITY_VIOLATION = "SecurityViolation",
    }
}

/// Ordered classification table.
pub const CLASSIFICATION_TABLE: &[FailureKind] = &[
    INVALID_ARGUMENT,
    MISSING_ARGUMENT,
    ARGUMENT_OUT_OF_RANGE,
    PATH_TOO_LONG,
    DIRECTORY_NOT_FOUND,
    IO_FAILURE,
    FILE_NOT_FOUND,
    NOT_SUPPORTED,
    UNAUTHORIZED_ACCESS,
    SECURITY_VIOLATION,
];

/// Kind of the failure returned when rendering diagnostics itself fails.
pub const DIAGNOSTIC_FAULT: &str = "DiagnosticFault";

/// Kind given to levels snapshotted from foreign `std::error::Error` values.
pub const FOREIGN_ERROR: &str = "Error";

/// Map an `io::ErrorKind` to a known kind.
pub const fn for_io_error(kind: io::ErrorKind) -> FailureKind {
    match kind {
        io::ErrorKind::NotFound => FILE_NOT_FOUND,
        io::ErrorKind::PermissionDenied => UNAUTHORIZED_ACCESS,
        io::ErrorKind::InvalidInput => INVALID_ARGUMENT,
        io::ErrorKind::Unsupported => NOT_SUPPORTED,
        _ => IO_FAILURE,
    }
}

/// Stable label for an `io::ErrorKind`, kept as an annotation.
#[inline]
pub const fn io_error_kind_label(kind: io::ErrorKind) -> &'static str {
    match kind {
        io::ErrorKind::NotFound => "NotFound",
        io::ErrorKind::PermissionDenied => "PermissionDenied",
        io::ErrorKind::AlreadyExists => "AlreadyExists",
        io::ErrorKind::WouldBlock => "WouldBlock",
        io::ErrorKind::InvalidInput => "InvalidInput",
        io::ErrorKind::InvalidData => "InvalidData",
        io::ErrorKind::TimedOut => "TimedOut",
        io::ErrorKind::WriteZero => "WriteZero",
        io::ErrorKind::Interrupted => "Interrupted",
        io::ErrorKind::Unsupported => "Unsupported",
        io::ErrorKind::UnexpectedEof => "UnexpectedEof",
        io::ErrorKind::OutOfMemory => "OutOfMemory",
        io::ErrorKind::Other => "Other",
        _ => "Unknown",
    }
}
