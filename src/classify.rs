//! Failure classification and user-facing explanations.
//!
//! A failure's kind is looked up once in [`kinds::CLASSIFICATION_TABLE`];
//! kinds that are not in the table classify as [`Category::Unknown`]. Each
//! category owns exactly one explanation template and one logging action, so
//! the mapping from failure to reported text is total.
//!
//! ```rust
//! use failchain_diagnostics::{classify_kind, explain_for, Category};
//!
//! assert_eq!(classify_kind("FileNotFound"), Category::NotFound);
//! assert_eq!(classify_kind("SomethingElse"), Category::Unknown);
//!
//! let text = explain_for(Category::Unknown, "SomethingElse", "SomethingElse=[boom]");
//! assert!(text.contains("SomethingElse"));
//! ```

use crate::{kinds, Failure};
use std::fmt;

/// Closed classification of failure kinds.
///
/// Callers match on it to pick reporting behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Argument validation failed.
    InvalidInput,
    /// Path too long, directory missing, or a generic I/O failure.
    PathOrIOProblem,
    /// The target does not exist.
    NotFound,
    /// The operation is not supported for this target.
    Unsupported,
    /// Authorization or security check failed.
    AccessDenied,
    /// Anything not in the classification table.
    Unknown,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 6] = [
        Category::InvalidInput,
        Category::PathOrIOProblem,
        Category::NotFound,
        Category::Unsupported,
        Category::AccessDenied,
        Category::Unknown,
    ];

    /// Stable name for logs.
    #[inline]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::InvalidInput => "InvalidInput",
            Self::PathOrIOProblem => "PathOrIOProblem",
            Self::NotFound => "NotFound",
            Self::Unsupported => "Unsupported",
            Self::AccessDenied => "AccessDenied",
            Self::Unknown => "Unknown",
        }
    }

    /// Logging action for failures of this category.
    #[inline]
    pub const fn log_level(self) -> LogLevel {
        match self {
            Self::InvalidInput | Self::NotFound => LogLevel::Warn,
            Self::PathOrIOProblem | Self::Unsupported | Self::Unknown => LogLevel::Error,
            Self::AccessDenied => LogLevel::Critical,
        }
    }

    /// Explanation template for this category.
    ///
    /// `kind` is only interpolated by [`Category::Unknown`].
    pub fn explain(self, kind: &str, messages: &str) -> String {
        match self {
            Self::InvalidInput => format!(
                "The value used for the fully qualified file name was incorrect. [{messages}]"
            ),
            Self::PathOrIOProblem => format!(
                "The fully qualified file name was too long, a directory in it could not be found, \
                 or an I/O error occurred while reading the file. [{messages}]"
            ),
            Self::NotFound => format!(
                "The file named by the fully qualified file name could not be found. [{messages}]"
            ),
            Self::Unsupported => format!(
                "The fully qualified file name is in an invalid format, or the file cannot be read \
                 this way. [{messages}]"
            ),
            Self::AccessDenied => format!(
                "The caller does not have the permission required to read the file. [{messages}]"
            ),
            Self::Unknown => format!(
                "An unexpected failure of kind '{kind}' occurred while reading the file. [{messages}]"
            ),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Logging action selected by a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Caller mistake or expected absence.
    Warn,
    /// Operational failure.
    Error,
    /// Security-relevant failure.
    Critical,
}

impl LogLevel {
    /// Upper-case label for log lines.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a kind name through the ordered table. First match wins.
pub fn classify_kind(kind: &str) -> Category {
    kinds::CLASSIFICATION_TABLE
        .iter()
        .find(|known| known.name() == kind)
        .map_or(Category::Unknown, |known| known.category())
}

/// Classify a failure by the kind of its outermost level.
#[inline]
pub fn classify(failure: &Failure) -> Category {
    classify_kind(failure.kind())
}

/// Interpolate `messages` (usually from [`crate::format_messages`]) into the
/// template for `category`.
#[inline]
pub fn explain_for(category: Category, kind: &str, messages: &str) -> String {
    category.explain(kind, messages)
}
