//! Convenience macros for declaring kinds, building failures and annotating.
//!
//! # Usage
//!
//! ```rust
//! use failchain_diagnostics::{annotate, failure, kinds, Category};
//!
//! let path = "/srv/data/report.csv";
//! let mut err = failure!(kinds::FILE_NOT_FOUND, "Could not find file '{}'.", path);
//! annotate!(err, "Path" => path, "Attempt" => 2i64);
//!
//! assert_eq!(err.category(), Category::NotFound);
//! assert_eq!(err.annotations().len(), 2);
//! ```

/// Declare [`FailureKind`](crate::FailureKind) constants under one category.
///
/// ```rust
/// use failchain_diagnostics::{define_failure_kinds, Category};
///
/// define_failure_kinds! {
///     Category::Unsupported => {
///         /// Compressed archives are not read directly.
///         ARCHIVE_NOT_SUPPORTED = "ArchiveNotSupported",
///     }
/// }
///
/// assert_eq!(ARCHIVE_NOT_SUPPORTED.name(), "ArchiveNotSupported");
/// assert_eq!(ARCHIVE_NOT_SUPPORTED.category(), Category::Unsupported);
/// ```
///
/// Kinds declared outside [`kinds`](crate::kinds) are not part of the
/// classification table and classify as `Unknown`.
#[macro_export]
macro_rules! define_failure_kinds {
    ($category:expr => { $($(#[$meta:meta])* $name:ident = $label:literal),* $(,)? }) => {
        $(
            $(#[$meta])*
            pub const $name: $crate::FailureKind = $crate::FailureKind::new($label, $category);
        )*
    };
}

/// Build a [`Failure`](crate::Failure) from a known kind and a format string.
///
/// `failure!(kind)` builds a failure with no message.
#[macro_export]
macro_rules! failure {
    ($kind:expr) => {
        $crate::Failure::without_message($kind.name())
    };
    ($kind:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::Failure::new($kind.name(), format!($fmt $(, $arg)*))
    };
}

/// Attach several annotations with the usual collision rules.
#[macro_export]
macro_rules! annotate {
    ($failure:expr, $($key:expr => $value:expr),+ $(,)?) => {{
        let target: &mut $crate::Failure = &mut $failure;
        $( target.annotate($key, $value); )+
    }};
}
