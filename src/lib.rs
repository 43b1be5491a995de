//! # Failchain Diagnostics
//!
//! Structured diagnosis of nested failure chains.
//!
//! ## Design Philosophy
//!
//! 1. **A failure is a chain**: each level owns its cause, outermost first
//! 2. **Context accumulates, never overwrites**: colliding annotation keys are suffixed
//! 3. **Classification is a table**: one ordered lookup from kind to [`Category`]
//! 4. **Diagnostics fail loudly**: a fault while rendering is returned, not swallowed
//! 5. **Owned context is zeroized** when the failure drops
//!
//! ## Pieces
//!
//! - [`format_messages`]: flattens the chain into `kind=[message]` lines
//! - [`collect_data`]: flattens per-level annotations into `kind Data=[k=v|...]` blocks
//! - [`annotate`]: attaches context with collision probing (`key`, `key-1`, `key-2`, ...)
//! - [`classify`] / [`explain_for`]: selects a category and its user-facing explanation
//!
//! ## Quick Start
//!
//! ```rust
//! use failchain_diagnostics::{kinds, Category, Failure};
//!
//! let inner = Failure::new(kinds::IO_FAILURE.name(), "disk unavailable");
//! let mut outer = Failure::new(kinds::FILE_NOT_FOUND.name(), "Could not find file 'a.txt'.")
//!     .with_cause(inner);
//! outer.annotate("Path", "a.txt");
//!
//! assert_eq!(
//!     outer.format_messages().unwrap(),
//!     "FileNotFound=[Could not find file 'a.txt'.]\nIoFailure=[disk unavailable]"
//! );
//! assert_eq!(
//!     outer.collect_data().unwrap(),
//!     "FileNotFound Data=[Path=a.txt]::IoFailure Data=[None]"
//! );
//! assert_eq!(outer.category(), Category::NotFound);
//! ```
//!
//! ## Features
//!
//! - `capture_environment` (default): the file reader annotates failures with
//!   machine name, working directory and user identity
//! - `trusted_debug`: enables untruncated report formatting (debug builds only)

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::io;
use std::result;
use zeroize::Zeroize;

pub mod classify;
pub mod collecting;
pub mod context;
pub mod convenience;
pub mod formatting;
pub mod kinds;
pub mod logging;
pub mod reader;
pub mod ring_buffer;

pub use classify::*;
pub use collecting::*;
pub use context::*;
pub use formatting::*;
pub use kinds::FailureKind;
pub use logging::*;
pub use reader::*;
pub use ring_buffer::*;

/// Type alias for Results using our failure type.
pub type Result<T> = result::Result<T, Failure>;

/// Upper bound on levels snapshotted from a foreign `std::error::Error` chain.
///
/// Foreign `source()` chains are not owned by us, so their termination is
/// not guaranteed by construction.
pub const MAX_FOREIGN_DEPTH: usize = 32;

/// One node of a failure chain.
///
/// # Ownership
///
/// A failure exclusively owns its cause through a `Box`, so every chain is
/// finite and acyclic by construction. Walking it with [`Failure::chain`]
/// always terminates.
///
/// # Mutation
///
/// Annotations may only be added through `&mut self`, which gives the
/// single-owner-at-a-time contract for free: two threads cannot annotate the
/// same failure without external synchronization.
#[must_use = "failures should be reported or propagated"]
pub struct Failure {
    kind: Cow<'static, str>,
    message: Option<Cow<'static, str>>,
    origin: Option<Cow<'static, str>>,
    annotations: Annotations,
    cause: Option<Box<Failure>>,
}

impl Failure {
    /// Create a failure of `kind` with a message.
    #[inline]
    pub fn new(kind: impl Into<Cow<'static, str>>, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind: kind.into(),
            message: Some(message.into()),
            origin: None,
            annotations: Annotations::new(),
            cause: None,
        }
    }

    /// Create a failure of `kind` with no message. Renders as `NULL`.
    #[inline]
    pub fn without_message(kind: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind: kind.into(),
            message: None,
            origin: None,
            annotations: Annotations::new(),
            cause: None,
        }
    }

    /// Wrap `self` as the cause of a new outer failure.
    #[inline]
    pub fn wrap(
        self,
        kind: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Failure::new(kind, message).with_cause(self)
    }

    /// Set the origin (subsystem or component that raised the failure).
    #[inline]
    pub fn with_origin(mut self, origin: impl Into<Cow<'static, str>>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Set the cause. Replaces any previous cause.
    #[inline]
    pub fn with_cause(mut self, cause: Failure) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Builder form of [`Failure::annotate`].
    #[inline]
    pub fn with_annotation(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<AnnotationValue>,
    ) -> Self {
        self.annotate(key, value);
        self
    }

    /// Attach a diagnostic key/value pair without overwriting.
    ///
    /// See [`annotate`] for the collision rules. Never fails.
    #[inline]
    pub fn annotate(
        &mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<AnnotationValue>,
    ) -> &mut Self {
        self.annotations.insert_unique(key, value);
        self
    }

    /// Kind identifier of this level.
    #[inline]
    pub fn kind(&self) -> &str {
        self.kind.as_ref()
    }

    /// Message of this level, if any.
    #[inline]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Origin of this level, if any.
    #[inline]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Annotations attached to this level, in insertion order.
    #[inline]
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// The direct cause, if any.
    #[inline]
    pub fn cause(&self) -> Option<&Failure> {
        self.cause.as_deref()
    }

    /// Iterate the chain, `self` first and innermost cause last.
    #[inline]
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// Number of levels in the chain (at least 1).
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    /// Innermost failure of the chain.
    pub fn root_cause(&self) -> &Failure {
        let mut current = self;
        while let Some(cause) = current.cause() {
            current = cause;
        }
        current
    }

    /// Classify this failure by its kind.
    #[inline]
    pub fn category(&self) -> Category {
        classify(self)
    }

    /// Format the chain with default delimiters.
    #[inline]
    pub fn format_messages(&self) -> Result<String> {
        format_messages(self, &Delimiters::default())
    }

    /// Collect per-level annotations.
    #[inline]
    pub fn collect_data(&self) -> Result<String> {
        collect_data(self)
    }

    /// Classify, format, and build the user-facing explanation in one call.
    pub fn explain(&self) -> Result<String> {
        let messages = self.format_messages()?;
        Ok(explain_for(self.category(), self.kind(), &messages))
    }

    /// Bridge an `io::Error` into a failure.
    ///
    /// The kind is taken from [`kinds::for_io_error`], the raw error kind and
    /// OS error code are kept as annotations, and any source behind a custom
    /// io error becomes the cause.
    pub fn from_io(error: io::Error) -> Self {
        let mut failure = Failure::new(kinds::for_io_error(error.kind()).name(), error.to_string())
            .with_origin("std::io");
        failure.annotate("IoErrorKind", kinds::io_error_kind_label(error.kind()));
        if let Some(code) = error.raw_os_error() {
            failure.annotate("OsErrorCode", i64::from(code));
        }
        if let Some(source) = error.get_ref().and_then(|inner| inner.source()) {
            failure = failure.with_cause(Failure::from_error(source));
        }
        failure
    }

    /// Snapshot a foreign error chain into failures.
    ///
    /// `Failure` levels keep their kind and message, `io::Error` levels keep
    /// their mapped kind, and every other level gets [`kinds::FOREIGN_ERROR`]
    /// since a `dyn Error` carries no type name. Annotations are not copied.
    /// At most [`MAX_FOREIGN_DEPTH`] levels are taken.
    pub fn from_error(error: &(dyn Error + 'static)) -> Self {
        let mut levels: Vec<&(dyn Error + 'static)> = Vec::new();
        let mut current = Some(error);
        while let Some(err) = current {
            if levels.len() == MAX_FOREIGN_DEPTH {
                break;
            }
            levels.push(err);
            current = err.source();
        }

        let mut chain: Option<Failure> = None;
        for err in levels.into_iter().rev() {
            let mut level = if let Some(failure) = err.downcast_ref::<Failure>() {
                let kind: Cow<'static, str> = Cow::Owned(failure.kind().to_owned());
                match failure.message() {
                    Some(message) => Failure::new(kind, message.to_owned()),
                    None => Failure::without_message(kind),
                }
            } else if let Some(io_err) = err.downcast_ref::<io::Error>() {
                Failure::new(kinds::for_io_error(io_err.kind()).name(), err.to_string())
            } else {
                Failure::new(kinds::FOREIGN_ERROR, err.to_string())
            };
            if let Some(cause) = chain.take() {
                level = level.with_cause(cause);
            }
            chain = Some(level);
        }

        // `levels` always holds at least `error` itself.
        chain.unwrap_or_else(|| Failure::new(kinds::FOREIGN_ERROR, error.to_string()))
    }

    /// Build the failure reported when rendering a chain itself fails.
    pub(crate) fn diagnostic_fault(operation: &'static str, level: usize, node: &Failure) -> Self {
        Failure::new(kinds::DIAGNOSTIC_FAULT, "Writing diagnostic output failed")
            .with_origin(env!("CARGO_PKG_NAME"))
            .with_annotation("Operation", operation)
            .with_annotation("Level", level)
            .with_annotation("FailedKind", node.kind().to_owned())
    }
}

/// Iterator over a failure chain, outermost first.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    next: Option<&'a Failure>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Failure;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.cause();
        Some(current)
    }
}

impl std::iter::FusedIterator for Chain<'_> {}

impl Zeroize for Failure {
    fn zeroize(&mut self) {
        if let Cow::Owned(ref mut s) = self.kind {
            s.zeroize();
        }
        if let Some(Cow::Owned(ref mut s)) = self.message {
            s.zeroize();
        }
        if let Some(Cow::Owned(ref mut s)) = self.origin {
            s.zeroize();
        }
        self.annotations.zeroize();
    }
}

impl Drop for Failure {
    fn drop(&mut self) {
        self.zeroize();

        // Detach causes one level at a time so dropping a long chain uses
        // constant stack.
        let mut next = self.cause.take();
        while let Some(mut node) = next {
            next = node.cause.take();
        }
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("kind", &self.kind())
            .field("message", &self.message())
            .field("origin", &self.origin())
            .field("annotations", &self.annotations)
            .field("cause", &self.cause())
            .finish()
    }
}

impl fmt::Display for Failure {
    /// Renders this level only, as `kind=[message]`.
    ///
    /// The rest of the chain is reachable through `Error::source`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}=[{}]",
            self.kind(),
            self.message().unwrap_or(NULL_LITERAL)
        )
    }
}

impl Error for Failure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn Error + 'static))
    }
}
