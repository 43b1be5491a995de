//! Contextual annotations attached to a [`Failure`] as it propagates.
//!
//! Every layer a failure passes through may add key/value pairs describing
//! what it was doing (the path being read, the working directory, the user
//! identity). Layers add, they never remove or overwrite: a key that is
//! already present is suffixed (`key-1`, `key-2`, ...) instead.
//!
//! # Memory Model
//!
//! The store is a `SmallVec<[Annotation; 4]>`: most failures carry a handful
//! of annotations and stay inline. Owned keys and values are zeroized on drop
//! since they routinely hold paths and identities.
//!
//! # Example
//!
//! ```rust
//! use failchain_diagnostics::{annotate, Failure};
//!
//! let mut failure = Failure::new("IoFailure", "read failed");
//! annotate(Some(&mut failure), "Attempt", 1i64);
//! annotate(Some(&mut failure), "Attempt", 2i64);
//!
//! let keys: Vec<&str> = failure.annotations().iter().map(|(k, _)| k).collect();
//! assert_eq!(keys, ["Attempt", "Attempt-1"]);
//!
//! // Annotating nothing is a no-op.
//! annotate(None, "Attempt", 3i64);
//! ```

use crate::Failure;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use zeroize::Zeroize;

/// Number of suffixed keys probed before an annotation is dropped.
pub const MAX_SUFFIX_PROBES: usize = 100;

/// Literal rendered for absent messages and null annotation values.
pub const NULL_LITERAL: &str = "NULL";

/// A dynamically typed annotation value.
///
/// Rendering is deferred to `Display` at collection time.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// Free text.
    Text(Cow<'static, str>),
    /// Signed integer.
    Integer(i64),
    /// Unsigned integer too large for `Integer`.
    Unsigned(u64),
    /// Floating point number.
    Float(f64),
    /// Boolean flag.
    Bool(bool),
    /// Opaque bytes, rendered as a length only.
    Blob(Vec<u8>),
    /// Absent value. Stored as the text `NULL`.
    Null,
}

impl AnnotationValue {
    /// `Null` becomes the literal text `NULL`; everything else is kept.
    #[inline]
    fn normalized(self) -> Self {
        match self {
            Self::Null => Self::Text(Cow::Borrowed(NULL_LITERAL)),
            other => other,
        }
    }

    /// Borrow the text, if this is a text value.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Unsigned(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Blob(bytes) => write!(f, "<blob:{} bytes>", bytes.len()),
            Self::Null => f.write_str(NULL_LITERAL),
        }
    }
}

impl Zeroize for AnnotationValue {
    fn zeroize(&mut self) {
        match self {
            Self::Text(Cow::Owned(s)) => s.zeroize(),
            Self::Blob(bytes) => bytes.zeroize(),
            _ => {}
        }
    }
}

impl From<&'static str> for AnnotationValue {
    fn from(value: &'static str) -> Self {
        Self::Text(Cow::Borrowed(value))
    }
}

impl From<String> for AnnotationValue {
    fn from(value: String) -> Self {
        Self::Text(Cow::Owned(value))
    }
}

impl From<Cow<'static, str>> for AnnotationValue {
    fn from(value: Cow<'static, str>) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AnnotationValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for AnnotationValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for AnnotationValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u64> for AnnotationValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Unsigned(value), Self::Integer)
    }
}

impl From<usize> for AnnotationValue {
    fn from(value: usize) -> Self {
        Self::from(value as u64)
    }
}

impl From<f64> for AnnotationValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AnnotationValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<u8>> for AnnotationValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<AnnotationValue>> From<Option<T>> for AnnotationValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One key/value pair.
#[derive(Debug)]
struct Annotation {
    key: Cow<'static, str>,
    value: AnnotationValue,
}

impl Zeroize for Annotation {
    fn zeroize(&mut self) {
        if let Cow::Owned(ref mut s) = self.key {
            s.zeroize();
        }
        self.value.zeroize();
    }
}

/// Insertion-ordered annotation store with unique keys.
///
/// No `Clone`: annotations live exactly as long as the failure that owns them.
#[derive(Default)]
pub struct Annotations {
    entries: SmallVec<[Annotation; 4]>,
}

impl Annotations {
    /// Create an empty store.
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }

    /// Number of annotations.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no annotations.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if `key` is present.
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|a| a.key == key)
    }

    /// Value stored under exactly `key`.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&AnnotationValue> {
        self.entries.iter().find(|a| a.key == key).map(|a| &a.value)
    }

    /// Iterate in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnnotationValue)> {
        self.entries.iter().map(|a| (a.key.as_ref(), &a.value))
    }

    /// Insert under `key`, or under the first free `key-N` for N in
    /// `1..=MAX_SUFFIX_PROBES`.
    ///
    /// Returns the key actually used, or `None` when every probe was taken
    /// and the annotation was dropped.
    pub fn insert_unique(
        &mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<AnnotationValue>,
    ) -> Option<&str> {
        let key = key.into();
        let slot = if !self.contains_key(&key) {
            key
        } else {
            let free = (1..=MAX_SUFFIX_PROBES)
                .map(|n| format!("{key}-{n}"))
                .find(|candidate| !self.contains_key(candidate))?;
            Cow::Owned(free)
        };

        self.entries.push(Annotation {
            key: slot,
            value: value.into().normalized(),
        });
        self.entries.last().map(|a| a.key.as_ref())
    }
}

impl fmt::Debug for Annotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Zeroize for Annotations {
    fn zeroize(&mut self) {
        for entry in &mut self.entries {
            entry.zeroize();
        }
        self.entries.clear();
    }
}

impl Drop for Annotations {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Attach a key/value pair to `failure` without overwriting.
///
/// - `None` failure: no-op
/// - existing `key`: stored under the first free `key-1` ... `key-100`
/// - all probes taken: dropped silently
/// - null value: stored as `NULL`
///
/// Never fails. Use [`Annotations::insert_unique`] to observe drops.
#[inline]
pub fn annotate(
    failure: Option<&mut Failure>,
    key: impl Into<Cow<'static, str>>,
    value: impl Into<AnnotationValue>,
) {
    if let Some(failure) = failure {
        failure.annotate(key, value);
    }
}

/// Attach `MachineName`, `CurrentDirectory` and `UserIdentity`.
///
/// Values that cannot be determined are stored as `NULL`.
pub fn annotate_environment(failure: &mut Failure) {
    let machine = std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .ok();
    let directory = std::env::current_dir()
        .ok()
        .map(|dir| dir.display().to_string());
    let identity = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok();

    failure
        .annotate("MachineName", machine)
        .annotate("CurrentDirectory", directory)
        .annotate("UserIdentity", identity);
}
