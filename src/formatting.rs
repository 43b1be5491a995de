//! Flattening a failure chain into one diagnostic message.
//!
//! Each level renders as `kind=[message]`, followed by
//! `<field> Source=[origin]` when the level has a non-blank origin. Levels
//! are separated by the line delimiter, outermost first:
//!
//! ```text
//! FileNotFound=[Could not find file 'a.txt'.]; Source=[FileReader]
//! FileNotFound=[No such file or directory (os error 2)]; Source=[std::io]
//! ```
//!
//! Control characters inside kinds, messages and origins are replaced with
//! `?`, so the only control characters in the output are the delimiters the
//! caller chose.

use crate::{Failure, NULL_LITERAL, Result};
use std::borrow::Cow;
use std::fmt;

/// Platform line separator, the default line delimiter.
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";

/// Platform line separator, the default line delimiter.
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// Default separator between sub-fields of one level.
pub const DEFAULT_FIELD_DELIMITER: &str = ";";

/// Field delimiters that would collide with `kind=[...]` framing.
pub const RESERVED_FIELD_DELIMITERS: [&str; 4] = [" ", "=", "[", "]"];

/// Delimiters used by [`format_messages`].
///
/// Empty values fall back to the defaults. A reserved field delimiter is a
/// caller contract violation; it is asserted in debug builds only.
///
/// # Panics
///
/// In debug builds, when the field delimiter is one of
/// [`RESERVED_FIELD_DELIMITERS`]. Release builds accept it unchecked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    line: Cow<'static, str>,
    field: Cow<'static, str>,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            line: Cow::Borrowed(LINE_SEPARATOR),
            field: Cow::Borrowed(DEFAULT_FIELD_DELIMITER),
        }
    }
}

impl Delimiters {
    /// Build from optional values; `None` or empty means default.
    ///
    /// # Panics
    ///
    /// In debug builds, when `field` is a reserved delimiter (see
    /// [`Delimiters::with_field`]).
    pub fn new(line: Option<&str>, field: Option<&str>) -> Self {
        let defaults = Self::default();
        let line = line.map_or(defaults.line.clone(), |l| Cow::Owned(l.to_owned()));
        let field = field.map_or(defaults.field.clone(), |f| Cow::Owned(f.to_owned()));
        defaults.with_line(line).with_field(field)
    }

    /// Set the line delimiter.
    #[inline]
    pub fn with_line(mut self, line: impl Into<Cow<'static, str>>) -> Self {
        let line = line.into();
        self.line = if line.is_empty() {
            Cow::Borrowed(LINE_SEPARATOR)
        } else {
            line
        };
        self
    }

    /// Set the field delimiter.
    ///
    /// # Panics
    ///
    /// In debug builds, when `field` is one of [`RESERVED_FIELD_DELIMITERS`].
    #[inline]
    pub fn with_field(mut self, field: impl Into<Cow<'static, str>>) -> Self {
        let field = field.into();
        debug_assert!(
            !RESERVED_FIELD_DELIMITERS.contains(&field.as_ref()),
            "field delimiter {field:?} is reserved for level framing"
        );
        self.field = if field.is_empty() {
            Cow::Borrowed(DEFAULT_FIELD_DELIMITER)
        } else {
            field
        };
        self
    }

    /// Line delimiter in effect.
    #[inline]
    pub fn line(&self) -> &str {
        self.line.as_ref()
    }

    /// Field delimiter in effect.
    #[inline]
    pub fn field(&self) -> &str {
        self.field.as_ref()
    }
}

/// Replace control characters with `?`. Borrows when there are none.
pub(crate) fn neutralize(s: &str) -> Cow<'_, str> {
    if !s.chars().any(char::is_control) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.chars()
            .map(|c| if c.is_control() { '?' } else { c })
            .collect(),
    )
}

fn write_level<W: fmt::Write>(node: &Failure, delimiters: &Delimiters, out: &mut W) -> fmt::Result {
    write!(
        out,
        "{}=[{}]",
        neutralize(node.kind()),
        neutralize(node.message().unwrap_or(NULL_LITERAL))
    )?;

    if let Some(origin) = node.origin().filter(|o| !o.trim().is_empty()) {
        write!(out, "{} Source=[{}]", delimiters.field(), neutralize(origin))?;
    }

    if node.cause().is_some() {
        out.write_str(delimiters.line())?;
    }
    Ok(())
}

/// Stream the chain into `out` without trimming.
///
/// A write error is returned as a `DiagnosticFault` failure annotated with
/// the operation, the level index and the kind of the level being written.
pub fn write_messages<W: fmt::Write>(
    root: &Failure,
    delimiters: &Delimiters,
    out: &mut W,
) -> Result<()> {
    for (level, node) in root.chain().enumerate() {
        write_level(node, delimiters, out)
            .map_err(|_| Failure::diagnostic_fault("FormatMessages", level, node))?;
    }
    Ok(())
}

/// Flatten the chain into one message.
///
/// The result is trimmed. No line delimiter follows the innermost level, so a
/// delimiter ending in `]` never eats the closing bracket.
///
/// ```rust
/// use failchain_diagnostics::{format_messages, Delimiters, Failure};
///
/// let chain = Failure::new("Inner", "B").wrap("Outer", "A");
/// let text = format_messages(&chain, &Delimiters::new(Some(" | "), None)).unwrap();
/// assert_eq!(text, "Outer=[A] | Inner=[B]");
/// ```
pub fn format_messages(root: &Failure, delimiters: &Delimiters) -> Result<String> {
    let mut raw = String::new();
    write_messages(root, delimiters, &mut raw)?;

    Ok(raw.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fails on any write containing `poison`.
    struct BrokenWriter {
        poison: &'static str,
    }

    impl fmt::Write for BrokenWriter {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            if s.contains(self.poison) {
                return Err(fmt::Error);
            }
            Ok(())
        }
    }

    #[test]
    fn single_level_has_no_delimiter() {
        let failure = Failure::new("Kind", "message");
        assert_eq!(failure.format_messages().unwrap(), "Kind=[message]");
    }

    #[test]
    fn missing_message_renders_null() {
        let failure = Failure::without_message("Kind");
        assert_eq!(failure.format_messages().unwrap(), "Kind=[NULL]");
    }

    #[test]
    fn two_levels_with_defaults() {
        let failure = Failure::new("Inner", "B").wrap("Outer", "A");
        assert_eq!(
            failure.format_messages().unwrap(),
            format!("Outer=[A]{LINE_SEPARATOR}Inner=[B]")
        );
    }

    #[test]
    fn origin_is_appended_with_field_delimiter() {
        let failure = Failure::new("Inner", "B")
            .with_origin("std::io")
            .wrap("Outer", "A");
        let delimiters = Delimiters::new(Some("\n"), Some(","));
        assert_eq!(
            format_messages(&failure, &delimiters).unwrap(),
            "Outer=[A]\nInner=[B], Source=[std::io]"
        );
    }

    #[test]
    fn blank_origin_is_ignored() {
        let failure = Failure::new("Kind", "m").with_origin("   ");
        assert_eq!(failure.format_messages().unwrap(), "Kind=[m]");
    }

    #[test]
    fn empty_delimiters_fall_back_to_defaults() {
        assert_eq!(Delimiters::new(Some(""), Some("")), Delimiters::default());
        assert_eq!(Delimiters::new(None, None), Delimiters::default());
    }

    #[test]
    fn result_is_trimmed() {
        let failure = Failure::new("Inner", "trailing   ").wrap("Outer", "A");
        let text = format_messages(&failure, &Delimiters::new(Some("\n"), None)).unwrap();
        assert_eq!(text, "Outer=[A]\nInner=[trailing   ]");

        let failure = Failure::new(" Padded", "m");
        assert_eq!(failure.format_messages().unwrap(), "Padded=[m]");
    }

    #[test]
    fn bracket_terminated_line_delimiter_keeps_last_level() {
        let single = Failure::new("Kind", "m");
        let delimiters = Delimiters::new(Some("]"), None);
        assert_eq!(format_messages(&single, &delimiters).unwrap(), "Kind=[m]");

        let chain = Failure::new("Inner", "b").wrap("Outer", "a");
        let delimiters = Delimiters::new(Some(" ]"), None);
        assert_eq!(
            format_messages(&chain, &delimiters).unwrap(),
            "Outer=[a] ]Inner=[b]"
        );
    }

    #[test]
    fn control_characters_are_neutralized() {
        let failure = Failure::new("Kind", "line one\nline two\t!");
        assert_eq!(failure.format_messages().unwrap(), "Kind=[line one?line two?!]");
    }

    #[test]
    fn formatting_is_idempotent() {
        let failure = Failure::new("C", "c").wrap("B", "b").wrap("A", "a");
        let first = failure.format_messages().unwrap();
        let second = failure.format_messages().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn writer_fault_is_reported_with_level() {
        let failure = Failure::new("Inner", "B").wrap("Outer", "A");
        let mut out = BrokenWriter { poison: "Inner" };
        let fault = write_messages(&failure, &Delimiters::default(), &mut out).unwrap_err();

        assert_eq!(fault.kind(), crate::kinds::DIAGNOSTIC_FAULT);
        let level = fault.annotations().get("Level").map(|v| v.to_string());
        assert_eq!(level.as_deref(), Some("1"));
        let failed = fault.annotations().get("FailedKind").map(|v| v.to_string());
        assert_eq!(failed.as_deref(), Some("Inner"));
    }
}
