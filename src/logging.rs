//! Structured diagnostic report handed to a logging sink.
//!
//! # Lifetime
//!
//! A [`DiagnosticReport`] borrows the failure it describes and cannot outlive
//! it. Sinks consume it during [`DiagnosticSink::record`] and copy whatever
//! they keep; the failure itself is then propagated to the caller.
//!
//! # Example
//!
//! ```rust
//! use failchain_diagnostics::{DiagnosticReport, Failure, LogLevel};
//!
//! let failure = Failure::new("UnauthorizedAccess", "denied").with_annotation("User", "svc");
//! let report = DiagnosticReport::new(&failure).unwrap();
//!
//! assert_eq!(report.log_level(), LogLevel::Critical);
//! assert_eq!(report.data(), "UnauthorizedAccess Data=[User=svc]");
//!
//! let mut line = String::new();
//! report.write_to(&mut line).unwrap();
//! assert!(line.starts_with("[CRITICAL] AccessDenied kind='UnauthorizedAccess'"));
//! ```

use crate::{Category, Delimiters, Failure, LogLevel, Result};
use std::borrow::Cow;
use std::fmt;

/// Maximum length for any individual field in formatted output
const MAX_FIELD_OUTPUT_LEN: usize = 1024;

/// Truncation indicator appended to truncated strings
const TRUNCATION_INDICATOR: &str = "...[TRUNCATED]";

/// Receiver of diagnostic reports.
///
/// Implementations must not fail: a sink that cannot store a report drops it.
pub trait DiagnosticSink {
    /// Consume one report.
    fn record(&self, report: &DiagnosticReport<'_>);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &S {
    fn record(&self, report: &DiagnosticReport<'_>) {
        (**self).record(report)
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for std::sync::Arc<S> {
    fn record(&self, report: &DiagnosticReport<'_>) {
        (**self).record(report)
    }
}

/// Classification, flattened chain, collected data and explanation of one
/// failure.
#[derive(Debug)]
pub struct DiagnosticReport<'a> {
    failure: &'a Failure,
    category: Category,
    messages: String,
    data: String,
    explanation: String,
}

impl<'a> DiagnosticReport<'a> {
    /// Build a report with default delimiters.
    pub fn new(failure: &'a Failure) -> Result<Self> {
        Self::with_delimiters(failure, &Delimiters::default())
    }

    /// Build a report with explicit delimiters for the message chain.
    pub fn with_delimiters(failure: &'a Failure, delimiters: &Delimiters) -> Result<Self> {
        let category = crate::classify(failure);
        let messages = crate::format_messages(failure, delimiters)?;
        let data = crate::collect_data(failure)?;
        let explanation = crate::explain_for(category, failure.kind(), &messages);
        Ok(Self {
            failure,
            category,
            messages,
            data,
            explanation,
        })
    }

    /// The failure being reported.
    #[inline]
    pub const fn failure(&self) -> &'a Failure {
        self.failure
    }

    /// Kind of the outermost level.
    #[inline]
    pub fn kind(&self) -> &'a str {
        self.failure.kind()
    }

    /// Category of the outermost level.
    #[inline]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Logging action selected by the category.
    #[inline]
    pub const fn log_level(&self) -> LogLevel {
        self.category.log_level()
    }

    /// Flattened message chain.
    #[inline]
    pub fn messages(&self) -> &str {
        &self.messages
    }

    /// Collected annotations.
    #[inline]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// User-facing explanation.
    #[inline]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Write one log line, truncating each field.
    ///
    /// Format:
    /// `[LEVEL] Category kind='...' explanation='...' data='...'`
    ///
    /// The explanation already embeds the message chain.
    pub fn write_to(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(
            f,
            "[{}] {} kind='{}' explanation='{}' data='{}'",
            self.log_level(),
            self.category,
            truncate_with_indicator(self.kind()),
            truncate_with_indicator(&self.explanation),
            truncate_with_indicator(&self.data)
        )
    }

    /// Untruncated multi-line rendering for trusted debug contexts.
    ///
    /// Only available with BOTH the `trusted_debug` feature AND debug
    /// assertions, since annotations routinely carry paths and identities.
    #[cfg(all(feature = "trusted_debug", debug_assertions))]
    pub fn format_for_trusted_debug(&self) -> String {
        let mut output = format!(
            "[{}] {} depth={}\n",
            self.log_level(),
            self.category,
            self.failure.depth()
        );
        for (level, node) in self.failure.chain().enumerate() {
            output.push_str(&format!("  #{level} {node}"));
            if let Some(origin) = node.origin() {
                output.push_str(&format!(" origin='{origin}'"));
            }
            for (key, value) in node.annotations().iter() {
                output.push_str(&format!(" {key}='{value}'"));
            }
            output.push('\n');
        }
        output.push_str(&self.explanation);
        output
    }
}

/// Truncate a string for display to prevent unbounded log lines.
///
/// Returns a Cow<str> to avoid allocation when no truncation is needed.
fn truncate_with_indicator(s: &str) -> Cow<'_, str> {
    if s.len() <= MAX_FIELD_OUTPUT_LEN {
        return Cow::Borrowed(s);
    }

    let max_content_len = MAX_FIELD_OUTPUT_LEN.saturating_sub(TRUNCATION_INDICATOR.len());

    // Last char boundary at or before the limit
    let mut idx = max_content_len;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }

    if idx == 0 {
        return Cow::Borrowed(TRUNCATION_INDICATOR);
    }

    let mut result = String::with_capacity(idx + TRUNCATION_INDICATOR.len());
    result.push_str(&s[..idx]);
    result.push_str(TRUNCATION_INDICATOR);
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Lines(RefCell<Vec<String>>);

    impl DiagnosticSink for Lines {
        fn record(&self, report: &DiagnosticReport<'_>) {
            let mut line = String::new();
            if report.write_to(&mut line).is_ok() {
                self.0.borrow_mut().push(line);
            }
        }
    }

    #[test]
    fn report_fields() {
        let failure = Failure::new("IoFailure", "inner")
            .wrap("FileNotFound", "outer")
            .with_annotation("Path", "/tmp/x");
        let report = DiagnosticReport::with_delimiters(&failure, &Delimiters::new(Some(" / "), None))
            .unwrap();

        assert_eq!(report.category(), Category::NotFound);
        assert_eq!(report.log_level(), LogLevel::Warn);
        assert_eq!(report.messages(), "FileNotFound=[outer] / IoFailure=[inner]");
        assert_eq!(report.data(), "FileNotFound Data=[Path=/tmp/x]::IoFailure Data=[None]");
        assert!(report.explanation().ends_with("[FileNotFound=[outer] / IoFailure=[inner]]"));
    }

    #[test]
    fn sink_through_reference() {
        let sink = Lines::default();
        let failure = Failure::new("Exotic", "boom");
        let report = DiagnosticReport::new(&failure).unwrap();

        let by_ref: &dyn DiagnosticSink = &sink;
        by_ref.record(&report);

        let lines = sink.0.borrow();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[ERROR] Unknown kind='Exotic'"));
        assert!(lines[0].contains("'Exotic' occurred"));
    }

    #[test]
    fn truncate_ascii() {
        let s = "a".repeat(MAX_FIELD_OUTPUT_LEN + 10);
        let truncated = truncate_with_indicator(&s);
        assert!(truncated.len() <= MAX_FIELD_OUTPUT_LEN);
        assert!(truncated.ends_with(TRUNCATION_INDICATOR));
    }

    #[test]
    fn no_truncate_when_under_limit() {
        let truncated = truncate_with_indicator("short string");
        assert!(matches!(truncated, Cow::Borrowed(_)));
    }

    #[test]
    fn truncate_utf8_boundary() {
        let s = "й".repeat(MAX_FIELD_OUTPUT_LEN);
        let truncated = truncate_with_indicator(&s);
        assert!(truncated.len() <= MAX_FIELD_OUTPUT_LEN);
        assert!(truncated.ends_with(TRUNCATION_INDICATOR));
    }

    #[test]
    fn exactly_at_limit() {
        let s = "a".repeat(MAX_FIELD_OUTPUT_LEN);
        let truncated = truncate_with_indicator(&s);
        assert!(matches!(truncated, Cow::Borrowed(_)));
        assert_eq!(truncated.len(), MAX_FIELD_OUTPUT_LEN);
    }

    #[test]
    fn long_data_is_truncated_in_log_line() {
        let failure = Failure::new("IoFailure", "m").with_annotation("Blob", "x".repeat(5000));
        let report = DiagnosticReport::new(&failure).unwrap();
        let mut line = String::new();
        report.write_to(&mut line).unwrap();
        assert!(line.contains(TRUNCATION_INDICATOR));
        assert!(line.len() < 3 * MAX_FIELD_OUTPUT_LEN);
    }

    #[cfg(all(feature = "trusted_debug", debug_assertions))]
    #[test]
    fn trusted_debug_lists_every_level() {
        let failure = Failure::new("Inner", "b")
            .with_annotation("k", "v")
            .wrap("Outer", "a");
        let report = DiagnosticReport::new(&failure).unwrap();
        let text = report.format_for_trusted_debug();
        assert!(text.contains("#0 Outer=[a]"));
        assert!(text.contains("#1 Inner=[b] k='v'"));
    }
}
