//! Flattening per-level annotations into one diagnostic string.
//!
//! ```text
//! FileNotFound Data=[Path=a.txt|Operation=read]::FileNotFound Data=[IoErrorKind=NotFound]
//! ```
//!
//! A level with no annotations renders `Data=[None]`.

use crate::formatting::neutralize;
use crate::{Failure, Result};
use std::fmt;

/// Separator between chain levels.
pub const LEVEL_DELIMITER: &str = "::";

/// Separator between `key=value` pairs of one level.
pub const PAIR_DELIMITER: &str = "|";

/// Rendered in place of pairs for a level without annotations.
pub const EMPTY_DATA: &str = "None";

fn write_level<W: fmt::Write>(node: &Failure, out: &mut W) -> fmt::Result {
    write!(out, "{} Data=[", neutralize(node.kind()))?;

    if node.annotations().is_empty() {
        out.write_str(EMPTY_DATA)?;
    } else {
        for (index, (key, value)) in node.annotations().iter().enumerate() {
            if index > 0 {
                out.write_str(PAIR_DELIMITER)?;
            }
            let rendered = value.to_string();
            write!(out, "{}={}", neutralize(key), neutralize(&rendered))?;
        }
    }

    out.write_str("]")?;
    if node.cause().is_some() {
        out.write_str(LEVEL_DELIMITER)?;
    }
    Ok(())
}

/// Stream every level's annotations into `out` without trimming.
///
/// A write error is returned as a `DiagnosticFault` failure, as in
/// [`crate::write_messages`].
pub fn write_data<W: fmt::Write>(root: &Failure, out: &mut W) -> Result<()> {
    for (level, node) in root.chain().enumerate() {
        write_level(node, out).map_err(|_| Failure::diagnostic_fault("CollectData", level, node))?;
    }
    Ok(())
}

/// Collect every level's annotations into one string.
///
/// The result is trimmed and a single trailing `::` is removed.
///
/// ```rust
/// use failchain_diagnostics::{collect_data, Failure};
///
/// let chain = Failure::new("Inner", "b")
///     .wrap("Outer", "a")
///     .with_annotation("k1", "v1");
/// assert_eq!(collect_data(&chain).unwrap(), "Outer Data=[k1=v1]::Inner Data=[None]");
/// ```
pub fn collect_data(root: &Failure) -> Result<String> {
    let mut raw = String::new();
    write_data(root, &mut raw)?;

    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(LEVEL_DELIMITER).unwrap_or(trimmed);
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnnotationValue;

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
    fn single_pair() {
        let failure = Failure::new("Kind", "m").with_annotation("k1", "v1");
        assert_eq!(collect_data(&failure).unwrap(), "Kind Data=[k1=v1]");
    }

    #[test]
    fn no_annotations_renders_none() {
        let failure = Failure::new("Kind", "m");
        assert_eq!(collect_data(&failure).unwrap(), "Kind Data=[None]");
    }

    #[test]
    fn pairs_keep_insertion_order() {
        let failure = Failure::new("Kind", "m")
            .with_annotation("b", 2i64)
            .with_annotation("a", true)
            .with_annotation("b", "again");
        assert_eq!(
            collect_data(&failure).unwrap(),
            "Kind Data=[b=2|a=true|b-1=again]"
        );
    }

    #[test]
    fn null_values_render_literal() {
        let failure = Failure::new("Kind", "m").with_annotation("gone", AnnotationValue::Null);
        assert_eq!(collect_data(&failure).unwrap(), "Kind Data=[gone=NULL]");
    }

    #[test]
    fn levels_joined_without_trailing_delimiter() {
        let failure = Failure::new("C", "c")
            .with_annotation("depth", 3i64)
            .wrap("B", "b")
            .wrap("A", "a")
            .with_annotation("depth", 1i64);
        let data = collect_data(&failure).unwrap();
        assert_eq!(data, "A Data=[depth=1]::B Data=[None]::C Data=[depth=3]");
        assert!(!data.ends_with(LEVEL_DELIMITER));
    }

    #[test]
    fn control_characters_in_values_are_neutralized() {
        let failure = Failure::new("Kind", "m").with_annotation("k", "a\r\nb");
        assert_eq!(collect_data(&failure).unwrap(), "Kind Data=[k=a??b]");
    }

    #[test]
    fn collection_is_idempotent() {
        let failure = Failure::new("B", "b").with_annotation("x", "y").wrap("A", "a");
        assert_eq!(collect_data(&failure).unwrap(), collect_data(&failure).unwrap());
    }

    #[test]
    fn writer_fault_is_reported_with_level() {
        let failure = Failure::new("Inner", "b")
            .with_annotation("k", "v")
            .wrap("Outer", "a");
        let mut out = BrokenWriter { poison: "Inner" };
        let fault = write_data(&failure, &mut out).unwrap_err();

        assert_eq!(fault.kind(), crate::kinds::DIAGNOSTIC_FAULT);
        let field = |key: &str| fault.annotations().get(key).map(|v| v.to_string());
        assert_eq!(field("Operation").as_deref(), Some("CollectData"));
        assert_eq!(field("Level").as_deref(), Some("1"));
        assert_eq!(field("FailedKind").as_deref(), Some("Inner"));
    }
}
