//! Format registry.
//!
//! A format token is a file extension without its leading separator, always
//! compared in lower case (`"drawio"`, `"svg"`). A set of valid formats may
//! contain the [`WILDCARD`] token, meaning any format is accepted.

use std::collections::BTreeSet;
use std::fmt;

/// Token that makes a [`FormatSet`] accept every format.
pub const WILDCARD: &str = "*";

/// Separator between a file stem and its extension.
pub const SEPARATOR: char = '.';

/// Converts an extension such as `".svg"` into its format token `"svg"`.
///
/// Only a single leading separator is stripped; casing is left untouched.
#[must_use]
pub fn extension_to_format(ext: &str) -> &str {
    ext.strip_prefix(SEPARATOR).unwrap_or(ext)
}

/// Converts a format token such as `"svg"` into the extension `".svg"`.
#[must_use]
pub fn format_to_extension(format: &str) -> String {
    format!("{SEPARATOR}{format}")
}

/// Returns the extension of the last element of a `/`-separated path,
/// including the separator, or an empty string when there is none.
///
/// `"docs/a.drawio"` gives `".drawio"`, `"docs.v2/readme"` gives `""`.
#[must_use]
pub fn path_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    path[name_start..]
        .rfind(SEPARATOR)
        .map_or("", |i| &path[name_start + i..])
}

/// Returns the normalized (lower-case) format token of a path.
#[must_use]
pub fn format_of(path: &str) -> String {
    extension_to_format(path_extension(path)).to_lowercase()
}

/// A set of lower-case format tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatSet {
    formats: BTreeSet<String>,
}

impl FormatSet {
    /// Creates a set from any list of tokens, lower-casing each one.
    pub fn new<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            formats: formats
                .into_iter()
                .map(|f| f.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Returns true if the exact token is in the set.
    #[must_use]
    pub fn contains(&self, format: &str) -> bool {
        self.formats.contains(format)
    }

    /// Returns true if the set holds the wildcard token.
    #[must_use]
    pub fn allows_any(&self) -> bool {
        self.formats.contains(WILDCARD)
    }

    /// Returns true if the token is in the set or the set holds the wildcard.
    #[must_use]
    pub fn allows(&self, format: &str) -> bool {
        self.contains(format) || self.allows_any()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Iterates over the tokens in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.formats.iter().map(String::as_str)
    }
}

impl fmt::Display for FormatSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, format) in self.formats.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{format}")?;
        }
        write!(f, "]")
    }
}

impl<S: AsRef<str>> FromIterator<S> for FormatSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_round_trip() {
        for token in ["drawio", "svg", "png", "tar.gz", "SVG", ""] {
            assert_eq!(extension_to_format(&format_to_extension(token)), token);
        }
    }

    #[test]
    fn test_extension_to_format_strips_one_separator() {
        assert_eq!(extension_to_format(".svg"), "svg");
        assert_eq!(extension_to_format("..svg"), ".svg");
        assert_eq!(extension_to_format("svg"), "svg");
        assert_eq!(extension_to_format(".PNG"), "PNG");
    }

    #[test]
    fn test_path_extension() {
        assert_eq!(path_extension("a.drawio"), ".drawio");
        assert_eq!(path_extension("sub/ok/c.drawio"), ".drawio");
        assert_eq!(path_extension("archive.tar.gz"), ".gz");
        assert_eq!(path_extension("docs.v2/readme"), "");
        assert_eq!(path_extension("Makefile"), "");
        assert_eq!(path_extension(".gitignore"), ".gitignore");
    }

    #[test]
    fn test_format_of_lowercases() {
        assert_eq!(format_of("Diagram.DrawIO"), "drawio");
        assert_eq!(format_of("noext"), "");
    }

    #[test]
    fn test_format_set_wildcard() {
        let strict = FormatSet::new(["pdf", "PNG", "svg"]);
        assert!(strict.allows("png"));
        assert!(!strict.allows("gif"));
        assert!(!strict.allows_any());

        let any: FormatSet = ["drawio", "*"].into_iter().collect();
        assert!(any.allows("xml"));
        assert!(any.allows(""));
        assert!(!any.contains("xml"));
    }

    #[test]
    fn test_format_set_display() {
        let set = FormatSet::new(["svg", "pdf"]);
        assert_eq!(set.to_string(), "[pdf, svg]");
        assert_eq!(FormatSet::default().to_string(), "[]");
    }
}
