//! Configuration validation.
//!
//! Checks run in a fixed order and stop at the first failure:
//! root directory, destination formats, source formats, sub-directories,
//! then the explicit file pairs.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filemap::drop_empty;
use crate::format::{FormatSet, SEPARATOR, WILDCARD, format_of};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

impl Config {
    /// Validates the configuration and returns its normalized form.
    ///
    /// Normalization lower-cases and de-duplicates both format lists, cleans
    /// sub-directory and skip-directory entries, and drops explicit file
    /// pairs with an empty side.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The root directory is relative or not an existing directory
    /// - A destination or source format is not in its valid set
    /// - A sub-directory is absolute, escapes the root or doesn't exist
    /// - An explicit file pair is malformed, has a disallowed format, or its
    ///   source file doesn't exist
    pub fn validate(mut self) -> Result<Self> {
        validate_root(&self.root_dir)?;

        self.dest_formats =
            normalize_formats("dest_formats", self.dest_formats, &self.valid_dest_formats)?;
        self.src_formats =
            normalize_formats("src_formats", self.src_formats, &self.valid_src_formats)?;

        self.sub_dirs = self.sub_dirs.iter().map(|d| clean_dir(d)).collect();
        for sub_dir in &self.sub_dirs {
            validate_relative("sub_dirs", sub_dir)?;
            let abs = self.root_dir.join(sub_dir);
            if !abs.is_dir() {
                return Err(Error::missing_path("sub_dirs", abs));
            }
        }
        dedup(&mut self.sub_dirs);

        self.skip_dirs = self.skip_dirs.iter().map(|d| clean_dir(d)).collect();
        dedup(&mut self.skip_dirs);

        self.files = drop_empty(self.files);
        for (dest, src) in &self.files {
            validate_relative("files dest-path", dest)?;
            validate_relative("files src-path", src)?;

            if !self.valid_dest_formats.allows(&format_of(dest)) {
                return Err(Error::invalid_path(
                    "files dest-path",
                    dest.as_str(),
                    format!("format is not one of {}", self.valid_dest_formats),
                ));
            }
            if !self.valid_src_formats.allows(&format_of(src)) {
                return Err(Error::invalid_path(
                    "files src-path",
                    src.as_str(),
                    format!("format is not one of {}", self.valid_src_formats),
                ));
            }

            let abs = self.root_dir.join(src);
            if !abs.is_file() {
                return Err(Error::missing_path("files src-path", abs));
            }
        }

        debug!(
            "Validated config: {} sub-dirs, {} skip-dirs, {} explicit files",
            self.sub_dirs.len(),
            self.skip_dirs.len(),
            self.files.len()
        );
        Ok(self)
    }
}

fn validate_root(root: &Path) -> Result<()> {
    if !root.is_absolute() {
        return Err(Error::config(format!(
            "Root directory must be an absolute path: {}",
            root.display()
        )));
    }
    if !root.is_dir() {
        return Err(Error::config(format!(
            "Root directory must be a directory: {}",
            root.display()
        )));
    }
    Ok(())
}

/// Lower-cases every token and checks it against the valid set.
fn normalize_formats(field: &str, formats: Vec<String>, valid: &FormatSet) -> Result<Vec<String>> {
    let mut normalized = Vec::with_capacity(formats.len());
    for (i, format) in formats.into_iter().enumerate() {
        let format = format.to_lowercase();
        let field = format!("{field}[{i}]");

        if format.is_empty()
            || format == WILDCARD
            || format.contains(SEPARATOR)
            || format.contains('/')
        {
            return Err(Error::invalid_format(field, format, "expected a bare extension"));
        }
        if !valid.allows(&format) {
            return Err(Error::invalid_format(field, format, valid));
        }
        normalized.push(format);
    }
    dedup(&mut normalized);
    Ok(normalized)
}

fn validate_relative(field: &str, path: &str) -> Result<()> {
    if Path::new(path).is_absolute() {
        return Err(Error::invalid_path(field, path, "must be relative"));
    }
    if !is_valid_path(path) {
        return Err(Error::invalid_path(
            field,
            path,
            "must be a clean '/'-separated path inside the root",
        ));
    }
    Ok(())
}

/// Reports whether `path` is a clean, unrooted, `/`-separated path.
///
/// `.` names the root itself. Otherwise no element may be empty, `.` or
/// `..`, so the path can neither start nor end with a slash and cannot climb
/// out of the root.
#[must_use]
pub fn is_valid_path(path: &str) -> bool {
    if path == "." {
        return true;
    }
    path.split('/')
        .all(|elem| !elem.is_empty() && elem != "." && elem != "..")
}

/// Strips trailing slashes and leading `./` from a relative directory entry.
fn clean_dir(dir: &str) -> String {
    if dir.is_empty() || dir.starts_with('/') {
        return dir.to_string();
    }
    let mut cleaned = dir.trim_end_matches('/');
    while let Some(rest) = cleaned.strip_prefix("./") {
        cleaned = rest.trim_start_matches('/');
    }
    if cleaned.is_empty() {
        ".".to_string()
    } else {
        cleaned.to_string()
    }
}

fn dedup(items: &mut Vec<String>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}
