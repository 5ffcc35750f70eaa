use crate::error::Result;
use crate::filemap::{FileMap, MergePolicy};
use crate::format::FormatSet;
use std::path::PathBuf;

const DEFAULT_ROOT_DIR: &str = "/files";
const DEFAULT_SUB_DIRS: &[&str] = &["."];
const DEFAULT_SKIP_DIRS: &[&str] = &[".git"];
const DEFAULT_SRC_FORMATS: &[&str] = &["drawio"];
// "*" lets an explicitly listed source file have any extension
const DEFAULT_VALID_SRC_FORMATS: &[&str] = &["drawio", "*"];
const DEFAULT_DEST_FORMATS: &[&str] = &["svg"];
const DEFAULT_VALID_DEST_FORMATS: &[&str] = &["pdf", "png", "jpg", "svg"];
const DEFAULT_OUTPUT_KEY: &str = "rendered-files";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Configuration for a render run.
///
/// Use [`Config::builder()`] to construct a validated configuration. All
/// paths other than `root_dir` are relative to `root_dir` and use `/` as
/// separator.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Absolute path of the root directory
    pub root_dir: PathBuf,

    /// Sub-directories of the root to search recursively for source files
    pub sub_dirs: Vec<String>,

    /// Directories not to descend into, matched on their full relative path
    pub skip_dirs: Vec<String>,

    /// Explicit destination to source pairs
    pub files: FileMap,

    /// Formats of the source files picked up by the scan
    pub src_formats: Vec<String>,

    /// Formats a source file may have
    pub valid_src_formats: FormatSet,

    /// Formats every scanned source is rendered to
    pub dest_formats: Vec<String>,

    /// Formats a destination file may have
    pub valid_dest_formats: FormatSet,

    /// Conflict resolution between explicit and scanned pairs
    pub merge_policy: MergePolicy,

    /// Key under which the rendered file list is reported
    pub output_key: String,

    /// Report every path as a double-quoted string
    pub quote_output: bool,

    /// Plan only, do not render or report
    pub dry_run: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use render_drawio::Config;
    ///
    /// let config = Config::builder()
    ///     .root_dir("/github/workspace")
    ///     .sub_dirs(["docs"])
    ///     .dest_formats(["svg", "png"])
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(DEFAULT_ROOT_DIR),
            sub_dirs: strings(DEFAULT_SUB_DIRS),
            skip_dirs: strings(DEFAULT_SKIP_DIRS),
            files: FileMap::new(),
            src_formats: strings(DEFAULT_SRC_FORMATS),
            valid_src_formats: FormatSet::new(DEFAULT_VALID_SRC_FORMATS),
            dest_formats: strings(DEFAULT_DEST_FORMATS),
            valid_dest_formats: FormatSet::new(DEFAULT_VALID_DEST_FORMATS),
            merge_policy: MergePolicy::default(),
            output_key: DEFAULT_OUTPUT_KEY.to_string(),
            quote_output: false,
            dry_run: false,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    root_dir: Option<PathBuf>,
    sub_dirs: Option<Vec<String>>,
    skip_dirs: Option<Vec<String>>,
    files: FileMap,
    src_formats: Option<Vec<String>>,
    valid_src_formats: Option<FormatSet>,
    dest_formats: Option<Vec<String>>,
    valid_dest_formats: Option<FormatSet>,
    merge_policy: Option<MergePolicy>,
    output_key: Option<String>,
    quote_output: bool,
    dry_run: bool,
}

impl ConfigBuilder {
    /// Sets the root directory. Must be absolute.
    #[must_use]
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(path.into());
        self
    }

    /// Sets the sub-directories to scan.
    #[must_use]
    pub fn sub_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_dirs = Some(dirs.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the directories to skip while scanning.
    ///
    /// Entries are full root-relative paths: `docs/old` skips only that
    /// directory, not every directory named `old`.
    #[must_use]
    pub fn skip_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_dirs = Some(dirs.into_iter().map(Into::into).collect());
        self
    }

    /// Adds one explicit destination to source pair.
    #[must_use]
    pub fn file(mut self, dest: impl Into<String>, src: impl Into<String>) -> Self {
        self.files.insert(dest.into(), src.into());
        self
    }

    /// Adds explicit destination to source pairs.
    #[must_use]
    pub fn files<I, D, S>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (D, S)>,
        D: Into<String>,
        S: Into<String>,
    {
        self.files
            .extend(pairs.into_iter().map(|(d, s)| (d.into(), s.into())));
        self
    }

    /// Sets the formats of source files picked up by the scan.
    #[must_use]
    pub fn src_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.src_formats = Some(formats.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the formats a source file may have.
    #[must_use]
    pub fn valid_src_formats(mut self, formats: FormatSet) -> Self {
        self.valid_src_formats = Some(formats);
        self
    }

    /// Sets the formats every scanned source is rendered to.
    #[must_use]
    pub fn dest_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dest_formats = Some(formats.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the formats a destination file may have.
    #[must_use]
    pub fn valid_dest_formats(mut self, formats: FormatSet) -> Self {
        self.valid_dest_formats = Some(formats);
        self
    }

    /// Sets the conflict resolution between explicit and scanned pairs.
    #[must_use]
    pub fn merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = Some(policy);
        self
    }

    /// Sets the key the rendered file list is reported under.
    #[must_use]
    pub fn output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    /// Reports every path as a double-quoted string.
    #[must_use]
    pub fn quote_output(mut self, enabled: bool) -> Self {
        self.quote_output = enabled;
        self
    }

    /// Enables dry run mode (nothing is rendered).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// The returned configuration is normalized: format lists are lower
    /// case, directory entries are cleaned and incomplete file pairs are
    /// gone.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        self.into_config().validate()
    }

    /// Assembles the configuration without validating it, for callers that
    /// hand it straight to [`Pipeline::new`](crate::Pipeline::new), which
    /// validates it once.
    #[must_use]
    pub fn into_config(self) -> Config {
        let defaults = Config::default();
        Config {
            root_dir: self.root_dir.unwrap_or(defaults.root_dir),
            sub_dirs: self.sub_dirs.unwrap_or(defaults.sub_dirs),
            skip_dirs: self.skip_dirs.unwrap_or(defaults.skip_dirs),
            files: self.files,
            src_formats: self.src_formats.unwrap_or(defaults.src_formats),
            valid_src_formats: self.valid_src_formats.unwrap_or(defaults.valid_src_formats),
            dest_formats: self.dest_formats.unwrap_or(defaults.dest_formats),
            valid_dest_formats: self
                .valid_dest_formats
                .unwrap_or(defaults.valid_dest_formats),
            merge_policy: self.merge_policy.unwrap_or(defaults.merge_policy),
            output_key: self.output_key.unwrap_or(defaults.output_key),
            quote_output: self.quote_output,
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder().root_dir(temp.path()).build().unwrap();

        assert_eq!(config.sub_dirs, vec!["."]);
        assert_eq!(config.skip_dirs, vec![".git"]);
        assert_eq!(config.src_formats, vec!["drawio"]);
        assert_eq!(config.dest_formats, vec!["svg"]);
        assert!(config.valid_src_formats.allows_any());
        assert!(!config.valid_dest_formats.allows_any());
        assert_eq!(config.output_key, "rendered-files");
        assert_eq!(config.merge_policy, MergePolicy::ExplicitWins);
        assert!(config.files.is_empty());
    }

    #[test]
    fn test_invalid_root_dir() {
        let result = Config::builder()
            .root_dir("/nonexistent/path/that/should/not/exist")
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_builder_collects_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.drawio"), "<mxfile/>").unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .file("a.png", "a.drawio")
            .files([("b.svg", "a.drawio")])
            .build()
            .unwrap();

        assert_eq!(config.files.len(), 2);
        assert_eq!(config.files["b.svg"], "a.drawio");
    }

    #[test]
    fn test_into_config_is_not_normalized() {
        let config = Config::builder()
            .root_dir("relative/root")
            .dest_formats(["SVG"])
            .into_config();

        assert_eq!(config.root_dir, PathBuf::from("relative/root"));
        assert_eq!(config.dest_formats, vec!["SVG"]);
        assert!(config.validate().is_err());
    }
}
