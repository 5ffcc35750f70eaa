//! Reporting rendered files back to the automation platform.

use crate::error::{Error, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Receives the key/value result of a run.
pub trait OutputSink {
    /// Emits one result value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    fn emit(&self, key: &str, value: &str) -> Result<()>;
}

impl<F> OutputSink for F
where
    F: Fn(&str, &str) -> Result<()>,
{
    fn emit(&self, key: &str, value: &str) -> Result<()> {
        self(key, value)
    }
}

/// Sets a GitHub Actions step output.
///
/// With an output file (the `GITHUB_OUTPUT` environment variable in a
/// runner) the value is appended as `key=value`, or as a `key<<DELIMITER`
/// block when it spans lines; otherwise the legacy `::set-output` workflow
/// command is printed to stdout with its value escaped.
#[derive(Debug, Clone, Default)]
pub struct GithubActionOutput {
    output_file: Option<PathBuf>,
}

impl GithubActionOutput {
    /// Creates a sink writing to `output_file`, or to stdout when `None`.
    #[must_use]
    pub const fn new(output_file: Option<PathBuf>) -> Self {
        Self { output_file }
    }

    /// Creates a sink from the `GITHUB_OUTPUT` environment variable.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os("GITHUB_OUTPUT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        )
    }
}

impl OutputSink for GithubActionOutput {
    fn emit(&self, key: &str, value: &str) -> Result<()> {
        info!(key, value, "Setting GitHub Action output");
        match &self.output_file {
            Some(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| Error::io(path, e))?;
                writeln!(file, "{}", output_file_entry(key, value)).map_err(|e| Error::io(path, e))
            }
            None => {
                println!("::set-output name={key}::{}", escape_command_value(value));
                Ok(())
            }
        }
    }
}

/// A value with a line break would start a new `key=value` entry, so it is
/// written as a delimited block instead.
fn output_file_entry(key: &str, value: &str) -> String {
    if !value.contains(['\n', '\r']) {
        return format!("{key}={value}");
    }
    let mut delimiter = String::from("RENDER_DRAWIO_EOF");
    while value.lines().any(|line| line == delimiter) {
        delimiter.push('_');
    }
    format!("{key}<<{delimiter}\n{value}\n{delimiter}")
}

fn escape_command_value(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Reports `files` under `key` as one space-joined value.
///
/// With a root directory, every path is first rewritten relative to it.
/// Plain joining does not escape spaces inside paths; use `quote` to wrap
/// each path in double quotes instead.
///
/// # Errors
///
/// Returns [`Error::Report`] if a path is not under `root_dir`, or the
/// sink's error.
pub fn report_files<S>(
    sink: &S,
    key: &str,
    root_dir: Option<&Path>,
    files: &[PathBuf],
    quote: bool,
) -> Result<()>
where
    S: OutputSink + ?Sized,
{
    let paths = match root_dir.filter(|root| !root.as_os_str().is_empty()) {
        Some(root) => files
            .iter()
            .map(|file| relative_to(root, file))
            .collect::<Result<Vec<_>>>()?,
        None => files
            .iter()
            .map(|file| file.to_string_lossy().into_owned())
            .collect(),
    };

    let value = if quote {
        join_quoted(&paths)
    } else {
        paths.join(" ")
    };
    sink.emit(key, &value)
}

fn relative_to(root: &Path, file: &Path) -> Result<String> {
    file.strip_prefix(root)
        .map(|rel| rel.to_string_lossy().into_owned())
        .map_err(|_| Error::Report {
            path: file.to_path_buf(),
            root: root.to_path_buf(),
        })
}

/// Joins strings as space-separated, double-quoted words.
#[must_use]
pub fn join_quoted<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|s| format!("{:?}", s.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_report_relative_paths() {
        let emitted = RefCell::new(Vec::<(String, String)>::new());
        let sink = |k: &str, v: &str| -> Result<()> {
            emitted.borrow_mut().push((k.to_string(), v.to_string()));
            Ok(())
        };

        let files = vec![PathBuf::from("/r/a.svg"), PathBuf::from("/r/sub/c.svg")];
        report_files(&sink, "rendered-files", Some(Path::new("/r")), &files, false).unwrap();

        assert_eq!(
            emitted.into_inner(),
            vec![("rendered-files".to_string(), "a.svg sub/c.svg".to_string())]
        );
    }

    #[test]
    fn test_report_path_outside_root_fails() {
        let sink = |_: &str, _: &str| -> Result<()> { panic!("nothing should be emitted") };

        let files = vec![PathBuf::from("/r/a.svg"), PathBuf::from("/other/b.svg")];
        let err = report_files(&sink, "rendered-files", Some(Path::new("/r")), &files, false)
            .unwrap_err();
        assert!(matches!(err, Error::Report { ref path, .. } if path == Path::new("/other/b.svg")));
    }

    #[test]
    fn test_report_without_root_keeps_paths() {
        let emitted = RefCell::new(Vec::<(String, String)>::new());
        let sink = |k: &str, v: &str| -> Result<()> {
            emitted.borrow_mut().push((k.to_string(), v.to_string()));
            Ok(())
        };

        let files = vec![PathBuf::from("/r/a.svg")];
        report_files(&sink, "out", Some(Path::new("")), &files, false).unwrap();
        report_files(&sink, "out", None, &[], false).unwrap();

        let emitted = emitted.into_inner();
        assert_eq!(emitted[0].1, "/r/a.svg");
        assert_eq!(emitted[1].1, "");
    }

    #[test]
    fn test_join_quoted() {
        assert_eq!(join_quoted(&["foo bar", "bar baz"]), r#""foo bar" "bar baz""#);
        assert_eq!(join_quoted(&[r#"say "hi""#]), r#""say \"hi\"""#);
    }

    #[test]
    fn test_report_quoted() {
        let emitted = RefCell::new(Vec::<(String, String)>::new());
        let sink = |_: &str, v: &str| -> Result<()> {
            emitted.borrow_mut().push((String::new(), v.to_string()));
            Ok(())
        };

        let files = vec![PathBuf::from("/r/my diagram.svg")];
        report_files(&sink, "k", Some(Path::new("/r")), &files, true).unwrap();
        assert_eq!(emitted.into_inner()[0].1, r#""my diagram.svg""#);
    }

    #[test]
    fn test_github_output_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.path().join("output");
        std::fs::write(&path, "previous=1\n").unwrap();

        let sink = GithubActionOutput::new(Some(path.clone()));
        sink.emit("rendered-files", "a.svg b.svg").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "previous=1\nrendered-files=a.svg b.svg\n");
    }

    #[test]
    fn test_github_output_file_multiline_value() {
        let temp = assert_fs::TempDir::new().unwrap();
        let path = temp.path().join("output");

        let sink = GithubActionOutput::new(Some(path.clone()));
        sink.emit("rendered-files", "a\nother=injected.svg").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "rendered-files<<RENDER_DRAWIO_EOF\na\nother=injected.svg\nRENDER_DRAWIO_EOF\n"
        );
        assert!(!content.lines().any(|line| line.starts_with("other=")));
    }

    #[test]
    fn test_output_delimiter_not_in_value() {
        let entry = output_file_entry("k", "x\nRENDER_DRAWIO_EOF\ny");
        assert_eq!(
            entry,
            "k<<RENDER_DRAWIO_EOF_\nx\nRENDER_DRAWIO_EOF\ny\nRENDER_DRAWIO_EOF_"
        );
    }

    #[test]
    fn test_escape_command_value() {
        assert_eq!(escape_command_value("a.svg b.svg"), "a.svg b.svg");
        assert_eq!(escape_command_value("50%\r\n::x"), "50%25%0D%0A::x");
    }
}
