//! Render driver.
//!
//! Drives an external [`Renderer`] over a [`FileMap`], one pair at a time,
//! stopping at the first failure.

use crate::error::{Error, Result};
use crate::filemap::FileMap;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Converts a source file into a destination file. Both paths are absolute.
///
/// Implementations enforce their own timeout. Closures with the signature
/// `Fn(&Path, &Path) -> Result<()>` implement this trait.
pub trait Renderer {
    /// Renders `src` to `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversion fails; the whole batch is aborted.
    fn render(&self, src: &Path, dest: &Path) -> Result<()>;

    /// Called once before the first [`Renderer::render`] of a batch with
    /// work in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the renderer cannot be made ready.
    fn prepare(&self) -> Result<()> {
        Ok(())
    }
}

impl<F> Renderer for F
where
    F: Fn(&Path, &Path) -> Result<()>,
{
    fn render(&self, src: &Path, dest: &Path) -> Result<()> {
        self(src, dest)
    }
}

/// What a render batch produced.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct RenderOutcome {
    /// Absolute destinations rendered successfully, in processing order
    pub rendered: Vec<PathBuf>,

    /// The failure that aborted the batch, if any
    pub failure: Option<Error>,
}

impl RenderOutcome {
    /// Returns true if every pair was rendered.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Converts the outcome into the rendered list or the aborting error.
    ///
    /// # Errors
    ///
    /// Returns the failure that aborted the batch.
    pub fn into_result(self) -> Result<Vec<PathBuf>> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.rendered),
        }
    }
}

/// Invokes a renderer for every pair of a file map.
pub struct RenderDriver {
    root_dir: PathBuf,
}

impl RenderDriver {
    /// Creates a driver that resolves pairs against `root_dir`.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Renders each pair sequentially and stops at the first failure.
    ///
    /// An empty map succeeds without calling the renderer at all, not even
    /// [`Renderer::prepare`].
    pub fn run<R>(&self, files: &FileMap, renderer: &R) -> RenderOutcome
    where
        R: Renderer + ?Sized,
    {
        let mut outcome = RenderOutcome {
            rendered: Vec::with_capacity(files.len()),
            failure: None,
        };

        if files.is_empty() {
            info!("Found no files to process");
            return outcome;
        }

        if let Err(e) = renderer.prepare() {
            error!("Renderer is not ready: {}", e);
            outcome.failure = Some(e);
            return outcome;
        }

        for (dest, src) in files {
            info!("Rendering {} -> {}", src, dest);
            let abs_src = self.root_dir.join(src);
            let abs_dest = self.root_dir.join(dest);

            if let Err(e) = renderer.render(&abs_src, &abs_dest) {
                error!("Rendering {} failed, aborting the remaining files", src);
                outcome.failure = Some(match e {
                    Error::Render { .. } => e,
                    other => Error::render(&abs_src, &abs_dest, &other),
                });
                return outcome;
            }
            outcome.rendered.push(abs_dest);
        }

        info!("Rendered {} files", outcome.rendered.len());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn map(pairs: &[(&str, &str)]) -> FileMap {
        pairs
            .iter()
            .map(|(d, s)| ((*d).to_string(), (*s).to_string()))
            .collect()
    }

    #[test]
    fn test_empty_map_is_a_no_op() {
        let calls = Cell::new(0);
        let renderer = |_: &Path, _: &Path| -> Result<()> {
            calls.set(calls.get() + 1);
            Ok(())
        };

        let outcome = RenderDriver::new("/r").run(&FileMap::new(), &renderer);
        assert!(outcome.is_success());
        assert!(outcome.rendered.is_empty());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_paths_are_joined_with_root() {
        let seen = RefCell::new(Vec::new());
        let renderer = |src: &Path, dest: &Path| -> Result<()> {
            seen.borrow_mut().push((src.to_path_buf(), dest.to_path_buf()));
            Ok(())
        };

        let files = map(&[("sub/c.svg", "sub/c.drawio")]);
        let rendered = RenderDriver::new("/r")
            .run(&files, &renderer)
            .into_result()
            .unwrap();

        assert_eq!(rendered, vec![PathBuf::from("/r/sub/c.svg")]);
        assert_eq!(
            seen.into_inner(),
            vec![(PathBuf::from("/r/sub/c.drawio"), PathBuf::from("/r/sub/c.svg"))]
        );
    }

    #[test]
    fn test_aborts_after_first_failure() {
        let calls = Cell::new(0);
        let renderer = |_: &Path, _: &Path| -> Result<()> {
            calls.set(calls.get() + 1);
            if calls.get() == 2 {
                return Err(Error::Command {
                    command: "drawio".to_string(),
                    exit_code: Some(1),
                    message: "exit status: 1".to_string(),
                    output: "Error: bad file".to_string(),
                });
            }
            Ok(())
        };

        let files = map(&[("a.svg", "a.drawio"), ("b.svg", "b.drawio"), ("c.svg", "c.drawio")]);
        let outcome = RenderDriver::new("/r").run(&files, &renderer);

        assert_eq!(calls.get(), 2);
        assert_eq!(outcome.rendered, vec![PathBuf::from("/r/a.svg")]);
        let err = outcome.into_result().unwrap_err();
        assert!(err.is_render());
        assert!(err.to_string().contains("/r/b.drawio"));
        assert!(err.to_string().contains("Error: bad file"));
    }

    struct NotReady;

    impl Renderer for NotReady {
        fn render(&self, _: &Path, _: &Path) -> Result<()> {
            panic!("render called on a renderer that failed to prepare");
        }

        fn prepare(&self) -> Result<()> {
            Err(Error::config("display missing"))
        }
    }

    #[test]
    fn test_prepare_failure_aborts() {
        let files = map(&[("a.svg", "a.drawio")]);
        let outcome = RenderDriver::new("/r").run(&files, &NotReady);
        assert!(!outcome.is_success());
        assert!(outcome.rendered.is_empty());
    }
}
