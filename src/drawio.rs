//! The draw.io desktop renderer and the virtual display it needs.

use crate::command::{ExecCommand, shell_quote};
use crate::error::{Error, Result};
use crate::render::Renderer;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

/// Default deadline for one render.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time given to the virtual display to come up.
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(1);

/// An Xvfb server started in the background before rendering.
///
/// Xvfb gives no readiness signal, so [`VirtualDisplay::start`] sleeps for a
/// fixed warm-up. A slow machine can still lose that race.
#[derive(Debug, Clone)]
pub struct VirtualDisplay {
    display: String,
    options: String,
    warmup: Duration,
}

impl VirtualDisplay {
    /// Creates a display description such as `":99"` with extra Xvfb
    /// command-line options.
    pub fn new(display: impl Into<String>, options: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            options: options.into(),
            warmup: DEFAULT_WARMUP,
        }
    }

    /// Sets the warm-up delay.
    #[must_use]
    pub const fn warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// The X display name, passed to renders as `DISPLAY`.
    #[must_use]
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Spawns Xvfb on a background thread and waits for the warm-up.
    ///
    /// Xvfb exiting with an error is logged, not returned.
    pub fn start(&self) {
        let line = format!("Xvfb {} {}", shell_quote(&self.display), self.options);
        info!("Starting virtual display {}", self.display);

        thread::spawn(move || {
            if let Err(e) = ExecCommand::shell(line).run() {
                error!("Error executing Xvfb: {}", e);
            }
        });

        debug!("Waiting {:?} for the display to come up", self.warmup);
        thread::sleep(self.warmup);
    }
}

/// Renders through the draw.io desktop command line
/// (`<runner> -x -t <src> -o <dest> --no-sandbox`).
#[derive(Debug, Clone)]
pub struct DrawioRenderer {
    runner: String,
    timeout: Duration,
    display: Option<VirtualDisplay>,
}

impl DrawioRenderer {
    /// Creates a renderer invoking `runner`, the draw.io executable or the
    /// wrapper script that launches it.
    pub fn new(runner: impl Into<String>) -> Self {
        Self {
            runner: runner.into(),
            timeout: DEFAULT_TIMEOUT,
            display: None,
        }
    }

    /// Sets the deadline of a single render.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Starts `display` before the first render and points draw.io at it.
    #[must_use]
    pub fn with_display(mut self, display: VirtualDisplay) -> Self {
        self.display = Some(display);
        self
    }

    /// Builds the command for one render.
    fn command(&self, src: &Path, dest: &Path) -> ExecCommand {
        let line = format!(
            "{} -x -t {} -o {} --no-sandbox",
            shell_quote(&self.runner),
            shell_quote(&src.to_string_lossy()),
            shell_quote(&dest.to_string_lossy()),
        );
        let command = ExecCommand::shell(line).timeout(self.timeout);
        match &self.display {
            Some(display) => command.env("DISPLAY", display.display()),
            None => command,
        }
    }
}

impl Renderer for DrawioRenderer {
    fn prepare(&self) -> Result<()> {
        if self.runner.trim().is_empty() {
            return Err(Error::config("draw.io runner command line is not set"));
        }
        if let Some(display) = &self.display {
            display.start();
        }
        Ok(())
    }

    fn render(&self, src: &Path, dest: &Path) -> Result<()> {
        let output = self
            .command(src, dest)
            .run()
            .map_err(|e| Error::render(src, dest, &e))?;
        debug!("draw.io output: {}", output.output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::path::PathBuf;

    #[test]
    fn test_command_line_quotes_paths() {
        let renderer = DrawioRenderer::new("/opt/drawio/runner.sh");
        let cmd = renderer.command(Path::new("/r/my diagram.drawio"), Path::new("/r/my diagram.svg"));
        assert_eq!(
            cmd.command_line(),
            "/bin/sh -c '/opt/drawio/runner.sh' -x -t '/r/my diagram.drawio' -o '/r/my diagram.svg' --no-sandbox"
        );
    }

    #[test]
    fn test_render_with_fake_runner() {
        let temp = assert_fs::TempDir::new().unwrap();
        let runner = temp.child("runner.sh");
        // Writes the display it was given to the path following -o
        runner
            .write_str("#!/bin/sh\nwhile [ \"$1\" != \"-o\" ]; do shift; done\necho \"$DISPLAY\" > \"$2\"\n")
            .unwrap();
        make_executable(runner.path());
        let dest = temp.child("out.svg");

        let renderer = DrawioRenderer::new(runner.path().display().to_string())
            .with_display(VirtualDisplay::new(":42", "").warmup(Duration::ZERO));
        renderer
            .render(Path::new("/unused.drawio"), dest.path())
            .unwrap();

        let written = std::fs::read_to_string(dest.path()).unwrap();
        assert_eq!(written.trim(), ":42");
    }

    #[test]
    fn test_render_failure_carries_paths() {
        let renderer = DrawioRenderer::new("false");
        let src = PathBuf::from("/r/a.drawio");
        let err = renderer.render(&src, Path::new("/r/a.svg")).unwrap_err();
        assert!(err.is_render());
        assert!(err.to_string().contains("/r/a.drawio"));
    }

    #[test]
    fn test_render_timeout() {
        let temp = assert_fs::TempDir::new().unwrap();
        let runner = temp.child("slow.sh");
        runner.write_str("#!/bin/sh\nsleep 5\n").unwrap();
        make_executable(runner.path());

        let renderer = DrawioRenderer::new(runner.path().display().to_string())
            .timeout(Duration::from_millis(100));
        let err = renderer
            .render(Path::new("/r/a.drawio"), Path::new("/r/a.svg"))
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_prepare_requires_runner() {
        assert!(DrawioRenderer::new("  ").prepare().is_err());
        assert!(DrawioRenderer::new("drawio").prepare().is_ok());
    }

    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).unwrap();
    }
}
