//! # render-drawio
//!
//! Finds draw.io diagrams in a repository and renders each one to the
//! configured output formats through an external renderer, then reports the
//! files it produced. Built to run as a GitHub Action.
//!
//! ## Quick Start
//!
//! ```no_run
//! use render_drawio::{Config, DrawioRenderer, GithubActionOutput, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .root_dir("/github/workspace")
//!     .sub_dirs(["docs"])
//!     .skip_dirs(["docs/archive"])
//!     .dest_formats(["svg", "png"])
//!     .file("README.svg", "diagrams/overview.drawio")
//!     .build()?;
//!
//! let renderer = DrawioRenderer::new("/opt/drawio-desktop/runner.sh");
//! Pipeline::new(config)?.run(&renderer, &GithubActionOutput::from_env())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Validator**: checks the root, formats, sub-directories and explicit files
//! 2. **Scanner**: walks sub-directories and synthesizes destination files
//! 3. **Merger**: combines explicit and scanned pairs
//! 4. **Render driver**: calls the renderer once per pair, fail-fast
//! 5. **Reporter**: emits the rendered files relative to the root

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod command;
mod config;
mod drawio;
mod error;
mod filemap;
mod pipeline;
mod render;
mod report;
mod scanner;
mod validator;

pub mod format;

pub use command::{CommandOutput, ExecCommand, shell_quote};
pub use config::{Config, ConfigBuilder};
pub use drawio::{DEFAULT_TIMEOUT, DEFAULT_WARMUP, DrawioRenderer, VirtualDisplay};
pub use error::{Error, Result};
pub use filemap::{FileMap, MergePolicy, drop_empty, merge};
pub use format::{FormatSet, WILDCARD};
pub use pipeline::{Pipeline, PipelineStats};
pub use render::{RenderDriver, RenderOutcome, Renderer};
pub use report::{GithubActionOutput, OutputSink, join_quoted, report_files};
pub use validator::is_valid_path;

/// Validates `config`, renders every planned file and reports the result.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - Explicit and scanned pairs conflict under [`MergePolicy::Reject`]
/// - Any single render fails
/// - A rendered file cannot be reported relative to the root
pub fn run<R, S>(config: Config, renderer: &R, sink: &S) -> Result<PipelineStats>
where
    R: Renderer + ?Sized,
    S: OutputSink + ?Sized,
{
    Pipeline::new(config)?.run(renderer, sink)
}
