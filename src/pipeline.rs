use crate::{
    config::Config,
    error::Result,
    filemap::{self, FileMap},
    render::{RenderDriver, Renderer},
    report::{OutputSink, report_files},
    scanner::{ScanStats, Scanner},
};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// Pairs declared explicitly in the configuration
    pub explicit_files: usize,

    /// Pairs synthesized by the directory scan
    pub scanned_files: usize,

    /// Pairs left after merging
    pub planned_files: usize,

    /// Destinations rendered successfully
    pub rendered_files: usize,

    /// Directories pruned by the skip list
    pub skipped_dirs: usize,

    /// Entries the scan could not read
    pub scan_errors: usize,

    /// Total execution time
    pub duration: Duration,

    /// Time spent scanning and merging
    pub scan_duration: Duration,

    /// Time spent rendering
    pub render_duration: Duration,
}

/// Runs one batch: scan, merge, render, report.
pub struct Pipeline {
    config: Config,
    scanner: Scanner,
    driver: RenderDriver,
}

impl Pipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(config: Config) -> Result<Self> {
        let config = config.validate()?;
        let scanner = Scanner::new(&config);
        let driver = RenderDriver::new(&config.root_dir);

        Ok(Self {
            config,
            scanner,
            driver,
        })
    }

    /// The validated configuration this pipeline runs with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Scans the sub-directories and merges the result with the explicit
    /// file list, without rendering anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the merge policy rejects a conflicting pair.
    pub fn plan(&self) -> Result<FileMap> {
        self.plan_with_stats().map(|(files, _)| files)
    }

    fn plan_with_stats(&self) -> Result<(FileMap, ScanStats)> {
        let (scanned, stats) = self.scanner.scan();
        info!(
            "Found {} files to render from the scan, {} declared explicitly",
            scanned.len(),
            self.config.files.len()
        );
        let files = filemap::merge(&self.config.files, scanned, self.config.merge_policy)?;
        Ok((files, stats))
    }

    /// Executes the pipeline and returns statistics.
    ///
    /// # Process
    ///
    /// 1. **Scan**: walks the sub-directories for source files
    /// 2. **Merge**: combines scanned and explicit pairs
    /// 3. **Render**: calls `renderer` for each pair, aborting on the first failure
    /// 4. **Report**: emits the rendered files, relative to the root, to `sink`
    ///
    /// Nothing is reported when rendering fails.
    ///
    /// # Errors
    ///
    /// Returns the first merge, render or report error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use render_drawio::{Config, DrawioRenderer, GithubActionOutput, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder().root_dir("/github/workspace").build()?;
    /// let renderer = DrawioRenderer::new("/opt/drawio/runner.sh");
    ///
    /// let stats = Pipeline::new(config)?.run(&renderer, &GithubActionOutput::from_env())?;
    /// println!("rendered {} files", stats.rendered_files);
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all, fields(root_dir = %self.config.root_dir.display()))]
    pub fn run<R, S>(&self, renderer: &R, sink: &S) -> Result<PipelineStats>
    where
        R: Renderer + ?Sized,
        S: OutputSink + ?Sized,
    {
        let start_time = Instant::now();

        info!("Stage 1/3: Scanning for source files...");
        let (files, scan_stats) = self.plan_with_stats()?;
        let scan_duration = start_time.elapsed();

        let mut stats = PipelineStats {
            explicit_files: self.config.files.len(),
            scanned_files: scan_stats.matched,
            planned_files: files.len(),
            skipped_dirs: scan_stats.skipped_dirs,
            scan_errors: scan_stats.errors,
            scan_duration,
            ..PipelineStats::default()
        };

        if self.config.dry_run {
            warn!("Dry run mode enabled - skipping rendering");
            for (dest, src) in &files {
                info!("Would render {} -> {}", src, dest);
            }
            stats.duration = start_time.elapsed();
            return Ok(stats);
        }

        info!("Stage 2/3: Rendering {} files...", files.len());
        let render_start = Instant::now();
        let rendered = self.driver.run(&files, renderer).into_result()?;
        stats.render_duration = render_start.elapsed();
        stats.rendered_files = rendered.len();

        info!("Stage 3/3: Reporting rendered files...");
        report_files(
            sink,
            &self.config.output_key,
            Some(self.config.root_dir.as_path()),
            &rendered,
            self.config.quote_output,
        )?;

        stats.duration = start_time.elapsed();
        info!(
            "✓ Rendered {} files in {:.2}s",
            stats.rendered_files,
            stats.duration.as_secs_f64()
        );
        Ok(stats)
    }
}
