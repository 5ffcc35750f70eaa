use anyhow::Context;
use clap::Parser;
use render_drawio::{
    Config, ConfigBuilder, DrawioRenderer, GithubActionOutput, MergePolicy, Pipeline,
    VirtualDisplay,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "render-drawio",
    version,
    author,
    about = "Render draw.io diagrams in a repository to SVG, PNG, JPG or PDF",
    long_about = "Render draw.io diagrams in a repository to SVG, PNG, JPG or PDF.\n\n\
    Source files are found by walking --sub-dirs below --root-dir, or listed \
    explicitly with --files. Every rendered file is reported, relative to the \
    root, as the GitHub Action output named by --output-key.\n\n\
    USAGE EXAMPLES:\n  \
      # Render every .drawio file in the workspace to SVG\n  \
      render-drawio --root-dir /github/workspace\n\n  \
      # Render docs/ to SVG and PNG, skipping docs/archive\n  \
      render-drawio -d docs -s docs/archive --formats svg,png\n\n  \
      # Render one file explicitly\n  \
      render-drawio --files img/overview.png=diagrams/overview.drawio"
)]
struct Cli {
    /// Root directory of the files to render (absolute)
    #[arg(short, long, env = "GITHUB_WORKSPACE", default_value = "/files", value_name = "PATH")]
    root_dir: PathBuf,

    /// Comma-separated sub-directories of --root-dir to search recursively
    #[arg(short = 'd', long, value_delimiter = ',', default_value = ".", value_name = "DIRS")]
    sub_dirs: Vec<String>,

    /// Comma-separated directories, relative to --root-dir, not to descend into
    #[arg(short = 's', long, value_delimiter = ',', default_value = ".git", value_name = "DIRS")]
    skip_dirs: Vec<String>,

    /// Comma-separated files to render, of form 'dest-file=src-file'
    ///
    /// The src-file may have any extension; the dest-file must end with one
    /// of pdf, png, jpg or svg.
    #[arg(short, long, value_delimiter = ',', value_parser = parse_file_pair, value_name = "DEST=SRC")]
    files: Vec<(String, String)>,

    /// Comma-separated formats to render scanned files as
    #[arg(long, value_delimiter = ',', default_value = "svg", value_name = "FORMATS")]
    formats: Vec<String>,

    /// What to do when --files and the scan produce the same destination
    #[arg(long, value_enum, default_value = "explicit-wins")]
    merge_policy: CliMergePolicy,

    /// Name of the GitHub Action output listing the rendered files
    #[arg(long, default_value = "rendered-files")]
    output_key: String,

    /// Quote every reported path
    #[arg(long)]
    quote_output: bool,

    /// Only list what would be rendered
    #[arg(long)]
    dry_run: bool,

    /// Seconds a single render may take
    #[arg(long, default_value_t = 10, value_name = "SECS")]
    timeout: u64,

    /// Seconds to wait for the virtual display before rendering
    #[arg(long, default_value_t = 1, value_name = "SECS")]
    warmup: u64,

    /// Command line of the draw.io desktop runner
    #[arg(long, env = "DRAWIO_DESKTOP_RUNNER_COMMAND_LINE", default_value = "drawio")]
    drawio_command: String,

    /// X display for the Xvfb server
    #[arg(long, env = "XVFB_DISPLAY", default_value = ":99")]
    xvfb_display: String,

    /// Extra options for the Xvfb server
    #[arg(long, env = "XVFB_OPTIONS", default_value = "")]
    xvfb_options: String,

    /// Don't start Xvfb (a display is already available)
    #[arg(long)]
    no_xvfb: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: CliLogLevel,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliMergePolicy {
    /// Keep the source given with --files
    ExplicitWins,
    /// Use the source found by the scan
    ScannedWins,
    /// Fail the run
    Reject,
}

impl From<CliMergePolicy> for MergePolicy {
    fn from(p: CliMergePolicy) -> Self {
        match p {
            CliMergePolicy::ExplicitWins => Self::ExplicitWins,
            CliMergePolicy::ScannedWins => Self::ScannedWins,
            CliMergePolicy::Reject => Self::Reject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliLogLevel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

fn parse_file_pair(s: &str) -> Result<(String, String), String> {
    // An empty item, as in `--files ""`, is an incomplete pair and gets dropped
    if s.trim().is_empty() {
        return Ok((String::new(), String::new()));
    }
    s.split_once('=')
        .map(|(dest, src)| (dest.trim().to_string(), src.trim().to_string()))
        .ok_or_else(|| format!("{s:?} must be formatted as dest-file=src-file"))
}

/// `-d ""` splits into one empty item; it means an empty list.
fn non_empty(items: &[String]) -> impl Iterator<Item = &String> {
    items.iter().filter(|item| !item.trim().is_empty())
}

fn config_builder(cli: &Cli) -> ConfigBuilder {
    Config::builder()
        .root_dir(cli.root_dir.clone())
        .sub_dirs(non_empty(&cli.sub_dirs).cloned())
        .skip_dirs(non_empty(&cli.skip_dirs).cloned())
        .files(cli.files.iter().cloned())
        .dest_formats(non_empty(&cli.formats).cloned())
        .merge_policy(cli.merge_policy.into())
        .output_key(cli.output_key.clone())
        .quote_output(cli.quote_output)
        .dry_run(cli.dry_run)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.log_level, cli.verbose);

    let pipeline = Pipeline::new(config_builder(&cli).into_config())
        .context("Failed to validate configuration")?;
    debug!("Got config {:?}", pipeline.config());

    let mut renderer =
        DrawioRenderer::new(cli.drawio_command).timeout(Duration::from_secs(cli.timeout));
    if !cli.no_xvfb && !cli.xvfb_display.is_empty() {
        renderer = renderer.with_display(
            VirtualDisplay::new(cli.xvfb_display, cli.xvfb_options)
                .warmup(Duration::from_secs(cli.warmup)),
        );
    }

    let stats = pipeline
        .run(&renderer, &GithubActionOutput::from_env())
        .context("Rendering failed")?;

    debug!("Pipeline stats: {}", serde_json::to_string(&stats)?);
    Ok(())
}

fn setup_tracing(level: CliLogLevel, verbosity: u8) {
    let level = match verbosity {
        0 => level,
        1 => level.max(CliLogLevel::Debug),
        _ => CliLogLevel::Trace,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("render_drawio={}", level.as_str())));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .init();
}
