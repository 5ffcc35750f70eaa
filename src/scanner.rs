use crate::{
    config::Config,
    filemap::FileMap,
    format::{extension_to_format, format_to_extension, path_extension},
};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, trace, warn};
use walkdir::{DirEntry, WalkDir};

/// Statistics collected during scanning.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct ScanStats {
    /// Entries visited, directories included
    pub visited: usize,

    /// Destination pairs synthesized, one per source file and destination
    /// format
    pub matched: usize,

    /// Directories pruned through the skip list
    pub skipped_dirs: usize,

    /// Entries the walk could not read
    pub errors: usize,
}

/// Walks the configured sub-directories and synthesizes destination files
/// for every source file found.
pub(crate) struct Scanner {
    root_dir: PathBuf,
    sub_dirs: Vec<String>,
    skip_dirs: HashSet<String>,
    src_formats: HashSet<String>,
    dest_formats: Vec<String>,
}

impl Scanner {
    /// Creates a new scanner from a validated configuration.
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            root_dir: config.root_dir.clone(),
            sub_dirs: config.sub_dirs.clone(),
            skip_dirs: config.skip_dirs.iter().cloned().collect(),
            src_formats: config.src_formats.iter().cloned().collect(),
            dest_formats: config.dest_formats.clone(),
        }
    }

    /// Scans every sub-directory and returns the synthesized pairs.
    ///
    /// Entries that cannot be read are logged and skipped, they never abort
    /// the walk.
    pub(crate) fn scan(&self) -> (FileMap, ScanStats) {
        let mut files = FileMap::new();
        let mut stats = ScanStats::default();

        for sub_dir in &self.sub_dirs {
            info!("Walking sub-directory {}", sub_dir);
            self.walk(&self.root_dir.join(sub_dir), &mut files, &mut stats);
        }

        debug!(
            "Scan complete: {} visited, {} matched, {} directories skipped, {} errors",
            stats.visited, stats.matched, stats.skipped_dirs, stats.errors
        );
        (files, stats)
    }

    fn walk(&self, start: &Path, files: &mut FileMap, stats: &mut ScanStats) {
        let mut skipped_dirs = 0;
        let walker = WalkDir::new(start)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                let skip = self.is_skipped_dir(entry);
                if skip {
                    skipped_dirs += 1;
                }
                !skip
            });

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Observed error {} while walking, but continuing...", e);
                    stats.errors += 1;
                    continue;
                }
            };
            stats.visited += 1;

            // Directories are only descended into, never rendered
            if entry.file_type().is_dir() {
                continue;
            }

            let Some(src) = self.relative(entry.path()) else {
                warn!(
                    "Skipping {}: file name is not valid UTF-8",
                    entry.path().display()
                );
                stats.errors += 1;
                continue;
            };
            trace!("Visiting path {}", src);
            for (dest, src) in self.destinations_for(&src) {
                stats.matched += 1;
                files.insert(dest, src);
            }
        }
        stats.skipped_dirs += skipped_dirs;
    }

    /// Returns one destination per configured destination format, or nothing
    /// when the file's format is not a source format.
    fn destinations_for(&self, src: &str) -> Vec<(String, String)> {
        let ext = path_extension(src);
        if !self
            .src_formats
            .contains(&extension_to_format(ext).to_lowercase())
        {
            trace!("File {} not matched by source formats", src);
            return Vec::new();
        }

        let stem = &src[..src.len() - ext.len()];
        self.dest_formats
            .iter()
            .map(|format| {
                let dest = format!("{stem}{}", format_to_extension(format));
                debug!("Matched {} -> {}", src, dest);
                (dest, src.to_string())
            })
            .collect()
    }

    /// Skip entries are matched on the full root-relative path, so `a/b`
    /// prunes only that directory and not every directory named `b`.
    fn is_skipped_dir(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let Some(rel) = self.relative(entry.path()) else {
            return false;
        };
        let skip = self.skip_dirs.contains(&rel);
        if skip {
            debug!("Directory {} skipped", rel);
        }
        skip
    }

    /// Root-relative, `/`-separated form of a walked path. The root itself is
    /// `.`. `None` when a component is not valid UTF-8.
    fn relative(&self, path: &Path) -> Option<String> {
        let rel = pathdiff::diff_paths(path, &self.root_dir).unwrap_or_else(|| path.to_path_buf());
        let parts = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_str()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;

        if parts.is_empty() {
            Some(".".to_string())
        } else {
            Some(parts.join("/"))
        }
    }
}
