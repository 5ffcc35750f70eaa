//! Destination to source file mappings and how they are combined.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Mapping from a root-relative destination path to its root-relative source.
///
/// Keys are unique, so every destination has exactly one source. Iteration
/// order carries no meaning for rendering.
pub type FileMap = BTreeMap<String, String>;

/// How to resolve a destination that is both declared explicitly and found
/// by the directory scan with a different source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// The explicitly declared source is kept
    #[default]
    ExplicitWins,
    /// The scanned source replaces the declared one
    ScannedWins,
    /// The conflict fails the run
    Reject,
}

/// Removes pairs whose destination or source is empty.
///
/// Such pairs are the result of sloppy input like `--files "a.svg="` and are
/// dropped without an error.
#[must_use]
pub fn drop_empty(files: FileMap) -> FileMap {
    files
        .into_iter()
        .filter(|(dest, src)| {
            let keep = !dest.is_empty() && !src.is_empty();
            if !keep {
                debug!("Dropping incomplete file pair {:?}={:?}", dest, src);
            }
            keep
        })
        .collect()
}

/// Combines the explicit file list with the pairs synthesized by the scan.
///
/// Pairs with an empty side are dropped from both inputs. A destination
/// present in both maps with the same source is not a conflict.
///
/// # Errors
///
/// Returns [`Error::DuplicateDestination`] on the first conflict when the
/// policy is [`MergePolicy::Reject`].
pub fn merge(explicit: &FileMap, scanned: FileMap, policy: MergePolicy) -> Result<FileMap> {
    let mut merged = drop_empty(explicit.clone());

    for (dest, src) in drop_empty(scanned) {
        match merged.get(&dest) {
            None => {
                merged.insert(dest, src);
            }
            Some(existing) if *existing == src => {}
            Some(existing) => match policy {
                MergePolicy::ExplicitWins => {
                    warn!(
                        "Scanned {} -> {} conflicts with declared source {}, keeping the declared one",
                        src, dest, existing
                    );
                }
                MergePolicy::ScannedWins => {
                    warn!(
                        "Scanned {} -> {} replaces declared source {}",
                        src, dest, existing
                    );
                    merged.insert(dest, src);
                }
                MergePolicy::Reject => {
                    return Err(Error::DuplicateDestination {
                        explicit: existing.clone(),
                        dest,
                        scanned: src,
                    });
                }
            },
        }
    }

    debug!("Merged file map holds {} pairs", merged.len());
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> FileMap {
        pairs
            .iter()
            .map(|(d, s)| ((*d).to_string(), (*s).to_string()))
            .collect()
    }

    #[test]
    fn test_drop_empty() {
        let files = map(&[("a.svg", "a.drawio"), ("", "b.drawio"), ("c.svg", "")]);
        assert_eq!(drop_empty(files), map(&[("a.svg", "a.drawio")]));
    }

    #[test]
    fn test_merge_disjoint() {
        let explicit = map(&[("out/x.png", "x.drawio")]);
        let scanned = map(&[("a.svg", "a.drawio")]);

        let merged = merge(&explicit, scanned, MergePolicy::Reject).unwrap();
        assert_eq!(
            merged,
            map(&[("out/x.png", "x.drawio"), ("a.svg", "a.drawio")])
        );
    }

    #[test]
    fn test_merge_same_pair_is_not_a_conflict() {
        let explicit = map(&[("a.svg", "a.drawio")]);
        let scanned = map(&[("a.svg", "a.drawio")]);

        let merged = merge(&explicit, scanned, MergePolicy::Reject).unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_merge_conflict_policies() {
        let explicit = map(&[("a.svg", "src/a.xml")]);
        let scanned = map(&[("a.svg", "a.drawio")]);

        let kept = merge(&explicit, scanned.clone(), MergePolicy::ExplicitWins).unwrap();
        assert_eq!(kept["a.svg"], "src/a.xml");

        let replaced = merge(&explicit, scanned.clone(), MergePolicy::ScannedWins).unwrap();
        assert_eq!(replaced["a.svg"], "a.drawio");

        let err = merge(&explicit, scanned, MergePolicy::Reject).unwrap_err();
        assert!(matches!(err, Error::DuplicateDestination { ref dest, .. } if dest == "a.svg"));
    }
}
