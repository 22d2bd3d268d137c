//! Discovery of DeepLabCut output files in a directory tree.

use std::path::{Path, PathBuf};

use glob::Pattern;
use regex::Regex;
use walkdir::WalkDir;

/// File extension DeepLabCut uses for its serialized predictions.
pub const DLC_OUTPUT_SUFFIX: &str = "h5";

/// Returns true if the file name looks like a DeepLabCut output file.
///
/// DeepLabCut names its outputs `<video><scorer>.h5`, where the scorer
/// embeds the network (`DLC_...` or `DeepLabCut_...`) and the training
/// shuffle (`shuffle<N>`).
pub fn is_dlc_output(path: &Path) -> bool {
    if path
        .extension()
        .map_or(true, |ext| ext != DLC_OUTPUT_SUFFIX)
    {
        return false;
    }
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    if !name.contains("DLC_") && !name.contains("DeepLabCut_") {
        return false;
    }
    Regex::new(r"shuffle\d+").unwrap().is_match(name)
}

/// Recursively collects DeepLabCut output files under `root`.
///
/// Unreadable entries are logged and skipped; the walk continues. An
/// optional glob `pattern` narrows the candidates by file name. Results are
/// sorted so repeated runs process files in the same order.
pub fn find_candidates(root: &Path, pattern: Option<&Pattern>) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_dlc_output(entry.path()) {
            continue;
        }
        if let Some(pattern) = pattern {
            let matches = entry
                .path()
                .file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| pattern.matches(name));
            if !matches {
                continue;
            }
        }
        found.push(entry.into_path());
    }
    found.sort();
    found
}
