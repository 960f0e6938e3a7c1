//! Golden file discovery.
//!
//! Discovery only lists files: it expands glob patterns relative to the
//! calling test's directory and names each match. Opening fixtures is a
//! separate step, so this module can be tested against plain directories.

use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::errors::{GoldenError, GoldenResult};

/// One golden file matched for a parameterized test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldenCase {
    /// Stable, human-readable case name (e.g. `basic.yml`).
    pub id: String,
    /// Absolute path of the golden file.
    pub path: PathBuf,
}

/// True if `pattern` contains glob metacharacters.
pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(|c| matches!(c, '*' | '?' | '['))
}

/// Expand `patterns` relative to `base_dir` into an ordered, deduplicated
/// list of files.
///
/// A pattern matching nothing is a [`GoldenError::NoMatch`], unless update
/// mode is on and the pattern is a literal path: that file will be created
/// when the test flushes.
pub fn expand(patterns: &[&str], base_dir: &Path, update_mode: bool) -> GoldenResult<Vec<PathBuf>> {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    let escaped_base = Pattern::escape(&base_dir.to_string_lossy());

    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    for pattern in patterns {
        let full = format!("{}/{}", escaped_base.trim_end_matches('/'), pattern);
        let entries = glob::glob_with(&full, options).map_err(|e| GoldenError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let mut matched = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| GoldenError::Pattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
            if path.is_file() {
                matched.push(path);
            }
        }

        if matched.is_empty() {
            if update_mode && !has_wildcard(pattern) {
                matched.push(base_dir.join(pattern));
            } else {
                return Err(GoldenError::NoMatch {
                    patterns: vec![pattern.to_string()],
                    dir: base_dir.to_path_buf(),
                });
            }
        }

        for path in matched {
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }
    }

    Ok(paths)
}

/// Expand `patterns` and name each match for the test `test_name`.
pub fn collect(
    patterns: &[&str],
    base_dir: &Path,
    test_name: &str,
    update_mode: bool,
) -> GoldenResult<Vec<GoldenCase>> {
    if patterns.is_empty() {
        return Err(GoldenError::NoMatch {
            patterns: Vec::new(),
            dir: base_dir.to_path_buf(),
        });
    }

    let paths = expand(patterns, base_dir, update_mode)?;
    let relative: Vec<PathBuf> = paths
        .iter()
        .map(|path| path.strip_prefix(base_dir).unwrap_or(path).to_path_buf())
        .collect();
    let ids = case_ids(test_name, &relative);

    Ok(ids
        .into_iter()
        .zip(paths)
        .map(|(id, path)| GoldenCase { id, path })
        .collect())
}

/// Case names for `relative` paths.
///
/// When every path sits under a directory named after the test (with any
/// `test_` prefix ignored on both sides), that directory is left out:
/// `test_find_words` + `find_words/basic.yml` is named `basic.yml`.
pub fn case_ids(test_name: &str, relative: &[PathBuf]) -> Vec<String> {
    let components: Vec<Vec<String>> = relative
        .iter()
        .map(|path| {
            path.components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .collect();

    let stem = strip_test_prefix(test_name);
    let skip = !components.is_empty()
        && components
            .iter()
            .all(|parts| parts.len() > 1 && strip_test_prefix(&parts[0]) == stem);
    let skip = usize::from(skip);

    components
        .into_iter()
        .map(|parts| parts[skip..].join("/"))
        .collect()
}

fn strip_test_prefix(name: &str) -> &str {
    name.strip_prefix("test_").unwrap_or(name)
}

/// Directory of the calling test file.
///
/// `file!()` is relative to the package root for a standalone package and
/// to the workspace root for a workspace member, so the manifest directory
/// and its ancestors are tried in turn.
pub fn caller_dir(manifest_dir: &Path, source_file: &Path) -> PathBuf {
    if source_file.is_absolute() {
        return source_file.parent().map(Path::to_path_buf).unwrap_or_default();
    }
    for root in manifest_dir.ancestors() {
        let candidate = root.join(source_file);
        if candidate.is_file() {
            return candidate
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
        }
    }
    manifest_dir
        .join(source_file)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
}
