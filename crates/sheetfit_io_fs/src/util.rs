//! Path helpers for the batch runner.

use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::spec::BatchError;

/// Suffix appended to the input stem for fitted copies.
pub const C_OUTPUT_STEM_SUFFIX: &str = "_beautifuler";
/// Extension of fitted copies.
pub const C_OUTPUT_EXTENSION: &str = "xlsx";

/// `<dir>/<stem>_beautifuler.xlsx` next to the input file.
pub fn derive_output_path(path_file_in: &Path) -> PathBuf {
    let mut name_out: OsString = path_file_in
        .file_stem()
        .map(OsString::from)
        .unwrap_or_default();
    name_out.push(C_OUTPUT_STEM_SUFFIX);
    name_out.push(".");
    name_out.push(C_OUTPUT_EXTENSION);
    path_file_in.with_file_name(name_out)
}

/// Whether `path` looks like a fitted copy (`<stem>_beautifuler.*`).
pub fn is_fitted_output(path: &Path) -> bool {
    path.file_stem()
        .is_some_and(|stem| stem.to_string_lossy().ends_with(C_OUTPUT_STEM_SUFFIX))
}

fn is_glob_component(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

/// Split a pattern into its literal base directory and whether it has wildcards.
fn split_glob_base(pattern: &str) -> (PathBuf, bool) {
    let mut path_base = PathBuf::new();
    for component in Path::new(pattern).components() {
        if let Component::Normal(part) = component
            && is_glob_component(&part.to_string_lossy())
        {
            return (path_base, true);
        }
        path_base.push(component);
    }
    (path_base, false)
}

fn collect_files_recursive(path_dir: &Path, l_out: &mut Vec<PathBuf>) {
    let Ok(iter_entries) = fs::read_dir(path_dir) else {
        return;
    };
    for entry in iter_entries.flatten() {
        let path_entry = entry.path();
        match entry.file_type() {
            Ok(ft) if ft.is_dir() => collect_files_recursive(&path_entry, l_out),
            Ok(ft) if ft.is_file() => l_out.push(path_entry),
            _ => {}
        }
    }
}

fn compile_matcher(pattern: &str) -> Result<GlobMatcher, BatchError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| BatchError::InvalidPattern(format!("Invalid preset pattern {pattern:?}: {e}")))
}

/// Expand preset entries: literal paths pass through, glob patterns are matched
/// against files under their literal base directory.
///
/// Literal paths are kept even when missing so they surface as per-file errors.
/// Glob matches skip fitted copies from earlier runs. Matches of one pattern
/// are sorted; entry order is otherwise preserved.
pub fn expand_preset_paths(patterns: &[String]) -> Result<Vec<PathBuf>, BatchError> {
    let mut l_paths = Vec::new();

    for pattern in patterns {
        let (path_base, if_glob) = split_glob_base(pattern);
        if !if_glob {
            l_paths.push(PathBuf::from(pattern));
            continue;
        }

        let matcher = compile_matcher(pattern)?;
        let path_dir_walk = if path_base.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            path_base.clone()
        };
        let mut l_candidates = Vec::new();
        collect_files_recursive(&path_dir_walk, &mut l_candidates);

        let mut l_matched: Vec<PathBuf> = l_candidates
            .into_iter()
            .map(|path| match path.strip_prefix(".") {
                Ok(path_rel) if path_base.as_os_str().is_empty() => path_rel.to_path_buf(),
                _ => path,
            })
            .filter(|path| matcher.is_match(path) && !is_fitted_output(path))
            .collect();
        l_matched.sort();
        debug!(pattern = %pattern, n_matched = l_matched.len(), "expanded preset pattern");
        l_paths.extend(l_matched);
    }

    Ok(l_paths)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::test_util::TestDir;

    #[test]
    fn output_path_sits_next_to_input() {
        assert_eq!(
            derive_output_path(Path::new("/data/report.xlsx")),
            PathBuf::from("/data/report_beautifuler.xlsx")
        );
        assert_eq!(
            derive_output_path(Path::new("报表.xlsm")),
            PathBuf::from("报表_beautifuler.xlsx")
        );
    }

    #[test]
    fn split_glob_base_stops_at_first_wildcard() {
        assert_eq!(
            split_glob_base("data/in/*.xlsx"),
            (PathBuf::from("data/in"), true)
        );
        assert_eq!(split_glob_base("a.xlsx"), (PathBuf::from("a.xlsx"), false));
        assert_eq!(split_glob_base("**/*.xlsx"), (PathBuf::new(), true));
    }

    #[test]
    fn expand_preset_paths_keeps_literals_and_matches_globs() {
        let tmp = TestDir::new();
        for name in ["b.xlsx", "a.xlsx", "notes.txt", "sub/c.xlsx"] {
            let path = tmp.path().join(name);
            std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            std::fs::write(path, b"x").expect("write");
        }

        let c_glob = format!("{}/*.xlsx", tmp.path().display());
        let c_missing = tmp.path().join("missing.xlsx").display().to_string();
        let l_paths = expand_preset_paths(&[c_missing.clone(), c_glob]).expect("expand");

        assert_eq!(
            l_paths,
            vec![
                PathBuf::from(c_missing),
                tmp.path().join("a.xlsx"),
                tmp.path().join("b.xlsx"),
            ]
        );
    }

    #[test]
    fn expand_preset_paths_skips_fitted_copies() {
        let tmp = TestDir::new();
        for name in ["a.xlsx", "a_beautifuler.xlsx", "b_beautifuler.xlsx"] {
            std::fs::write(tmp.path().join(name), b"x").expect("write");
        }

        let c_glob = format!("{}/*.xlsx", tmp.path().display());
        let c_literal = tmp.path().join("b_beautifuler.xlsx").display().to_string();
        let l_paths = expand_preset_paths(&[c_glob, c_literal.clone()]).expect("expand");

        assert_eq!(
            l_paths,
            vec![tmp.path().join("a.xlsx"), PathBuf::from(c_literal)]
        );
        assert!(is_fitted_output(Path::new("dir/x_beautifuler.xlsx")));
        assert!(!is_fitted_output(Path::new("dir/x_beautifuler_2.xlsx")));
    }

    #[test]
    fn expand_preset_paths_rejects_bad_pattern() {
        let err = expand_preset_paths(&["data/[.xlsx".to_string()]).expect_err("bad glob");
        assert!(matches!(err, BatchError::InvalidPattern(_)));
    }
}
