//! Parallel file analysis using Rayon

use rayon::prelude::*;
use std::path::Path;

use crate::config::RefactorConfig;
use crate::parser::ParseError;
use crate::report::FileReport;

/// Analyze multiple files in parallel; results keep the input order.
pub fn analyze_files_parallel<P: AsRef<Path> + Sync>(
    files: &[P],
    config: &RefactorConfig,
    concurrency: Option<usize>,
) -> Vec<Result<FileReport, ParseError>> {
    if let Some(num_threads) = concurrency {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // already initialized
    }

    files
        .par_iter()
        .map(|path| crate::analyze_file(path.as_ref(), config))
        .collect()
}

/// Expand glob patterns to file paths
pub fn expand_globs(patterns: &[String]) -> Vec<String> {
    let mut files = Vec::new();

    for pattern in patterns {
        if pattern.contains('*') || pattern.contains('?') {
            match glob::glob(pattern) {
                Ok(paths) => {
                    for entry in paths.flatten() {
                        if entry.is_file() {
                            if let Some(path) = entry.to_str() {
                                files.push(path.to_string());
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "invalid glob pattern");
                }
            }
        } else {
            files.push(pattern.clone());
        }
    }

    files
}

/// Keep only files with a supported extension
pub fn filter_supported_files(files: Vec<String>) -> Vec<String> {
    use crate::parser::detect_language;

    files
        .into_iter()
        .filter(|f| detect_language(f) != "unknown")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_expand_globs_non_glob() {
        let patterns = vec!["Test.java".to_string()];
        let files = expand_globs(&patterns);
        assert_eq!(files, vec!["Test.java"]);
    }

    #[test]
    fn test_expand_globs_pattern() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        fs::write(dir.path().join("A.java"), "class A {}").expect("Should write file");
        fs::write(dir.path().join("B.txt"), "").expect("Should write file");
        let pattern = format!("{}/*.java", dir.path().display());
        let files = expand_globs(&[pattern]);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("A.java"));
    }

    #[test]
    fn test_filter_supported_files() {
        let files = vec![
            "Test.java".to_string(),
            "test.rs".to_string(),
            "Upper.JAVA".to_string(),
            "readme.md".to_string(),
        ];
        let filtered = filter_supported_files(files);
        assert_eq!(filtered, vec!["Test.java", "Upper.JAVA"]);
    }

    #[test]
    fn test_analyze_files_keeps_order() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let a = dir.path().join("A.java");
        let b = dir.path().join("B.java");
        fs::write(&a, "class A {}").expect("Should write file");
        fs::write(&b, "class B {}").expect("Should write file");
        let missing = dir.path().join("Missing.java");

        let results = analyze_files_parallel(&[&a, &missing, &b], &RefactorConfig::all_enabled(), None);
        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().expect("Should analyze A").file.ends_with("A.java"));
        assert!(results[1].is_err());
        assert!(results[2].as_ref().expect("Should analyze B").file.ends_with("B.java"));
    }
}
