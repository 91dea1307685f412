//! Finding image files in the source directory.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::PipelineError;

/// Lists the supported image files directly inside a directory.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

/// A candidate image file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileDiscovery {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Supported files directly inside `dir`, sorted by path.
    ///
    /// Subdirectories are not descended into. Fails when `dir` is missing or
    /// is not a directory.
    pub fn discover(&self, dir: &Path) -> Result<Vec<DiscoveredFile>, PipelineError> {
        if !dir.is_dir() {
            return Err(PipelineError::SourceNotFound(dir.to_path_buf()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            // A dangling link or unreadable entry named like an image aborts the run.
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => match e.path() {
                    Some(path) if !self.is_supported(path) => {
                        tracing::debug!(path = %path.display(), "Skipping unreadable entry");
                        continue;
                    }
                    path => {
                        return Err(PipelineError::Unreadable {
                            path: path.unwrap_or(dir).to_path_buf(),
                            message: e.to_string(),
                        })
                    }
                },
            };

            let entry_path = entry.path();
            if entry.file_type().is_file() && self.is_supported(entry_path) {
                let meta = entry.metadata().map_err(|e| PipelineError::Unreadable {
                    path: entry_path.to_path_buf(),
                    message: e.to_string(),
                })?;
                files.push(DiscoveredFile {
                    path: entry_path.to_path_buf(),
                    size: meta.len(),
                });
            }
        }

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!(dir = %dir.display(), count = files.len(), "Discovered images");
        Ok(files)
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_supported() {
        let discovery = FileDiscovery::new(ProcessingConfig::default());

        assert!(discovery.is_supported(Path::new("test.jpg")));
        assert!(discovery.is_supported(Path::new("test.JPG")));
        assert!(discovery.is_supported(Path::new("test.png")));
        assert!(discovery.is_supported(Path::new("test.tiff")));
        assert!(!discovery.is_supported(Path::new("test.txt")));
        assert!(!discovery.is_supported(Path::new("README")));
    }

    #[test]
    fn test_discover_is_sorted_and_not_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.png"), b"x").unwrap();
        fs::write(dir.path().join("a.jpg"), b"xy").unwrap();
        fs::write(dir.path().join("notes.txt"), b"skip").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.png"), b"x").unwrap();

        let files = FileDiscovery::new(ProcessingConfig::default())
            .discover(dir.path())
            .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png"]);
        assert_eq!(files[0].size, 2);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        let err = FileDiscovery::new(ProcessingConfig::default())
            .discover(&missing)
            .unwrap_err();
        assert!(matches!(err, PipelineError::SourceNotFound(p) if p == missing));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_image_link_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.png"), dir.path().join("b.png"))
            .unwrap();

        let err = FileDiscovery::new(ProcessingConfig::default())
            .discover(dir.path())
            .unwrap_err();
        assert!(
            matches!(&err, PipelineError::Unreadable { path, .. } if path.ends_with("b.png")),
            "unexpected error: {err}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_link_to_other_files_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("notes.txt"))
            .unwrap();

        let files = FileDiscovery::new(ProcessingConfig::default())
            .discover(dir.path())
            .unwrap();
        assert_eq!(files.len(), 1);
    }
}
