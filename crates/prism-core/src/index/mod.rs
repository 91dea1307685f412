//! Metadata index: one row per image, written once at the end of a run.
//!
//! Records come from the loader without a container path. [`IndexBuilder`]
//! holds them while extraction runs; [`IndexBuilder::finalize`] checks that
//! every container is complete and fills in `feature_store_path`, and
//! [`MetadataIndex::write`] persists the result atomically.

mod writer;

pub use writer::{read_rows, IndexFormat, IndexWriter};

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{PipelineError, PipelineResult};
use crate::store::FeatureStore;
use crate::types::ImageRecord;

/// Collects image records until every bundle has been written.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    records: Vec<ImageRecord>,
}

impl IndexBuilder {
    pub fn new(records: Vec<ImageRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Assign each record its container path.
    ///
    /// Fails with `IncompleteBundle` for the first record whose container is
    /// missing any dataset.
    pub fn finalize(self, store: &FeatureStore) -> PipelineResult<MetadataIndex> {
        let mut records = self.records;
        for record in &mut records {
            let missing = store.missing(&record.identifier)?;
            if !missing.is_empty() {
                return Err(PipelineError::IncompleteBundle {
                    id: record.identifier.clone(),
                    missing: missing.iter().map(|d| d.key().to_string()).collect(),
                });
            }
            record.feature_store_path = Some(store.container_path(&record.identifier));
        }
        Ok(MetadataIndex { records })
    }
}

/// Finalized index with every `feature_store_path` set.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataIndex {
    records: Vec<ImageRecord>,
}

impl MetadataIndex {
    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write to `path` through a temporary file and rename, so the index is
    /// either absent or complete.
    pub fn write(&self, path: &Path, format: IndexFormat) -> PipelineResult<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| PipelineError::storage(parent, e))?;

        let temp = NamedTempFile::new_in(parent).map_err(|e| PipelineError::storage(parent, e))?;
        let mut writer = IndexWriter::new(BufWriter::new(temp), format);
        writer
            .write_all(&self.records)
            .map_err(|e| PipelineError::storage(path, e))?;
        writer.flush().map_err(|e| PipelineError::storage(path, e))?;
        let rows = writer.rows_written();

        let temp = writer
            .into_inner()
            .into_inner()
            .map_err(|e| PipelineError::storage(path, e.error()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| PipelineError::storage(path, e))?;
        temp.persist(path)
            .map_err(|e| PipelineError::storage(path, e.error))?;

        tracing::info!(path = %path.display(), rows, "Wrote metadata index");
        Ok(())
    }

    /// Read an index written by [`MetadataIndex::write`].
    pub fn read(path: &Path, format: IndexFormat) -> PipelineResult<Self> {
        let file = File::open(path).map_err(|e| PipelineError::storage(path, e))?;
        let records = read_rows(BufReader::new(file), format)
            .map_err(|e| PipelineError::storage(path, e))?;
        Ok(Self { records })
    }

    /// Remove an index left by a previous run. Absent files are not an error.
    pub fn remove_stale(path: &Path) -> PipelineResult<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed stale index");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PipelineError::storage(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Dataset, FeatureData, ImageId, Orientation};
    use ndarray::Array2;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn record(id: &str, height: usize, width: usize) -> ImageRecord {
        ImageRecord {
            identifier: ImageId::new(id),
            relative_path: PathBuf::from(format!("images/{id}.png")),
            height,
            width,
            channel_count: 3,
            orientation: Orientation::from_dimensions(height, width),
            feature_store_path: None,
        }
    }

    fn fill(store: &FeatureStore, id: &str, datasets: &[Dataset]) {
        let data = FeatureData::U8x2(Array2::zeros((1, 1)));
        for &dataset in datasets {
            store.upsert(&ImageId::new(id), dataset, &data).unwrap();
        }
    }

    #[test]
    fn test_finalize_assigns_container_paths() {
        let dir = tempdir().unwrap();
        let store = FeatureStore::new(dir.path(), false);
        fill(&store, "a", &Dataset::ALL);
        fill(&store, "b", &Dataset::ALL);

        let index = IndexBuilder::new(vec![record("a", 2, 2), record("b", 4, 2)])
            .finalize(&store)
            .unwrap();
        assert_eq!(index.len(), 2);
        for row in index.records() {
            assert_eq!(
                row.feature_store_path.as_deref(),
                Some(store.container_path(&row.identifier).as_path())
            );
        }
    }

    #[test]
    fn test_finalize_rejects_incomplete_bundle() {
        let dir = tempdir().unwrap();
        let store = FeatureStore::new(dir.path(), false);
        fill(&store, "a", &Dataset::ALL[..4]);

        let err = IndexBuilder::new(vec![record("a", 2, 2)])
            .finalize(&store)
            .unwrap_err();
        match err {
            PipelineError::IncompleteBundle { id, missing } => {
                assert_eq!(id.as_str(), "a");
                assert_eq!(missing, vec!["EntropyMap", "KeypointOverlay"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_csv_columns_and_round_trip() {
        let dir = tempdir().unwrap();
        let store = FeatureStore::new(dir.path().join("features"), false);
        store.ensure_dir().unwrap();
        fill(&store, "a", &Dataset::ALL);

        let index = IndexBuilder::new(vec![record("a", 3, 2)])
            .finalize(&store)
            .unwrap();
        let path = dir.path().join("out").join("dataframe.csv");
        index.write(&path, IndexFormat::Csv).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "identifier,relative_path,height,width,channel_count,orientation,feature_store_path"
        );
        assert!(text.lines().nth(1).unwrap().contains(",3,2,3,portrait,"));
        assert_eq!(MetadataIndex::read(&path, IndexFormat::Csv).unwrap(), index);
    }

    #[test]
    fn test_remove_stale_ignores_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dataframe.csv");
        MetadataIndex::remove_stale(&path).unwrap();
        fs::write(&path, "old").unwrap();
        MetadataIndex::remove_stale(&path).unwrap();
        assert!(!path.exists());
    }
}
