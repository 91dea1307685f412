//! Per-image feature containers.
//!
//! Each image owns one NPZ container, `<feature_dir>/<identifier>.npz`: a zip
//! archive with one `<Dataset>.npy` entry per dataset, readable with
//! `numpy.load`. Writes go through a temporary file in the same directory and
//! an atomic rename, so readers see either the previous container or the new
//! one, never a partial entry.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use ndarray::{Array, Dimension, Ix2, Ix3};
use ndarray_npy::{ReadNpyExt, ReadableElement};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{Dataset, FeatureData, ImageId};

/// Container file extension.
pub const CONTAINER_EXTENSION: &str = "npz";

fn entry_name(dataset: Dataset) -> String {
    format!("{}.npy", dataset.key())
}

/// Directory of feature containers, one per image.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    dir: PathBuf,
    compress: bool,
}

impl FeatureStore {
    pub fn new(dir: impl Into<PathBuf>, compress: bool) -> Self {
        Self {
            dir: dir.into(),
            compress,
        }
    }

    /// Store rooted at the directory of an existing container, plus the
    /// identifier the container belongs to.
    pub fn for_container(path: &Path) -> PipelineResult<(Self, ImageId)> {
        let id = ImageId::from_path(path)
            .ok_or_else(|| PipelineError::storage(path, "not a container file name"))?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok((Self::new(dir, false), id))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn container_path(&self, id: &ImageId) -> PathBuf {
        self.dir.join(format!("{}.{CONTAINER_EXTENSION}", id.as_str()))
    }

    /// Create the store directory if absent.
    pub fn ensure_dir(&self) -> PipelineResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| PipelineError::storage(&self.dir, e))
    }

    fn entry_options(&self) -> SimpleFileOptions {
        let method = if self.compress {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        // Fixed timestamp: identical data gives identical bytes.
        SimpleFileOptions::default()
            .compression_method(method)
            .last_modified_time(zip::DateTime::default())
    }

    /// Write one dataset into the image's container, replacing any previous
    /// entry under the same key and keeping every other entry untouched.
    pub fn upsert(
        &self,
        id: &ImageId,
        dataset: Dataset,
        data: &FeatureData,
    ) -> PipelineResult<()> {
        let path = self.container_path(id);
        let name = entry_name(dataset);

        let temp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| PipelineError::storage(&self.dir, e))?;
        let mut writer = ZipWriter::new(temp);

        if path.exists() {
            let mut archive = self.open_path(&path)?;
            for i in 0..archive.len() {
                let entry = archive
                    .by_index_raw(i)
                    .map_err(|e| PipelineError::storage(&path, e))?;
                if entry.name() == name {
                    continue;
                }
                writer
                    .raw_copy_file(entry)
                    .map_err(|e| PipelineError::storage(&path, e))?;
            }
        }

        writer
            .start_file(name, self.entry_options())
            .map_err(|e| PipelineError::storage(&path, e))?;
        data.write_npy(&mut writer)
            .map_err(|e| PipelineError::storage(&path, e))?;
        let temp = writer
            .finish()
            .map_err(|e| PipelineError::storage(&path, e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| PipelineError::storage(&path, e))?;
        temp.persist(&path)
            .map_err(|e| PipelineError::storage(&path, e.error))?;

        tracing::trace!(id = %id, dataset = %dataset, "Stored dataset");
        Ok(())
    }

    fn open_path(&self, path: &Path) -> PipelineResult<ZipArchive<File>> {
        let file = File::open(path).map_err(|e| PipelineError::storage(path, e))?;
        ZipArchive::new(file).map_err(|e| PipelineError::storage(path, e))
    }

    fn open(&self, id: &ImageId) -> PipelineResult<ZipArchive<File>> {
        self.open_path(&self.container_path(id))
    }

    /// Dataset keys present in the container, in storage order.
    pub fn dataset_names(&self, id: &ImageId) -> PipelineResult<Vec<String>> {
        let archive = self.open(id)?;
        Ok(archive
            .file_names()
            .map(|name| name.strip_suffix(".npy").unwrap_or(name).to_string())
            .collect())
    }

    /// Serialized `.npy` bytes of one dataset.
    pub fn read_raw(&self, id: &ImageId, dataset: Dataset) -> PipelineResult<Vec<u8>> {
        let path = self.container_path(id);
        let mut archive = self.open_path(&path)?;
        let mut entry = archive
            .by_name(&entry_name(dataset))
            .map_err(|e| PipelineError::storage(&path, e))?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| PipelineError::storage(&path, e))?;
        Ok(bytes)
    }

    /// Decode one dataset into an array of the caller's element type and
    /// dimensionality.
    pub fn read<A, D>(&self, id: &ImageId, dataset: Dataset) -> PipelineResult<Array<A, D>>
    where
        A: ReadableElement,
        D: Dimension,
    {
        let path = self.container_path(id);
        let mut archive = self.open_path(&path)?;
        let entry = archive
            .by_name(&entry_name(dataset))
            .map_err(|e| PipelineError::storage(&path, e))?;
        Array::<A, D>::read_npy(entry).map_err(|e| PipelineError::storage(&path, e))
    }

    /// Decode one dataset with the element type it is written with.
    pub fn load(&self, id: &ImageId, dataset: Dataset) -> PipelineResult<FeatureData> {
        Ok(match dataset {
            Dataset::Image | Dataset::KeypointOverlay => {
                FeatureData::U8x3(self.read::<u8, Ix3>(id, dataset)?)
            }
            Dataset::ColorSpace | Dataset::EdgeMap => {
                FeatureData::U8x2(self.read::<u8, Ix2>(id, dataset)?)
            }
            Dataset::ColorHistogram => FeatureData::U64x2(self.read::<u64, Ix2>(id, dataset)?),
            Dataset::EntropyMap => FeatureData::F64x2(self.read::<f64, Ix2>(id, dataset)?),
        })
    }

    /// Datasets a complete bundle needs that the container lacks.
    ///
    /// A missing container lacks all of them.
    pub fn missing(&self, id: &ImageId) -> PipelineResult<Vec<Dataset>> {
        if !self.container_path(id).exists() {
            return Ok(Dataset::ALL.to_vec());
        }
        let present = self.dataset_names(id)?;
        Ok(Dataset::ALL
            .into_iter()
            .filter(|d| !present.iter().any(|name| name == d.key()))
            .collect())
    }

    pub fn is_complete(&self, id: &ImageId) -> PipelineResult<bool> {
        Ok(self.missing(id)?.is_empty())
    }

    /// Remove the image's container. Absent containers are not an error.
    pub fn discard(&self, id: &ImageId) -> PipelineResult<()> {
        let path = self.container_path(id);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(id = %id, "Discarded container");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PipelineError::storage(&path, e)),
        }
    }
}
