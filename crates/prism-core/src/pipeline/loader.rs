//! Decoding source images into RGB buffers and their index records.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{GenericImageView, ImageFormat, ImageReader};
use tokio::task::{JoinError, JoinSet};

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{ImageId, ImageRecord, Orientation, RawImage};

use super::discovery::{DiscoveredFile, FileDiscovery};
use super::validate::Validator;

/// One decoded image and the record describing it.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub record: ImageRecord,
    pub pixels: RawImage,
}

impl LoadedImage {
    pub fn id(&self) -> &ImageId {
        &self.record.identifier
    }
}

/// Discovers, validates and decodes the images of a source directory.
pub struct ImageLoader {
    discovery: FileDiscovery,
    validator: Arc<Validator>,
    parallel_workers: usize,
}

impl ImageLoader {
    pub fn new(config: &Config) -> Self {
        Self {
            discovery: FileDiscovery::new(config.processing.clone()),
            validator: Arc::new(Validator::new(config.limits.clone())),
            parallel_workers: config.processing.parallel_workers.max(1),
        }
    }

    /// Supported files in `dir`, each paired with its identifier.
    ///
    /// Fails on the first identifier claimed by two files.
    pub fn plan(&self, dir: &Path) -> PipelineResult<Vec<(ImageId, PathBuf)>> {
        let files = self.discovery.discover(dir)?;
        let bytes: u64 = files.iter().map(|f| f.size).sum();
        tracing::debug!(files = files.len(), bytes, "Planned source images");
        assign_identifiers(&files)
    }

    /// Decode every image in `dir` with at most `parallel_workers` blocking
    /// decodes in flight. The first failure stops loading. Images are
    /// returned sorted by identifier.
    pub async fn load_all(&self, dir: &Path) -> PipelineResult<Vec<LoadedImage>> {
        let planned = self.plan(dir)?;
        tracing::info!("Loading {} images from {:?}", planned.len(), dir);

        let validator = self.validator.clone();
        load_planned(planned, self.parallel_workers, move |id, path| {
            load_file(&validator, id, path)
        })
        .await
    }
}

async fn load_planned<F>(
    planned: Vec<(ImageId, PathBuf)>,
    workers: usize,
    decode: F,
) -> PipelineResult<Vec<LoadedImage>>
where
    F: Fn(ImageId, &Path) -> PipelineResult<LoadedImage> + Clone + Send + 'static,
{
    let total = planned.len();
    let mut tasks = JoinSet::new();
    let mut images = Vec::with_capacity(total);

    for (id, path) in planned {
        // A finished slot is joined before the next decode starts, so a
        // failure stops loading without touching the remaining files.
        while tasks.len() >= workers {
            match tasks.join_next().await {
                Some(joined) => images.push(joined_image(joined, total)?),
                None => break,
            }
        }
        let decode = decode.clone();
        tasks.spawn_blocking(move || decode(id, &path));
    }

    while let Some(joined) = tasks.join_next().await {
        images.push(joined_image(joined, total)?);
    }

    images.sort_by(|a, b| a.id().cmp(b.id()));
    Ok(images)
}

fn joined_image(
    joined: Result<PipelineResult<LoadedImage>, JoinError>,
    total: usize,
) -> PipelineResult<LoadedImage> {
    let loaded = joined.map_err(|e| PipelineError::Worker(format!("Loader task failed: {e}")))?;
    if let Err(e) = &loaded {
        tracing::warn!("Loading stopped ({total} images planned): {e}");
    }
    loaded
}

fn assign_identifiers(files: &[DiscoveredFile]) -> PipelineResult<Vec<(ImageId, PathBuf)>> {
    let mut seen: HashMap<ImageId, &Path> = HashMap::with_capacity(files.len());
    let mut planned = Vec::with_capacity(files.len());

    for file in files {
        let id = ImageId::from_path(&file.path).ok_or_else(|| PipelineError::Decode {
            path: file.path.clone(),
            message: "File name has no usable stem".to_string(),
        })?;
        if let Some(first) = seen.insert(id.clone(), file.path.as_path()) {
            return Err(PipelineError::DuplicateIdentifier {
                id,
                first: first.to_path_buf(),
                second: file.path.clone(),
            });
        }
        planned.push((id, file.path.clone()));
    }
    Ok(planned)
}

/// Validate, decode and convert one file to RGB8.
fn load_file(validator: &Validator, id: ImageId, path: &Path) -> PipelineResult<LoadedImage> {
    let start = std::time::Instant::now();
    validator.validate(path)?;

    let decode_error = |message: String| PipelineError::Decode {
        path: path.to_path_buf(),
        message,
    };

    let bytes = std::fs::read(path).map_err(|e| decode_error(format!("Cannot read file: {e}")))?;
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| decode_error(format!("Cannot detect image format: {e}")))?;
    if reader.format().is_none() {
        let format = ImageFormat::from_path(path)
            .map_err(|e| decode_error(format!("Unsupported format: {e}")))?;
        reader.set_format(format);
    }
    let decoded = reader.decode().map_err(|e| decode_error(e.to_string()))?;

    let (width, height) = decoded.dimensions();
    validator.check_dimensions(path, width, height)?;

    // Alpha and palette information is dropped: buffers are always RGB.
    let pixels = RawImage::from_rgb(decoded.to_rgb8());
    let record = ImageRecord {
        identifier: id,
        relative_path: path.to_path_buf(),
        height: pixels.height(),
        width: pixels.width(),
        channel_count: pixels.channels(),
        orientation: Orientation::from_dimensions(pixels.height(), pixels.width()),
        feature_store_path: None,
    };

    tracing::debug!(
        "Loaded {} ({}x{}) in {:?}",
        record.identifier,
        record.width,
        record.height,
        start.elapsed()
    );
    Ok(LoadedImage { record, pixels })
}
