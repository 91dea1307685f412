//! Pipeline orchestration: load, extract, store, index.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error::{ConfigError, PipelineError, PipelineResult};
use crate::features::ExtractorSet;
use crate::index::{IndexBuilder, IndexFormat, MetadataIndex};
use crate::store::FeatureStore;
use crate::types::{Dataset, FeatureData, ImageId, RunSummary};

use super::loader::{ImageLoader, LoadedImage};

/// Shared cancellation signal, checked between datasets.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress notifications delivered while a run is in flight.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Every source image decoded
    Loaded { images: usize },
    /// One dataset persisted for one image
    DatasetWritten { id: ImageId, dataset: Dataset },
    /// Every dataset of one image persisted
    ImageCompleted { id: ImageId },
    /// Index written; the run succeeded
    IndexWritten { path: PathBuf, rows: usize },
}

/// Runs every extractor over every image of a source directory and writes
/// the feature containers and the metadata index.
pub struct FeaturePipeline {
    loader: ImageLoader,
    extractors: Arc<ExtractorSet>,
    store: FeatureStore,
    index_path: PathBuf,
    index_format: IndexFormat,
    parallel_workers: usize,
}

impl FeaturePipeline {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let index_format = IndexFormat::parse(&config.storage.index_format).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "Unknown index format '{}'",
                config.storage.index_format
            ))
        })?;

        Ok(Self {
            loader: ImageLoader::new(config),
            extractors: Arc::new(ExtractorSet::new(&config.extraction)),
            store: FeatureStore::new(config.feature_dir(), config.storage.compress),
            index_path: config.index_path(),
            index_format,
            parallel_workers: config.processing.parallel_workers.max(1),
        })
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn index_format(&self) -> IndexFormat {
        self.index_format
    }

    /// Process `source` without progress reporting or external cancellation.
    pub async fn run(&self, source: &Path) -> PipelineResult<RunSummary> {
        self.run_with_progress(source, &CancelFlag::new(), |_| {})
            .await
    }

    /// Process `source`, reporting progress through `on_event`.
    ///
    /// The index is written only when every image produced a complete
    /// bundle. The first failure cancels the remaining work and is returned.
    pub async fn run_with_progress<F>(
        &self,
        source: &Path,
        cancel: &CancelFlag,
        on_event: F,
    ) -> PipelineResult<RunSummary>
    where
        F: Fn(PipelineEvent) + Send + Sync + 'static,
    {
        let start = Instant::now();
        let on_event = Arc::new(on_event);

        self.store.ensure_dir()?;
        MetadataIndex::remove_stale(&self.index_path)?;

        let images = self.loader.load_all(source).await?;
        self.extract_and_index(images, cancel, on_event, start).await
    }

    /// Everything after loading: one unit per image, then the index.
    async fn extract_and_index<F>(
        &self,
        images: Vec<LoadedImage>,
        cancel: &CancelFlag,
        on_event: Arc<F>,
        start: Instant,
    ) -> PipelineResult<RunSummary>
    where
        F: Fn(PipelineEvent) + Send + Sync + 'static,
    {
        on_event(PipelineEvent::Loaded {
            images: images.len(),
        });
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let builder = IndexBuilder::new(images.iter().map(|i| i.record.clone()).collect());
        tracing::info!(
            "Extracting {} datasets for {} images ({} workers)",
            Dataset::ALL.len(),
            images.len(),
            self.parallel_workers
        );

        let semaphore = Arc::new(Semaphore::new(self.parallel_workers));
        let mut handles = Vec::with_capacity(images.len());

        for image in images {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::Worker(e.to_string()))?;
            if cancel.is_cancelled() {
                break;
            }

            let store = self.store.clone();
            let extractors = self.extractors.clone();
            let cancel = cancel.clone();
            let on_event = on_event.clone();

            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let result = process_image(&store, &extractors, &image, &cancel, &*on_event);
                if result.is_err() {
                    // Stop the other units; this one never leaves a partial bundle.
                    cancel.cancel();
                    if let Err(e) = store.discard(image.id()) {
                        tracing::warn!("Could not discard container for {}: {e}", image.id());
                    }
                }
                result
            }));
        }

        // Wait for every unit so no write outlives the run.
        let mut first_error: Option<PipelineError> = None;
        let mut datasets_written = 0;
        for handle in handles {
            let outcome = handle
                .await
                .map_err(|e| PipelineError::Worker(format!("Extraction task failed: {e}")))
                .and_then(|result| result);
            match outcome {
                Ok(written) => datasets_written += written,
                Err(e) => {
                    cancel.cancel();
                    // A real failure outranks the cancellations it triggered.
                    let replace = match &first_error {
                        None => true,
                        Some(PipelineError::Cancelled) => !matches!(e, PipelineError::Cancelled),
                        Some(_) => false,
                    };
                    if replace {
                        first_error = Some(e);
                    }
                }
            }
        }
        if let Some(e) = first_error {
            tracing::error!("Run failed: {e}");
            return Err(e);
        }
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let images = builder.len();
        let index = builder.finalize(&self.store)?;
        index.write(&self.index_path, self.index_format)?;
        on_event(PipelineEvent::IndexWritten {
            path: self.index_path.clone(),
            rows: index.len(),
        });

        Ok(RunSummary {
            images,
            datasets_written,
            feature_dir: self.store.dir().to_path_buf(),
            index_path: self.index_path.clone(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Write the raw image and every extracted dataset for one image.
///
/// Returns the number of datasets written.
fn process_image(
    store: &FeatureStore,
    extractors: &ExtractorSet,
    image: &LoadedImage,
    cancel: &CancelFlag,
    on_event: &(dyn Fn(PipelineEvent) + Send + Sync),
) -> PipelineResult<usize> {
    let id = image.id();
    let start = Instant::now();
    let mut written = 0;

    let mut write = |dataset: Dataset, data: FeatureData| -> PipelineResult<()> {
        store.upsert(id, dataset, &data)?;
        written += 1;
        on_event(PipelineEvent::DatasetWritten {
            id: id.clone(),
            dataset,
        });
        Ok(())
    };

    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    write(Dataset::Image, FeatureData::U8x3(image.pixels.pixels().clone()))?;

    for extractor in extractors.iter() {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let dataset = extractor.dataset();
        let data = extractor
            .extract(&image.pixels)
            .map_err(|source| PipelineError::Extraction {
                id: id.clone(),
                dataset,
                source,
            })?;
        tracing::trace!("{id}: {dataset} {:?} {}", data.shape(), data.dtype());
        write(dataset, data)?;
    }

    tracing::debug!("Completed {id} in {:?}", start.elapsed());
    on_event(PipelineEvent::ImageCompleted { id: id.clone() });
    Ok(written)
}
