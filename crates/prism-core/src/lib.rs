//! Prism Core - image feature-extraction library.
//!
//! Prism turns a directory of images into per-image feature bundles and a
//! tabular metadata index:
//!
//! ```text
//! Directory → Load (RGB) → Extract (color space, histogram, edges,
//!           entropy, keypoints) → NPZ container per image → Index (CSV/JSON)
//! ```
//!
//! Each container `<feature_dir>/<identifier>.npz` holds six `.npy`
//! datasets: `Image`, `ColorSpace`, `ColorHistogram`, `EdgeMap`,
//! `EntropyMap` and `KeypointOverlay`. The index is written once, after
//! every bundle is complete.
//!
//! # Usage
//!
//! ```rust,ignore
//! use prism_core::{Config, FeaturePipeline};
//!
//! #[tokio::main]
//! async fn main() -> prism_core::Result<()> {
//!     let config = Config::load()?;
//!     let pipeline = FeaturePipeline::new(&config)?;
//!
//!     let summary = pipeline.run("./images".as_ref()).await?;
//!     println!("{} images indexed in {:?}", summary.images, summary.index_path);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod features;
pub mod index;
pub mod pipeline;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, ExtractError, PipelineError, PipelineResult, PrismError, Result};
pub use features::{ExtractorSet, FeatureExtractor};
pub use index::{IndexBuilder, IndexFormat, MetadataIndex};
pub use pipeline::{CancelFlag, FeaturePipeline, ImageLoader, LoadedImage, PipelineEvent};
pub use store::FeatureStore;
pub use types::{Dataset, FeatureData, ImageId, ImageRecord, Orientation, RawImage, RunSummary};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
