//! Feature-extraction pipeline stages.
//!
//! - **discovery**: find image files in the source directory
//! - **validate**: size limits and format signatures before decoding
//! - **loader**: decode to RGB buffers and build index records
//! - **processor**: run extractors per image, persist bundles, write the index

pub mod discovery;
pub mod loader;
pub mod processor;
pub mod validate;

pub use discovery::{DiscoveredFile, FileDiscovery};
pub use loader::{ImageLoader, LoadedImage};
pub use processor::{CancelFlag, FeaturePipeline, PipelineEvent};
pub use validate::Validator;
