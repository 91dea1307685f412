//! The `prism extract` command.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use prism_core::{CancelFlag, Config, FeaturePipeline, PipelineEvent, RunSummary};

/// Index file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndexFormatArg {
    /// Comma-separated values
    Csv,
    /// Single JSON array
    Json,
    /// JSON Lines (one record per line)
    Jsonl,
}

impl IndexFormatArg {
    fn as_config_value(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Jsonl => "jsonl",
        }
    }
}

/// Arguments for the `extract` command.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Directory of images to process (not descended into)
    #[arg(required = true)]
    pub source: PathBuf,

    /// Directory for the per-image feature containers
    #[arg(long)]
    pub feature_dir: Option<PathBuf>,

    /// Metadata index file
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Metadata index format
    #[arg(short, long, value_enum)]
    pub format: Option<IndexFormatArg>,

    /// Number of images processed concurrently
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Deflate datasets inside the containers
    #[arg(long)]
    pub compress: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl ExtractArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.feature_dir {
            config.storage.feature_dir = dir.clone();
        }
        if let Some(index) = &self.index {
            config.storage.index_path = index.clone();
        }
        if let Some(format) = self.format {
            config.storage.index_format = format.as_config_value().to_string();
        }
        if let Some(parallel) = self.parallel {
            config.processing.parallel_workers = parallel;
        }
        if self.compress {
            config.storage.compress = true;
        }
    }
}

/// Execute the extract command.
pub async fn execute(args: ExtractArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let pipeline = FeaturePipeline::new(&config)?;
    tracing::info!(
        "Extracting {:?} into {:?} (index: {:?})",
        args.source,
        pipeline.store().dir(),
        pipeline.index_path()
    );

    let cancel = CancelFlag::new();
    let signal_flag = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling after in-flight datasets...");
            signal_flag.cancel();
        }
    });

    let progress = if args.no_progress {
        ProgressBar::hidden()
    } else {
        create_progress_bar()
    };
    let bar = progress.clone();

    let result = pipeline
        .run_with_progress(&args.source, &cancel, move |event| match event {
            PipelineEvent::Loaded { images } => {
                bar.set_length(images as u64);
                bar.set_message("extracting");
            }
            PipelineEvent::DatasetWritten { .. } => {}
            PipelineEvent::ImageCompleted { id } => {
                bar.inc(1);
                bar.set_message(id.to_string());
            }
            PipelineEvent::IndexWritten { .. } => bar.set_message("index written"),
        })
        .await;
    ctrl_c.abort();

    match result {
        Ok(summary) => {
            progress.finish_and_clear();
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            progress.abandon();
            Err(anyhow::Error::new(e).context("Feature extraction failed; no index was written"))
        }
    }
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("loading...");
    pb
}

/// Print a formatted summary after a successful run.
fn print_summary(summary: &RunSummary) {
    let elapsed = summary.elapsed_ms as f64 / 1000.0;
    let rate = if elapsed > 0.0 {
        summary.images as f64 / elapsed
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Images:       {:>8}", summary.images);
    eprintln!("    Datasets:     {:>8}", summary.datasets_written);
    eprintln!("    Duration:     {:>7.1}s", elapsed);
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ------------------------------------");
    eprintln!("    Features:     {}", summary.feature_dir.display());
    eprintln!("    Index:        {}", summary.index_path.display());
    eprintln!("  ====================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ExtractArgs {
        ExtractArgs {
            source: PathBuf::from("images"),
            feature_dir: None,
            index: None,
            format: None,
            parallel: None,
            compress: false,
            no_progress: true,
        }
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = Config::default();
        args().apply(&mut config);
        assert_eq!(config.storage.index_format, "csv");
        assert!(!config.storage.compress);
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = Config::default();
        let args = ExtractArgs {
            feature_dir: Some(PathBuf::from("out/features")),
            index: Some(PathBuf::from("out/index.json")),
            format: Some(IndexFormatArg::Json),
            parallel: Some(2),
            compress: true,
            ..args()
        };
        args.apply(&mut config);
        assert_eq!(config.storage.feature_dir, PathBuf::from("out/features"));
        assert_eq!(config.storage.index_path, PathBuf::from("out/index.json"));
        assert_eq!(config.storage.index_format, "json");
        assert_eq!(config.processing.parallel_workers, 2);
        assert!(config.storage.compress);
    }

    #[tokio::test]
    async fn test_execute_fails_without_index_on_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("images");
        std::fs::create_dir(&source).unwrap();
        std::fs::write(source.join("not-an-image.png"), b"oops").unwrap();

        let args = ExtractArgs {
            source,
            feature_dir: Some(dir.path().join("features")),
            index: Some(dir.path().join("index.csv")),
            ..args()
        };
        let err = execute(args, Config::default()).await.unwrap_err();
        assert!(err.to_string().contains("no index was written"));
        assert!(!dir.path().join("index.csv").exists());
    }
}
