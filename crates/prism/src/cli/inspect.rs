//! The `prism inspect` command.

use std::path::PathBuf;

use clap::Args;
use prism_core::{Dataset, FeatureStore};

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Feature container (`<identifier>.npz`)
    #[arg(required = true)]
    pub container: PathBuf,
}

/// One line of the inspect report.
#[derive(Debug, PartialEq)]
struct DatasetLine {
    key: String,
    dtype: &'static str,
    shape: Vec<usize>,
}

/// Execute the inspect command.
pub async fn execute(args: InspectArgs) -> anyhow::Result<()> {
    if !args.container.is_file() {
        anyhow::bail!("Container not found: {}", args.container.display());
    }
    let (store, id) = FeatureStore::for_container(&args.container)?;
    let lines = describe(&store, &id)?;
    let missing = store.missing(&id)?;

    println!("{} ({})", id, args.container.display());
    for line in &lines {
        println!("  {:<16} {:<4} {:?}", line.key, line.dtype, line.shape);
    }
    if missing.is_empty() {
        println!("complete: yes");
    } else {
        let names: Vec<&str> = missing.iter().map(|d| d.key()).collect();
        println!("complete: no (missing {})", names.join(", "));
    }
    Ok(())
}

fn describe(store: &FeatureStore, id: &prism_core::ImageId) -> anyhow::Result<Vec<DatasetLine>> {
    let mut lines = Vec::new();
    for key in store.dataset_names(id)? {
        match Dataset::from_key(&key) {
            Some(dataset) => {
                let data = store.load(id, dataset)?;
                lines.push(DatasetLine {
                    key,
                    dtype: data.dtype(),
                    shape: data.shape().to_vec(),
                });
            }
            None => tracing::warn!("Unknown dataset '{key}' in {id}"),
        }
    }
    Ok(lines)
}
