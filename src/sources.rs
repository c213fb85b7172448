//! Status listing for the `sources` command.

use anyhow::Result;

use crate::config::Config;
use crate::index::VectorIndex;

/// Print the state of the persisted artifacts and the configured
/// ingestion sources.
pub fn list_sources(config: &Config) -> Result<()> {
    let index_path = &config.storage.index_path;
    let meta_path = &config.storage.meta_path;

    match (index_path.exists(), meta_path.exists()) {
        (true, true) => {
            let (dim, rows) = VectorIndex::read_header(index_path)?;
            println!(
                "index: OK ({} rows, dim {}) at {}",
                rows,
                dim,
                index_path.display()
            );
            println!("metadata: OK at {}", meta_path.display());
        }
        (exists_index, exists_meta) => {
            if !exists_index {
                println!("index: MISSING at {}", index_path.display());
            } else {
                println!("index: OK at {}", index_path.display());
            }
            if !exists_meta {
                println!("metadata: MISSING at {}", meta_path.display());
            } else {
                println!("metadata: OK at {}", meta_path.display());
            }
            println!("run `askdocs ingest` to build the index");
        }
    }

    println!();
    if config.sources.allowed_domains.is_empty() {
        println!("allowed domains: (none — web ingestion disabled)");
    } else {
        println!("allowed domains: {}", config.sources.allowed_domains.join(", "));
    }
    println!(
        "urls file: {} ({})",
        config.sources.urls_file.display(),
        if config.sources.urls_file.exists() {
            "present"
        } else {
            "absent"
        }
    );
    println!(
        "local dir: {} ({})",
        config.sources.local_dir.display(),
        if config.sources.local_dir.is_dir() {
            "present"
        } else {
            "absent"
        }
    );

    Ok(())
}
