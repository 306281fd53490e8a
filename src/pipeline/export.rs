// src/pipeline/export.rs

use std::path::Path;

use crate::error::Result;
use crate::storage::PostStore;
use crate::utils::fs::save_json;

/// Write every stored record as pretty JSON, to `output` or stdout.
pub async fn run_export(store: &dyn PostStore, output: Option<&Path>) -> Result<usize> {
    let records = store.list_all();
    let enriched = records.iter().filter(|r| r.is_enriched()).count();

    match output {
        Some(path) => {
            save_json(path, &records).await?;
            log::info!(
                "Exported {} record(s), {} enriched, to {}",
                records.len(),
                enriched,
                path.display()
            );
        }
        None => println!("{}", serde_json::to_string_pretty(&records)?),
    }

    Ok(records.len())
}
