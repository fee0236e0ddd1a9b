//! Catalog fetch — the loader's I/O half.
//!
//! The source is either an http(s):// URL or a local file path, mirroring
//! how the config treats them interchangeably. Parsing is delegated to
//! `shelf_core::loader`; this module only moves bytes.

use tracing::info;

use shelf_core::catalog::TrackRecord;
use shelf_core::config::CatalogConfig;
use shelf_core::loader::{parse_catalog, LoaderError};

pub async fn fetch_catalog(config: CatalogConfig) -> Result<Vec<TrackRecord>, LoaderError> {
    let body = read_source(&config.source).await?;
    let records = parse_catalog(config.format, &body, &config.default_category)?;
    info!("loaded {} tracks from {}", records.len(), config.source);
    Ok(records)
}

async fn read_source(source: &str) -> Result<String, LoaderError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let response = reqwest::get(source)
            .await
            .map_err(|e| LoaderError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| LoaderError::Fetch(e.to_string()))?;
        response
            .text()
            .await
            .map_err(|e| LoaderError::Fetch(e.to_string()))
    } else {
        tokio::fs::read_to_string(source)
            .await
            .map_err(|e| LoaderError::Fetch(format!("{}: {}", source, e)))
    }
}
