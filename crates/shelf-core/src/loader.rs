//! Catalog source normalization.
//!
//! Three source shapes feed the same `TrackRecord` list:
//! - `Api`: JSON array of `{id, title, audio_url}` rows from a tracks API.
//!   The row title doubles as the filename; no tags.
//! - `TaggedJson`: JSON array of full records, tags included.
//! - `MappingText`: numbered plain text, `N. <filename>` followed by the
//!   track URL on its own line.
//!
//! Tag assignment is pre-computed metadata supplied by the source; nothing
//! here classifies tracks.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{title_from_filename, TrackRecord};
use crate::config::CatalogFormat;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("catalog fetch failed: {0}")]
    Fetch(String),
    #[error("catalog parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parse a raw source body according to `format`.
pub fn parse_catalog(
    format: CatalogFormat,
    body: &str,
    default_category: &str,
) -> Result<Vec<TrackRecord>, LoaderError> {
    let records = match format {
        CatalogFormat::Api => parse_api_tracks(body, default_category)?,
        CatalogFormat::TaggedJson => parse_tagged_json(body)?,
        CatalogFormat::MappingText => parse_mapping_text(body, default_category),
    };
    debug!("parsed {} tracks ({:?})", records.len(), format);
    Ok(records)
}

// ── API rows ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiTrack {
    id: u64,
    title: String,
    audio_url: String,
}

pub fn parse_api_tracks(
    body: &str,
    default_category: &str,
) -> Result<Vec<TrackRecord>, LoaderError> {
    let rows: Vec<ApiTrack> = serde_json::from_str(body)?;
    Ok(rows
        .into_iter()
        .map(|row| TrackRecord {
            id: row.id,
            title: title_from_filename(&row.title),
            filename: row.title,
            category: default_category.to_string(),
            tags: Vec::new(),
            url: row.audio_url,
        })
        .collect())
}

// ── Tagged JSON ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TaggedTrack {
    id: u64,
    filename: String,
    /// Derived from `filename` when the source omits it.
    title: Option<String>,
    category: String,
    #[serde(default)]
    tags: Vec<String>,
    url: String,
}

pub fn parse_tagged_json(body: &str) -> Result<Vec<TrackRecord>, LoaderError> {
    let rows: Vec<TaggedTrack> = serde_json::from_str(body)?;
    Ok(rows
        .into_iter()
        .map(|row| TrackRecord {
            id: row.id,
            title: row
                .title
                .unwrap_or_else(|| title_from_filename(&row.filename)),
            filename: row.filename,
            category: row.category,
            tags: row.tags,
            url: row.url,
        })
        .collect())
}

// ── Numbered mapping text ────────────────────────────────────────────────────

/// `N. <filename>` — the id and filename of the entry the next URL line
/// completes. Whitespace after the dot is required, so `1.mp3` is not an
/// entry header.
fn parse_numbered_line(line: &str) -> Option<(u64, &str)> {
    let (num, rest) = line.split_once('.')?;
    let id: u64 = num.parse().ok()?;
    let name = rest.trim_start();
    if name.len() == rest.len() || name.is_empty() {
        return None;
    }
    Some((id, name))
}

/// Parse the numbered mapping format. Blank lines, comments (`#`) and list
/// markers (`- `) are skipped; a numbered line without a following URL is
/// dropped.
pub fn parse_mapping_text(body: &str, default_category: &str) -> Vec<TrackRecord> {
    let mut records = Vec::new();
    let mut pending: Option<(u64, String)> = None;

    for raw in body.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("- ") {
            continue;
        }

        if let Some((id, filename)) = parse_numbered_line(line) {
            if let Some((dropped_id, dropped_name)) = pending.take() {
                warn!(
                    "mapping entry {} ({}) has no URL, dropping",
                    dropped_id, dropped_name
                );
            }
            pending = Some((id, filename.to_string()));
            continue;
        }

        if line.starts_with("http") {
            if let Some((id, filename)) = pending.take() {
                records.push(TrackRecord {
                    id,
                    title: title_from_filename(&filename),
                    filename,
                    category: default_category.to_string(),
                    tags: Vec::new(),
                    url: line.to_string(),
                });
            }
        }
    }

    if let Some((dropped_id, dropped_name)) = pending {
        warn!(
            "mapping entry {} ({}) has no URL, dropping",
            dropped_id, dropped_name
        );
    }

    records
}
