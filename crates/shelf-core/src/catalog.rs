//! Track records and the in-memory catalog store.
//!
//! The catalog is populated once per session by the loader and replaced
//! wholesale on reload. There is no partial mutation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The loader supplied zero records. Callers must surface this as an
    /// error state, not render an empty grid.
    #[error("catalog source returned zero tracks")]
    Empty,
}

/// One audio track as the rest of the system sees it, regardless of which
/// source format it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: u64,
    /// Original file name, used as the download name.
    pub filename: String,
    /// Display name — `filename` with the extension stripped.
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Absolute resource location for playback and download.
    pub url: String,
}

/// Derive a display title by stripping one trailing `.` + word-characters
/// extension. Anything else (dotless names, trailing dots, non-word
/// suffixes) passes through unchanged.
pub fn title_from_filename(filename: &str) -> String {
    if let Some(idx) = filename.rfind('.') {
        let ext = &filename[idx + 1..];
        if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return filename[..idx].to_string();
        }
    }
    filename.to_string()
}

/// The full list of tracks for the current session.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<TrackRecord>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire record list. Zero records is a loader failure,
    /// never a valid catalog.
    pub fn replace(&mut self, records: Vec<TrackRecord>) -> Result<(), CatalogError> {
        if records.is_empty() {
            return Err(CatalogError::Empty);
        }
        self.records = records;
        Ok(())
    }

    pub fn records(&self) -> &[TrackRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct categories present in the catalog, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for r in &self.records {
            if !out.contains(&r.category) {
                out.push(r.category.clone());
            }
        }
        out.sort();
        out
    }

    /// Distinct tags present in the catalog, sorted. Empty when no source
    /// supplied tags (the tag filter is meaningless then).
    pub fn tags(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for r in &self.records {
            for t in &r.tags {
                if !out.contains(t) {
                    out.push(t.clone());
                }
            }
        }
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: u64, filename: &str, category: &str, tags: &[&str]) -> TrackRecord {
        TrackRecord {
            id,
            filename: filename.to_string(),
            title: title_from_filename(filename),
            category: category.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            url: format!("https://cdn.example.net/{}", filename),
        }
    }

    #[test]
    fn test_title_strips_extension() {
        assert_eq!(title_from_filename("Sunset Walk.mp3"), "Sunset Walk");
        assert_eq!(title_from_filename("piece.v2.flac"), "piece.v2");
    }

    #[test]
    fn test_title_leaves_odd_names_alone() {
        assert_eq!(title_from_filename("no-extension"), "no-extension");
        assert_eq!(title_from_filename("trailing-dot."), "trailing-dot.");
        assert_eq!(title_from_filename("weird.mp 3"), "weird.mp 3");
    }

    #[test]
    fn test_replace_rejects_empty() {
        let mut catalog = Catalog::new();
        assert!(matches!(catalog.replace(vec![]), Err(CatalogError::Empty)));

        catalog.replace(vec![track(1, "a.mp3", "bgm", &[])]).unwrap();
        assert_eq!(catalog.len(), 1);
        // A bad reload must not wipe the previous snapshot.
        assert!(catalog.replace(vec![]).is_err());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_categories_and_tags_distinct_sorted() {
        let mut catalog = Catalog::new();
        catalog
            .replace(vec![
                track(1, "a.mp3", "bgm", &["happy", "bgm"]),
                track(2, "b.mp3", "ambient", &["happy"]),
                track(3, "c.mp3", "bgm", &[]),
            ])
            .unwrap();
        assert_eq!(catalog.categories(), vec!["ambient", "bgm"]);
        assert_eq!(catalog.tags(), vec!["bgm", "happy"]);
    }
}
