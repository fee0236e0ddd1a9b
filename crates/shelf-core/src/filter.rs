//! Filter state and the pure filter/paginate engine.
//!
//! `filter_and_paginate` has no side effects: the caller owns the
//! `FilterState` and is responsible for writing the returned page number
//! back when it differs (out-of-range pages are clamped, never an error).

use crate::catalog::TrackRecord;

/// Sentinel meaning "no category/tag filter".
pub const ALL: &str = "all";

pub const DEFAULT_PAGE_SIZE: usize = 24;

/// The user's current view into the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub category: String,
    pub tag: String,
    /// Always held lowercased; empty means no search filter.
    search_term: String,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl FilterState {
    pub fn new(page_size: usize) -> Self {
        Self {
            category: ALL.to_string(),
            tag: ALL.to_string(),
            search_term: String::new(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Any filter change resets to the first page.
    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
        self.page = 1;
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
        self.page = 1;
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.to_lowercase();
        self.page = 1;
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// The filtering predicate: category AND tag AND search must all hold.
    pub fn matches(&self, record: &TrackRecord) -> bool {
        let category_ok = self.category == ALL || record.category == self.category;
        let tag_ok = self.tag == ALL || record.tags.iter().any(|t| *t == self.tag);
        let search_ok = self.search_term.is_empty()
            || record.title.to_lowercase().contains(&self.search_term)
            || record.filename.to_lowercase().contains(&self.search_term);
        category_ok && tag_ok && search_ok
    }

    /// Apply a page-navigation request given the page count of the current
    /// filtered view. Prev/Next wrap around; Jump outside `[1, total_pages]`
    /// is rejected with no state change (forgiving-UI policy).
    pub fn navigate(&mut self, request: PageRequest, total_pages: usize) -> bool {
        let total_pages = total_pages.max(1);
        let target = match request {
            PageRequest::First => 1,
            PageRequest::Last => total_pages,
            PageRequest::Prev => {
                if self.page <= 1 {
                    total_pages
                } else {
                    self.page - 1
                }
            }
            PageRequest::Next => {
                if self.page >= total_pages {
                    1
                } else {
                    self.page + 1
                }
            }
            PageRequest::Jump(n) => {
                if n < 1 || n > total_pages {
                    return false;
                }
                n
            }
        };
        self.page = target;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageRequest {
    First,
    Prev,
    Next,
    Last,
    Jump(usize),
}

/// One rendered page plus the pagination metadata the UI needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub items: Vec<TrackRecord>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    total_items.div_ceil(page_size.max(1)).max(1)
}

/// Filter `records` through `state` and slice out the current page.
/// Stable: the relative order of `records` is preserved, no re-sort.
pub fn filter_and_paginate(records: &[TrackRecord], state: &FilterState) -> PageView {
    let filtered: Vec<&TrackRecord> = records.iter().filter(|r| state.matches(r)).collect();

    let total_items = filtered.len();
    let total_pages = total_pages(total_items, state.page_size);
    let page = state.page.clamp(1, total_pages);

    let start = (page - 1) * state.page_size;
    let end = (start + state.page_size).min(total_items);
    let items = if start < total_items {
        filtered[start..end].iter().map(|r| (*r).clone()).collect()
    } else {
        Vec::new()
    };

    PageView {
        items,
        page,
        total_pages,
        total_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::title_from_filename;

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

    fn sample_catalog(n: usize) -> Vec<TrackRecord> {
        (1..=n as u64)
            .map(|i| track(i, &format!("track {}.mp3", i), "bgm", &[]))
            .collect()
    }

    #[test]
    fn test_page_never_exceeds_page_size() {
        let records = sample_catalog(60);
        let mut state = FilterState::new(24);
        for page in 1..=4 {
            state.page = page;
            let view = filter_and_paginate(&records, &state);
            assert!(view.items.len() <= 24);
        }
    }

    #[test]
    fn test_unfiltered_round_trip() {
        let records = sample_catalog(50);
        let state = FilterState::new(24);
        let mut seen = Vec::new();
        for page in 1..=3 {
            let mut s = state.clone();
            s.page = page;
            seen.extend(filter_and_paginate(&records, &s).items);
        }
        assert_eq!(seen, records);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let records = sample_catalog(30);
        let mut state = FilterState::new(24);
        state.set_search_term("track 1");
        let first = filter_and_paginate(&records, &state);
        let second = filter_and_paginate(&records, &state);
        assert_eq!(first, second);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let records = vec![track(1, "Sunset Walk.mp3", "bgm", &[])];
        let mut state = FilterState::default();
        state.set_search_term("SUNSET");
        assert_eq!(filter_and_paginate(&records, &state).total_items, 1);
        state.set_search_term("xyz");
        assert_eq!(filter_and_paginate(&records, &state).total_items, 0);
    }

    #[test]
    fn test_search_matches_filename_too() {
        // Title loses the extension; the raw filename still matches.
        let records = vec![track(1, "rainfall.mp3", "bgm", &[])];
        let mut state = FilterState::default();
        state.set_search_term(".mp3");
        assert_eq!(filter_and_paginate(&records, &state).total_items, 1);
    }

    #[test]
    fn test_tag_filter() {
        let records = vec![
            track(1, "a.mp3", "bgm", &["happy", "bgm"]),
            track(2, "b.mp3", "bgm", &["sad"]),
        ];
        let mut state = FilterState::default();
        state.set_tag("happy");
        let view = filter_and_paginate(&records, &state);
        assert_eq!(view.total_items, 1);
        assert_eq!(view.items[0].id, 1);

        state.set_tag("calm");
        assert_eq!(filter_and_paginate(&records, &state).total_items, 0);
    }

    #[test]
    fn test_category_and_tag_and_search_all_apply() {
        let records = vec![
            track(1, "sunny day.mp3", "bgm", &["happy"]),
            track(2, "sunny night.mp3", "ambient", &["happy"]),
            track(3, "sunny day 2.mp3", "bgm", &["sad"]),
        ];
        let mut state = FilterState::default();
        state.set_category("bgm");
        state.set_tag("happy");
        state.set_search_term("sunny");
        let view = filter_and_paginate(&records, &state);
        assert_eq!(view.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut state = FilterState::new(24);
        state.page = 3;
        state.set_category("bgm");
        assert_eq!(state.page, 1);
        state.page = 2;
        state.set_search_term("x");
        assert_eq!(state.page, 1);
    }

    #[test]
    fn test_pagination_wraps() {
        // 60 records at page size 24 → 3 pages.
        let records = sample_catalog(60);
        let mut state = FilterState::new(24);
        let total = filter_and_paginate(&records, &state).total_pages;
        assert_eq!(total, 3);

        assert!(state.navigate(PageRequest::Prev, total));
        assert_eq!(state.page, 3);
        assert!(state.navigate(PageRequest::Next, total));
        assert_eq!(state.page, 1);
        assert!(state.navigate(PageRequest::Last, total));
        assert_eq!(state.page, 3);
        assert!(state.navigate(PageRequest::Next, total));
        assert_eq!(state.page, 1);
    }

    #[test]
    fn test_out_of_range_jump_rejected() {
        let mut state = FilterState::new(24);
        state.page = 2;
        assert!(!state.navigate(PageRequest::Jump(0), 3));
        assert_eq!(state.page, 2);
        assert!(!state.navigate(PageRequest::Jump(4), 3));
        assert_eq!(state.page, 2);
        assert!(state.navigate(PageRequest::Jump(3), 3));
        assert_eq!(state.page, 3);
    }

    #[test]
    fn test_empty_filter_result_still_one_page() {
        let records = sample_catalog(10);
        let mut state = FilterState::new(24);
        state.set_search_term("no such track");
        let view = filter_and_paginate(&records, &state);
        assert_eq!(view.total_items, 0);
        assert_eq!(view.total_pages, 1);
        assert!(view.items.is_empty());
        assert_eq!(view.page, 1);
    }

    #[test]
    fn test_stale_page_is_clamped() {
        // Page 3 was valid before a narrowing search dropped the count.
        let records = sample_catalog(60);
        let mut state = FilterState::new(24);
        state.page = 3;
        state.search_term = "track 5".to_string(); // bypass setter: simulate stale page
        let view = filter_and_paginate(&records, &state);
        assert_eq!(view.page, 1);
        assert!(!view.items.is_empty());
    }
}
