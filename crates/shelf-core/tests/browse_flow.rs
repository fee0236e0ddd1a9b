//! End-to-end flow over the core: parse a tagged source, fill the catalog,
//! browse it with filters and pagination, and gate downloads.

use shelf_core::catalog::Catalog;
use shelf_core::config::CatalogFormat;
use shelf_core::filter::{filter_and_paginate, FilterState, PageRequest};
use shelf_core::limiter::{Decision, DenyReason, DownloadLimiter, LimiterConfig};
use shelf_core::loader::parse_catalog;

fn tagged_source(n: usize) -> String {
    let rows: Vec<String> = (1..=n)
        .map(|i| {
            let tag = if i % 2 == 0 { "happy" } else { "calm" };
            format!(
                r#"{{"id": {i}, "filename": "track {i}.mp3", "title": "track {i}",
                    "category": "bgm", "tags": ["{tag}"],
                    "url": "https://cdn.example.net/track-{i}.mp3"}}"#
            )
        })
        .collect();
    format!("[{}]", rows.join(","))
}

#[test]
fn browse_filter_and_page_through_catalog() {
    let body = tagged_source(60);
    let records = parse_catalog(CatalogFormat::TaggedJson, &body, "bgm").unwrap();

    let mut catalog = Catalog::new();
    catalog.replace(records).unwrap();
    assert_eq!(catalog.categories(), vec!["bgm"]);
    assert_eq!(catalog.tags(), vec!["calm", "happy"]);

    let mut state = FilterState::new(24);

    // Unfiltered: 60 tracks, 3 pages, wrap both ways.
    let view = filter_and_paginate(catalog.records(), &state);
    assert_eq!((view.total_items, view.total_pages), (60, 3));
    assert!(state.navigate(PageRequest::Prev, view.total_pages));
    assert_eq!(state.page, 3);
    let last = filter_and_paginate(catalog.records(), &state);
    assert_eq!(last.items.len(), 12);
    assert!(state.navigate(PageRequest::Next, last.total_pages));
    assert_eq!(state.page, 1);

    // Tag filter narrows to 30 and resets the page.
    state.navigate(PageRequest::Jump(2), 3);
    state.set_tag("happy");
    assert_eq!(state.page, 1);
    let happy = filter_and_paginate(catalog.records(), &state);
    assert_eq!(happy.total_items, 30);
    assert!(happy.items.iter().all(|r| r.tags.contains(&"happy".into())));

    // Search on top of the tag filter.
    state.set_search_term("TRACK 1");
    let both = filter_and_paginate(catalog.records(), &state);
    // happy ∩ "track 1*": 10, 12, 14, 16, 18 (from 10..=19)
    assert_eq!(both.total_items, 5);
}

#[test]
fn downloads_gate_through_the_limiter() {
    let body = tagged_source(12);
    let records = parse_catalog(CatalogFormat::TaggedJson, &body, "bgm").unwrap();
    let mut catalog = Catalog::new();
    catalog.replace(records).unwrap();

    let mut limiter = DownloadLimiter::new(LimiterConfig::default());
    let t0: i64 = 1_700_000_000_000;

    // Download the first page's worth of tracks, one per second.
    let mut denied_at = None;
    for (i, _record) in catalog.records().iter().enumerate() {
        let now = t0 + i as i64 * 1000;
        match limiter.try_record_download(now) {
            Decision::Allowed { count_in_window } => {
                assert_eq!(count_in_window, i + 1);
            }
            Decision::Denied(reason) => {
                denied_at = Some((i, reason));
                break;
            }
        }
    }
    assert_eq!(denied_at, Some((10, DenyReason::LimitExceeded)));

    // Everything after the lockout is LimitActive until the window lapses.
    assert_eq!(
        limiter.try_record_download(t0 + 60_000),
        Decision::Denied(DenyReason::LimitActive)
    );
    assert!(matches!(
        limiter.try_record_download(t0 + 10_000 + 180_000),
        Decision::Allowed { .. }
    ));
}
