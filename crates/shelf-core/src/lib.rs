//! shelf-core — the engine behind the trackshelf browser.
//!
//! Everything here is synchronous and UI-free:
//! - `catalog` — track records and the in-memory catalog store
//! - `filter` — filter state and the pure filter/paginate engine
//! - `limiter` — sliding-window download rate limiter with persisted lockout
//! - `loader` — normalization of the supported catalog source formats
//! - `config` — TOML config with tunables (page size, limiter caps, paths)
//! - `platform` — config/data dir resolution and mpv discovery

pub mod catalog;
pub mod config;
pub mod filter;
pub mod limiter;
pub mod loader;
pub mod platform;
