#![forbid(unsafe_code)]

//! Public entry point for the ListTube feed crate.
//!
//! The library aggregates the uploads of many YouTube channels into one
//! newest-first feed. Channel results are cached per channel with a freshness
//! window so the rate-limited Data API is only hit when an entry goes stale.
//! Binaries wire the pieces together; every collaborator (API client, cache
//! store, clock) is injected at construction time.

pub mod aggregate;
pub mod cache;
pub mod clock;
pub mod config;
pub mod fetcher;
pub mod lists;
pub mod logging;
pub mod normalize;
pub mod records;
pub mod search;
pub mod service;
pub mod youtube;

#[cfg(test)]
pub(crate) mod testing;
