// SPDX-License-Identifier: GPL-3.0-or-later

//! Track catalog client: resolves year charts and candidate tracks.
//!
//! Wraps a Spotify-shaped catalog API behind a degrade-to-empty contract:
//! token resolution via the client-credentials flow, curated year-chart
//! playlist lookup with a raw search fallback, per-item screening, dedup,
//! and a short-TTL per-(year, genre) cache.

pub mod client;
pub mod error;
pub mod models;

pub use client::{CatalogClient, CatalogClientBuilder};
pub use error::{CatalogError, Result};
