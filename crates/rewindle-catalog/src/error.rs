// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Internal error taxonomy for catalog calls.
///
/// The public `fetch_year_tracks` contract degrades every failure to "fewer
/// results"; these variants exist so logs can distinguish a flaky network
/// from upstream contract drift.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog credentials not configured")]
    MissingCredentials,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {body}")]
    ApiError { status: u16, body: String },

    #[error("invalid response from catalog: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}
