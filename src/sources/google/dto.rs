//! Google Custom Search JSON API Data Transfer Objects
//!
//! DO NOT use these types outside the google module - convert to domain types.
//!
//! API Reference: https://developers.google.com/custom-search/v1/reference/rest/v1/cse/list
//!
//! Example response (trimmed):
//! ```json
//! {
//!   "searchInformation": { "totalResults": "2" },
//!   "items": [
//!     {
//!       "title": "Exo Round Dishwash Bar 500 g - Amazon.in",
//!       "link": "https://www.amazon.in/dp/B00...",
//!       "snippet": "Exo Round dishwash bar with anti-bacterial ..."
//!     }
//!   ]
//! }
//! ```
//!
//! `items` is absent (not empty) when nothing matched.

use serde::{Deserialize, Serialize};

/// Top-level search response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

/// One search result
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}
