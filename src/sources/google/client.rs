//! Google Custom Search HTTP client
//!
//! Needs an API key and a Programmable Search Engine ID (`cx`). The free tier
//! allows 100 queries a day, so a 429 here usually means the daily quota is
//! gone rather than a burst limit.

use std::time::Duration;

use super::{adapter, dto};
use crate::barcode::BarcodeKey;
use crate::http::{build_client, error_for_response};
use crate::model::ProductDetails;
use crate::retry::RemoteError;

/// Default search endpoint
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Google Custom Search API client
pub struct GoogleSearchClient {
    api_key: String,
    search_cx: String,
    http_client: reqwest::Client,
    base_url: String,
}

impl GoogleSearchClient {
    pub fn new(
        api_key: impl Into<String>,
        search_cx: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            search_cx: search_cx.into(),
            http_client: build_client(timeout),
            base_url: base_url.into(),
        }
    }

    /// Search the web for a barcode.
    ///
    /// Runs a second, more descriptive query only when the first returned no
    /// results at all.
    pub async fn lookup(&self, key: &BarcodeKey) -> Result<Option<ProductDetails>, RemoteError> {
        let barcode = key.digits();

        let mut items = self.search(&adapter::primary_query(barcode)).await?.items;
        if items.is_empty() {
            tracing::debug!("No search results for {}, trying alternate query", barcode);
            items = self.search(&adapter::alternate_query(barcode)).await?.items;
        }

        Ok(adapter::to_details(&items))
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}?key={}&cx={}&q={}&num=10",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&self.search_cx),
            urlencoding::encode(query)
        )
    }

    async fn search(&self, query: &str) -> Result<dto::SearchResponse, RemoteError> {
        let response = self.http_client.get(self.search_url(query)).send().await?;

        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }

        response
            .json::<dto::SearchResponse>()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_query() {
        let client = GoogleSearchClient::new(
            "k&y",
            "cx:1",
            DEFAULT_BASE_URL,
            Duration::from_secs(5),
        );
        let url = client.search_url("8901030865278 product");
        assert_eq!(
            url,
            "https://www.googleapis.com/customsearch/v1?key=k%26y&cx=cx%3A1&q=8901030865278%20product&num=10"
        );
    }

    #[test]
    fn test_empty_response_parses() {
        let resp: dto::SearchResponse =
            serde_json::from_str(r#"{"searchInformation": {"totalResults": "0"}}"#).unwrap();
        assert!(resp.items.is_empty());
    }
}
