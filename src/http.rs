//! HTTP page fetcher for the balldontlie players API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::FetcherConfig;
use crate::ports::{FetchError, PageFetcher};
use crate::state::{Cursor, Page, RawPlayer};

/// Fetches player pages over HTTP.
#[derive(Clone)]
pub struct BallDontLieFetcher {
    client: Client,
    config: FetcherConfig,
}

impl BallDontLieFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    /// Build from `ROSTER_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(FetcherConfig::from_env())
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    fn page_url(&self, cursor: Cursor) -> String {
        format!(
            "{}/players?cursor={}&per_page={}",
            self.config.base_url.trim_end_matches('/'),
            cursor,
            self.config.per_page
        )
    }
}

impl Default for BallDontLieFetcher {
    fn default() -> Self {
        Self::new(FetcherConfig::default())
    }
}

#[async_trait]
impl PageFetcher for BallDontLieFetcher {
    async fn fetch_page(&self, cursor: Cursor) -> Result<Page, FetchError> {
        let url = self.page_url(cursor);
        tracing::debug!(cursor, %url, "Fetching players");

        let mut request = self.client.get(&url);
        if let Some(key) = &self.config.api_key {
            request = request.header(reqwest::header::AUTHORIZATION, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        parse_page(&body, self.config.per_page)
    }
}

#[derive(Debug, Deserialize)]
struct PlayersResponse {
    data: Vec<RawPlayer>,
    #[serde(default)]
    meta: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
struct PageMeta {
    #[serde(default)]
    next_cursor: Option<Cursor>,
    #[serde(default)]
    per_page: Option<u32>,
}

/// Decode a `{data: [...], meta: {next_cursor, per_page}}` body.
fn parse_page(body: &str, default_page_size: u32) -> Result<Page, FetchError> {
    let response: PlayersResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(Page {
        records: response.data,
        next_cursor: response.meta.next_cursor,
        page_size: response.meta.per_page.unwrap_or(default_page_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_page_url() {
        let fetcher = BallDontLieFetcher::new(FetcherConfig {
            base_url: "http://localhost:9000/v1/".to_string(),
            per_page: 25,
            ..FetcherConfig::default()
        });
        assert_eq!(
            fetcher.page_url(40),
            "http://localhost:9000/v1/players?cursor=40&per_page=25"
        );
        assert_eq!(
            BallDontLieFetcher::default().page_url(0),
            "https://api.balldontlie.io/v1/players?cursor=0&per_page=10"
        );
    }

    #[test]
    fn test_parse_page() {
        let body = r#"{
            "data": [
                {"id": 1, "first_name": "Alaa", "last_name": "Abdelnaby", "position": "F",
                 "height": "6-10", "weight": "240", "jersey_number": "30", "college": "Duke",
                 "country": "USA", "draft_year": 1990, "draft_round": 1, "draft_number": 25,
                 "team": {"id": 25, "conference": "West", "division": "Northwest", "city": "Portland",
                          "name": "Trail Blazers", "full_name": "Portland Trail Blazers", "abbreviation": "POR"}},
                {"id": 2, "first_name": "Zaid", "last_name": "Abdul-Aziz", "position": "C",
                 "height": null, "weight": null, "jersey_number": null, "college": null,
                 "country": null, "draft_year": null, "draft_round": null, "draft_number": null,
                 "team": {"id": 17, "abbreviation": "MIL"}}
            ],
            "meta": {"next_cursor": 2, "per_page": 10}
        }"#;

        let page = parse_page(body, 10).unwrap();
        assert_eq!(page.next_cursor, Some(2));
        assert_eq!(page.page_size, 10);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].college.as_deref(), Some("Duke"));
        assert_eq!(page.records[1].team.as_ref().unwrap().abbreviation, "MIL");
    }

    #[test]
    fn test_parse_last_page() {
        let page = parse_page(r#"{"data": [], "meta": {"next_cursor": null}}"#, 10).unwrap();
        assert_eq!(page.next_cursor, None);
        assert_eq!(page.page_size, 10);

        let page = parse_page(r#"{"data": []}"#, 5).unwrap();
        assert_eq!(page.next_cursor, None);
        assert_eq!(page.page_size, 5);
    }

    #[test]
    fn test_parse_rejects_bad_body() {
        let err = parse_page("<html>", 10).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        assert!(err.to_string().starts_with("Invalid player page"));
    }
}
