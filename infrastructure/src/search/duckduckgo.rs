//! DuckDuckGo Instant Answer API.
//!
//! Needs no API key. The API returns an abstract, a direct answer and a list
//! of related topics rather than a full result page, so results are built
//! from those sections.

use async_trait::async_trait;
use atelier_application::{SearchProvider, SearchResult};
use atelier_domain::ProviderError;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("atelier/", env!("CARGO_PKG_VERSION"));

pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoSearch {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::permanent(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ProviderError> {
        debug!(query, limit, "web search");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::transient(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_http_status(
                status.as_u16(),
                format!("Search API returned {}: {}", status, body),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::permanent(format!("Unreadable search response: {}", e)))?;

        Ok(parse_results(&body, limit))
    }
}

/// Abstract and answer first, then related topics (nested groups flattened).
fn parse_results(data: &Value, limit: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();

    if let Some(text) = non_empty(&data["AbstractText"]) {
        results.push(SearchResult {
            title: non_empty(&data["Heading"])
                .or_else(|| non_empty(&data["AbstractSource"]))
                .unwrap_or("Summary")
                .to_string(),
            url: data["AbstractURL"].as_str().unwrap_or_default().to_string(),
            snippet: text.to_string(),
        });
    }

    if let Some(answer) = non_empty(&data["Answer"]) {
        results.push(SearchResult {
            title: "Instant answer".to_string(),
            url: String::new(),
            snippet: answer.to_string(),
        });
    }

    if let Some(definition) = non_empty(&data["Definition"]) {
        results.push(SearchResult {
            title: non_empty(&data["DefinitionSource"])
                .unwrap_or("Definition")
                .to_string(),
            url: data["DefinitionURL"].as_str().unwrap_or_default().to_string(),
            snippet: definition.to_string(),
        });
    }

    if let Some(topics) = data["RelatedTopics"].as_array() {
        let flattened = topics.iter().flat_map(|topic| match topic["Topics"].as_array() {
            Some(group) => group.iter().collect::<Vec<_>>(),
            None => vec![topic],
        });
        for topic in flattened {
            let Some(text) = non_empty(&topic["Text"]) else {
                continue;
            };
            results.push(SearchResult {
                title: topic_title(text).to_string(),
                url: topic["FirstURL"].as_str().unwrap_or_default().to_string(),
                snippet: text.to_string(),
            });
        }
    }

    results.truncate(limit);
    results
}

fn non_empty(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}

/// Related topic texts read "Title - description".
fn topic_title(text: &str) -> &str {
    text.split_once(" - ").map_or(text, |(title, _)| title).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_abstract_and_topics() {
        let data = json!({
            "Heading": "Tide",
            "AbstractText": "Tides are the rise and fall of sea levels.",
            "AbstractSource": "Wikipedia",
            "AbstractURL": "https://en.wikipedia.org/wiki/Tide",
            "Answer": "",
            "RelatedTopics": [
                { "Text": "Spring tide - A tide just after a new or full moon", "FirstURL": "https://duckduckgo.com/Spring_tide" },
                { "Name": "See also", "Topics": [
                    { "Text": "Tidal force - Gravitational effect", "FirstURL": "https://duckduckgo.com/Tidal_force" }
                ]}
            ]
        });

        let results = parse_results(&data, 10);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Tide");
        assert_eq!(results[0].url, "https://en.wikipedia.org/wiki/Tide");
        assert_eq!(results[1].title, "Spring tide");
        assert_eq!(results[2].title, "Tidal force");
        assert_eq!(results[2].url, "https://duckduckgo.com/Tidal_force");
    }

    #[test]
    fn test_parse_respects_limit() {
        let topics: Vec<Value> = (0..8)
            .map(|i| json!({ "Text": format!("Topic {}", i), "FirstURL": format!("https://x.test/{}", i) }))
            .collect();
        let data = json!({ "Answer": "42", "RelatedTopics": topics });

        let results = parse_results(&data, 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].snippet, "42");
        assert_eq!(results[2].title, "Topic 1");
    }

    #[test]
    fn test_parse_empty_response() {
        let data = json!({ "AbstractText": "", "RelatedTopics": [] });
        assert!(parse_results(&data, 5).is_empty());
    }
}
