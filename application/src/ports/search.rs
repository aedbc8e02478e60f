//! Web search port used by the `web_search` planner tool.

use async_trait::async_trait;
use atelier_domain::ProviderError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ProviderError>;
}

/// Render results as the text fed back to the planner.
pub fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for \"{}\".", query);
    }
    let mut out = format!("Search results for \"{}\":\n", query);
    for (i, r) in results.iter().enumerate() {
        out.push_str(&format!("\n{}. {}\n   {}\n", i + 1, r.title, r.url));
        if !r.snippet.is_empty() {
            out.push_str(&format!("   {}\n", r.snippet));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_results() {
        let results = vec![SearchResult {
            title: "Tides".into(),
            url: "https://x.test/tides".into(),
            snippet: "Tides are caused by the moon.".into(),
        }];
        let text = format_results("tides", &results);
        assert!(text.contains("1. Tides\n   https://x.test/tides"));
        assert!(text.contains("caused by the moon"));
        assert_eq!(format_results("q", &[]), "No results found for \"q\".");
    }
}
