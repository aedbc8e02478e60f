//! Web search adapters for the planner's `web_search` tool.

mod duckduckgo;

pub use duckduckgo::DuckDuckGoSearch;
