//! Generation providers over a generic job REST shape
//!
//! `POST {base_url}{submit_path}` submits a request and answers either with a
//! result URL (synchronous) or a job id. `GET {base_url}{status_path}` reports
//! the job status. Field names vary across vendors, so the wire parser
//! accepts the common aliases.

mod client;
mod wire;

pub use client::{HttpProviderClient, HttpProviderConfig};
