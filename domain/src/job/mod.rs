//! Job subdomain: tracked handles to in-flight provider requests.

pub mod entities;

pub use entities::{Job, JobId, JobStatus};
