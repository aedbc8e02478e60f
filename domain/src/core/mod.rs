//! Core domain concepts shared across all subdomains.
//!
//! - [`model::Model`]: identifier of the reasoning model driving the planner
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod model;
pub mod string;
