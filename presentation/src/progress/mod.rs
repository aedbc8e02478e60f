//! Progress rendering for generation runs

pub mod reporter;
