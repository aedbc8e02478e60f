//! File-backed persistence and artifact output.

mod manifest;
mod run_store;

pub use manifest::ManifestAssembler;
pub use run_store::JsonFileRunStore;
