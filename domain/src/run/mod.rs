//! Generation runs: the request, its identifier and persisted snapshots.

pub mod request;
pub mod snapshot;

pub use request::{GenerationRequest, ReferenceAsset, RunId};
pub use snapshot::{RunPhase, RunSnapshot, UnitOutcome, UnitRecord};
