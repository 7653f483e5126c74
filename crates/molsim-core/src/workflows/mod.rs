//! The public-API layer: prefab molecules and one-call orchestration of the
//! engine sessions.

pub mod prefab;
pub mod simulate;
