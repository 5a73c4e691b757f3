//! Typed view of a BORIS project document.
//!
//! # Responsibility
//! - Define the canonical structures used after a project has been migrated.
//! - Keep unknown document keys so a loaded project survives a round trip.
//!
//! # Invariants
//! - Typed structures only describe the current project format.
//! - Older formats are upgraded on the raw JSON document before deserializing.
//!
//! # See also
//! - crate::project::migrations

pub mod event;
pub mod project;
pub mod version;
