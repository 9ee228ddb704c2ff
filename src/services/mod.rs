//! Service layer
//!
//! Bundles the provenance pipeline behind one handle so the CLI and
//! library consumers do not wire its parts themselves.

pub mod provenance_session;

pub use provenance_session::ProvenanceSession;
