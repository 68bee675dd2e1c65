//! plauderei-core – Gemeinsame Typen und Fehlertaxonomie
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Plauderei-Crates gemeinsam genutzt werden.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{PlaudereiError, Result};
pub use types::{UserId, VerbindungsId};
