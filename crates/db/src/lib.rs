//! plauderei-db – Store-Abstraktion
//!
//! Dieses Crate stellt das `Store`-Trait bereit, das Benutzer, Kanaele,
//! Mitgliedschaften und Kanal-Verlaeufe hinter einer einheitlichen
//! Schnittstelle abstrahiert. Der Store selbst ist nicht nebenlaeufig;
//! Aufrufer serialisieren den Zugriff ueber ein gemeinsames Lock.

pub mod datei;
pub mod error;
pub mod memory;
pub mod models;
pub mod store;

pub use datei::DateiStore;
pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use models::{BenutzerRecord, KanalRecord, VerlaufEintrag};
pub use store::Store;
