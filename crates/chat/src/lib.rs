//! plauderei-chat – Verlauf und Anhaenge
//!
//! Dieses Crate implementiert:
//! - Darstellung des Kanalverlaufs fuer `/read`
//! - Ablage von Voicemails (`audio/<id>.wav`) und Dateien (`files/<id><endung>`)
//! - StorageBackend-Trait + DiskStorage-Implementierung
//!
//! # Beispiel
//!
//! ```no_run
//! use std::sync::Arc;
//! use plauderei_chat::{DiskStorage, MedienDienst};
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = Arc::new(DiskStorage::new("data"));
//!     let medien = MedienDienst::neu(storage, 10 * 1024 * 1024);
//!     let voicemail = medien.voicemail_speichern(b"RIFF...").await.unwrap();
//!     println!("Voicemail {} gespeichert", voicemail.id);
//! }
//! ```

pub mod error;
pub mod media;
pub mod storage;
pub mod verlauf;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use error::{ChatError, ChatResult};
pub use media::{GespeicherteDatei, GespeicherteVoicemail, MedienDienst};
pub use storage::{DiskStorage, StorageBackend};
pub use verlauf::verlauf_rendern;
