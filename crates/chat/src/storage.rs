//! Storage-Backend fuer Anhaenge
//!
//! Das `StorageBackend`-Trait abstrahiert den konkreten Ablageort der
//! Voicemails und Dateien. Pfade sind immer relativ und duerfen das
//! Basisverzeichnis nicht verlassen.

use std::path::{Component, Path, PathBuf};

use crate::error::{ChatError, ChatResult};

/// Abstraktes Speicher-Backend fuer Anhaenge
#[allow(async_fn_in_trait)]
pub trait StorageBackend: Send + Sync {
    /// Datei unter dem angegebenen Pfad speichern
    async fn store(&self, path: &str, data: &[u8]) -> ChatResult<()>;

    /// Datei laden; fehlt sie, ergibt das `DateiNichtGefunden`
    async fn retrieve(&self, path: &str) -> ChatResult<Vec<u8>>;
}

/// Disk-basiertes Storage-Backend
///
/// Speichert Dateien unter `base_dir/<path>`.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    base_dir: PathBuf,
}

impl DiskStorage {
    /// Neues DiskStorage mit dem angegebenen Basisverzeichnis erstellen
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Vollstaendigen Dateipfad aus relativem Pfad berechnen
    fn full_path(&self, path: &str) -> ChatResult<PathBuf> {
        let relativ = Path::new(path);
        if path.is_empty() || !relativ.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(ChatError::UngueltigeEingabe(format!("Pfad {path:?}")));
        }
        Ok(self.base_dir.join(relativ))
    }
}

impl StorageBackend for DiskStorage {
    async fn store(&self, path: &str, data: &[u8]) -> ChatResult<()> {
        let full = self.full_path(path)?;

        // Elternverzeichnis anlegen falls noetig
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&full, data).await?;
        tracing::debug!(path = %full.display(), bytes = data.len(), "Datei gespeichert");
        Ok(())
    }

    async fn retrieve(&self, path: &str) -> ChatResult<Vec<u8>> {
        let full = self.full_path(path)?;
        match tokio::fs::read(&full).await {
            Ok(data) => {
                tracing::debug!(path = %full.display(), bytes = data.len(), "Datei gelesen");
                Ok(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ChatError::DateiNichtGefunden(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
