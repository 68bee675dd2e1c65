//! Fehlertypen fuer Plauderei
//!
//! Zentrale Fehlertaxonomie. Die Fachcrates definieren eigene Fehler und
//! konvertieren via `From` in `PlaudereiError`.

use thiserror::Error;

/// Globaler Result-Alias fuer Plauderei
pub type Result<T> = std::result::Result<T, PlaudereiError>;

/// Alle Fehlerklassen des Chat-Servers
#[derive(Debug, Error)]
pub enum PlaudereiError {
    // --- Protokoll & Verbindung ---
    /// Fehlerhafter oder zu grosser Frame, die Verbindung wird geschlossen
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Gegenstelle hat die Verbindung getrennt
    #[error("Verbindung getrennt")]
    VerbindungGetrennt,

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    // --- Sitzung ---
    /// Ungueltiger Login, Passwort oder Nickname (Client muss erneut senden)
    #[error("Validierung fehlgeschlagen: {0}")]
    Validierung(String),

    /// Befehl vor Abschluss des ID-Handshakes
    #[error("Nicht autorisiert")]
    NichtAutorisiert,

    // --- Ressourcen ---
    #[error("Speicherfehler: {0}")]
    Speicher(String),

    #[error("Audio-Codec-Fehler: {0}")]
    AudioCodec(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl PlaudereiError {
    /// Erstellt einen Protokollfehler aus einer beliebigen Nachricht
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }

    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler die Sitzung beendet
    ///
    /// Alle anderen Klassen werden geloggt, die Sitzung laeuft weiter.
    pub fn ist_verbindungsende(&self) -> bool {
        matches!(
            self,
            Self::Protokoll(_) | Self::VerbindungGetrennt | Self::Io(_)
        )
    }
}
