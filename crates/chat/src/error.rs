//! Fehlertypen fuer das Chat-Crate

use plauderei_core::PlaudereiError;
use thiserror::Error;

/// Chat-Fehlertypen
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Datei nicht gefunden: {0}")]
    DateiNichtGefunden(String),

    #[error("Datei zu gross: {size} Bytes (Maximum: {max} Bytes)")]
    DateiZuGross { size: u64, max: u64 },

    #[error("Dateiendung nicht erlaubt: {0}")]
    EndungNichtErlaubt(String),

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

pub type ChatResult<T> = Result<T, ChatError>;

impl From<ChatError> for PlaudereiError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::DateiZuGross { .. }
            | ChatError::EndungNichtErlaubt(_)
            | ChatError::UngueltigeEingabe(_) => PlaudereiError::Validierung(e.to_string()),
            ChatError::DateiNichtGefunden(_) | ChatError::Io(_) => {
                PlaudereiError::Speicher(e.to_string())
            }
        }
    }
}
