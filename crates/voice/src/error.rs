//! Fehlertypen der Voice-Pipeline

use plauderei_core::PlaudereiError;
use thiserror::Error;

/// Fehler beim Kodieren oder Dekodieren eines Voice-Frames
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Dekodierung fehlgeschlagen: {0}")]
    Dekodierung(String),

    #[error("Kodierung fehlgeschlagen: {0}")]
    Kodierung(String),
}

pub type VoiceResult<T> = Result<T, VoiceError>;

impl From<VoiceError> for PlaudereiError {
    fn from(e: VoiceError) -> Self {
        PlaudereiError::AudioCodec(e.to_string())
    }
}
