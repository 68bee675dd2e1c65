//! Fehlertypen fuer den Auth-Service

use plauderei_core::PlaudereiError;
use thiserror::Error;

/// Alle moeglichen Fehler beim Pruefen und Hashen von Anmeldedaten
#[derive(Debug, Error)]
pub enum AuthError {
    // --- Syntax ---
    #[error("Ungueltiges Format ({feld}): {grund}")]
    UngueltigesFormat { feld: &'static str, grund: String },

    // --- Passwort ---
    #[error("Passwort-Hashing fehlgeschlagen: {0}")]
    PasswortHashing(String),

    // --- Konfiguration ---
    #[error("Ungueltiger Passwort-Salt: {0}")]
    UngueltigerSalt(String),
}

impl AuthError {
    pub(crate) fn format(feld: &'static str, grund: impl Into<String>) -> Self {
        Self::UngueltigesFormat {
            feld,
            grund: grund.into(),
        }
    }
}

impl From<AuthError> for PlaudereiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UngueltigesFormat { .. } => PlaudereiError::Validierung(e.to_string()),
            AuthError::UngueltigerSalt(_) => PlaudereiError::Konfiguration(e.to_string()),
            AuthError::PasswortHashing(_) => PlaudereiError::Intern(e.to_string()),
        }
    }
}

/// Result-Alias fuer den Auth-Service
pub type AuthResult<T> = Result<T, AuthError>;
