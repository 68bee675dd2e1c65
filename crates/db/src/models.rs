//! Datenmodelle fuer Plauderei
//!
//! Diese Typen repraesentieren die dauerhaft gespeicherten Datensaetze.
//! Der Verlauf wird als selbstbeschreibender, getaggter Datensatz
//! gespeichert (eine JSON-Zeile pro Eintrag).

use chrono::{DateTime, Utc};
use plauderei_core::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{DbError, DbResult};

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

/// Benutzer-Datensatz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenutzerRecord {
    pub id: UserId,
    pub nickname: String,
    pub login: String,
    pub password_hash: String,
}

// ---------------------------------------------------------------------------
// Kanaele
// ---------------------------------------------------------------------------

/// Kanal mit Mitgliedern und Verlauf
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KanalRecord {
    pub name: String,
    pub members: BTreeSet<UserId>,
    pub history: Vec<VerlaufEintrag>,
}

impl KanalRecord {
    pub fn neu(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Prueft ob ein Kanalname gespeichert werden darf
///
/// Kanalnamen werden als Verzeichnisnamen verwendet, daher keine Pfad-
/// trenner, keine fuehrenden Punkte und keine Leerzeichen.
pub fn kanalname_pruefen(name: &str) -> DbResult<()> {
    let gueltig = !name.is_empty()
        && name.len() <= 64
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if gueltig {
        Ok(())
    } else {
        Err(DbError::UngueltigeDaten(format!("Ungueltiger Kanalname: {name:?}")))
    }
}

// ---------------------------------------------------------------------------
// Verlauf
// ---------------------------------------------------------------------------

/// Ein Eintrag im Kanal-Verlauf (nur anhaengen)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerlaufEintrag {
    Text {
        time: DateTime<Utc>,
        user_id: UserId,
        message: String,
    },
    Voicemail {
        time: DateTime<Utc>,
        user_id: UserId,
        voicemail_id: String,
        /// Dauer in Sekunden
        duration: f64,
    },
    FileRef {
        time: DateTime<Utc>,
        user_id: UserId,
        file_id: String,
        filename: String,
        extension: Option<String>,
        size: u64,
    },
}

impl VerlaufEintrag {
    /// Zeitpunkt des Eintrags
    pub fn time(&self) -> DateTime<Utc> {
        match self {
            Self::Text { time, .. } | Self::Voicemail { time, .. } | Self::FileRef { time, .. } => {
                *time
            }
        }
    }

    /// Absender des Eintrags
    pub fn user_id(&self) -> &UserId {
        match self {
            Self::Text { user_id, .. }
            | Self::Voicemail { user_id, .. }
            | Self::FileRef { user_id, .. } => user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kanalnamen() {
        assert!(kanalname_pruefen("general").is_ok());
        assert!(kanalname_pruefen("team-1.b_x").is_ok());
        assert!(kanalname_pruefen("").is_err());
        assert!(kanalname_pruefen("..").is_err());
        assert!(kanalname_pruefen("a/b").is_err());
        assert!(kanalname_pruefen("mit leerzeichen").is_err());
    }

    #[test]
    fn verlauf_ist_selbstbeschreibend() {
        // Trennzeichen im Dateinamen duerfen das Format nicht brechen
        let eintrag = VerlaufEintrag::FileRef {
            time: Utc::now(),
            user_id: UserId::from("u1"),
            file_id: "101".into(),
            filename: "a, Name: b].txt".into(),
            extension: Some(".txt".into()),
            size: 12,
        };
        let json = serde_json::to_string(&eintrag).unwrap();
        assert!(json.contains("\"kind\":\"file_ref\""));
        let zurueck: VerlaufEintrag = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, eintrag);
        assert_eq!(zurueck.user_id().as_str(), "u1");
    }
}
