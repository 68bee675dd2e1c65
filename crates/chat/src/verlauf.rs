//! Darstellung des Kanalverlaufs
//!
//! Nicknames werden erst beim Lesen aufgeloest, eine spaetere Umbenennung
//! wirkt also auch auf alte Eintraege. Unbekannte IDs erscheinen roh.

use plauderei_core::UserId;
use plauderei_db::{BenutzerRecord, VerlaufEintrag};
use std::collections::HashMap;
use std::fmt::Write;

const ZEITFORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rendert den Verlauf als eine Zeile pro Eintrag
pub fn verlauf_rendern(
    eintraege: &[VerlaufEintrag],
    benutzer: &[BenutzerRecord],
    zeit_anzeigen: bool,
) -> String {
    let nicknames: HashMap<&UserId, &str> = benutzer
        .iter()
        .map(|b| (&b.id, b.nickname.as_str()))
        .collect();

    let mut ausgabe = String::new();
    for (i, eintrag) in eintraege.iter().enumerate() {
        if i > 0 {
            ausgabe.push('\n');
        }
        if zeit_anzeigen {
            let _ = write!(ausgabe, "[{}] ", eintrag.time().format(ZEITFORMAT));
        }

        let user_id = eintrag.user_id();
        let nickname = nicknames.get(user_id).copied().unwrap_or_else(|| {
            tracing::debug!(user_id = %user_id, "Benutzer fuer Verlaufseintrag unbekannt");
            user_id.as_str()
        });
        let _ = write!(ausgabe, "{nickname}: ");

        match eintrag {
            VerlaufEintrag::Text { message, .. } => ausgabe.push_str(message),
            VerlaufEintrag::Voicemail {
                voicemail_id,
                duration,
                ..
            } => {
                let _ = write!(
                    ausgabe,
                    "[Voicemail_ID: {voicemail_id}, Duration: {}]",
                    dauer_formatieren(*duration)
                );
            }
            VerlaufEintrag::FileRef {
                file_id,
                filename,
                extension,
                size,
                ..
            } => {
                let _ = write!(ausgabe, "[File_ID: {file_id}, Name: {filename}");
                if let Some(ext) = extension.as_deref().filter(|e| !e.is_empty()) {
                    let _ = write!(ausgabe, ", Extension: {ext}");
                }
                let _ = write!(ausgabe, ", Size: {size} bytes]");
            }
        }
    }
    ausgabe
}

/// Formatiert Sekunden als `MM:SS`
pub fn dauer_formatieren(sekunden: f64) -> String {
    let ganz = if sekunden.is_finite() && sekunden > 0.0 {
        sekunden as u64
    } else {
        0
    };
    format!("{:02}:{:02}", ganz / 60, ganz % 60)
}
