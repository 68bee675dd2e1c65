//! AUDIO- und FILE-Frames: Voicemails und Datei-Anhaenge
//!
//! Die Bytes werden ausserhalb der Store-Sperre geschrieben. Der Verlaufs-
//! eintrag folgt danach unter der Sperre, nachdem die Mitgliedschaft noch
//! einmal geprueft wurde.

use chrono::Utc;
use plauderei_chat::ChatError;
use plauderei_core::UserId;
use plauderei_db::VerlaufEintrag;
use plauderei_protocol::body::{AudioAntwort, AudioUpload, DateiUpload};
use plauderei_protocol::{DataType, Flag, Frame};

use crate::befehle::KEIN_ZUGRIFF;
use crate::server_state::SignalingState;

/// Antwort auf eine fehlende Voicemail
pub fn voicemail_fehlt() -> Frame {
    Frame::leer(DataType::Audio, Flag::AudiofileError)
}

fn datei_abgelehnt(grund: &str) -> Frame {
    Frame::text(Flag::FileError, format!("File rejected: {grund}"))
}

/// Verarbeitet eine hochgeladene Voicemail
pub async fn audio_verarbeiten(state: &SignalingState, user_id: &UserId, upload: AudioUpload) -> Vec<Frame> {
    if upload.user_id != user_id.as_str() {
        tracing::debug!(user_id = %user_id, angegeben = %upload.user_id, "Abweichende ID im AUDIO-Frame");
    }
    if !mitglied(state, &upload.kanal, user_id) {
        tracing::info!(user_id = %user_id, kanal = %upload.kanal, "Voicemail ohne Kanalzugriff");
        return vec![Frame::text(Flag::AudiofileError, KEIN_ZUGRIFF)];
    }

    let voicemail = match state.medien.voicemail_speichern(&upload.daten).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(user_id = %user_id, kanal = %upload.kanal, fehler = %e, "Voicemail nicht gespeichert");
            return vec![voicemail_fehlt()];
        }
    };

    let eintrag = VerlaufEintrag::Voicemail {
        time: Utc::now(),
        user_id: user_id.clone(),
        voicemail_id: voicemail.id.clone(),
        duration: voicemail.dauer_sek,
    };
    if let Err(antwort) = verlauf_anhaengen(state, &upload.kanal, user_id, eintrag) {
        return vec![Frame::text(Flag::AudiofileError, antwort)];
    }

    tracing::info!(
        user_id = %user_id,
        kanal = %upload.kanal,
        voicemail_id = %voicemail.id,
        dateiname = %upload.dateiname,
        "Voicemail im Verlauf"
    );
    Vec::new()
}

/// Verarbeitet einen Datei-Anhang
pub async fn datei_verarbeiten(state: &SignalingState, user_id: &UserId, upload: DateiUpload) -> Vec<Frame> {
    if !mitglied(state, &upload.kanal, user_id) {
        tracing::info!(user_id = %user_id, kanal = %upload.kanal, "Datei ohne Kanalzugriff");
        return vec![Frame::text(Flag::FileError, KEIN_ZUGRIFF)];
    }

    let datei = match state.medien.datei_speichern(&upload.dateiname, &upload.daten).await {
        Ok(d) => d,
        Err(e) => {
            tracing::info!(user_id = %user_id, dateiname = %upload.dateiname, fehler = %e, "Datei abgelehnt");
            let grund = match e {
                ChatError::EndungNichtErlaubt(_) => "extension not allowed".to_string(),
                ChatError::DateiZuGross { max, .. } => format!("file too large (max {max} bytes)"),
                _ => "server error".to_string(),
            };
            return vec![datei_abgelehnt(&grund)];
        }
    };

    let eintrag = VerlaufEintrag::FileRef {
        time: Utc::now(),
        user_id: user_id.clone(),
        file_id: datei.id.clone(),
        filename: upload.dateiname.clone(),
        extension: datei.endung.clone(),
        size: datei.groesse,
    };
    if let Err(antwort) = verlauf_anhaengen(state, &upload.kanal, user_id, eintrag) {
        return vec![Frame::text(Flag::FileError, antwort)];
    }

    tracing::info!(user_id = %user_id, kanal = %upload.kanal, file_id = %datei.id, "Datei im Verlauf");
    Vec::new()
}

/// Liefert eine gespeicherte Voicemail (`/voicemail_on <id>`)
pub async fn voicemail_senden(state: &SignalingState, user_id: &UserId, id: &str) -> Frame {
    match state.medien.voicemail_laden(id).await {
        Ok(daten) => {
            tracing::info!(user_id = %user_id, voicemail_id = id, bytes = daten.len(), "Voicemail ausgeliefert");
            let antwort = AudioAntwort {
                dateiname: format!("{id}.wav"),
                daten: daten.into(),
            };
            Frame::neu(DataType::Audio, Flag::Command, antwort.kodieren())
        }
        Err(e) => {
            tracing::info!(user_id = %user_id, voicemail_id = id, fehler = %e, "Voicemail nicht verfuegbar");
            voicemail_fehlt()
        }
    }
}

fn mitglied(state: &SignalingState, kanal: &str, user_id: &UserId) -> bool {
    let store = state.store.lock();
    matches!(store.channel_exists(kanal), Ok(true)) && matches!(store.is_member(kanal, user_id), Ok(true))
}

/// Haengt einen Eintrag an, sofern der Absender noch Mitglied ist
fn verlauf_anhaengen(
    state: &SignalingState,
    kanal: &str,
    user_id: &UserId,
    eintrag: VerlaufEintrag,
) -> Result<(), &'static str> {
    let mut store = state.store.lock();
    // Zwischen Upload und Eintrag kann der Kanal verlassen worden sein
    if !matches!(store.is_member(kanal, user_id), Ok(true)) {
        return Err(KEIN_ZUGRIFF);
    }
    store.append_history(kanal, eintrag).map_err(|e| {
        tracing::error!(kanal, fehler = %e, "Verlaufseintrag fehlgeschlagen");
        crate::befehle::SERVERFEHLER
    })
}
