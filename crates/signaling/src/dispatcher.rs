//! Message-Dispatcher – Routet eingehende Frames an die richtigen Handler
//!
//! ## Routing
//! - `TEXT` + `COMMAND`: Textbefehl (nur nach abgeschlossenem ID-Handshake)
//! - `TEXT` + andere Flags: Anmeldung, Registrierung, ID-Handshake, `CHANNEL`
//! - `AUDIO` / `FILE`: Voicemail- und Datei-Upload (freigeschaltet)
//! - `VOICE`: Einspeisung in den Mixer des Kanals (freigeschaltet, Mitglied)
//! - `NUMBER`: wird ignoriert

use chrono::Utc;
use plauderei_core::PlaudereiError;
use plauderei_protocol::body::{AudioUpload, DateiUpload, VoiceBody};
use plauderei_protocol::{DataType, Flag, Frame};
use plauderei_voice::VoiceEintrag;
use std::sync::Arc;

use crate::anhang;
use crate::befehle::{self, BefehlsErgebnis, BefehlsKontext, SERVERFEHLER};
use crate::handshake;
use crate::server_state::SignalingState;
use crate::session::Session;

/// Was die Verbindung nach einem Frame tun soll
#[derive(Debug, PartialEq)]
pub enum Reaktion {
    /// Antworten in dieser Reihenfolge an den Absender schicken
    Antworten(Vec<Frame>),
    /// Verbindung schliessen
    Trennen,
}

impl Reaktion {
    fn keine() -> Self {
        Self::Antworten(Vec::new())
    }
}

/// Zentraler Frame-Dispatcher einer Verbindung
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet einen eingehenden Frame
    pub async fn dispatch(&self, frame: Frame, session: &mut Session) -> Reaktion {
        match frame.typ {
            DataType::Text => self.text(frame, session).await,
            DataType::Number => {
                tracing::debug!(verbindung = %session.verbindung, "NUMBER-Frame ignoriert");
                Reaktion::keine()
            }
            DataType::Audio => self.audio(frame, session).await,
            DataType::File => self.datei(frame, session).await,
            DataType::Voice => self.voice(frame, session),
        }
    }

    async fn text(&self, frame: Frame, session: &mut Session) -> Reaktion {
        let inhalt = frame.text_inhalt();
        if frame.flag != Flag::Command {
            let antworten = handshake::verarbeiten(&self.state, session, frame.flag, inhalt.trim()).await;
            return Reaktion::Antworten(antworten);
        }
        if !freigeschaltet(session, "Befehl") {
            return Reaktion::keine();
        }
        let Some(user_id) = session.user_id.clone() else {
            return Reaktion::keine();
        };

        let ergebnis = {
            let mut store = self.state.store.lock();
            let mut ctx = BefehlsKontext {
                user_id: &user_id,
                nickname: session.nickname.get_or_insert_with(String::new),
                zeit_anzeigen: &mut session.zeit_anzeigen,
            };
            befehle::ausfuehren(&inhalt, &mut **store, &mut ctx)
        };

        match ergebnis {
            Ok(BefehlsErgebnis::Antwort(antwort)) => Reaktion::Antworten(vec![antwort]),
            Ok(BefehlsErgebnis::Voicemail(id)) => {
                Reaktion::Antworten(vec![anhang::voicemail_senden(&self.state, &user_id, &id).await])
            }
            Ok(BefehlsErgebnis::Trennen) => Reaktion::Trennen,
            Err(e) => {
                let fehler = PlaudereiError::from(e);
                tracing::error!(user_id = %user_id, fehler = %fehler, "Befehl fehlgeschlagen");
                Reaktion::Antworten(vec![Frame::text(Flag::Command, SERVERFEHLER)])
            }
        }
    }

    async fn audio(&self, frame: Frame, session: &mut Session) -> Reaktion {
        let Some(user_id) = session.freigeschaltete_id().cloned() else {
            freigeschaltet(session, "AUDIO");
            return Reaktion::keine();
        };
        match AudioUpload::parsen(&frame.body) {
            Ok(upload) => Reaktion::Antworten(anhang::audio_verarbeiten(&self.state, &user_id, upload).await),
            Err(e) => protokollfehler(session, e),
        }
    }

    async fn datei(&self, frame: Frame, session: &mut Session) -> Reaktion {
        let Some(user_id) = session.freigeschaltete_id().cloned() else {
            freigeschaltet(session, "FILE");
            return Reaktion::keine();
        };
        match DateiUpload::parsen(&frame.body) {
            Ok(upload) => Reaktion::Antworten(anhang::datei_verarbeiten(&self.state, &user_id, upload).await),
            Err(e) => protokollfehler(session, e),
        }
    }

    fn voice(&self, frame: Frame, session: &mut Session) -> Reaktion {
        let Some(user_id) = session.freigeschaltete_id().cloned() else {
            freigeschaltet(session, "VOICE");
            return Reaktion::keine();
        };
        let paket = match VoiceBody::parsen(&frame.body) {
            Ok(p) => p,
            Err(e) => return protokollfehler(session, e),
        };

        let timestamp_ms = paket
            .timestamp_ms
            .unwrap_or_else(|| Utc::now().timestamp_millis().max(0) as u64);

        // Sperre bis nach dem Einspeisen halten, sonst kann ein parallel
        // geloeschter Kanal einen neuen Mixer bekommen
        let store = self.state.store.lock();
        if !matches!(store.is_member(&paket.kanal, &user_id), Ok(true)) {
            tracing::debug!(user_id = %user_id, kanal = %paket.kanal, "VOICE ohne Mitgliedschaft verworfen");
            return Reaktion::keine();
        }
        self.state.voice.paket_einspeisen(
            &paket.kanal,
            session.verbindung,
            user_id,
            VoiceEintrag::neu(timestamp_ms, paket.payload),
        );
        drop(store);
        Reaktion::keine()
    }
}

/// Prueft die Freischaltung und loggt Verstoesse
fn freigeschaltet(session: &Session, was: &str) -> bool {
    if session.freigeschaltete_id().is_some() {
        return true;
    }
    tracing::warn!(
        verbindung = %session.verbindung,
        peer = %session.peer,
        was,
        fehler = %PlaudereiError::NichtAutorisiert,
        "Frame vor dem ID-Handshake ignoriert"
    );
    false
}

fn protokollfehler(session: &Session, fehler: PlaudereiError) -> Reaktion {
    tracing::warn!(verbindung = %session.verbindung, peer = %session.peer, fehler = %fehler, "Fehlerhafter Body");
    if fehler.ist_verbindungsende() {
        Reaktion::Trennen
    } else {
        Reaktion::keine()
    }
}
