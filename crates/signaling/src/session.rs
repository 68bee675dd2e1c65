//! Zustand einer einzelnen Verbindung
//!
//! ## Anmelde-Zustaende
//! ```text
//! WartetAufLogin -> WartetAufPasswort -> WartetAufNickname -> Autorisiert   (Registrierung)
//! WartetAufLogin -> WartetAufPasswort -> Autorisiert                        (Anmeldung)
//! ```
//! Erst der ID-Handshake (`CHECK_ID` -> `ID` -> `ID_CORRECT`) schaltet den
//! Befehls-Dispatcher frei.

use plauderei_core::{UserId, VerbindungsId};
use plauderei_protocol::Frame;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Ob ein akzeptierter Login zu einer Registrierung oder Anmeldung gehoert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnmeldeModus {
    Registrierung,
    Anmeldung,
}

/// Fortschritt der Anmeldung
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPhase {
    WartetAufLogin,
    WartetAufPasswort {
        login: String,
        modus: AnmeldeModus,
    },
    /// Nur bei der Registrierung
    WartetAufNickname {
        login: String,
        password_hash: String,
    },
    Autorisiert,
}

/// Zustand einer Verbindung
#[derive(Debug)]
pub struct Session {
    pub verbindung: VerbindungsId,
    pub peer: SocketAddr,
    pub phase: AuthPhase,
    pub user_id: Option<UserId>,
    pub login: Option<String>,
    pub nickname: Option<String>,
    /// Per `CHANNEL`-Flag gemerkter Kanal fuer die Registrierung
    pub ausstehender_kanal: Option<String>,
    /// `ID` wurde gesendet, Echo des Clients steht aus
    pub wartet_auf_id: bool,
    /// ID-Handshake abgeschlossen, Befehle erlaubt
    pub freigeschaltet: bool,
    /// Zeitstempel in `/read` anzeigen
    pub zeit_anzeigen: bool,
    /// Eigene Send-Queue (wird bei der Freischaltung im Broadcaster registriert)
    pub(crate) ausgang: mpsc::Sender<Frame>,
}

impl Session {
    pub fn neu(peer: SocketAddr, ausgang: mpsc::Sender<Frame>) -> Self {
        Self {
            verbindung: VerbindungsId::naechste(),
            peer,
            phase: AuthPhase::WartetAufLogin,
            user_id: None,
            login: None,
            nickname: None,
            ausstehender_kanal: None,
            wartet_auf_id: false,
            freigeschaltet: false,
            zeit_anzeigen: false,
            ausgang,
        }
    }

    pub fn ist_autorisiert(&self) -> bool {
        self.phase == AuthPhase::Autorisiert
    }

    /// Benutzer-ID, sofern der ID-Handshake abgeschlossen ist
    pub fn freigeschaltete_id(&self) -> Option<&UserId> {
        if self.freigeschaltet {
            self.user_id.as_ref()
        } else {
            None
        }
    }
}
