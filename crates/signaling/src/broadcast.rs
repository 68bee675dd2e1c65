//! Broadcaster – Verteilt Frames an verbundene Clients
//!
//! Der Broadcaster ist der Live-Index `UserId -> Send-Queue`. Eine
//! Verbindung wird nach erfolgreichem ID-Handshake registriert. Die Queue
//! wird ausschliesslich vom Task der Verbindung geleert, sodass pro Socket
//! immer nur ein Schreiber existiert.
//!
//! Kanal-Mitglieder kommen aus dem Store; der Broadcaster bildet sie nur
//! auf die aktuell verbundenen Clients ab. Fehlschlaege einzelner
//! Empfaenger werden geloggt und brechen den Versand nicht ab.

use dashmap::DashMap;
use plauderei_core::{UserId, VerbindungsId};
use plauderei_protocol::Frame;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standard-Groesse der Send-Queue pro Verbindung
pub const STANDARD_SENDE_QUEUE: usize = 256;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub user_id: UserId,
    pub verbindung: VerbindungsId,
    pub tx: mpsc::Sender<Frame>,
}

impl ClientSender {
    /// Sendet einen Frame nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, frame: Frame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    verbindung = %self.verbindung,
                    "Send-Queue voll – Frame verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    user_id = %self.user_id,
                    verbindung = %self.verbindung,
                    "Send-Queue geschlossen (Client getrennt)"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Broadcaster
// ---------------------------------------------------------------------------

/// Zentraler Broadcaster fuer alle freigeschalteten Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<BroadcasterInner>,
}

struct BroadcasterInner {
    /// Client-Sender, indiziert nach UserId
    clients: DashMap<UserId, ClientSender>,
}

impl Broadcaster {
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(BroadcasterInner {
                clients: DashMap::new(),
            }),
        }
    }

    /// Registriert eine Verbindung; eine aeltere Verbindung desselben
    /// Benutzers wird ersetzt
    pub fn client_registrieren(&self, sender: ClientSender) {
        let user_id = sender.user_id.clone();
        let verbindung = sender.verbindung;
        if let Some(alt) = self.inner.clients.insert(user_id.clone(), sender) {
            tracing::info!(
                user_id = %user_id,
                alt = %alt.verbindung,
                neu = %verbindung,
                "Aeltere Verbindung im Broadcaster ersetzt"
            );
        }
        tracing::debug!(user_id = %user_id, verbindung = %verbindung, "Client im Broadcaster registriert");
    }

    /// Entfernt eine Verbindung, sofern sie noch die registrierte ist
    pub fn client_entfernen(&self, user_id: &UserId, verbindung: VerbindungsId) -> bool {
        let entfernt = self
            .inner
            .clients
            .remove_if(user_id, |_, s| s.verbindung == verbindung)
            .is_some();
        if entfernt {
            tracing::debug!(user_id = %user_id, verbindung = %verbindung, "Client aus Broadcaster entfernt");
        }
        entfernt
    }

    /// Sendet einen Frame an einen einzelnen Benutzer
    ///
    /// Gibt `true` zurueck wenn der Benutzer verbunden ist und der Frame
    /// eingereiht wurde.
    pub fn an_user_senden(&self, user_id: &UserId, frame: Frame) -> bool {
        match self.inner.clients.get(user_id) {
            Some(sender) => sender.senden(frame),
            None => {
                tracing::debug!(user_id = %user_id, "Senden an nicht verbundenen Benutzer");
                false
            }
        }
    }

    /// Sendet einen Frame an alle verbundenen Mitglieder
    ///
    /// Benutzer in `ausser` werden uebersprungen. Gibt die Anzahl der
    /// erfolgreichen Sendungen zurueck.
    pub fn an_mitglieder_senden<'a>(
        &self,
        mitglieder: impl IntoIterator<Item = &'a UserId>,
        ausser: &[UserId],
        frame: Frame,
    ) -> usize {
        let mut gesendet = 0;
        for user_id in mitglieder {
            if ausser.contains(user_id) {
                continue;
            }
            // Nicht verbundene Mitglieder werden still uebersprungen
            if let Some(sender) = self.inner.clients.get(user_id) {
                if sender.senden(frame.clone()) {
                    gesendet += 1;
                }
            }
        }
        gesendet
    }

    /// Anzahl registrierter Verbindungen
    pub fn client_anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    /// Prueft ob ein Benutzer verbunden und freigeschaltet ist
    pub fn ist_online(&self, user_id: &UserId) -> bool {
        self.inner.clients.contains_key(user_id)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
