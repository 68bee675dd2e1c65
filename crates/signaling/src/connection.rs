//! Client-Connection – Verwaltet eine einzelne Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Der Task ist der einzige Schreiber auf dem Socket: direkte
//! Antworten gehen sofort raus, Broadcasts und Voice-Frames anderer Tasks
//! kommen ueber die Send-Queue der Session.
//!
//! ## Ablauf
//! ```text
//! Frame lesen -> Dispatcher -> Antworten schreiben
//!      ^                              |
//!      +------------------------------+
//! Send-Queue -> schreiben (Broadcast, Mix, Kanal-Loeschung)
//! ```

use futures_util::{SinkExt, StreamExt};
use plauderei_protocol::{wire::FrameCodec, Frame};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::Framed;

use crate::dispatcher::{MessageDispatcher, Reaktion};
use crate::server_state::SignalingState;
use crate::session::Session;

/// Verarbeitet eine einzelne Verbindung
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    pub fn neu(state: Arc<SignalingState>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, ein Protokollfehler auftritt, der
    /// Client `/connect` sendet oder das Shutdown-Signal kommt.
    pub async fn verarbeiten<S>(self, stream: S, mut shutdown_rx: watch::Receiver<bool>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let peer_addr = self.peer_addr;
        let mut framed = Framed::new(
            stream,
            FrameCodec::with_max_size(self.state.config.max_frame_groesse),
        );

        let (sende_tx, mut sende_rx) = mpsc::channel::<Frame>(self.state.config.sende_queue.max(1));
        let mut session = Session::neu(peer_addr, sende_tx);
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        self.state.verbindung_beginnt();
        tracing::info!(peer = %peer_addr, verbindung = %session.verbindung, "Neue Verbindung");

        if *shutdown_rx.borrow() {
            tracing::debug!(peer = %peer_addr, "Shutdown bereits aktiv");
        } else {
            loop {
                tokio::select! {
                    // Eingehender Frame vom Client
                    frame = framed.next() => {
                        let frame = match frame {
                            Some(Ok(f)) => f,
                            Some(Err(e)) if e.ist_verbindungsende() => {
                                tracing::warn!(peer = %peer_addr, fehler = %e, "Frame-Lesefehler");
                                break;
                            }
                            Some(Err(e)) => {
                                tracing::warn!(peer = %peer_addr, fehler = %e, "Frame-Lesefehler, Verbindung bleibt offen");
                                continue;
                            }
                            None => {
                                tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                                break;
                            }
                        };
                        tracing::trace!(
                            peer = %peer_addr,
                            typ = ?frame.typ,
                            flag = ?frame.flag,
                            groesse = frame.groesse(),
                            "Frame empfangen"
                        );

                        match dispatcher.dispatch(frame, &mut session).await {
                            Reaktion::Antworten(antworten) => {
                                if !antworten_senden(&mut framed, antworten, peer_addr).await {
                                    break;
                                }
                            }
                            Reaktion::Trennen => {
                                tracing::info!(peer = %peer_addr, "Verbindung wird serverseitig geschlossen");
                                break;
                            }
                        }
                    }

                    // Ausgehender Frame aus Broadcast oder Mixer
                    Some(ausgehend) = sende_rx.recv() => {
                        if let Err(e) = framed.send(ausgehend).await {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Broadcast-Senden fehlgeschlagen");
                            if e.ist_verbindungsende() {
                                break;
                            }
                        }
                    }

                    // Shutdown-Signal
                    Ok(()) = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                            break;
                        }
                    }
                }
            }
        }

        self.aufraeumen(&session);
        tracing::info!(peer = %peer_addr, "Verbindungs-Task beendet");
    }

    /// Entfernt Live-Registrierung und Jitter-Buffer der Verbindung
    fn aufraeumen(&self, session: &Session) {
        if let Some(user_id) = &session.user_id {
            if self.state.broadcaster.client_entfernen(user_id, session.verbindung) {
                tracing::debug!(user_id = %user_id, "Live-Registrierung entfernt");
            }
        }
        self.state.voice.verbindung_entfernen(session.verbindung);
        self.state.verbindung_endet();
    }
}

async fn antworten_senden<S>(
    framed: &mut Framed<S, FrameCodec>,
    antworten: Vec<Frame>,
    peer_addr: SocketAddr,
) -> bool
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    for antwort in antworten {
        if let Err(e) = framed.send(antwort).await {
            tracing::warn!(peer = %peer_addr, fehler = %e, "Senden fehlgeschlagen");
            if e.ist_verbindungsende() {
                return false;
            }
        }
    }
    true
}
