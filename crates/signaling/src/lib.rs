//! plauderei-signaling – Session- und Protokoll-Engine
//!
//! Dieser Crate verwaltet die TCP-Verbindungen des Plauderei-Servers:
//! Anmeldung und Registrierung, Befehlsverarbeitung, Anhaenge,
//! Voice-Einspeisung und das Verteilen von Frames an Kanal-Mitglieder.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task, ein Schreiber pro Socket)
//!     |  Session: WartetAufLogin -> WartetAufPasswort -> (WartetAufNickname) -> Autorisiert
//!     |           + ID-Handshake (CHECK_ID / ID / ID_CORRECT) schaltet Befehle frei
//!     v
//! Dispatcher (nach DataType und Flag)
//!     |
//!     +-- handshake   (LOGIN_*, PASSWORD_*, NICK, CHECK_ID, ID)
//!     +-- befehle     (/join, /exit, /send, /read, /nick, ...)
//!     +-- anhang      (AUDIO, FILE)
//!     +-- VoicePipeline (VOICE)
//!
//! Broadcaster – Live-Index UserId -> Send-Queue der Verbindung
//! ```

pub mod anhang;
pub mod befehle;
pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod handshake;
pub mod kanal_admin;
pub mod server_state;
pub mod session;
pub mod tcp;

// Bequeme Re-Exporte
pub use broadcast::{Broadcaster, ClientSender};
pub use connection::ClientConnection;
pub use server_state::{GeteilterStore, SignalingConfig, SignalingState};
pub use session::{AuthPhase, Session};
pub use tcp::SignalingServer;
