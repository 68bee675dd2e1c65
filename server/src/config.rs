//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use plauderei_auth::password::STANDARD_SALT;
use plauderei_core::PlaudereiError;
use plauderei_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use plauderei_signaling::broadcast::STANDARD_SENDE_QUEUE;
use plauderei_voice::codec::{ANZAHL_KANAELE, FRAMES_PER_BUFFER, SAMPLE_RATE};
use plauderei_voice::jitter_buffer::STANDARD_KAPAZITAET;
use plauderei_voice::pipeline::{STANDARD_EINGANGS_QUEUE, STANDARD_MISCH_FENSTER};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Ablage von Benutzern, Kanaelen und Anhaengen
    pub speicher: SpeicherEinstellungen,
    /// Frame- und Anhang-Grenzen
    pub protokoll: ProtokollEinstellungen,
    /// Passwort-Hashing
    pub auth: AuthEinstellungen,
    /// Voice-Mixing
    pub voice: VoiceEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Betreiber-Konsole auf stdin
    pub konsole: KonsolenEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Clients
    pub max_clients: u32,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Plauderei Server".into(),
            max_clients: 512,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer die TCP-Verbindung
    pub bind_adresse: String,
    /// Port fuer die TCP-Verbindung
    pub tcp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 8080,
        }
    }
}

/// Store-Backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Nur im Speicher, geht beim Neustart verloren
    Memory,
    /// JSON-Dateien im Datenverzeichnis
    #[default]
    Datei,
}

/// Speicher-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeicherEinstellungen {
    /// Datenverzeichnis (Store-Dateien, `audio/`, `files/`)
    pub verzeichnis: PathBuf,
    pub backend: StoreBackend,
}

impl Default for SpeicherEinstellungen {
    fn default() -> Self {
        Self {
            verzeichnis: PathBuf::from("data"),
            backend: StoreBackend::Datei,
        }
    }
}

/// Protokoll-Grenzen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtokollEinstellungen {
    /// Maximale Body-Groesse eines Frames in Bytes
    pub max_frame_groesse: usize,
    /// Maximale Groesse eines Anhangs in Bytes
    pub max_anhang: usize,
    /// Ausgehende Queue pro Verbindung (Frames)
    pub sende_queue: usize,
}

impl Default for ProtokollEinstellungen {
    fn default() -> Self {
        Self {
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
            max_anhang: plauderei_chat::media::STANDARD_MAX_ANHANG,
            sende_queue: STANDARD_SENDE_QUEUE,
        }
    }
}

/// Passwort-Hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthEinstellungen {
    /// Fester Salt fuer alle Passwoerter
    pub salt: String,
    /// Argon2 m_cost in KiB
    pub speicher_kib: u32,
    /// Argon2 t_cost
    pub iterationen: u32,
}

impl Default for AuthEinstellungen {
    fn default() -> Self {
        Self {
            salt: STANDARD_SALT.into(),
            speicher_kib: 19 * 1024,
            iterationen: 2,
        }
    }
}

/// Voice-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceEinstellungen {
    pub sample_rate: u32,
    pub frames_per_buffer: usize,
    pub kanaele: usize,
    /// Pakete pro Jitter Buffer
    pub puffer_kapazitaet: usize,
    /// Eingangs-Queue pro Kanal-Mixer
    pub eingangs_queue: usize,
    /// Wartezeit auf fehlende Sprecher vor einer Mischrunde
    pub misch_fenster_ms: u64,
}

impl Default for VoiceEinstellungen {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            frames_per_buffer: FRAMES_PER_BUFFER,
            kanaele: ANZAHL_KANAELE,
            puffer_kapazitaet: STANDARD_KAPAZITAET,
            eingangs_queue: STANDARD_EINGANGS_QUEUE,
            misch_fenster_ms: STANDARD_MISCH_FENSTER.as_millis() as u64,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Filter-Ausdruck, z.B. "info" oder "plauderei_signaling=debug"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Betreiber-Konsole
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KonsolenEinstellungen {
    pub aktiviert: bool,
}

impl Default for KonsolenEinstellungen {
    fn default() -> Self {
        Self { aktiviert: true }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config: Self = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        config.pruefen()?;
        Ok(config)
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn pruefen(&self) -> Result<(), PlaudereiError> {
        let fehler = |msg: String| Err(PlaudereiError::Konfiguration(msg));

        if self.server.max_clients == 0 {
            return fehler("server.max_clients muss groesser als 0 sein".into());
        }
        if self.protokoll.max_anhang > self.protokoll.max_frame_groesse {
            return fehler(format!(
                "protokoll.max_anhang ({}) ueberschreitet max_frame_groesse ({})",
                self.protokoll.max_anhang, self.protokoll.max_frame_groesse
            ));
        }
        // Der mitgelieferte Codec arbeitet mit festem Frame-Format
        let v = &self.voice;
        if (v.sample_rate, v.frames_per_buffer, v.kanaele) != (SAMPLE_RATE, FRAMES_PER_BUFFER, ANZAHL_KANAELE) {
            return fehler(format!(
                "voice: nur {SAMPLE_RATE} Hz, {FRAMES_PER_BUFFER} Frames, {ANZAHL_KANAELE} Kanaele unterstuetzt"
            ));
        }
        if v.misch_fenster_ms == 0 {
            return fehler("voice.misch_fenster_ms muss groesser als 0 sein".into());
        }
        self.tcp_bind_adresse()?;
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> Result<SocketAddr, PlaudereiError> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port);
        adresse
            .parse()
            .map_err(|e| PlaudereiError::Konfiguration(format!("Bind-Adresse '{adresse}': {e}")))
    }
}
