//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt alle geteilten Dienste als Arc-Referenzen, die sicher zwischen
//! tokio-Tasks geteilt werden koennen.

use parking_lot::Mutex;
use plauderei_auth::PasswortHasher;
use plauderei_chat::{DiskStorage, MedienDienst};
use plauderei_core::UserId;
use plauderei_db::Store;
use plauderei_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use plauderei_protocol::Frame;
use plauderei_voice::{MixAusgabe, VoiceCodec, VoicePipeline, VoicePipelineConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::broadcast::{Broadcaster, STANDARD_SENDE_QUEUE};

/// Store hinter einer einzigen groben Sperre
///
/// Jede Folge "lesen, dann schreiben" muss die Sperre durchgehend halten.
/// Die Sperre wird nie ueber einen `.await` hinweg gehalten. Der
/// `DateiStore` schreibt darunter synchron, ein Aufruf blockiert den
/// Worker also fuer die Dauer eines kleinen Datei-Schreibvorgangs.
pub type GeteilterStore = Arc<Mutex<Box<dyn Store>>>;

/// Verpackt einen Store fuer die gemeinsame Nutzung
pub fn store_teilen(store: impl Store + 'static) -> GeteilterStore {
    Arc::new(Mutex::new(Box::new(store)))
}

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale gleichzeitige Verbindungen
    pub max_clients: u32,
    /// Obergrenze fuer den Body eines Frames
    pub max_frame_groesse: usize,
    /// Groesse der ausgehenden Queue pro Verbindung
    pub sende_queue: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_clients: 512,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
            sende_queue: STANDARD_SENDE_QUEUE,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Benutzer, Kanaele, Mitgliedschaften und Verlauf
    pub store: GeteilterStore,
    /// Live-Index der freigeschalteten Verbindungen
    pub broadcaster: Broadcaster,
    /// Mixer-Tasks pro Kanal
    pub voice: VoicePipeline,
    /// Voicemail- und Dateiablage
    pub medien: Arc<MedienDienst<DiskStorage>>,
    /// Passwort-Hashing mit festem Salt
    pub hasher: PasswortHasher,
    /// Anzahl offener Verbindungen
    aktive_verbindungen: AtomicUsize,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(
        config: SignalingConfig,
        store: GeteilterStore,
        hasher: PasswortHasher,
        medien: Arc<MedienDienst<DiskStorage>>,
        voice_config: VoicePipelineConfig,
        codec: Arc<dyn VoiceCodec>,
    ) -> Arc<Self> {
        let broadcaster = Broadcaster::neu();
        let ausgabe = Arc::new(KanalAusgabe {
            store: Arc::clone(&store),
            broadcaster: broadcaster.clone(),
        });
        let voice = VoicePipeline::neu(voice_config, codec, ausgabe);

        Arc::new(Self {
            config: Arc::new(config),
            store,
            broadcaster,
            voice,
            medien,
            hasher,
            aktive_verbindungen: AtomicUsize::new(0),
        })
    }

    /// Anzahl offener Verbindungen
    pub fn aktive_verbindungen(&self) -> usize {
        self.aktive_verbindungen.load(Ordering::Relaxed)
    }

    pub(crate) fn verbindung_beginnt(&self) {
        self.aktive_verbindungen.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn verbindung_endet(&self) {
        self.aktive_verbindungen.fetch_sub(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Mix-Ausgabe
// ---------------------------------------------------------------------------

/// Liefert gemischte Voice-Frames an die Mitglieder eines Kanals
struct KanalAusgabe {
    store: GeteilterStore,
    broadcaster: Broadcaster,
}

impl MixAusgabe for KanalAusgabe {
    fn ausliefern(&self, kanal: &str, sprecher: &[UserId], frame: Frame) {
        let mitglieder = match self.store.lock().get_channel_members(kanal) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(kanal, fehler = %e, "Voice-Frame ohne Kanal verworfen");
                return;
            }
        };
        self.broadcaster
            .an_mitglieder_senden(&mitglieder, sprecher, frame);
    }

    fn an_sprecher(&self, kanal: &str, sprecher: &UserId, frame: Frame) {
        // Wer inzwischen ausgetreten ist, bekommt nichts mehr
        if !self.store.lock().is_member(kanal, sprecher).unwrap_or(false) {
            return;
        }
        self.broadcaster.an_user_senden(sprecher, frame);
    }
}
