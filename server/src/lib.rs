//! plauderei-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;
pub mod konsole;

use anyhow::{Context, Result};
use config::{ServerConfig, StoreBackend};
use plauderei_auth::PasswortHasher;
use plauderei_chat::{DiskStorage, MedienDienst};
use plauderei_db::{DateiStore, MemoryStore, VerlaufEintrag};
use plauderei_signaling::server_state::{store_teilen, GeteilterStore};
use plauderei_signaling::{SignalingConfig, SignalingServer, SignalingState};
use plauderei_voice::{PcmCodec, VoicePipelineConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Store oeffnen, Hasher und Anhang-Ablage aufbauen
    /// 2. TCP-Listener binden
    /// 3. Konsole starten (optional)
    /// 4. Auf Ctrl-C warten, dann alle Sessions beenden
    pub async fn starten(self) -> Result<()> {
        let state = zustand_aufbauen(&self.config)?;
        let bind_addr = self.config.tcp_bind_adresse()?;

        let server = SignalingServer::binden(Arc::clone(&state), bind_addr)
            .await
            .with_context(|| format!("TCP-Listener auf {bind_addr} konnte nicht gebunden werden"))?;

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %server.lokale_adresse()?,
            backend = ?self.config.speicher.backend,
            verzeichnis = %self.config.speicher.verzeichnis.display(),
            "Server startet"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        if self.config.konsole.aktiviert {
            let konsolen_state = Arc::clone(&state);
            let rx = shutdown_rx.clone();
            tokio::spawn(async move {
                let eingabe = tokio::io::BufReader::new(tokio::io::stdin());
                if let Err(e) =
                    konsole::konsole_ausfuehren(konsolen_state, eingabe, tokio::io::stdout(), rx).await
                {
                    tracing::warn!(fehler = %e, "Konsole beendet");
                }
            });
        }

        let signaling = tokio::spawn(server.starten(shutdown_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
        // Fehler nur wenn alle Empfaenger schon weg sind
        let _ = shutdown_tx.send(true);

        signaling.await.context("Signaling-Task abgebrochen")??;
        Ok(())
    }
}

/// Baut den gemeinsamen Zustand aus der Konfiguration auf
pub fn zustand_aufbauen(config: &ServerConfig) -> Result<Arc<SignalingState>> {
    let store = store_oeffnen(config)?;

    let hasher = PasswortHasher::neu(
        &config.auth.salt,
        config.auth.speicher_kib,
        config.auth.iterationen,
    )
    .context("Passwort-Hasher konnte nicht erstellt werden")?;

    let medien = Arc::new(MedienDienst::neu(
        Arc::new(DiskStorage::new(&config.speicher.verzeichnis)),
        config.protokoll.max_anhang,
    ));
    // Vorhandene Anhaenge nicht ueberschreiben
    if let Some(hoechste) = hoechste_anhang_id(&store)? {
        medien.ids_fortsetzen_ab(hoechste + 1);
    }

    let signaling_config = SignalingConfig {
        max_clients: config.server.max_clients,
        max_frame_groesse: config.protokoll.max_frame_groesse,
        sende_queue: config.protokoll.sende_queue,
    };
    let voice_config = VoicePipelineConfig {
        puffer_kapazitaet: config.voice.puffer_kapazitaet,
        eingangs_queue: config.voice.eingangs_queue,
        misch_fenster: Duration::from_millis(config.voice.misch_fenster_ms),
    };

    Ok(SignalingState::neu(
        signaling_config,
        store,
        hasher,
        medien,
        voice_config,
        Arc::new(PcmCodec),
    ))
}

fn store_oeffnen(config: &ServerConfig) -> Result<GeteilterStore> {
    let store = match config.speicher.backend {
        StoreBackend::Memory => store_teilen(MemoryStore::neu()),
        StoreBackend::Datei => {
            let pfad = &config.speicher.verzeichnis;
            let datei_store = DateiStore::oeffnen(pfad)
                .with_context(|| format!("Store in '{}' konnte nicht geoeffnet werden", pfad.display()))?;
            store_teilen(datei_store)
        }
    };
    Ok(store)
}

/// Hoechste Voicemail- oder Datei-ID im gesamten Verlauf
fn hoechste_anhang_id(store: &GeteilterStore) -> Result<Option<u64>> {
    let store = store.lock();
    let mut hoechste = None;
    for kanal in store.list_channels()? {
        for eintrag in store.get_channel_history(&kanal)? {
            let id = match &eintrag {
                VerlaufEintrag::Voicemail { voicemail_id, .. } => voicemail_id,
                VerlaufEintrag::FileRef { file_id, .. } => file_id,
                VerlaufEintrag::Text { .. } => continue,
            };
            if let Ok(id) = id.parse::<u64>() {
                hoechste = hoechste.max(Some(id));
            }
        }
    }
    Ok(hoechste)
}
