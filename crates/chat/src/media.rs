//! Ablage von Voicemails und Datei-Anhaengen
//!
//! Beide Arten teilen sich einen Zaehler fuer numerische IDs, der bei 100
//! beginnt. Voicemails liegen unter `audio/<id>.wav`, Dateien unter
//! `files/<id><endung>`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{ChatError, ChatResult};
use crate::storage::StorageBackend;

/// Erste vergebene Anhang-ID
pub const ERSTE_ID: u64 = 100;

/// Standard-Obergrenze fuer Anhaenge (10 MiB)
pub const STANDARD_MAX_ANHANG: usize = 10 * 1024 * 1024;

/// Erlaubte Dateiendungen (klein geschrieben, mit Punkt)
pub const ERLAUBTE_ENDUNGEN: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".pdf", ".txt", ".doc", ".docx", ".xlsx", ".zip", ".rar",
    ".mp3", ".wav", ".aac", ".flac", ".mp4", ".avi", ".mkv", ".mov",
];

const AUDIO_VERZEICHNIS: &str = "audio";
const DATEI_VERZEICHNIS: &str = "files";

// ---------------------------------------------------------------------------
// Ergebnisse
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct GespeicherteVoicemail {
    pub id: String,
    /// Dauer in Sekunden (0.0 wenn kein lesbarer WAV-Header)
    pub dauer_sek: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GespeicherteDatei {
    pub id: String,
    /// Endung inklusive Punkt, klein geschrieben
    pub endung: Option<String>,
    pub groesse: u64,
}

// ---------------------------------------------------------------------------
// MedienDienst
// ---------------------------------------------------------------------------

pub struct MedienDienst<S: StorageBackend> {
    storage: Arc<S>,
    naechste_id: AtomicU64,
    max_anhang: usize,
}

impl<S: StorageBackend> MedienDienst<S> {
    pub fn neu(storage: Arc<S>, max_anhang: usize) -> Self {
        Self {
            storage,
            naechste_id: AtomicU64::new(ERSTE_ID),
            max_anhang,
        }
    }

    /// Stellt sicher, dass keine ID unterhalb von `mindestens` vergeben wird
    ///
    /// Wird beim Start mit der hoechsten bereits im Verlauf stehenden ID + 1
    /// aufgerufen, damit vorhandene Anhaenge nicht ueberschrieben werden.
    pub fn ids_fortsetzen_ab(&self, mindestens: u64) {
        self.naechste_id.fetch_max(mindestens, Ordering::Relaxed);
    }

    pub fn max_anhang(&self) -> usize {
        self.max_anhang
    }

    fn id_vergeben(&self) -> String {
        self.naechste_id.fetch_add(1, Ordering::Relaxed).to_string()
    }

    /// Speichert eine Voicemail und ermittelt ihre Dauer
    pub async fn voicemail_speichern(&self, daten: &[u8]) -> ChatResult<GespeicherteVoicemail> {
        self.groesse_pruefen(daten.len())?;

        let id = self.id_vergeben();
        self.storage
            .store(&format!("{AUDIO_VERZEICHNIS}/{id}.wav"), daten)
            .await?;

        let dauer_sek = wav_dauer(daten);
        tracing::info!(voicemail_id = %id, bytes = daten.len(), dauer_sek, "Voicemail gespeichert");
        Ok(GespeicherteVoicemail { id, dauer_sek })
    }

    /// Laedt eine Voicemail anhand ihrer ID
    pub async fn voicemail_laden(&self, id: &str) -> ChatResult<Vec<u8>> {
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ChatError::DateiNichtGefunden(format!("Voicemail {id}")));
        }
        self.storage
            .retrieve(&format!("{AUDIO_VERZEICHNIS}/{id}.wav"))
            .await
    }

    /// Speichert einen Datei-Anhang nach Pruefung von Endung und Groesse
    pub async fn datei_speichern(&self, dateiname: &str, daten: &[u8]) -> ChatResult<GespeicherteDatei> {
        let endung = endung_von(dateiname);
        match endung.as_deref() {
            Some(e) if ERLAUBTE_ENDUNGEN.contains(&e) => {}
            andere => {
                return Err(ChatError::EndungNichtErlaubt(
                    andere.unwrap_or("(keine)").to_string(),
                ))
            }
        }
        self.groesse_pruefen(daten.len())?;

        let id = self.id_vergeben();
        let endung_str = endung.as_deref().unwrap_or_default();
        self.storage
            .store(&format!("{DATEI_VERZEICHNIS}/{id}{endung_str}"), daten)
            .await?;

        tracing::info!(file_id = %id, dateiname, bytes = daten.len(), "Datei gespeichert");
        Ok(GespeicherteDatei {
            id,
            endung,
            groesse: daten.len() as u64,
        })
    }

    fn groesse_pruefen(&self, groesse: usize) -> ChatResult<()> {
        if groesse > self.max_anhang {
            return Err(ChatError::DateiZuGross {
                size: groesse as u64,
                max: self.max_anhang as u64,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

/// Endung eines Dateinamens (mit Punkt, klein geschrieben)
pub fn endung_von(dateiname: &str) -> Option<String> {
    let name = dateiname.rsplit(['/', '\\']).next().unwrap_or(dateiname);
    let punkt = name.rfind('.')?;
    if punkt == 0 || punkt + 1 == name.len() {
        return None;
    }
    Some(name[punkt..].to_ascii_lowercase())
}

/// Dauer einer WAV-Datei in Sekunden
///
/// Liest `fmt `- und `data`-Chunk des RIFF-Containers. Alles, was sich
/// nicht als WAV lesen laesst, ergibt 0.0.
pub fn wav_dauer(daten: &[u8]) -> f64 {
    if daten.len() < 12 || &daten[0..4] != b"RIFF" || &daten[8..12] != b"WAVE" {
        return 0.0;
    }

    let mut byte_rate: Option<u32> = None;
    let mut data_groesse: Option<u32> = None;
    let mut pos = 12;

    while pos + 8 <= daten.len() {
        let id = &daten[pos..pos + 4];
        let groesse = u32::from_le_bytes([daten[pos + 4], daten[pos + 5], daten[pos + 6], daten[pos + 7]]);
        let inhalt = pos + 8;

        match id {
            b"fmt " if inhalt + 12 <= daten.len() => {
                byte_rate = Some(u32::from_le_bytes([
                    daten[inhalt + 8],
                    daten[inhalt + 9],
                    daten[inhalt + 10],
                    daten[inhalt + 11],
                ]));
            }
            b"data" => {
                // Abgeschnittene Aufnahmen: nur vorhandene Bytes zaehlen
                let vorhanden = (daten.len() - inhalt) as u32;
                data_groesse = Some(groesse.min(vorhanden));
                break;
            }
            _ => {}
        }

        // Chunks sind auf gerade Laenge aufgefuellt
        pos = inhalt
            .saturating_add(groesse as usize)
            .saturating_add(groesse as usize & 1);
    }

    match (byte_rate, data_groesse) {
        (Some(rate), Some(bytes)) if rate > 0 => bytes as f64 / rate as f64,
        _ => 0.0,
    }
}
