//! Mischrunde
//!
//! Eine Runde richtet alle Jitter Buffer eines Kanals am kleinsten
//! Front-Zeitstempel aus, dekodiert und entnimmt jedes Paket mit
//! `timestamp <= min`, summiert die Frames samplewise und begrenzt jedes
//! Sample hart auf den i16-Bereich. Leere Puffer werden uebersprungen.

use plauderei_core::VerbindungsId;
use std::collections::HashMap;

use crate::codec::VoiceCodec;
use crate::jitter_buffer::VoiceJitterBuffer;

/// Ergebnis einer Mischrunde
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mischrunde {
    /// Gemischter PCM-Frame
    pub frame: Vec<i16>,
    /// Verbindungen, deren Pakete in den Frame eingeflossen sind
    pub sprecher: Vec<VerbindungsId>,
    /// Dekodierte Frames der Sprecher, gleiche Reihenfolge wie `sprecher`
    pub beitraege: Vec<Vec<i16>>,
}

impl Mischrunde {
    /// Mix aller anderen Sprecher; `None` wenn `verbindung` allein sprach
    pub fn ohne(&self, verbindung: VerbindungsId) -> Option<Vec<i16>> {
        let andere: Vec<Vec<i16>> = self
            .sprecher
            .iter()
            .zip(&self.beitraege)
            .filter(|(v, _)| **v != verbindung)
            .map(|(_, frame)| frame.clone())
            .collect();
        (!andere.is_empty()).then(|| frames_mischen(&andere))
    }
}

/// Begrenzt eine Summe auf den i16-Bereich
pub fn clamp16(wert: i32) -> i16 {
    wert.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Summiert Frames samplewise mit hartem Clipping
///
/// Die Ausgabe hat die Laenge des laengsten Frames; fehlende Samples
/// kuerzerer Frames zaehlen als 0.
pub fn frames_mischen(frames: &[Vec<i16>]) -> Vec<i16> {
    let laenge = frames.iter().map(Vec::len).max().unwrap_or(0);
    let mut summe = vec![0i32; laenge];
    for frame in frames {
        for (s, &sample) in summe.iter_mut().zip(frame) {
            *s += sample as i32;
        }
    }
    summe.into_iter().map(clamp16).collect()
}

/// Fuehrt eine Mischrunde ueber alle Puffer eines Kanals aus
///
/// Gibt `None` zurueck, wenn kein Puffer ein Paket enthielt oder kein
/// Paket dekodiert werden konnte. Nicht dekodierbare Pakete werden trotzdem
/// entnommen und verworfen.
pub fn mischrunde_ausfuehren(
    puffer: &mut HashMap<VerbindungsId, VoiceJitterBuffer>,
    codec: &dyn VoiceCodec,
) -> Option<Mischrunde> {
    let min_timestamp = puffer.values().filter_map(|p| p.front_timestamp()).min()?;

    let mut beitraege = Vec::new();
    for (verbindung, jb) in puffer.iter_mut() {
        if !jb.front_timestamp().is_some_and(|ts| ts <= min_timestamp) {
            continue;
        }
        let Some(eintrag) = jb.pop() else { continue };
        match codec.decode(&eintrag.payload) {
            Ok(pcm) => beitraege.push((*verbindung, pcm)),
            Err(e) => {
                tracing::warn!(
                    verbindung = %verbindung,
                    timestamp_ms = eintrag.timestamp_ms,
                    fehler = %e,
                    "Voice-Paket nicht dekodierbar, verworfen"
                );
            }
        }
    }

    if beitraege.is_empty() {
        return None;
    }

    beitraege.sort_by_key(|(v, _)| v.inner());
    let (sprecher, beitraege): (Vec<_>, Vec<_>) = beitraege.into_iter().unzip();
    Some(Mischrunde {
        frame: frames_mischen(&beitraege),
        sprecher,
        beitraege,
    })
}
