//! Jitter Buffer pro Verbindung
//!
//! Ein FIFO aus `{timestamp, payload}`. Pakete werden in Ankunftsreihenfolge
//! abgelegt und von der Mischrunde vorne entnommen. Laeuft der Puffer ueber,
//! wird das aelteste Paket verworfen, damit die Latenz begrenzt bleibt.
//!
//! Der Puffer ist nicht thread-safe; er gehoert exklusiv dem Mixer-Task
//! seines Kanals.

use bytes::Bytes;
use std::collections::VecDeque;

/// Standard-Kapazitaet in Paketen (500 ms bei 10-ms-Frames)
pub const STANDARD_KAPAZITAET: usize = 50;

// ---------------------------------------------------------------------------
// Eintrag
// ---------------------------------------------------------------------------

/// Ein gepuffertes Voice-Paket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceEintrag {
    /// Zeitstempel in Millisekunden
    pub timestamp_ms: u64,
    /// Kodierte Nutzdaten
    pub payload: Bytes,
}

impl VoiceEintrag {
    pub fn neu(timestamp_ms: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp_ms,
            payload: payload.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Statistiken
// ---------------------------------------------------------------------------

/// Statistiken des Jitter Buffers (Snapshot)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JitterBufferStatistik {
    /// Anzahl empfangener Pakete gesamt
    pub empfangen: u64,
    /// Anzahl entnommener (gemischter) Pakete
    pub entnommen: u64,
    /// Anzahl wegen Ueberlauf verworfener Pakete
    pub verworfen: u64,
}

// ---------------------------------------------------------------------------
// VoiceJitterBuffer
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct VoiceJitterBuffer {
    kapazitaet: usize,
    eintraege: VecDeque<VoiceEintrag>,
    statistik: JitterBufferStatistik,
}

impl VoiceJitterBuffer {
    /// Erstellt einen leeren Puffer; eine Kapazitaet von 0 wird auf 1 angehoben
    pub fn neu(kapazitaet: usize) -> Self {
        let kapazitaet = kapazitaet.max(1);
        Self {
            kapazitaet,
            eintraege: VecDeque::with_capacity(kapazitaet),
            statistik: JitterBufferStatistik::default(),
        }
    }

    /// Haengt ein Paket an
    ///
    /// Gibt `false` zurueck, wenn dafuer das aelteste Paket verworfen wurde.
    pub fn push(&mut self, eintrag: VoiceEintrag) -> bool {
        self.statistik.empfangen += 1;
        let mut ohne_verlust = true;
        if self.eintraege.len() >= self.kapazitaet {
            if let Some(alt) = self.eintraege.pop_front() {
                self.statistik.verworfen += 1;
                tracing::warn!(
                    timestamp_ms = alt.timestamp_ms,
                    "Buffer-Ueberlauf: Paket verworfen"
                );
            }
            ohne_verlust = false;
        }
        self.eintraege.push_back(eintrag);
        ohne_verlust
    }

    /// Zeitstempel des vordersten Pakets
    pub fn front_timestamp(&self) -> Option<u64> {
        self.eintraege.front().map(|e| e.timestamp_ms)
    }

    /// Entnimmt das vorderste Paket
    pub fn pop(&mut self) -> Option<VoiceEintrag> {
        let eintrag = self.eintraege.pop_front()?;
        self.statistik.entnommen += 1;
        Some(eintrag)
    }

    pub fn ist_leer(&self) -> bool {
        self.eintraege.is_empty()
    }

    /// Aktueller Fuellstand in Paketen
    pub fn fuellstand(&self) -> usize {
        self.eintraege.len()
    }

    pub fn statistik(&self) -> &JitterBufferStatistik {
        &self.statistik
    }
}

impl Default for VoiceJitterBuffer {
    fn default() -> Self {
        Self::neu(STANDARD_KAPAZITAET)
    }
}
