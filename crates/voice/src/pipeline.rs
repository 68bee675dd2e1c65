//! Voice-Pipeline – ein Mixer-Task pro Kanal
//!
//! Sessions speisen VOICE-Pakete ueber [`VoicePipeline::paket_einspeisen`]
//! ein. Fuer jeden Kanal existiert ein Task, der ueber eine begrenzte
//! mpsc-Queue versorgt wird und die Jitter Buffer seines Kanals exklusiv
//! besitzt.
//!
//! Der Task liest alles ein, was bereits in der Queue steht, und mischt
//! erst, wenn jeder aktive Sprecher ein Paket vorliegen hat oder das
//! Misch-Fenster abgelaufen ist. Ein Sprecher, dessen Puffer bei Ablauf des
//! Fensters leer ist, gilt als still und wird nicht mehr abgewartet, bis er
//! wieder sendet. Ein neu einsetzender Sprecher wartet immer das Fenster ab,
//! damit gleichzeitig beginnende Sprecher in dieselbe Runde fallen.
//!
//! Zuhoerer bekommen den vollen Mix, jeder Sprecher den Mix der anderen.
//! Ist die Queue voll, wird das Paket verworfen; ein Unterlauf oder
//! Ueberlauf beendet die Pipeline nie.

use dashmap::DashMap;
use plauderei_core::{UserId, VerbindungsId};
use plauderei_protocol::body::VoiceBody;
use plauderei_protocol::{DataType, Flag, Frame};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::codec::VoiceCodec;
use crate::jitter_buffer::{VoiceEintrag, VoiceJitterBuffer, STANDARD_KAPAZITAET};
use crate::mixer::{mischrunde_ausfuehren, Mischrunde};

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standard-Groesse der Eingangs-Queue pro Mixer-Task (Pakete)
pub const STANDARD_EINGANGS_QUEUE: usize = 256;

/// Standard-Wartezeit auf fehlende Sprecher (zwei 10-ms-Frames)
pub const STANDARD_MISCH_FENSTER: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct VoicePipelineConfig {
    /// Kapazitaet jedes Jitter Buffers in Paketen
    pub puffer_kapazitaet: usize,
    /// Groesse der Eingangs-Queue pro Kanal
    pub eingangs_queue: usize,
    /// Laengste Wartezeit vom ersten offenen Paket bis zur Mischrunde
    pub misch_fenster: Duration,
}

impl Default for VoicePipelineConfig {
    fn default() -> Self {
        Self {
            puffer_kapazitaet: STANDARD_KAPAZITAET,
            eingangs_queue: STANDARD_EINGANGS_QUEUE,
            misch_fenster: STANDARD_MISCH_FENSTER,
        }
    }
}

// ---------------------------------------------------------------------------
// Ausgabe
// ---------------------------------------------------------------------------

/// Empfaenger gemischter Frames
///
/// Wird von der Broadcast-Schicht implementiert.
pub trait MixAusgabe: Send + Sync + 'static {
    /// Voller Mix an alle Kanalmitglieder ausser den `sprechern` der Runde
    fn ausliefern(&self, kanal: &str, sprecher: &[UserId], frame: Frame);

    /// Mix ohne die eigene Stimme an einen einzelnen Sprecher
    fn an_sprecher(&self, kanal: &str, sprecher: &UserId, frame: Frame);
}

// ---------------------------------------------------------------------------
// Mixer-Eingang
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum MixerEingang {
    Paket {
        verbindung: VerbindungsId,
        user_id: UserId,
        eintrag: VoiceEintrag,
    },
    Entfernen(VerbindungsId),
}

// ---------------------------------------------------------------------------
// VoicePipeline
// ---------------------------------------------------------------------------

/// Verwaltet die Mixer-Tasks aller Kanaele
///
/// Clone ist guenstig; alle Klone teilen denselben Zustand.
#[derive(Clone)]
pub struct VoicePipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    config: VoicePipelineConfig,
    codec: Arc<dyn VoiceCodec>,
    ausgabe: Arc<dyn MixAusgabe>,
    /// Eingangs-Queue je Kanal
    kanaele: DashMap<String, mpsc::Sender<MixerEingang>>,
}

impl VoicePipeline {
    pub fn neu(
        config: VoicePipelineConfig,
        codec: Arc<dyn VoiceCodec>,
        ausgabe: Arc<dyn MixAusgabe>,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                config,
                codec,
                ausgabe,
                kanaele: DashMap::new(),
            }),
        }
    }

    /// Reicht ein Paket an den Mixer des Kanals weiter
    ///
    /// Startet den Mixer-Task, falls der Kanal noch keinen hat. Muss
    /// innerhalb einer Tokio-Runtime aufgerufen werden. Gibt `false`
    /// zurueck, wenn das Paket verworfen wurde.
    pub fn paket_einspeisen(
        &self,
        kanal: &str,
        verbindung: VerbindungsId,
        user_id: UserId,
        eintrag: VoiceEintrag,
    ) -> bool {
        let tx = self
            .inner
            .kanaele
            .entry(kanal.to_string())
            .or_insert_with(|| self.mixer_starten(kanal))
            .clone();

        match tx.try_send(MixerEingang::Paket {
            verbindung,
            user_id,
            eintrag,
        }) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(kanal, verbindung = %verbindung, "Mixer-Queue voll, Paket verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(kanal, "Mixer bereits beendet");
                false
            }
        }
    }

    /// Entfernt die Jitter Buffer einer Verbindung aus allen Mixern
    pub fn verbindung_entfernen(&self, verbindung: VerbindungsId) {
        for eintrag in self.inner.kanaele.iter() {
            if eintrag
                .value()
                .try_send(MixerEingang::Entfernen(verbindung))
                .is_err()
            {
                tracing::debug!(
                    kanal = %eintrag.key(),
                    verbindung = %verbindung,
                    "Entfernen nicht zustellbar"
                );
            }
        }
    }

    /// Stoppt den Mixer eines Kanals
    ///
    /// Der Task liest bereits eingereihte Pakete noch ein und endet, sobald
    /// seine Queue leer und geschlossen ist. Noch nicht gemischte Pakete
    /// werden verworfen.
    pub fn kanal_entfernen(&self, kanal: &str) -> bool {
        let entfernt = self.inner.kanaele.remove(kanal).is_some();
        if entfernt {
            tracing::info!(kanal, "Voice-Mixer gestoppt");
        }
        entfernt
    }

    /// Kanaele mit laufendem Mixer
    pub fn aktive_kanaele(&self) -> Vec<String> {
        let mut kanaele: Vec<String> = self.inner.kanaele.iter().map(|e| e.key().clone()).collect();
        kanaele.sort();
        kanaele
    }

    fn mixer_starten(&self, kanal: &str) -> mpsc::Sender<MixerEingang> {
        let (tx, rx) = mpsc::channel(self.inner.config.eingangs_queue.max(1));
        let mixer = KanalMixer {
            kanal: kanal.to_string(),
            codec: Arc::clone(&self.inner.codec),
            ausgabe: Arc::clone(&self.inner.ausgabe),
            puffer_kapazitaet: self.inner.config.puffer_kapazitaet,
            fenster: self.inner.config.misch_fenster,
            puffer: HashMap::new(),
            sprecher: HashMap::new(),
            frist: None,
            neuer_sprecher: false,
        };
        tokio::spawn(mixer.laufen(rx));
        tracing::info!(kanal, "Voice-Mixer gestartet");
        tx
    }
}

impl std::fmt::Debug for VoicePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoicePipeline")
            .field("config", &self.inner.config)
            .field("kanaele", &self.aktive_kanaele())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Mixer-Task
// ---------------------------------------------------------------------------

struct Sprecher {
    user_id: UserId,
    /// `false` solange der Sprecher still ist
    aktiv: bool,
}

struct KanalMixer {
    kanal: String,
    codec: Arc<dyn VoiceCodec>,
    ausgabe: Arc<dyn MixAusgabe>,
    puffer_kapazitaet: usize,
    fenster: Duration,
    puffer: HashMap<VerbindungsId, VoiceJitterBuffer>,
    sprecher: HashMap<VerbindungsId, Sprecher>,
    /// Spaetester Zeitpunkt der naechsten Runde, gesetzt solange Pakete offen sind
    frist: Option<Instant>,
    /// Seit der letzten Runde hat ein Sprecher neu eingesetzt
    neuer_sprecher: bool,
}

impl KanalMixer {
    async fn laufen(mut self, mut rx: mpsc::Receiver<MixerEingang>) {
        loop {
            let frist = self.frist;
            tokio::select! {
                eingang = rx.recv() => {
                    let Some(eingang) = eingang else { break };
                    self.einreihen(eingang);
                    while let Ok(eingang) = rx.try_recv() {
                        self.einreihen(eingang);
                    }
                }
                _ = tokio::time::sleep_until(frist.unwrap_or_else(Instant::now)), if frist.is_some() => {}
            }
            self.runden_ausfuehren();
        }

        tracing::debug!(kanal = %self.kanal, "Voice-Mixer beendet");
    }

    fn einreihen(&mut self, eingang: MixerEingang) {
        match eingang {
            MixerEingang::Paket {
                verbindung,
                user_id,
                eintrag,
            } => {
                let sprecher = self.sprecher.entry(verbindung).or_insert(Sprecher {
                    user_id,
                    aktiv: false,
                });
                if !sprecher.aktiv {
                    sprecher.aktiv = true;
                    self.neuer_sprecher = true;
                    tracing::trace!(kanal = %self.kanal, verbindung = %verbindung, "Sprecher setzt ein");
                }

                let kapazitaet = self.puffer_kapazitaet;
                self.puffer
                    .entry(verbindung)
                    .or_insert_with(|| VoiceJitterBuffer::neu(kapazitaet))
                    .push(eintrag);

                if self.frist.is_none() {
                    self.frist = Some(Instant::now() + self.fenster);
                }
            }
            MixerEingang::Entfernen(verbindung) => {
                self.sprecher.remove(&verbindung);
                if let Some(jb) = self.puffer.remove(&verbindung) {
                    let statistik = jb.statistik();
                    tracing::debug!(
                        kanal = %self.kanal,
                        verbindung = %verbindung,
                        empfangen = statistik.empfangen,
                        gemischt = statistik.entnommen,
                        verworfen = statistik.verworfen,
                        offen = jb.fuellstand(),
                        "Jitter Buffer entfernt"
                    );
                }
            }
        }
    }

    /// Jeder aktive Sprecher hat ein Paket und keiner hat gerade erst eingesetzt
    fn vollstaendig(&self) -> bool {
        !self.neuer_sprecher
            && self
                .sprecher
                .iter()
                .filter(|(_, s)| s.aktiv)
                .all(|(v, _)| self.puffer.get(v).is_some_and(|jb| !jb.ist_leer()))
    }

    fn runden_ausfuehren(&mut self) {
        let jetzt = Instant::now();
        while let Some(frist) = self.frist {
            if jetzt < frist && !self.vollstaendig() {
                break;
            }

            // Wer jetzt nichts vorliegen hat, ist still
            for (verbindung, sprecher) in self.sprecher.iter_mut() {
                if sprecher.aktiv && self.puffer.get(verbindung).map_or(true, VoiceJitterBuffer::ist_leer) {
                    sprecher.aktiv = false;
                }
            }
            self.neuer_sprecher = false;

            if let Some(runde) = mischrunde_ausfuehren(&mut self.puffer, self.codec.as_ref()) {
                self.runde_ausliefern(&runde);
            }

            self.frist = self
                .puffer
                .values()
                .any(|jb| !jb.ist_leer())
                .then(|| jetzt + self.fenster);
        }
    }

    fn runde_ausliefern(&self, runde: &Mischrunde) {
        let sprecher: Vec<(VerbindungsId, UserId)> = runde
            .sprecher
            .iter()
            .filter_map(|v| self.sprecher.get(v).map(|s| (*v, s.user_id.clone())))
            .collect();
        let sprecher_ids: Vec<UserId> = sprecher.iter().map(|(_, u)| u.clone()).collect();

        tracing::trace!(kanal = %self.kanal, sprecher = sprecher.len(), "Mischrunde ausgeliefert");
        if let Some(frame) = self.frame_kodieren(&runde.frame) {
            self.ausgabe.ausliefern(&self.kanal, &sprecher_ids, frame);
        }

        for (verbindung, user_id) in &sprecher {
            let Some(pcm) = runde.ohne(*verbindung) else { continue };
            if let Some(frame) = self.frame_kodieren(&pcm) {
                self.ausgabe.an_sprecher(&self.kanal, user_id, frame);
            }
        }
    }

    fn frame_kodieren(&self, pcm: &[i16]) -> Option<Frame> {
        let payload = match self.codec.encode(pcm) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(kanal = %self.kanal, fehler = %e, "Gemischter Frame nicht kodierbar");
                return None;
            }
        };
        let body = VoiceBody {
            kanal: self.kanal.clone(),
            payload: payload.into(),
            timestamp_ms: None,
        };
        Some(Frame::neu(DataType::Voice, Flag::Command, body.kodieren()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PcmCodec;

    #[derive(Debug)]
    enum Ausgeliefert {
        Alle {
            kanal: String,
            sprecher: Vec<UserId>,
            pcm: Vec<i16>,
        },
        Sprecher {
            user_id: UserId,
            pcm: Vec<i16>,
        },
    }

    /// Sammelt ausgelieferte Frames in einer Queue
    struct TestAusgabe(mpsc::UnboundedSender<Ausgeliefert>);

    fn pcm_von(frame: &Frame) -> Vec<i16> {
        assert_eq!(frame.typ, DataType::Voice);
        let body = VoiceBody::parsen(&frame.body).unwrap();
        assert_eq!(body.timestamp_ms, None);
        PcmCodec.decode(&body.payload).unwrap()
    }

    impl MixAusgabe for TestAusgabe {
        fn ausliefern(&self, kanal: &str, sprecher: &[UserId], frame: Frame) {
            let _ = self.0.send(Ausgeliefert::Alle {
                kanal: kanal.to_string(),
                sprecher: sprecher.to_vec(),
                pcm: pcm_von(&frame),
            });
        }

        fn an_sprecher(&self, _kanal: &str, sprecher: &UserId, frame: Frame) {
            let _ = self.0.send(Ausgeliefert::Sprecher {
                user_id: sprecher.clone(),
                pcm: pcm_von(&frame),
            });
        }
    }

    fn pipeline() -> (VoicePipeline, mpsc::UnboundedReceiver<Ausgeliefert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let p = VoicePipeline::neu(
            VoicePipelineConfig::default(),
            Arc::new(PcmCodec),
            Arc::new(TestAusgabe(tx)),
        );
        (p, rx)
    }

    fn pcm_eintrag(ts: u64, pcm: &[i16]) -> VoiceEintrag {
        VoiceEintrag::neu(ts, PcmCodec.encode(pcm).unwrap())
    }

    async fn empfangen(rx: &mut mpsc::UnboundedReceiver<Ausgeliefert>) -> Ausgeliefert {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("Timeout beim Warten auf Mischrunde")
            .expect("Ausgabe geschlossen")
    }

    #[tokio::test(start_paused = true)]
    async fn einzelnes_paket_wird_unveraendert_ausgeliefert() {
        let (p, mut rx) = pipeline();
        let ann = UserId::from("ann");
        let pcm = [100i16, -100, 5];

        assert!(p.paket_einspeisen("general", VerbindungsId::naechste(), ann.clone(), pcm_eintrag(1, &pcm)));

        match empfangen(&mut rx).await {
            Ausgeliefert::Alle { kanal, sprecher, pcm: gemischt } => {
                assert_eq!(kanal, "general");
                assert_eq!(sprecher, vec![ann]);
                assert_eq!(gemischt, pcm);
            }
            anderes => panic!("unerwartet: {anderes:?}"),
        }
        // Allein gesprochen: kein Mix ohne eigene Stimme
        tokio::time::sleep(STANDARD_MISCH_FENSTER * 5).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn gleichzeitige_sprecher_werden_gemischt() {
        let (p, mut rx) = pipeline();
        let (ann, bob) = (UserId::from("ann"), UserId::from("bob"));
        let (va, vb) = (VerbindungsId::naechste(), VerbindungsId::naechste());

        p.paket_einspeisen("c", va, ann.clone(), pcm_eintrag(100, &[1000, 30_000]));
        p.paket_einspeisen("c", vb, bob.clone(), pcm_eintrag(100, &[5, 5_000]));

        let mut an_sprecher = Vec::new();
        for _ in 0..3 {
            match empfangen(&mut rx).await {
                Ausgeliefert::Alle { sprecher, pcm, .. } => {
                    assert_eq!(pcm, vec![1005, i16::MAX]);
                    assert_eq!(sprecher.len(), 2);
                    assert!(sprecher.contains(&ann) && sprecher.contains(&bob));
                }
                Ausgeliefert::Sprecher { user_id, pcm } => an_sprecher.push((user_id, pcm)),
            }
        }
        an_sprecher.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            an_sprecher,
            vec![(ann, vec![5, 5_000]), (bob, vec![1000, 30_000])]
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn spaeter_sprecher_innerhalb_des_fensters_wird_mitgemischt() {
        let (p, mut rx) = pipeline();
        let (va, vb) = (VerbindungsId::naechste(), VerbindungsId::naechste());

        p.paket_einspeisen("c", va, UserId::from("a"), pcm_eintrag(100, &[1]));
        tokio::time::sleep(STANDARD_MISCH_FENSTER / 2).await;
        p.paket_einspeisen("c", vb, UserId::from("b"), pcm_eintrag(100, &[2]));

        loop {
            if let Ausgeliefert::Alle { pcm, .. } = empfangen(&mut rx).await {
                assert_eq!(pcm, vec![3]);
                break;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stiller_sprecher_wird_nicht_mehr_abgewartet() {
        let (p, mut rx) = pipeline();
        let (va, vb) = (VerbindungsId::naechste(), VerbindungsId::naechste());
        let ann = UserId::from("ann");

        p.paket_einspeisen("c", va, ann.clone(), pcm_eintrag(100, &[1]));
        p.paket_einspeisen("c", vb, UserId::from("bob"), pcm_eintrag(100, &[2]));
        for _ in 0..3 {
            empfangen(&mut rx).await;
        }

        // Bob schweigt: Ann wird nach Ablauf des Fensters allein gemischt
        let start = Instant::now();
        p.paket_einspeisen("c", va, ann.clone(), pcm_eintrag(110, &[7]));
        match empfangen(&mut rx).await {
            Ausgeliefert::Alle { sprecher, pcm, .. } => {
                assert_eq!(sprecher, vec![ann.clone()]);
                assert_eq!(pcm, vec![7]);
            }
            anderes => panic!("unerwartet: {anderes:?}"),
        }
        assert!(start.elapsed() >= STANDARD_MISCH_FENSTER);

        // Danach geht Ann ohne Wartezeit durch
        let start = Instant::now();
        p.paket_einspeisen("c", va, ann, pcm_eintrag(120, &[8]));
        match empfangen(&mut rx).await {
            Ausgeliefert::Alle { pcm, .. } => assert_eq!(pcm, vec![8]),
            anderes => panic!("unerwartet: {anderes:?}"),
        }
        assert!(start.elapsed() < STANDARD_MISCH_FENSTER);
    }

    #[tokio::test(start_paused = true)]
    async fn kaputtes_paket_stoppt_pipeline_nicht() {
        let (p, mut rx) = pipeline();
        let v = VerbindungsId::naechste();
        let u = UserId::from("u");

        p.paket_einspeisen("c", v, u.clone(), VoiceEintrag::neu(1, vec![1u8]));
        p.paket_einspeisen("c", v, u.clone(), pcm_eintrag(2, &[9]));

        match empfangen(&mut rx).await {
            Ausgeliefert::Alle { pcm, .. } => assert_eq!(pcm, vec![9]),
            anderes => panic!("unerwartet: {anderes:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn kanaele_sind_isoliert() {
        let (p, mut rx) = pipeline();
        p.paket_einspeisen("a", VerbindungsId::naechste(), UserId::from("x"), pcm_eintrag(1, &[1]));
        p.paket_einspeisen("b", VerbindungsId::naechste(), UserId::from("y"), pcm_eintrag(1, &[2]));

        let mut ergebnisse = Vec::new();
        for _ in 0..2 {
            if let Ausgeliefert::Alle { kanal, pcm, .. } = empfangen(&mut rx).await {
                ergebnisse.push((kanal, pcm));
            }
        }
        ergebnisse.sort();
        assert_eq!(ergebnisse, vec![("a".to_string(), vec![1]), ("b".to_string(), vec![2])]);
        assert_eq!(p.aktive_kanaele(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn kanal_entfernen_stoppt_mixer() {
        let (p, _rx) = pipeline();
        p.paket_einspeisen("weg", VerbindungsId::naechste(), UserId::from("x"), pcm_eintrag(1, &[1]));
        assert!(p.kanal_entfernen("weg"));
        assert!(!p.kanal_entfernen("weg"));
        assert!(p.aktive_kanaele().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn entfernte_verbindung_wird_nicht_mehr_gemischt() {
        let (p, mut rx) = pipeline();
        let (va, vb) = (VerbindungsId::naechste(), VerbindungsId::naechste());

        p.paket_einspeisen("c", va, UserId::from("a"), pcm_eintrag(1, &[1]));
        p.verbindung_entfernen(va);
        p.paket_einspeisen("c", vb, UserId::from("b"), pcm_eintrag(1, &[2]));

        match empfangen(&mut rx).await {
            Ausgeliefert::Alle { sprecher, pcm, .. } => {
                assert_eq!(sprecher, vec![UserId::from("b")]);
                assert_eq!(pcm, vec![2]);
            }
            anderes => panic!("unerwartet: {anderes:?}"),
        }
    }

    #[tokio::test]
    async fn verbindung_entfernen_ohne_mixer_ist_harmlos() {
        let (p, _rx) = pipeline();
        p.verbindung_entfernen(VerbindungsId::naechste());
        assert!(p.aktive_kanaele().is_empty());
    }
}
