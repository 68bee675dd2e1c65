//! Codec-Schnittstelle der Voice-Pipeline
//!
//! Die Pipeline kennt nur "Payload -> PCM" und "PCM -> Payload". Der
//! mitgelieferte `PcmCodec` reicht i16-Samples als Little-Endian-Bytes
//! durch; ein echter Opus-Codec wird ueber denselben Trait angebunden.

use crate::error::{VoiceError, VoiceResult};

/// Abtastrate in Hz
pub const SAMPLE_RATE: u32 = 48_000;
/// Frames pro Puffer (10 ms bei 48 kHz)
pub const FRAMES_PER_BUFFER: usize = 480;
/// Anzahl Audiokanaele (Stereo, interleaved)
pub const ANZAHL_KANAELE: usize = 2;
/// Samples in einem vollstaendigen PCM-Frame
pub const SAMPLES_PRO_FRAME: usize = FRAMES_PER_BUFFER * ANZAHL_KANAELE;

/// Kodiert und dekodiert einen PCM-Frame
pub trait VoiceCodec: Send + Sync + 'static {
    fn encode(&self, pcm: &[i16]) -> VoiceResult<Vec<u8>>;
    fn decode(&self, payload: &[u8]) -> VoiceResult<Vec<i16>>;
}

/// Unkomprimiertes PCM (i16, Little Endian)
#[derive(Debug, Clone, Copy, Default)]
pub struct PcmCodec;

impl VoiceCodec for PcmCodec {
    fn encode(&self, pcm: &[i16]) -> VoiceResult<Vec<u8>> {
        Ok(pcm.iter().flat_map(|s| s.to_le_bytes()).collect())
    }

    fn decode(&self, payload: &[u8]) -> VoiceResult<Vec<i16>> {
        if payload.len() % 2 != 0 {
            return Err(VoiceError::Dekodierung(format!(
                "ungerade Payload-Laenge {}",
                payload.len()
            )));
        }
        if payload.len() / 2 > SAMPLES_PRO_FRAME {
            return Err(VoiceError::Dekodierung(format!(
                "{} Samples ueberschreiten einen Frame ({SAMPLES_PRO_FRAME})",
                payload.len() / 2
            )));
        }
        Ok(payload
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_hin_und_zurueck() {
        let codec = PcmCodec;
        let pcm = vec![0i16, 1, -1, i16::MAX, i16::MIN, 1234];
        let payload = codec.encode(&pcm).unwrap();
        assert_eq!(payload.len(), pcm.len() * 2);
        assert_eq!(codec.decode(&payload).unwrap(), pcm);
    }

    #[test]
    fn little_endian_byte_reihenfolge() {
        assert_eq!(PcmCodec.encode(&[0x0102]).unwrap(), vec![0x02, 0x01]);
    }

    #[test]
    fn ungerade_laenge_ist_fehler() {
        assert!(matches!(
            PcmCodec.decode(&[1, 2, 3]),
            Err(VoiceError::Dekodierung(_))
        ));
    }

    #[test]
    fn zu_langer_frame_ist_fehler() {
        let payload = vec![0u8; (SAMPLES_PRO_FRAME + 1) * 2];
        assert!(PcmCodec.decode(&payload).is_err());
    }
}
