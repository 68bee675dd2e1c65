//! Body-Layouts fuer AUDIO, FILE und VOICE
//!
//! Alle Felder sind laengen-praefixiert (u32 big-endian). Jede Laenge wird
//! gegen die verbleibenden Bytes geprueft, bevor gelesen wird.
//!
//! ```text
//! AUDIO (Client->Server): idLen|id|channelLen|channel|filenameLen|filename|audioBytes...
//! AUDIO (Server->Client): filenameLen|filename|audioBytes...
//! FILE:                   idLen|id|channelLen|channel|filenameLen|filename|fileSize|fileData...
//! VOICE:                  channelLen|channel|payloadLen|payload[|timestamp:u64]
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use plauderei_core::PlaudereiError;

// ---------------------------------------------------------------------------
// Leser
// ---------------------------------------------------------------------------

/// Sequentieller Leser ueber einen Body mit Grenzpruefung
struct BodyLeser<'a> {
    rest: &'a [u8],
    layout: &'static str,
}

impl<'a> BodyLeser<'a> {
    fn neu(body: &'a [u8], layout: &'static str) -> Self {
        Self { rest: body, layout }
    }

    fn u32(&mut self, feld: &str) -> Result<u32, PlaudereiError> {
        let bytes = self.bytes(4, feld)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn bytes(&mut self, n: usize, feld: &str) -> Result<&'a [u8], PlaudereiError> {
        if self.rest.len() < n {
            return Err(PlaudereiError::protokoll(format!(
                "{}: zu wenig Daten fuer {feld} (benoetigt {n}, vorhanden {})",
                self.layout,
                self.rest.len()
            )));
        }
        let (kopf, rest) = self.rest.split_at(n);
        self.rest = rest;
        Ok(kopf)
    }

    fn string(&mut self, feld: &str) -> Result<String, PlaudereiError> {
        let laenge = self.u32(feld)? as usize;
        let bytes = self.bytes(laenge, feld)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            PlaudereiError::protokoll(format!("{}: {feld} ist kein UTF-8", self.layout))
        })
    }

    fn rest(self) -> &'a [u8] {
        self.rest
    }
}

fn string_schreiben(buf: &mut BytesMut, s: &str) {
    buf.put_u32(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

// ---------------------------------------------------------------------------
// AUDIO
// ---------------------------------------------------------------------------

/// Sprachnachricht vom Client (zum Speichern im Kanal)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUpload {
    pub user_id: String,
    pub kanal: String,
    pub dateiname: String,
    pub daten: Bytes,
}

impl AudioUpload {
    pub fn parsen(body: &[u8]) -> Result<Self, PlaudereiError> {
        let mut leser = BodyLeser::neu(body, "AUDIO");
        let user_id = leser.string("id")?;
        let kanal = leser.string("channel")?;
        let dateiname = leser.string("filename")?;
        let daten = Bytes::copy_from_slice(leser.rest());
        Ok(Self {
            user_id,
            kanal,
            dateiname,
            daten,
        })
    }

    pub fn kodieren(&self) -> Bytes {
        let mut buf = BytesMut::new();
        string_schreiben(&mut buf, &self.user_id);
        string_schreiben(&mut buf, &self.kanal);
        string_schreiben(&mut buf, &self.dateiname);
        buf.put_slice(&self.daten);
        buf.freeze()
    }
}

/// Gespeicherte Sprachnachricht an den Client (Antwort auf `/voicemail_on`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAntwort {
    pub dateiname: String,
    pub daten: Bytes,
}

impl AudioAntwort {
    pub fn parsen(body: &[u8]) -> Result<Self, PlaudereiError> {
        let mut leser = BodyLeser::neu(body, "AUDIO");
        let dateiname = leser.string("filename")?;
        Ok(Self {
            dateiname,
            daten: Bytes::copy_from_slice(leser.rest()),
        })
    }

    pub fn kodieren(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + self.dateiname.len() + self.daten.len());
        string_schreiben(&mut buf, &self.dateiname);
        buf.put_slice(&self.daten);
        buf.freeze()
    }
}

// ---------------------------------------------------------------------------
// FILE
// ---------------------------------------------------------------------------

/// Dateianhang vom Client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateiUpload {
    pub user_id: String,
    pub kanal: String,
    pub dateiname: String,
    pub daten: Bytes,
}

impl DateiUpload {
    /// Parst den FILE-Body; die deklarierte Dateigroesse muss den Daten entsprechen
    pub fn parsen(body: &[u8]) -> Result<Self, PlaudereiError> {
        let mut leser = BodyLeser::neu(body, "FILE");
        let user_id = leser.string("id")?;
        let kanal = leser.string("channel")?;
        let dateiname = leser.string("filename")?;
        let groesse = leser.u32("fileSize")? as usize;
        let daten = leser.rest();
        if daten.len() != groesse {
            return Err(PlaudereiError::protokoll(format!(
                "FILE: Dateigroesse {groesse} passt nicht zu {} Bytes Daten",
                daten.len()
            )));
        }
        Ok(Self {
            user_id,
            kanal,
            dateiname,
            daten: Bytes::copy_from_slice(daten),
        })
    }

    pub fn kodieren(&self) -> Bytes {
        let mut buf = BytesMut::new();
        string_schreiben(&mut buf, &self.user_id);
        string_schreiben(&mut buf, &self.kanal);
        string_schreiben(&mut buf, &self.dateiname);
        buf.put_u32(self.daten.len() as u32);
        buf.put_slice(&self.daten);
        buf.freeze()
    }
}

// ---------------------------------------------------------------------------
// VOICE
// ---------------------------------------------------------------------------

/// Echtzeit-Sprachpaket (eingehend mit optionalem Zeitstempel, ausgehend ohne)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceBody {
    pub kanal: String,
    pub payload: Bytes,
    /// Aufnahmezeitpunkt in Millisekunden (optional)
    pub timestamp_ms: Option<u64>,
}

impl VoiceBody {
    pub fn parsen(body: &[u8]) -> Result<Self, PlaudereiError> {
        let mut leser = BodyLeser::neu(body, "VOICE");
        let kanal = leser.string("channel")?;
        let laenge = leser.u32("payloadLen")? as usize;
        let payload = Bytes::copy_from_slice(leser.bytes(laenge, "payload")?);
        let timestamp_ms = match leser.rest() {
            [] => None,
            rest if rest.len() == 8 => {
                let mut ts = [0u8; 8];
                ts.copy_from_slice(rest);
                Some(u64::from_be_bytes(ts))
            }
            rest => {
                return Err(PlaudereiError::protokoll(format!(
                    "VOICE: {} ueberzaehlige Bytes nach dem Payload",
                    rest.len()
                )))
            }
        };
        Ok(Self {
            kanal,
            payload,
            timestamp_ms,
        })
    }

    pub fn kodieren(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(16 + self.kanal.len() + self.payload.len());
        string_schreiben(&mut buf, &self.kanal);
        buf.put_u32(self.payload.len() as u32);
        buf.put_slice(&self.payload);
        if let Some(ts) = self.timestamp_ms {
            buf.put_u64(ts);
        }
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_upload_layout() {
        let upload = AudioUpload {
            user_id: "u1".into(),
            kanal: "general".into(),
            dateiname: "rec.wav".into(),
            daten: Bytes::from_static(b"RIFF"),
        };
        let body = upload.kodieren();
        assert_eq!(&body[..4], &2u32.to_be_bytes());
        assert_eq!(&body[4..6], b"u1");
        assert_eq!(AudioUpload::parsen(&body).unwrap(), upload);
    }

    #[test]
    fn audio_upload_laenge_zu_gross() {
        let mut body = BytesMut::new();
        body.put_u32(50);
        body.put_slice(b"kurz");
        assert!(AudioUpload::parsen(&body).is_err());
    }

    #[test]
    fn audio_antwort_nur_dateiname_und_daten() {
        let antwort = AudioAntwort {
            dateiname: "100.wav".into(),
            daten: Bytes::from_static(&[1, 2, 3]),
        };
        let body = antwort.kodieren();
        assert_eq!(body.len(), 4 + 7 + 3);
        assert_eq!(AudioAntwort::parsen(&body).unwrap(), antwort);
    }

    #[test]
    fn datei_upload_groesse_wird_geprueft() {
        let upload = DateiUpload {
            user_id: "u1".into(),
            kanal: "c".into(),
            dateiname: "a.txt".into(),
            daten: Bytes::from_static(b"hallo"),
        };
        let mut body = upload.kodieren().to_vec();
        assert_eq!(DateiUpload::parsen(&body).unwrap(), upload);

        body.push(b'!');
        assert!(DateiUpload::parsen(&body).is_err());
    }

    #[test]
    fn voice_body_mit_und_ohne_timestamp() {
        let mut voice = VoiceBody {
            kanal: "general".into(),
            payload: Bytes::from_static(&[0, 1, 0, 2]),
            timestamp_ms: None,
        };
        assert_eq!(VoiceBody::parsen(&voice.kodieren()).unwrap(), voice);

        voice.timestamp_ms = Some(1_700_000_000_123);
        let body = voice.kodieren();
        assert_eq!(body.len(), 4 + 7 + 4 + 4 + 8);
        assert_eq!(VoiceBody::parsen(&body).unwrap(), voice);
    }

    #[test]
    fn voice_body_ueberzaehlige_bytes() {
        let voice = VoiceBody {
            kanal: "g".into(),
            payload: Bytes::new(),
            timestamp_ms: None,
        };
        let mut body = voice.kodieren().to_vec();
        body.extend_from_slice(&[1, 2, 3]);
        assert!(VoiceBody::parsen(&body).is_err());
    }
}
