//! Wire-Format fuer TCP-Verbindungen
//!
//! Frame-basiertes Protokoll mit festem 9-Byte-Header.
//!
//! ## Frame-Format
//!
//! ```text
//! +------+--------+--------+--------+--------+----...----+
//! | Typ  | Groesse (u32 BE)| Flag (u32 BE)   | Body      |
//! +------+--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Groesse gibt die Anzahl der Body-Bytes an und wird geprueft, bevor
//! ein Body-Puffer angelegt wird. Maximale Body-Groesse ist konfigurierbar
//! (Standard: 10 MiB).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use plauderei_core::PlaudereiError;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{DataType, Flag, Frame};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Body-Groesse (10 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Groesse des Headers in Bytes (Typ + Groesse + Flag)
pub const HEADER_SIZE: usize = 1 + 4 + 4;

// ---------------------------------------------------------------------------
// Reine Kodierfunktionen
// ---------------------------------------------------------------------------

/// Header-Felder ohne Body
struct Header {
    typ: DataType,
    groesse: usize,
    flag: Flag,
}

fn header_lesen(kopf: &[u8], max_frame_size: usize) -> Result<Header, PlaudereiError> {
    let typ = DataType::try_from(kopf[0])
        .map_err(|t| PlaudereiError::protokoll(format!("Unbekannter Frame-Typ: {t}")))?;
    let groesse = u32::from_be_bytes([kopf[1], kopf[2], kopf[3], kopf[4]]) as usize;
    let flag = Flag::from(u32::from_be_bytes([kopf[5], kopf[6], kopf[7], kopf[8]]));

    if groesse > max_frame_size {
        return Err(PlaudereiError::protokoll(format!(
            "Frame zu gross: {groesse} Bytes (Maximum: {max_frame_size} Bytes)"
        )));
    }

    Ok(Header { typ, groesse, flag })
}

fn header_schreiben(frame: &Frame, dst: &mut BytesMut) {
    dst.put_u8(frame.typ.wert());
    dst.put_u32(frame.body.len() as u32);
    dst.put_u32(frame.flag.wert());
}

/// Kodiert einen Frame in Header + Body
pub fn encode(frame: &Frame) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + frame.body.len());
    header_schreiben(frame, &mut buf);
    buf.put_slice(&frame.body);
    buf.freeze()
}

/// Dekodiert genau einen vollstaendigen Frame
///
/// Die deklarierte Groesse muss exakt der Anzahl der restlichen Bytes
/// entsprechen.
pub fn decode(bytes: &[u8]) -> Result<Frame, PlaudereiError> {
    if bytes.len() < HEADER_SIZE {
        return Err(PlaudereiError::protokoll("Frame kuerzer als Header"));
    }
    let header = header_lesen(&bytes[..HEADER_SIZE], usize::MAX)?;
    let body = &bytes[HEADER_SIZE..];
    if body.len() != header.groesse {
        return Err(PlaudereiError::protokoll(format!(
            "Groesse stimmt nicht: deklariert {}, vorhanden {}",
            header.groesse,
            body.len()
        )));
    }
    Ok(Frame::neu(header.typ, header.flag, Bytes::copy_from_slice(body)))
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer frame-basierte TCP-Verbindungen
///
/// Implementiert `Encoder<Frame>` und `Decoder` fuer nahtlose
/// Integration mit `tokio_util::codec::Framed`.
///
/// # Beispiel
///
/// ```rust,no_run
/// use tokio_util::codec::Framed;
/// use plauderei_protocol::wire::FrameCodec;
///
/// // let stream = TcpStream::connect(...).await?;
/// // let framed = Framed::new(stream, FrameCodec::new());
/// ```
#[derive(Debug, Clone)]
pub struct FrameCodec {
    /// Maximale erlaubte Body-Groesse in Bytes
    max_frame_size: usize,
}

impl FrameCodec {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefinierter maximaler Body-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Gibt die konfigurierte maximale Body-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = PlaudereiError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Warte auf den vollstaendigen Header
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        // Header lesen ohne den Buffer zu veraendern; Groesse vor Allokation pruefen
        let header = header_lesen(&src[..HEADER_SIZE], self.max_frame_size)?;

        let total_size = HEADER_SIZE + header.groesse;
        if src.len() < total_size {
            // Speicher vorbelegen um Reallocations zu vermeiden
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let body = src.split_to(header.groesse).freeze();

        Ok(Some(Frame::neu(header.typ, header.flag, body)))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = PlaudereiError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.body.len() > self.max_frame_size {
            return Err(PlaudereiError::protokoll(format!(
                "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                item.body.len(),
                self.max_frame_size
            )));
        }

        dst.reserve(HEADER_SIZE + item.body.len());
        header_schreiben(&item, dst);
        dst.put_slice(&item.body);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen fuer direktes async Lesen/Schreiben
// ---------------------------------------------------------------------------

fn eof_als_getrennt(e: io::Error) -> PlaudereiError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        PlaudereiError::VerbindungGetrennt
    } else {
        PlaudereiError::Io(e)
    }
}

/// Liest einen einzelnen Frame aus einem `AsyncRead`
///
/// Kurze Lesevorgaenge werden von `read_exact` wiederholt.
///
/// # Fehler
/// - `VerbindungGetrennt` wenn die Gegenstelle vor Abschluss des Frames schliesst
/// - `Protokoll` bei unbekanntem Typ oder zu grossem Frame
pub async fn read_frame<R>(reader: &mut R, max_frame_size: usize) -> Result<Frame, PlaudereiError>
where
    R: AsyncRead + Unpin,
{
    let mut kopf = [0u8; HEADER_SIZE];
    reader.read_exact(&mut kopf).await.map_err(eof_als_getrennt)?;
    let header = header_lesen(&kopf, max_frame_size)?;

    let mut body = vec![0u8; header.groesse];
    reader.read_exact(&mut body).await.map_err(eof_als_getrennt)?;

    Ok(Frame::neu(header.typ, header.flag, body))
}

/// Schreibt einen einzelnen Frame in einen `AsyncWrite`
///
/// Header und Body werden in einem Puffer zusammengesetzt und mit einem
/// einzigen `write_all` geschrieben.
pub async fn write_frame<W>(
    writer: &mut W,
    frame: &Frame,
    max_frame_size: usize,
) -> Result<(), PlaudereiError>
where
    W: AsyncWrite + Unpin,
{
    if frame.body.len() > max_frame_size {
        return Err(PlaudereiError::protokoll(format!(
            "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
            frame.body.len(),
            max_frame_size
        )));
    }

    writer.write_all(&encode(frame)).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
