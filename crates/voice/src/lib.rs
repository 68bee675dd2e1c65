//! plauderei-voice – Voice-Mixing-Pipeline
//!
//! Eingehende VOICE-Pakete landen pro Verbindung in einem Jitter Buffer.
//! Je Kanal laeuft genau ein Mixer-Task, der die Puffer nach Zeitstempel
//! ausrichtet, dekodiert, additiv mischt und das Ergebnis an die
//! Kanal-Mitglieder ausliefern laesst.
//!
//! ## Module
//! - [`codec`] – Codec-Schnittstelle und PCM-Passthrough
//! - [`jitter_buffer`] – FIFO-Puffer pro Verbindung
//! - [`mixer`] – Mischrunde (Ausrichten, Dekodieren, Summieren, Clipping)
//! - [`pipeline`] – Mixer-Tasks pro Kanal

pub mod codec;
pub mod error;
pub mod jitter_buffer;
pub mod mixer;
pub mod pipeline;

pub use codec::{PcmCodec, VoiceCodec};
pub use error::{VoiceError, VoiceResult};
pub use jitter_buffer::{VoiceEintrag, VoiceJitterBuffer};
pub use mixer::{clamp16, frames_mischen, mischrunde_ausfuehren, Mischrunde};
pub use pipeline::{MixAusgabe, VoicePipeline, VoicePipelineConfig};
