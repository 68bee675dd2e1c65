//! plauderei-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert das binaere Frame-Format, die Flags fuer die
//! Protokoll-Unterzustaende und die Body-Layouts fuer AUDIO, FILE und VOICE.

pub mod body;
pub mod frame;
pub mod wire;

pub use frame::{DataType, Flag, Frame};
pub use wire::FrameCodec;
