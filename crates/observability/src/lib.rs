//! # plauderei-observability
//!
//! Structured Logging via tracing-subscriber (Text oder JSON), gesteuert
//! ueber die Server-Konfiguration und die Umgebungsvariablen
//! `PL_LOG_LEVEL` / `PL_LOG_FORMAT`.

pub mod logging;

pub use logging::{
    einstellungen_aufloesen, logging_initialisieren, LogEinstellungen, LogFormat, LoggingFehler,
};
