//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable (hat Vorrang vor der Konfigurationsdatei):
//! - `PL_LOG_LEVEL`: Filter-Ausdruck (`info`, `plauderei_signaling=debug`, ...)
//! - `PL_LOG_FORMAT`: `text` oder `json`

use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "PL_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "PL_LOG_FORMAT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoggingFehler {
    #[error("Ungueltiges Log-Format: {0} (erlaubt: text, json)")]
    UngueltigesFormat(String),

    #[error("Ungueltiger Log-Filter {filter:?}: {grund}")]
    UngueltigerFilter { filter: String, grund: String },

    #[error("Logging wurde bereits initialisiert")]
    BereitsInitialisiert,
}

/// Ausgabeformat der Log-Zeilen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingFehler;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            anderes => Err(LoggingFehler::UngueltigesFormat(anderes.to_string())),
        }
    }
}

/// Aufgeloeste Logging-Einstellungen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEinstellungen {
    pub filter: String,
    pub format: LogFormat,
}

/// Kombiniert Konfiguration und Umgebung
///
/// Gesetzte, nicht leere Umgebungswerte ueberschreiben die Konfiguration.
pub fn einstellungen_aufloesen(
    level: &str,
    format: &str,
    env_level: Option<String>,
    env_format: Option<String>,
) -> Result<LogEinstellungen, LoggingFehler> {
    let filter = env_level
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| level.to_string());
    let format = env_format
        .filter(|f| !f.trim().is_empty())
        .as_deref()
        .unwrap_or(format)
        .parse()?;

    // Filter frueh pruefen, damit Tippfehler beim Start auffallen
    EnvFilter::try_new(&filter).map_err(|e| LoggingFehler::UngueltigerFilter {
        filter: filter.clone(),
        grund: e.to_string(),
    })?;

    Ok(LogEinstellungen { filter, format })
}

/// Initialisiert den globalen Subscriber
///
/// Liest `PL_LOG_LEVEL` und `PL_LOG_FORMAT` aus der Umgebung und faellt auf
/// die uebergebenen Werte zurueck.
pub fn logging_initialisieren(level: &str, format: &str) -> Result<LogEinstellungen, LoggingFehler> {
    let einstellungen = einstellungen_aufloesen(
        level,
        format,
        std::env::var(ENV_LOG_LEVEL).ok(),
        std::env::var(ENV_LOG_FORMAT).ok(),
    )?;
    let filter = EnvFilter::try_new(&einstellungen.filter).map_err(|e| LoggingFehler::UngueltigerFilter {
        filter: einstellungen.filter.clone(),
        grund: e.to_string(),
    })?;

    let ergebnis = match einstellungen.format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    ergebnis.map_err(|_| LoggingFehler::BereitsInitialisiert)?;

    tracing::debug!(filter = %einstellungen.filter, format = ?einstellungen.format, "Logging initialisiert");
    Ok(einstellungen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsen() {
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("xml".parse::<LogFormat>().is_err());
        assert!("JSON".parse::<LogFormat>().is_err()); // Gross-/Kleinschreibung
    }

    #[test]
    fn konfiguration_ohne_umgebung() {
        let e = einstellungen_aufloesen("debug", "json", None, None).unwrap();
        assert_eq!(e.filter, "debug");
        assert_eq!(e.format, LogFormat::Json);
    }

    #[test]
    fn umgebung_hat_vorrang() {
        let e = einstellungen_aufloesen(
            "info",
            "text",
            Some("plauderei_signaling=trace".into()),
            Some("json".into()),
        )
        .unwrap();
        assert_eq!(e.filter, "plauderei_signaling=trace");
        assert_eq!(e.format, LogFormat::Json);
    }

    #[test]
    fn leere_umgebung_wird_ignoriert() {
        let e = einstellungen_aufloesen("warn", "text", Some("  ".into()), Some(String::new())).unwrap();
        assert_eq!(e.filter, "warn");
        assert_eq!(e.format, LogFormat::Text);
    }

    #[test]
    fn ungueltige_werte() {
        assert_eq!(
            einstellungen_aufloesen("info", "yaml", None, None),
            Err(LoggingFehler::UngueltigesFormat("yaml".into()))
        );
        assert!(matches!(
            einstellungen_aufloesen("info=[", "text", None, None),
            Err(LoggingFehler::UngueltigerFilter { .. })
        ));
    }
}
