//! Betreiber-Konsole auf stdin
//!
//! Befehle:
//! - `/channels` – Kanaele mit Mitgliederzahl
//! - `/add_channel <kanal>` – Kanal anlegen
//! - `/del_channel <kanal>` – Kanal loeschen, Mitglieder werden benachrichtigt
//! - `/help` – Hilfe

use plauderei_signaling::{kanal_admin, SignalingState};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

pub const HILFE: &str = "Available commands:\n\
    /channels - list channels and their members\n\
    /add_channel <channel> - create a channel\n\
    /del_channel <channel> - delete a channel and notify its members\n\
    /help - show this help\n";

pub const FALSCHER_BEFEHL: &str = "Wrong command, use /help\n";

/// Fuehrt eine Konsolenzeile aus und liefert die Ausgabe
pub fn befehl_ausfuehren(state: &SignalingState, zeile: &str) -> String {
    let teile: Vec<&str> = zeile.split_whitespace().collect();
    let ergebnis = match teile.as_slice() {
        [] => return String::new(),
        ["/channels"] => kanal_admin::kanaele_auflisten(state),
        ["/add_channel", kanal] => match kanal_admin::kanal_anlegen(state, kanal) {
            Ok(true) => Ok(format!("Channel {kanal} created\n")),
            Ok(false) => Ok(format!("Channel {kanal} already exists\n")),
            Err(e) => Err(e),
        },
        ["/del_channel", kanal] => match kanal_admin::kanal_loeschen(state, kanal) {
            Ok(true) => Ok(format!("Channel {kanal} deleted\n")),
            Ok(false) => Ok(format!("Channel {kanal} not found\n")),
            Err(e) => Err(e),
        },
        ["/help"] => Ok(HILFE.to_string()),
        _ => Ok(FALSCHER_BEFEHL.to_string()),
    };

    ergebnis.unwrap_or_else(|e| {
        tracing::error!(befehl = zeile, fehler = %e, "Konsolenbefehl fehlgeschlagen");
        format!("Error: {e}\n")
    })
}

/// Liest Befehle bis EOF oder Shutdown
pub async fn konsole_ausfuehren<R, W>(
    state: Arc<SignalingState>,
    eingabe: R,
    mut ausgabe: W,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut zeilen = eingabe.lines();
    loop {
        tokio::select! {
            zeile = zeilen.next_line() => {
                let Some(zeile) = zeile? else {
                    tracing::debug!("Konsole: Eingabe beendet");
                    break;
                };
                tracing::info!(befehl = %zeile.trim(), "Konsolenbefehl");
                let antwort = befehl_ausfuehren(&state, &zeile);
                ausgabe.write_all(antwort.as_bytes()).await?;
                ausgabe.flush().await?;
            }
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
    Ok(())
}
