//! Kanal-Verwaltung fuer den Betreiber (Konsole)

use plauderei_db::DbResult;
use plauderei_protocol::{Flag, Frame};

use crate::befehle;
use crate::server_state::SignalingState;

/// Legt einen Kanal an; `false` wenn er schon existiert
pub fn kanal_anlegen(state: &SignalingState, kanal: &str) -> DbResult<bool> {
    let angelegt = state.store.lock().create_channel(kanal)?;
    if angelegt {
        tracing::info!(kanal, "Kanal vom Betreiber angelegt");
    }
    Ok(angelegt)
}

/// Loescht einen Kanal samt Mitgliedern und Verlauf
///
/// Alle Mitglieder mit Live-Verbindung bekommen vorher eine `DEL_CHANNEL`-
/// Meldung. Fehlgeschlagene Zustellungen halten die Loeschung nicht auf.
/// Gibt `false` zurueck wenn der Kanal nicht existierte.
pub fn kanal_loeschen(state: &SignalingState, kanal: &str) -> DbResult<bool> {
    let geloescht = {
        let mut store = state.store.lock();
        if !store.channel_exists(kanal)? {
            return Ok(false);
        }
        let mitglieder = store.get_channel_members(kanal)?;
        let meldung = Frame::text(
            Flag::DelChannel,
            format!("Channel {kanal} removed on server. You exit from channel."),
        );
        let zugestellt = state.broadcaster.an_mitglieder_senden(&mitglieder, &[], meldung);
        tracing::info!(kanal, mitglieder = mitglieder.len(), zugestellt, "Kanal-Loeschung gemeldet");
        let geloescht = store.delete_channel(kanal)?;
        // Unter derselben Sperre wie die Mitgliedspruefung beim Einspeisen
        state.voice.kanal_entfernen(kanal);
        geloescht
    };

    tracing::info!(kanal, "Kanal geloescht");
    Ok(geloescht)
}

/// Kanalliste mit Mitgliederzahl (wie `/channels`)
pub fn kanaele_auflisten(state: &SignalingState) -> DbResult<String> {
    let store = state.store.lock();
    befehle::kanalliste(&**store)
}
