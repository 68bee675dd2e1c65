//! Textbefehle freigeschalteter Sessions
//!
//! Dispatch-Tabelle Befehlsname -> Handler. Jeder Handler bekommt die
//! Argumente, den gesperrten Store und den Kontext der Session. Pruefung und
//! Aenderung laufen so unter derselben Sperre.

use chrono::Utc;
use plauderei_auth::kennung_pruefen;
use plauderei_chat::verlauf_rendern;
use plauderei_core::UserId;
use plauderei_db::models::kanalname_pruefen;
use plauderei_db::{DbResult, Store, VerlaufEintrag};
use plauderei_protocol::{Flag, Frame};

// ---------------------------------------------------------------------------
// Antworttexte
// ---------------------------------------------------------------------------

pub const BEIGETRETEN: &str = "You have joined the channel";
pub const BEREITS_MITGLIED: &str = "You already on this channel";
pub const KANAL_EXISTIERT_NICHT: &str = "Channel does not exist";
pub const VERLASSEN: &str = "You have left the channel";
pub const KEIN_MITGLIED: &str = "You are not in this channel";
pub const KANAL_NICHT_GEFUNDEN: &str = "Channel not found";
pub const GESENDET: &str = "Message sent";
pub const KEIN_ZUGRIFF: &str = "You don't have access to this channel, use join <channel> for adding";
pub const KANAL_UNBEKANNT: &str = "Channel not found, use /channels to see available channels";
pub const KANAL_LEER: &str = "Channel is empty";
pub const ZEIT_AN: &str = "Time on";
pub const ZEIT_AUS: &str = "Time off";
pub const FALSCHER_BEFEHL: &str = "Wrong command";
pub const NICKNAME_VERGEBEN: &str = "Nickname is not available";
pub const KEINE_KANAELE: &str = "No existing channels.\n";
pub const SERVERFEHLER: &str = "Server error, try again later";

/// Ergebnis eines Befehls
#[derive(Debug, Clone, PartialEq)]
pub enum BefehlsErgebnis {
    /// Direkte Antwort an den Absender
    Antwort(Frame),
    /// Voicemail laden (asynchron, ausserhalb der Store-Sperre)
    Voicemail(String),
    /// Verbindung schliessen (`/connect`)
    Trennen,
}

impl BefehlsErgebnis {
    fn text(text: impl Into<String>) -> Self {
        Self::Antwort(Frame::text(Flag::Command, text))
    }
}

/// Session-Daten, die ein Befehl lesen oder aendern darf
pub struct BefehlsKontext<'a> {
    pub user_id: &'a UserId,
    pub nickname: &'a mut String,
    pub zeit_anzeigen: &'a mut bool,
}

type Handler = fn(&[&str], &mut dyn Store, &mut BefehlsKontext<'_>) -> DbResult<BefehlsErgebnis>;

/// Befehlsname -> (Handler, Verwendung)
const BEFEHLE: &[(&str, Handler, &str)] = &[
    ("/join", join, "/join <channel>"),
    ("/exit", exit, "/exit <channel>"),
    ("/send", send, "/send <channel> <message>"),
    ("/read", read, "/read <channel>"),
    ("/nick", nick, "/nick <new_nickname>"),
    ("/channels", channels, "/channels"),
    ("/time_on", time_on, "/time_on"),
    ("/time_off", time_off, "/time_off"),
    ("/voicemail_on", voicemail_on, "/voicemail_on <id>"),
    ("/connect", connect, "/connect"),
];

/// Fuehrt eine Befehlszeile aus
///
/// Die Zeile wird an Leerzeichen getrennt, das erste Token waehlt den
/// Handler. Store-Fehler werden an den Aufrufer durchgereicht.
pub fn ausfuehren(
    zeile: &str,
    store: &mut dyn Store,
    ctx: &mut BefehlsKontext<'_>,
) -> DbResult<BefehlsErgebnis> {
    let args: Vec<&str> = zeile.split_whitespace().collect();
    let Some(name) = args.first() else {
        return Ok(BefehlsErgebnis::text(FALSCHER_BEFEHL));
    };

    let Some((_, handler, verwendung)) = BEFEHLE.iter().find(|(n, _, _)| n == name) else {
        tracing::info!(user_id = %ctx.user_id, befehl = %name, "Unbekannter Befehl");
        return Ok(BefehlsErgebnis::text(FALSCHER_BEFEHL));
    };

    tracing::info!(user_id = %ctx.user_id, befehl = %name, args = args.len() - 1, "Befehl");

    if !argumente_passen(name, args.len()) {
        return Ok(BefehlsErgebnis::text(format!("Error command, use: {verwendung}")));
    }
    handler(&args, store, ctx)
}

fn argumente_passen(name: &str, anzahl: usize) -> bool {
    match name {
        "/send" => anzahl >= 3,
        "/join" | "/exit" | "/read" | "/nick" | "/voicemail_on" => anzahl == 2,
        _ => anzahl == 1,
    }
}

// ---------------------------------------------------------------------------
// Kanal-Befehle
// ---------------------------------------------------------------------------

fn join(args: &[&str], store: &mut dyn Store, ctx: &mut BefehlsKontext<'_>) -> DbResult<BefehlsErgebnis> {
    let kanal = args[1];
    if kanalname_pruefen(kanal).is_err() {
        return Ok(BefehlsErgebnis::Antwort(Frame::text(
            Flag::NoChannel,
            KANAL_EXISTIERT_NICHT,
        )));
    }
    if store.create_channel(kanal)? {
        tracing::info!(kanal, user_id = %ctx.user_id, "Kanal beim Beitritt angelegt");
    }
    if store.add_channel_member(kanal, ctx.user_id)? {
        Ok(BefehlsErgebnis::text(BEIGETRETEN))
    } else {
        Ok(BefehlsErgebnis::text(BEREITS_MITGLIED))
    }
}

fn exit(args: &[&str], store: &mut dyn Store, ctx: &mut BefehlsKontext<'_>) -> DbResult<BefehlsErgebnis> {
    let kanal = args[1];
    if !store.channel_exists(kanal)? {
        return Ok(BefehlsErgebnis::text(KANAL_NICHT_GEFUNDEN));
    }
    if store.remove_channel_member(kanal, ctx.user_id)? {
        Ok(BefehlsErgebnis::text(VERLASSEN))
    } else {
        Ok(BefehlsErgebnis::text(KEIN_MITGLIED))
    }
}

fn send(args: &[&str], store: &mut dyn Store, ctx: &mut BefehlsKontext<'_>) -> DbResult<BefehlsErgebnis> {
    let kanal = args[1];
    if !store.channel_exists(kanal)? {
        return Ok(BefehlsErgebnis::text(KANAL_UNBEKANNT));
    }
    if !store.is_member(kanal, ctx.user_id)? {
        return Ok(BefehlsErgebnis::text(KEIN_ZUGRIFF));
    }
    store.append_history(
        kanal,
        VerlaufEintrag::Text {
            time: Utc::now(),
            user_id: ctx.user_id.clone(),
            message: args[2..].join(" "),
        },
    )?;
    Ok(BefehlsErgebnis::text(GESENDET))
}

fn read(args: &[&str], store: &mut dyn Store, ctx: &mut BefehlsKontext<'_>) -> DbResult<BefehlsErgebnis> {
    let kanal = args[1];
    if !store.channel_exists(kanal)? {
        return Ok(BefehlsErgebnis::text(KANAL_UNBEKANNT));
    }
    if !store.is_member(kanal, ctx.user_id)? {
        return Ok(BefehlsErgebnis::text(KEIN_ZUGRIFF));
    }
    let verlauf = store.get_channel_history(kanal)?;
    if verlauf.is_empty() {
        return Ok(BefehlsErgebnis::text(KANAL_LEER));
    }
    let benutzer = store.get_users()?;
    Ok(BefehlsErgebnis::text(verlauf_rendern(
        &verlauf,
        &benutzer,
        *ctx.zeit_anzeigen,
    )))
}

fn channels(_args: &[&str], store: &mut dyn Store, _ctx: &mut BefehlsKontext<'_>) -> DbResult<BefehlsErgebnis> {
    Ok(BefehlsErgebnis::text(kanalliste(store)?))
}

/// `Name: <kanal>, Number of active users: <n>` pro Zeile
pub fn kanalliste(store: &dyn Store) -> DbResult<String> {
    let kanaele = store.list_channels()?;
    if kanaele.is_empty() {
        return Ok(KEINE_KANAELE.to_string());
    }
    let mut ausgabe = String::new();
    for kanal in kanaele {
        let anzahl = store.get_channel_members(&kanal)?.len();
        ausgabe.push_str(&format!("Name: {kanal}, Number of active users: {anzahl}\n"));
    }
    Ok(ausgabe)
}

// ---------------------------------------------------------------------------
// Session-Befehle
// ---------------------------------------------------------------------------

fn nick(args: &[&str], store: &mut dyn Store, ctx: &mut BefehlsKontext<'_>) -> DbResult<BefehlsErgebnis> {
    let neu = args[1];
    if let Err(e) = kennung_pruefen("nickname", neu) {
        tracing::info!(user_id = %ctx.user_id, fehler = %e, "Neuer Nickname abgelehnt");
        return Ok(BefehlsErgebnis::text(NICKNAME_VERGEBEN));
    }
    match store.rename_user(ctx.user_id, neu) {
        Ok(()) => {}
        Err(e) if e.ist_eindeutigkeit() => {
            tracing::info!(user_id = %ctx.user_id, nickname = neu, "Nickname bereits vergeben");
            return Ok(BefehlsErgebnis::text(NICKNAME_VERGEBEN));
        }
        Err(e) => return Err(e),
    }
    tracing::info!(user_id = %ctx.user_id, alt = %ctx.nickname, neu, "Nickname geaendert");
    *ctx.nickname = neu.to_string();
    Ok(BefehlsErgebnis::Antwort(Frame::text(Flag::ChangeNick, neu)))
}

fn time_on(_args: &[&str], _store: &mut dyn Store, ctx: &mut BefehlsKontext<'_>) -> DbResult<BefehlsErgebnis> {
    *ctx.zeit_anzeigen = true;
    Ok(BefehlsErgebnis::Antwort(Frame::text(Flag::TimeOn, ZEIT_AN)))
}

fn time_off(_args: &[&str], _store: &mut dyn Store, ctx: &mut BefehlsKontext<'_>) -> DbResult<BefehlsErgebnis> {
    *ctx.zeit_anzeigen = false;
    Ok(BefehlsErgebnis::Antwort(Frame::text(Flag::TimeOff, ZEIT_AUS)))
}

fn voicemail_on(args: &[&str], _store: &mut dyn Store, _ctx: &mut BefehlsKontext<'_>) -> DbResult<BefehlsErgebnis> {
    Ok(BefehlsErgebnis::Voicemail(args[1].to_string()))
}

fn connect(_args: &[&str], _store: &mut dyn Store, ctx: &mut BefehlsKontext<'_>) -> DbResult<BefehlsErgebnis> {
    tracing::info!(user_id = %ctx.user_id, "Client wechselt den Server");
    Ok(BefehlsErgebnis::Trennen)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use plauderei_db::{BenutzerRecord, MemoryStore};

    fn store_mit(nicknames: &[&str]) -> (MemoryStore, Vec<UserId>) {
        let mut store = MemoryStore::neu();
        let mut ids = Vec::new();
        for (i, nick) in nicknames.iter().enumerate() {
            let id = UserId::new();
            store
                .put_user(BenutzerRecord {
                    id: id.clone(),
                    nickname: nick.to_string(),
                    login: format!("login{i}"),
                    password_hash: "hash".into(),
                })
                .unwrap();
            ids.push(id);
        }
        (store, ids)
    }

    fn befehl(store: &mut MemoryStore, user_id: &UserId, zeile: &str) -> BefehlsErgebnis {
        let mut nickname = String::from("x");
        let mut zeit = false;
        let mut ctx = BefehlsKontext {
            user_id,
            nickname: &mut nickname,
            zeit_anzeigen: &mut zeit,
        };
        ausfuehren(zeile, store, &mut ctx).unwrap()
    }

    fn text(ergebnis: BefehlsErgebnis) -> String {
        match ergebnis {
            BefehlsErgebnis::Antwort(frame) => frame.text_inhalt(),
            anderes => panic!("Antwort erwartet, erhalten: {anderes:?}"),
        }
    }

    #[test]
    fn join_ist_idempotent() {
        let (mut store, ids) = store_mit(&["Ann"]);
        assert_eq!(text(befehl(&mut store, &ids[0], "/join general")), BEIGETRETEN);
        assert_eq!(text(befehl(&mut store, &ids[0], "/join general")), BEREITS_MITGLIED);
        assert_eq!(store.get_channel_members("general").unwrap().len(), 1);
    }

    #[test]
    fn join_mit_ungueltigem_namen() {
        let (mut store, ids) = store_mit(&["Ann"]);
        match befehl(&mut store, &ids[0], "/join ../etc") {
            BefehlsErgebnis::Antwort(frame) => {
                assert_eq!(frame.flag, Flag::NoChannel);
                assert_eq!(frame.text_inhalt(), KANAL_EXISTIERT_NICHT);
            }
            anderes => panic!("unerwartet: {anderes:?}"),
        }
        assert!(store.list_channels().unwrap().is_empty());
    }

    #[test]
    fn exit_dann_read_ohne_zugriff() {
        let (mut store, ids) = store_mit(&["Ann"]);
        befehl(&mut store, &ids[0], "/join general");
        befehl(&mut store, &ids[0], "/send general hallo");
        assert_eq!(text(befehl(&mut store, &ids[0], "/exit general")), VERLASSEN);
        assert_eq!(text(befehl(&mut store, &ids[0], "/exit general")), KEIN_MITGLIED);
        assert_eq!(text(befehl(&mut store, &ids[0], "/read general")), KEIN_ZUGRIFF);
        assert_eq!(text(befehl(&mut store, &ids[0], "/exit nirgends")), KANAL_NICHT_GEFUNDEN);
    }

    #[test]
    fn send_und_read_in_reihenfolge() {
        let (mut store, ids) = store_mit(&["Ann", "Bob"]);
        befehl(&mut store, &ids[0], "/join general");
        befehl(&mut store, &ids[1], "/join general");
        assert_eq!(text(befehl(&mut store, &ids[0], "/read general")), KANAL_LEER);

        assert_eq!(text(befehl(&mut store, &ids[0], "/send general eins zwei")), GESENDET);
        befehl(&mut store, &ids[1], "/send general drei");
        befehl(&mut store, &ids[0], "/send general vier");

        assert_eq!(
            text(befehl(&mut store, &ids[1], "/read general")),
            "Ann: eins zwei\nBob: drei\nAnn: vier"
        );
    }

    #[test]
    fn nick_benennt_verlauf_rueckwirkend_um() {
        let (mut store, ids) = store_mit(&["Ann", "Bob"]);
        befehl(&mut store, &ids[0], "/join general");
        befehl(&mut store, &ids[0], "/send general hallo");

        match befehl(&mut store, &ids[0], "/nick Anna") {
            BefehlsErgebnis::Antwort(frame) => {
                assert_eq!(frame.flag, Flag::ChangeNick);
                assert_eq!(frame.text_inhalt(), "Anna");
            }
            anderes => panic!("unerwartet: {anderes:?}"),
        }
        assert_eq!(text(befehl(&mut store, &ids[0], "/read general")), "Anna: hallo");

        // Vergebener Nickname aendert nichts
        assert_eq!(text(befehl(&mut store, &ids[0], "/nick Bob")), NICKNAME_VERGEBEN);
        assert_eq!(
            store.find_user_by_id(&ids[0]).unwrap().unwrap().nickname,
            "Anna"
        );
    }

    #[test]
    fn zeit_anzeige_umschalten() {
        let (mut store, ids) = store_mit(&["Ann"]);
        let mut nickname = String::from("Ann");
        let mut zeit = false;
        let mut ctx = BefehlsKontext {
            user_id: &ids[0],
            nickname: &mut nickname,
            zeit_anzeigen: &mut zeit,
        };
        match ausfuehren("/time_on", &mut store, &mut ctx).unwrap() {
            BefehlsErgebnis::Antwort(frame) => assert_eq!(frame.flag, Flag::TimeOn),
            anderes => panic!("unerwartet: {anderes:?}"),
        }
        assert!(*ctx.zeit_anzeigen);

        ausfuehren("/join general", &mut store, &mut ctx).unwrap();
        ausfuehren("/send general hallo", &mut store, &mut ctx).unwrap();
        let BefehlsErgebnis::Antwort(frame) = ausfuehren("/read general", &mut store, &mut ctx).unwrap() else {
            panic!("Antwort erwartet");
        };
        let zeile = frame.text_inhalt();
        assert!(zeile.starts_with('['));
        assert!(zeile.ends_with("] Ann: hallo"));

        match ausfuehren("/time_off", &mut store, &mut ctx).unwrap() {
            BefehlsErgebnis::Antwort(frame) => assert_eq!(frame.text_inhalt(), ZEIT_AUS),
            anderes => panic!("unerwartet: {anderes:?}"),
        }
        assert!(!zeit);
    }

    #[test]
    fn kanalliste_zaehlt_mitglieder() {
        let (mut store, ids) = store_mit(&["Ann", "Bob"]);
        assert_eq!(text(befehl(&mut store, &ids[0], "/channels")), KEINE_KANAELE);
        befehl(&mut store, &ids[0], "/join a");
        befehl(&mut store, &ids[1], "/join a");
        befehl(&mut store, &ids[1], "/join b");
        assert_eq!(
            text(befehl(&mut store, &ids[0], "/channels")),
            "Name: a, Number of active users: 2\nName: b, Number of active users: 1\n"
        );
    }

    #[test]
    fn falsche_befehle_und_verwendung() {
        let (mut store, ids) = store_mit(&["Ann"]);
        assert_eq!(text(befehl(&mut store, &ids[0], "/tanzen")), FALSCHER_BEFEHL);
        assert_eq!(text(befehl(&mut store, &ids[0], "   ")), FALSCHER_BEFEHL);
        assert_eq!(
            text(befehl(&mut store, &ids[0], "/join")),
            "Error command, use: /join <channel>"
        );
        assert_eq!(
            text(befehl(&mut store, &ids[0], "/send general")),
            "Error command, use: /send <channel> <message>"
        );
    }

    #[test]
    fn voicemail_und_connect() {
        let (mut store, ids) = store_mit(&["Ann"]);
        assert_eq!(
            befehl(&mut store, &ids[0], "/voicemail_on 101"),
            BefehlsErgebnis::Voicemail("101".into())
        );
        assert_eq!(befehl(&mut store, &ids[0], "/connect"), BefehlsErgebnis::Trennen);
    }
}
