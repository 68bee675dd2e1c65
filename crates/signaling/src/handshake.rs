//! Anmelde- und Registrierungs-Zustandsmaschine
//!
//! Fehlschlaege (Syntax, Eindeutigkeit, falsches Passwort) erzeugen keine
//! Antwort und keinen Zustandswechsel. Der Client wiederholt den Schritt,
//! die Verbindung bleibt bestehen.

use plauderei_auth::{kennung_pruefen, passwort_pruefen, PasswortHasher};
use plauderei_core::UserId;
use plauderei_db::models::kanalname_pruefen;
use plauderei_db::BenutzerRecord;
use plauderei_protocol::{Flag, Frame};

use crate::broadcast::ClientSender;
use crate::server_state::SignalingState;
use crate::session::{AnmeldeModus, AuthPhase, Session};

pub const LOGIN_KORREKT: &str = "Login correct";
pub const PASSWORT_KORREKT: &str = "Password correct";
pub const NICKNAME_KORREKT: &str = "Nickname correct";
pub const REGISTRIERT: &str = "Registered successfully";

/// Verarbeitet einen Handshake-Frame und liefert die direkten Antworten
pub async fn verarbeiten(
    state: &SignalingState,
    session: &mut Session,
    flag: Flag,
    inhalt: &str,
) -> Vec<Frame> {
    match flag {
        Flag::LoginSignUp => login_pruefen(state, session, inhalt, AnmeldeModus::Registrierung),
        Flag::LoginLogIn => login_pruefen(state, session, inhalt, AnmeldeModus::Anmeldung),
        Flag::PasswordSignUp => passwort_registrieren(state, session, inhalt).await,
        Flag::PasswordLogIn => passwort_anmelden(state, session, inhalt).await,
        Flag::Nick | Flag::NickSignUp => nickname_registrieren(state, session, inhalt),
        Flag::CheckId => id_senden(state, session),
        Flag::Id => id_bestaetigen(state, session, inhalt),
        Flag::Channel => {
            kanal_merken(state, session, inhalt);
            Vec::new()
        }
        andere => {
            tracing::debug!(verbindung = %session.verbindung, flag = ?andere, "Flag ignoriert");
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

fn login_pruefen(
    state: &SignalingState,
    session: &mut Session,
    login: &str,
    modus: AnmeldeModus,
) -> Vec<Frame> {
    if session.ist_autorisiert() {
        tracing::debug!(verbindung = %session.verbindung, "Login nach Autorisierung ignoriert");
        return Vec::new();
    }
    if let Err(e) = kennung_pruefen("login", login) {
        tracing::info!(verbindung = %session.verbindung, fehler = %e, "Login abgelehnt");
        return Vec::new();
    }

    let vorhanden = match state.store.lock().find_user_by_login(login) {
        Ok(user) => user.is_some(),
        Err(e) => {
            tracing::error!(fehler = %e, "Store-Fehler bei Login-Pruefung");
            return Vec::new();
        }
    };

    // Registrierung braucht einen freien, Anmeldung einen vorhandenen Login
    let akzeptiert = match modus {
        AnmeldeModus::Registrierung => !vorhanden,
        AnmeldeModus::Anmeldung => vorhanden,
    };
    if !akzeptiert {
        tracing::info!(verbindung = %session.verbindung, login, ?modus, "Login nicht akzeptiert");
        return Vec::new();
    }

    tracing::info!(verbindung = %session.verbindung, login, ?modus, "Login akzeptiert");
    session.phase = AuthPhase::WartetAufPasswort {
        login: login.to_string(),
        modus,
    };
    vec![Frame::text(Flag::CheckLogin, LOGIN_KORREKT)]
}

// ---------------------------------------------------------------------------
// Passwort
// ---------------------------------------------------------------------------

async fn passwort_registrieren(
    state: &SignalingState,
    session: &mut Session,
    passwort: &str,
) -> Vec<Frame> {
    let login = match &session.phase {
        AuthPhase::WartetAufPasswort {
            login,
            modus: AnmeldeModus::Registrierung,
        } => login.clone(),
        _ => {
            tracing::debug!(verbindung = %session.verbindung, "PASSWORD_SIGN_UP ausserhalb der Registrierung");
            return Vec::new();
        }
    };
    if let Err(e) = passwort_pruefen(passwort) {
        tracing::info!(verbindung = %session.verbindung, fehler = %e, "Passwort abgelehnt");
        return Vec::new();
    }

    let Some(password_hash) = hash_berechnen(&state.hasher, passwort).await else {
        return Vec::new();
    };

    session.phase = AuthPhase::WartetAufNickname {
        login,
        password_hash,
    };
    vec![Frame::text(Flag::CheckPassword, PASSWORT_KORREKT)]
}

async fn passwort_anmelden(
    state: &SignalingState,
    session: &mut Session,
    passwort: &str,
) -> Vec<Frame> {
    let login = match &session.phase {
        AuthPhase::WartetAufPasswort {
            login,
            modus: AnmeldeModus::Anmeldung,
        } => login.clone(),
        _ => {
            tracing::debug!(verbindung = %session.verbindung, "PASSWORD_LOG_IN ohne akzeptierten Login");
            return Vec::new();
        }
    };

    let user = match state.store.lock().find_user_by_login(&login) {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!(login, "Benutzer zwischen Login und Passwort verschwunden");
            return Vec::new();
        }
        Err(e) => {
            tracing::error!(fehler = %e, "Store-Fehler bei Anmeldung");
            return Vec::new();
        }
    };

    let hasher = state.hasher.clone();
    let pw = passwort.to_string();
    let hash = user.password_hash.clone();
    let korrekt = match tokio::task::spawn_blocking(move || hasher.pruefen(&pw, &hash)).await {
        Ok(Ok(korrekt)) => korrekt,
        Ok(Err(e)) => {
            tracing::error!(user_id = %user.id, fehler = %e, "Passwort-Hash nicht pruefbar");
            false
        }
        Err(e) => {
            tracing::error!(fehler = %e, "Passwort-Pruefung abgebrochen");
            false
        }
    };
    if !korrekt {
        tracing::info!(verbindung = %session.verbindung, login, "Falsches Passwort");
        return Vec::new();
    }

    tracing::info!(verbindung = %session.verbindung, user_id = %user.id, "Anmeldung erfolgreich");
    session.phase = AuthPhase::Autorisiert;
    session.user_id = Some(user.id);
    session.login = Some(user.login);
    session.nickname = Some(user.nickname.clone());
    vec![Frame::text(Flag::Authorized, user.nickname)]
}

async fn hash_berechnen(hasher: &PasswortHasher, passwort: &str) -> Option<String> {
    let hasher = hasher.clone();
    let pw = passwort.to_string();
    match tokio::task::spawn_blocking(move || hasher.hashen(&pw)).await {
        Ok(Ok(hash)) => Some(hash),
        Ok(Err(e)) => {
            tracing::error!(fehler = %e, "Passwort-Hashing fehlgeschlagen");
            None
        }
        Err(e) => {
            tracing::error!(fehler = %e, "Passwort-Hashing abgebrochen");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Nickname (Registrierung)
// ---------------------------------------------------------------------------

fn nickname_registrieren(state: &SignalingState, session: &mut Session, nickname: &str) -> Vec<Frame> {
    let (login, password_hash) = match &session.phase {
        AuthPhase::WartetAufNickname {
            login,
            password_hash,
        } => (login.clone(), password_hash.clone()),
        _ => {
            tracing::debug!(verbindung = %session.verbindung, "NICK ausserhalb der Registrierung");
            return Vec::new();
        }
    };
    if let Err(e) = kennung_pruefen("nickname", nickname) {
        tracing::info!(verbindung = %session.verbindung, fehler = %e, "Nickname abgelehnt");
        return Vec::new();
    }

    let user = BenutzerRecord {
        id: UserId::new(),
        nickname: nickname.to_string(),
        login: login.clone(),
        password_hash,
    };

    {
        let mut store = state.store.lock();
        // put_user prueft Login- und Nickname-Eindeutigkeit und veraendert
        // bei einem Konflikt nichts
        if let Err(e) = store.put_user(user.clone()) {
            if e.ist_eindeutigkeit() {
                tracing::info!(verbindung = %session.verbindung, fehler = %e, "Registrierung abgelehnt");
            } else {
                tracing::error!(fehler = %e, "Store-Fehler bei Registrierung");
            }
            return Vec::new();
        }

        if let Some(kanal) = &session.ausstehender_kanal {
            match store.add_channel_member(kanal, &user.id) {
                Ok(_) => tracing::info!(user_id = %user.id, kanal, "Neuer Benutzer dem Kanal hinzugefuegt"),
                Err(e) => tracing::warn!(user_id = %user.id, kanal, fehler = %e, "Kanal-Beitritt nach Registrierung fehlgeschlagen"),
            }
        }
    }

    tracing::info!(verbindung = %session.verbindung, user_id = %user.id, login, nickname, "Benutzer registriert");
    session.phase = AuthPhase::Autorisiert;
    session.user_id = Some(user.id);
    session.login = Some(user.login);
    session.nickname = Some(user.nickname);
    vec![
        Frame::text(Flag::CheckNickname, NICKNAME_KORREKT),
        Frame::text(Flag::Registered, REGISTRIERT),
    ]
}

// ---------------------------------------------------------------------------
// ID-Handshake
// ---------------------------------------------------------------------------

fn id_senden(state: &SignalingState, session: &mut Session) -> Vec<Frame> {
    let Some(login) = session.login.clone().filter(|_| session.ist_autorisiert()) else {
        tracing::debug!(verbindung = %session.verbindung, "CHECK_ID vor Autorisierung");
        return Vec::new();
    };

    let user = match state.store.lock().find_user_by_login(&login) {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!(login, "CHECK_ID fuer unbekannten Login");
            return Vec::new();
        }
        Err(e) => {
            tracing::error!(fehler = %e, "Store-Fehler bei CHECK_ID");
            return Vec::new();
        }
    };

    session.wartet_auf_id = true;
    session.user_id = Some(user.id.clone());
    vec![Frame::text(Flag::Id, user.id.as_str())]
}

fn id_bestaetigen(state: &SignalingState, session: &mut Session, id: &str) -> Vec<Frame> {
    if !session.wartet_auf_id {
        tracing::debug!(verbindung = %session.verbindung, "ID ohne vorheriges CHECK_ID");
        return Vec::new();
    }
    let Some(user_id) = session.user_id.clone().filter(|u| u.as_str() == id) else {
        tracing::warn!(verbindung = %session.verbindung, "ID-Echo stimmt nicht ueberein");
        return Vec::new();
    };

    // Nickname frisch lesen, er kann sich seit der Anmeldung geaendert haben
    let nickname = match state.store.lock().find_user_by_id(&user_id) {
        Ok(Some(user)) => user.nickname,
        Ok(None) => {
            tracing::warn!(user_id = %user_id, "ID-Bestaetigung fuer geloeschten Benutzer");
            return Vec::new();
        }
        Err(e) => {
            tracing::error!(fehler = %e, "Store-Fehler bei ID-Bestaetigung");
            return Vec::new();
        }
    };

    session.wartet_auf_id = false;
    session.freigeschaltet = true;
    session.nickname = Some(nickname.clone());

    state.broadcaster.client_registrieren(ClientSender {
        user_id: user_id.clone(),
        verbindung: session.verbindung,
        tx: session.ausgang.clone(),
    });

    tracing::info!(verbindung = %session.verbindung, user_id = %user_id, "ID-Handshake abgeschlossen");
    vec![Frame::text(Flag::IdCorrect, nickname)]
}

// ---------------------------------------------------------------------------
// CHANNEL
// ---------------------------------------------------------------------------

/// Merkt den Kanal fuer die Registrierung und legt ihn bei Bedarf an
fn kanal_merken(state: &SignalingState, session: &mut Session, kanal: &str) {
    if let Err(e) = kanalname_pruefen(kanal) {
        tracing::warn!(verbindung = %session.verbindung, fehler = %e, "CHANNEL mit ungueltigem Namen");
        return;
    }
    match state.store.lock().create_channel(kanal) {
        Ok(true) => tracing::info!(kanal, "Kanal angelegt"),
        Ok(false) => {}
        Err(e) => {
            tracing::error!(kanal, fehler = %e, "Kanal konnte nicht angelegt werden");
            return;
        }
    }
    session.ausstehender_kanal = Some(kanal.to_string());
}
