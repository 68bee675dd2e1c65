//! Syntaxpruefung fuer Anmeldedaten
//!
//! Login und Nickname folgen denselben Regeln:
//! - 3 bis 24 Zeichen
//! - beginnt mit einem Buchstaben
//! - nur Buchstaben, Ziffern und `_` `.` `-`
//! - kein doppelter Unterstrich
//!
//! Passwoerter:
//! - 8 bis 64 Zeichen, keine Leerzeichen
//! - mindestens je ein Gross- und Kleinbuchstabe, eine Ziffer und ein Sonderzeichen
//! - kein Zeichen viermal oder oefter hintereinander

use crate::error::{AuthError, AuthResult};

/// Erlaubte Sonderzeichen in Passwoertern
pub const SONDERZEICHEN: &str = "!@#$%^&*()-_=+[]{}|;:,.<>?/~";

/// Prueft Login oder Nickname
///
/// `feld` erscheint in der Fehlermeldung ("login" oder "nickname").
pub fn kennung_pruefen(feld: &'static str, wert: &str) -> AuthResult<()> {
    let laenge = wert.chars().count();
    if !(3..=24).contains(&laenge) {
        return Err(AuthError::format(feld, format!("Laenge {laenge} nicht in 3..=24")));
    }

    if !wert.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(AuthError::format(feld, "muss mit einem Buchstaben beginnen"));
    }

    if let Some(c) = wert
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(AuthError::format(feld, format!("unerlaubtes Zeichen {c:?}")));
    }

    if wert.contains("__") {
        return Err(AuthError::format(feld, "doppelter Unterstrich"));
    }

    Ok(())
}

/// Prueft die Passwort-Regeln
pub fn passwort_pruefen(passwort: &str) -> AuthResult<()> {
    const FELD: &str = "password";

    let laenge = passwort.chars().count();
    if !(8..=64).contains(&laenge) {
        return Err(AuthError::format(FELD, format!("Laenge {laenge} nicht in 8..=64")));
    }

    if passwort.chars().any(char::is_whitespace) {
        return Err(AuthError::format(FELD, "enthaelt Leerzeichen"));
    }

    let gross = passwort.chars().any(|c| c.is_ascii_uppercase());
    let klein = passwort.chars().any(|c| c.is_ascii_lowercase());
    let ziffer = passwort.chars().any(|c| c.is_ascii_digit());
    let sonder = passwort.chars().any(|c| SONDERZEICHEN.contains(c));
    if !(gross && klein && ziffer && sonder) {
        return Err(AuthError::format(
            FELD,
            "benoetigt Gross- und Kleinbuchstaben, Ziffer und Sonderzeichen",
        ));
    }

    let zeichen: Vec<char> = passwort.chars().collect();
    if zeichen
        .windows(4)
        .any(|w| w.iter().all(|&c| c == w[0]))
    {
        return Err(AuthError::format(FELD, "Zeichen 4x hintereinander"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gueltige_kennungen() {
        for wert in ["ann1", "Ann", "a.b-c_d", "abc", "x23456789012345678901234"] {
            assert!(kennung_pruefen("login", wert).is_ok(), "{wert} muss gueltig sein");
        }
    }

    #[test]
    fn ungueltige_kennungen() {
        for wert in [
            "ab",                          // zu kurz
            "x234567890123456789012345",   // zu lang
            "1ann",                        // beginnt mit Ziffer
            "_ann",                        // beginnt mit Unterstrich
            ".ann",
            "an n",                        // Leerzeichen
            "ann!",                        // Sonderzeichen
            "a__b",                        // doppelter Unterstrich
            "",
        ] {
            assert!(kennung_pruefen("nickname", wert).is_err(), "{wert:?} muss ungueltig sein");
        }
    }

    #[test]
    fn gueltige_passwoerter() {
        assert!(passwort_pruefen("Abcdef1!").is_ok());
        assert!(passwort_pruefen("xY9~aaab").is_ok());
    }

    #[test]
    fn ungueltige_passwoerter() {
        assert!(passwort_pruefen("Abc1!").is_err(), "zu kurz");
        assert!(passwort_pruefen(&"Ab1!".repeat(17)).is_err(), "zu lang");
        assert!(passwort_pruefen("abcdef1!").is_err(), "kein Grossbuchstabe");
        assert!(passwort_pruefen("ABCDEF1!").is_err(), "kein Kleinbuchstabe");
        assert!(passwort_pruefen("Abcdefg!").is_err(), "keine Ziffer");
        assert!(passwort_pruefen("Abcdefg1").is_err(), "kein Sonderzeichen");
        assert!(passwort_pruefen("Abc def1!").is_err(), "Leerzeichen");
        assert!(passwort_pruefen("Aaaaab1!").is_err(), "vier gleiche Zeichen");
    }

    #[test]
    fn drei_gleiche_zeichen_sind_erlaubt() {
        assert!(passwort_pruefen("Aaaab1!x").is_ok());
    }

    #[test]
    fn fehlermeldung_nennt_feld() {
        let e = kennung_pruefen("nickname", "1x").unwrap_err();
        assert!(e.to_string().contains("nickname"));
    }
}
