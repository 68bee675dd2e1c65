//! Store-Trait
//!
//! Einfache CRUD-Schnittstelle fuer Benutzer, Kanaele, Mitgliedschaften und
//! Verlaeufe. Implementierungen sind nicht thread-safe; jede Lese-dann-
//! Schreib-Sequenz muss vom Aufrufer unter einem Lock ausgefuehrt werden.

use plauderei_core::UserId;
use std::collections::BTreeSet;

use crate::error::DbResult;
use crate::models::{BenutzerRecord, VerlaufEintrag};

/// Persistente Ablage fuer Benutzer, Kanaele und Verlaeufe
pub trait Store: Send {
    // --- Benutzer ---

    /// Alle bekannten Benutzer
    fn get_users(&self) -> DbResult<Vec<BenutzerRecord>>;

    /// Legt einen neuen Benutzer an (ID, Login und Nickname muessen eindeutig sein)
    fn put_user(&mut self, user: BenutzerRecord) -> DbResult<()>;

    /// Aendert den Nickname eines Benutzers
    fn rename_user(&mut self, id: &UserId, nickname: &str) -> DbResult<()>;

    // --- Kanaele ---

    fn channel_exists(&self, kanal: &str) -> DbResult<bool>;

    /// Legt einen Kanal an; `false` wenn er bereits existiert
    fn create_channel(&mut self, kanal: &str) -> DbResult<bool>;

    /// Alle Kanalnamen in stabiler Reihenfolge
    fn list_channels(&self) -> DbResult<Vec<String>>;

    /// Entfernt Kanal, Mitglieder und Verlauf; `false` wenn er nicht existierte
    fn delete_channel(&mut self, kanal: &str) -> DbResult<bool>;

    // --- Mitgliedschaft ---

    fn get_channel_members(&self, kanal: &str) -> DbResult<BTreeSet<UserId>>;

    /// Fuegt ein Mitglied hinzu; `false` wenn es bereits Mitglied war
    fn add_channel_member(&mut self, kanal: &str, id: &UserId) -> DbResult<bool>;

    /// Entfernt ein Mitglied; `false` wenn es kein Mitglied war
    fn remove_channel_member(&mut self, kanal: &str, id: &UserId) -> DbResult<bool>;

    // --- Verlauf ---

    fn get_channel_history(&self, kanal: &str) -> DbResult<Vec<VerlaufEintrag>>;

    fn append_history(&mut self, kanal: &str, eintrag: VerlaufEintrag) -> DbResult<()>;

    // --- Abgeleitete Abfragen ---

    fn find_user_by_id(&self, id: &UserId) -> DbResult<Option<BenutzerRecord>> {
        Ok(self.get_users()?.into_iter().find(|u| &u.id == id))
    }

    fn find_user_by_login(&self, login: &str) -> DbResult<Option<BenutzerRecord>> {
        Ok(self.get_users()?.into_iter().find(|u| u.login == login))
    }

    fn find_user_by_nickname(&self, nickname: &str) -> DbResult<Option<BenutzerRecord>> {
        Ok(self.get_users()?.into_iter().find(|u| u.nickname == nickname))
    }

    fn is_member(&self, kanal: &str, id: &UserId) -> DbResult<bool> {
        Ok(self.get_channel_members(kanal)?.contains(id))
    }
}
