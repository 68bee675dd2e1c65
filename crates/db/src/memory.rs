//! In-Memory-Store
//!
//! Haelt alle Datensaetze im Speicher. Wird direkt fuer Tests und den
//! `memory`-Betrieb verwendet und dient dem `DateiStore` als Cache.

use plauderei_core::UserId;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{DbError, DbResult};
use crate::models::{kanalname_pruefen, BenutzerRecord, KanalRecord, VerlaufEintrag};
use crate::store::Store;

/// Store ohne Persistenz
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Vec<BenutzerRecord>,
    channels: BTreeMap<String, KanalRecord>,
}

impl MemoryStore {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Baut einen Store aus bereits geladenen Datensaetzen auf
    pub(crate) fn aus_daten(users: Vec<BenutzerRecord>, channels: Vec<KanalRecord>) -> Self {
        Self {
            users,
            channels: channels.into_iter().map(|k| (k.name.clone(), k)).collect(),
        }
    }

    /// Gibt den vollstaendigen Kanal zurueck
    pub fn kanal(&self, kanal: &str) -> DbResult<&KanalRecord> {
        self.channels
            .get(kanal)
            .ok_or_else(|| DbError::nicht_gefunden(format!("Kanal {kanal}")))
    }

    fn kanal_mut(&mut self, kanal: &str) -> DbResult<&mut KanalRecord> {
        self.channels
            .get_mut(kanal)
            .ok_or_else(|| DbError::nicht_gefunden(format!("Kanal {kanal}")))
    }

    /// Prueft die Eindeutigkeit eines neuen Benutzers ohne ihn anzulegen
    pub(crate) fn eindeutigkeit_pruefen(&self, user: &BenutzerRecord) -> DbResult<()> {
        for vorhanden in &self.users {
            if vorhanden.id == user.id {
                return Err(DbError::Eindeutigkeit(format!("ID {}", user.id)));
            }
            if vorhanden.login == user.login {
                return Err(DbError::Eindeutigkeit(format!("Login {}", user.login)));
            }
            if vorhanden.nickname == user.nickname {
                return Err(DbError::Eindeutigkeit(format!("Nickname {}", user.nickname)));
            }
        }
        Ok(())
    }

    /// Prueft ob ein Nickname von einem anderen Benutzer belegt ist
    pub(crate) fn nickname_belegt(&self, id: &UserId, nickname: &str) -> bool {
        self.users
            .iter()
            .any(|u| u.nickname == nickname && &u.id != id)
    }
}

impl Store for MemoryStore {
    fn get_users(&self) -> DbResult<Vec<BenutzerRecord>> {
        Ok(self.users.clone())
    }

    fn put_user(&mut self, user: BenutzerRecord) -> DbResult<()> {
        self.eindeutigkeit_pruefen(&user)?;
        self.users.push(user);
        Ok(())
    }

    fn rename_user(&mut self, id: &UserId, nickname: &str) -> DbResult<()> {
        if self.nickname_belegt(id, nickname) {
            return Err(DbError::Eindeutigkeit(format!("Nickname {nickname}")));
        }
        let user = self
            .users
            .iter_mut()
            .find(|u| &u.id == id)
            .ok_or_else(|| DbError::nicht_gefunden(format!("Benutzer {id}")))?;
        user.nickname = nickname.to_string();
        Ok(())
    }

    fn channel_exists(&self, kanal: &str) -> DbResult<bool> {
        Ok(self.channels.contains_key(kanal))
    }

    fn create_channel(&mut self, kanal: &str) -> DbResult<bool> {
        kanalname_pruefen(kanal)?;
        if self.channels.contains_key(kanal) {
            return Ok(false);
        }
        self.channels.insert(kanal.to_string(), KanalRecord::neu(kanal));
        Ok(true)
    }

    fn list_channels(&self) -> DbResult<Vec<String>> {
        Ok(self.channels.keys().cloned().collect())
    }

    fn delete_channel(&mut self, kanal: &str) -> DbResult<bool> {
        Ok(self.channels.remove(kanal).is_some())
    }

    fn get_channel_members(&self, kanal: &str) -> DbResult<BTreeSet<UserId>> {
        Ok(self.kanal(kanal)?.members.clone())
    }

    fn add_channel_member(&mut self, kanal: &str, id: &UserId) -> DbResult<bool> {
        Ok(self.kanal_mut(kanal)?.members.insert(id.clone()))
    }

    fn remove_channel_member(&mut self, kanal: &str, id: &UserId) -> DbResult<bool> {
        Ok(self.kanal_mut(kanal)?.members.remove(id))
    }

    fn get_channel_history(&self, kanal: &str) -> DbResult<Vec<VerlaufEintrag>> {
        Ok(self.kanal(kanal)?.history.clone())
    }

    fn append_history(&mut self, kanal: &str, eintrag: VerlaufEintrag) -> DbResult<()> {
        self.kanal_mut(kanal)?.history.push(eintrag);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn benutzer(id: &str, login: &str, nick: &str) -> BenutzerRecord {
        BenutzerRecord {
            id: UserId::from(id),
            nickname: nick.into(),
            login: login.into(),
            password_hash: "hash".into(),
        }
    }

    #[test]
    fn benutzer_eindeutigkeit() {
        let mut store = MemoryStore::neu();
        store.put_user(benutzer("1", "ann1", "Ann")).unwrap();

        let doppelt_nick = store.put_user(benutzer("2", "bob1", "Ann"));
        assert!(doppelt_nick.unwrap_err().ist_eindeutigkeit());

        let doppelt_login = store.put_user(benutzer("3", "ann1", "Bob"));
        assert!(doppelt_login.unwrap_err().ist_eindeutigkeit());

        // Fehlgeschlagene Anlage darf den Store nicht veraendern
        assert_eq!(store.get_users().unwrap().len(), 1);
    }

    #[test]
    fn umbenennen() {
        let mut store = MemoryStore::neu();
        store.put_user(benutzer("1", "ann1", "Ann")).unwrap();
        store.put_user(benutzer("2", "bob1", "Bob")).unwrap();

        store.rename_user(&UserId::from("1"), "Anna").unwrap();
        assert_eq!(
            store.find_user_by_id(&UserId::from("1")).unwrap().unwrap().nickname,
            "Anna"
        );
        assert!(store.rename_user(&UserId::from("1"), "Bob").is_err());
        assert!(store.rename_user(&UserId::from("9"), "Neu").is_err());
    }

    #[test]
    fn mitgliedschaft_idempotent() {
        let mut store = MemoryStore::neu();
        let uid = UserId::from("1");
        assert!(store.create_channel("general").unwrap());
        assert!(!store.create_channel("general").unwrap());

        assert!(store.add_channel_member("general", &uid).unwrap());
        assert!(!store.add_channel_member("general", &uid).unwrap());
        assert_eq!(store.get_channel_members("general").unwrap().len(), 1);

        assert!(store.remove_channel_member("general", &uid).unwrap());
        assert!(!store.remove_channel_member("general", &uid).unwrap());
    }

    #[test]
    fn fehlender_kanal() {
        let mut store = MemoryStore::neu();
        assert!(!store.channel_exists("x").unwrap());
        assert!(store.get_channel_members("x").is_err());
        assert!(store.add_channel_member("x", &UserId::from("1")).is_err());
        assert!(!store.delete_channel("x").unwrap());
    }

    #[test]
    fn verlauf_reihenfolge() {
        let mut store = MemoryStore::neu();
        store.create_channel("c").unwrap();
        for i in 0..3 {
            store
                .append_history(
                    "c",
                    VerlaufEintrag::Text {
                        time: Utc::now(),
                        user_id: UserId::from("1"),
                        message: format!("m{i}"),
                    },
                )
                .unwrap();
        }
        let verlauf = store.get_channel_history("c").unwrap();
        let texte: Vec<_> = verlauf
            .iter()
            .map(|e| match e {
                VerlaufEintrag::Text { message, .. } => message.clone(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(texte, vec!["m0", "m1", "m2"]);
    }
}
