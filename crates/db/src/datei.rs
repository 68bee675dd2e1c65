//! Dateisystem-Store
//!
//! Persistiert alle Datensaetze unterhalb eines Basisverzeichnisses:
//!
//! ```text
//! <basis>/users.jsonl                   ein BenutzerRecord pro Zeile
//! <basis>/channels/<kanal>/members.json JSON-Array der Mitglieds-IDs
//! <basis>/channels/<kanal>/history.jsonl ein VerlaufEintrag pro Zeile
//! ```
//!
//! Beim Oeffnen wird alles in einen `MemoryStore` geladen; jede Aenderung
//! wird zuerst auf die Platte geschrieben und erst danach im Cache
//! uebernommen.

use plauderei_core::UserId;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{DbError, DbResult};
use crate::memory::MemoryStore;
use crate::models::{kanalname_pruefen, BenutzerRecord, KanalRecord, VerlaufEintrag};
use crate::store::Store;

const BENUTZER_DATEI: &str = "users.jsonl";
const KANAL_VERZEICHNIS: &str = "channels";
const MITGLIEDER_DATEI: &str = "members.json";
const VERLAUF_DATEI: &str = "history.jsonl";

/// Store mit Persistenz im Dateisystem
///
/// Alle Zugriffe sind synchron und laufen unter der groben Store-Sperre
/// direkt im aufrufenden Tokio-Task. Jede Aenderung schreibt eine einzelne
/// kleine Datei (`members.json`, eine Verlaufszeile) oder die
/// Benutzerliste neu. Das Schreiben muss vor dem Freigeben der Sperre
/// abgeschlossen sein, sonst koennten zwei Aenderungen in vertauschter
/// Reihenfolge auf der Platte landen; ein Auslagern per `spawn_blocking`
/// haette die Sperre dafuer ueber einen `.await` halten muessen.
#[derive(Debug)]
pub struct DateiStore {
    basis: PathBuf,
    cache: MemoryStore,
}

impl DateiStore {
    /// Oeffnet (oder erstellt) einen Store im angegebenen Verzeichnis
    pub fn oeffnen(basis: impl Into<PathBuf>) -> DbResult<Self> {
        let basis = basis.into();
        fs::create_dir_all(basis.join(KANAL_VERZEICHNIS))?;

        let users = json_zeilen_lesen::<BenutzerRecord>(&basis.join(BENUTZER_DATEI))?;

        let mut channels = Vec::new();
        for eintrag in fs::read_dir(basis.join(KANAL_VERZEICHNIS))? {
            let eintrag = eintrag?;
            if !eintrag.file_type()?.is_dir() {
                continue;
            }
            let name = eintrag.file_name().to_string_lossy().into_owned();
            if kanalname_pruefen(&name).is_err() {
                tracing::warn!(kanal = %name, "Ungueltiges Kanalverzeichnis uebersprungen");
                continue;
            }
            let pfad = eintrag.path();
            let members = match fs::read(pfad.join(MITGLIEDER_DATEI)) {
                Ok(bytes) => serde_json::from_slice::<BTreeSet<UserId>>(&bytes)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
                Err(e) => return Err(e.into()),
            };
            let history = json_zeilen_lesen::<VerlaufEintrag>(&pfad.join(VERLAUF_DATEI))?;
            channels.push(KanalRecord {
                name,
                members,
                history,
            });
        }

        tracing::info!(
            pfad = %basis.display(),
            benutzer = users.len(),
            kanaele = channels.len(),
            "Datei-Store geladen"
        );

        Ok(Self {
            basis,
            cache: MemoryStore::aus_daten(users, channels),
        })
    }

    /// Basisverzeichnis des Stores
    pub fn basis(&self) -> &Path {
        &self.basis
    }

    fn kanal_pfad(&self, kanal: &str) -> PathBuf {
        self.basis.join(KANAL_VERZEICHNIS).join(kanal)
    }

    fn benutzer_schreiben(&self, users: &[BenutzerRecord]) -> DbResult<()> {
        let mut inhalt = Vec::new();
        for user in users {
            serde_json::to_writer(&mut inhalt, user)?;
            inhalt.push(b'\n');
        }
        atomar_schreiben(&self.basis.join(BENUTZER_DATEI), &inhalt)
    }

    fn mitglieder_schreiben(&self, kanal: &str, members: &BTreeSet<UserId>) -> DbResult<()> {
        let inhalt = serde_json::to_vec(members)?;
        atomar_schreiben(&self.kanal_pfad(kanal).join(MITGLIEDER_DATEI), &inhalt)
    }
}

impl Store for DateiStore {
    fn get_users(&self) -> DbResult<Vec<BenutzerRecord>> {
        self.cache.get_users()
    }

    fn put_user(&mut self, user: BenutzerRecord) -> DbResult<()> {
        self.cache.eindeutigkeit_pruefen(&user)?;
        let mut users = self.cache.get_users()?;
        users.push(user.clone());
        self.benutzer_schreiben(&users)?;
        self.cache.put_user(user)
    }

    fn rename_user(&mut self, id: &UserId, nickname: &str) -> DbResult<()> {
        if self.cache.nickname_belegt(id, nickname) {
            return Err(DbError::Eindeutigkeit(format!("Nickname {nickname}")));
        }
        let mut users = self.cache.get_users()?;
        let user = users
            .iter_mut()
            .find(|u| &u.id == id)
            .ok_or_else(|| DbError::nicht_gefunden(format!("Benutzer {id}")))?;
        user.nickname = nickname.to_string();
        self.benutzer_schreiben(&users)?;
        self.cache.rename_user(id, nickname)
    }

    fn channel_exists(&self, kanal: &str) -> DbResult<bool> {
        self.cache.channel_exists(kanal)
    }

    fn create_channel(&mut self, kanal: &str) -> DbResult<bool> {
        kanalname_pruefen(kanal)?;
        if self.cache.channel_exists(kanal)? {
            return Ok(false);
        }
        fs::create_dir_all(self.kanal_pfad(kanal))?;
        self.mitglieder_schreiben(kanal, &BTreeSet::new())?;
        self.cache.create_channel(kanal)
    }

    fn list_channels(&self) -> DbResult<Vec<String>> {
        self.cache.list_channels()
    }

    fn delete_channel(&mut self, kanal: &str) -> DbResult<bool> {
        if !self.cache.channel_exists(kanal)? {
            return Ok(false);
        }
        match fs::remove_dir_all(self.kanal_pfad(kanal)) {
            Ok(()) => {}
            // Bereits geloescht – kein Fehler
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.cache.delete_channel(kanal)
    }

    fn get_channel_members(&self, kanal: &str) -> DbResult<BTreeSet<UserId>> {
        self.cache.get_channel_members(kanal)
    }

    fn add_channel_member(&mut self, kanal: &str, id: &UserId) -> DbResult<bool> {
        let mut members = self.cache.get_channel_members(kanal)?;
        if !members.insert(id.clone()) {
            return Ok(false);
        }
        self.mitglieder_schreiben(kanal, &members)?;
        self.cache.add_channel_member(kanal, id)
    }

    fn remove_channel_member(&mut self, kanal: &str, id: &UserId) -> DbResult<bool> {
        let mut members = self.cache.get_channel_members(kanal)?;
        if !members.remove(id) {
            return Ok(false);
        }
        self.mitglieder_schreiben(kanal, &members)?;
        self.cache.remove_channel_member(kanal, id)
    }

    fn get_channel_history(&self, kanal: &str) -> DbResult<Vec<VerlaufEintrag>> {
        self.cache.get_channel_history(kanal)
    }

    fn append_history(&mut self, kanal: &str, eintrag: VerlaufEintrag) -> DbResult<()> {
        // Existenz pruefen bevor die Datei angelegt wird
        self.cache.kanal(kanal)?;

        let mut zeile = serde_json::to_vec(&eintrag)?;
        zeile.push(b'\n');
        let mut datei = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.kanal_pfad(kanal).join(VERLAUF_DATEI))?;
        datei.write_all(&zeile)?;

        self.cache.append_history(kanal, eintrag)
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

/// Liest eine JSON-Lines-Datei; eine fehlende Datei ergibt eine leere Liste
///
/// Eine letzte Zeile ohne Zeilenende stammt von einem abgebrochenen
/// Schreibvorgang. Ist sie kein gueltiges JSON, wird sie verworfen und die
/// Datei auf das letzte Zeilenende gekuerzt, damit folgende Anhaenge nicht
/// an das Bruchstueck geraten. Kaputte Zeilen davor bleiben ein Fehler.
fn json_zeilen_lesen<T: serde::de::DeserializeOwned>(pfad: &Path) -> DbResult<Vec<T>> {
    let inhalt = match fs::read_to_string(pfad) {
        Ok(inhalt) => inhalt,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let (vollstaendig, rest) = inhalt.split_at(inhalt.rfind('\n').map_or(0, |i| i + 1));

    let mut datensaetze = vollstaendig
        .lines()
        .filter(|zeile| !zeile.trim().is_empty())
        .map(|zeile| serde_json::from_str(zeile).map_err(DbError::from))
        .collect::<DbResult<Vec<T>>>()?;

    if rest.trim().is_empty() {
        return Ok(datensaetze);
    }
    match serde_json::from_str(rest) {
        Ok(datensatz) => {
            // Nur das Zeilenende fehlt
            datensaetze.push(datensatz);
            fs::OpenOptions::new().append(true).open(pfad)?.write_all(b"\n")?;
        }
        Err(e) => {
            tracing::warn!(
                pfad = %pfad.display(),
                bytes = rest.len(),
                fehler = %e,
                "Abgerissene letzte Zeile verworfen"
            );
            fs::OpenOptions::new()
                .write(true)
                .open(pfad)?
                .set_len(vollstaendig.len() as u64)?;
        }
    }
    Ok(datensaetze)
}

/// Schreibt ueber eine temporaere Datei und benennt sie danach um
fn atomar_schreiben(pfad: &Path, inhalt: &[u8]) -> DbResult<()> {
    let tmp = pfad.with_extension("tmp");
    fs::write(&tmp, inhalt)?;
    fs::rename(&tmp, pfad)?;
    Ok(())
}
