//! Tests fuer die Ablage von Voicemails und Dateien

use std::sync::Arc;

use crate::error::ChatError;
use crate::media::{endung_von, wav_dauer, MedienDienst, ERSTE_ID};
use crate::storage::DiskStorage;

fn dienst(max: usize) -> (MedienDienst<DiskStorage>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Temp-Verzeichnis konnte nicht erstellt werden");
    let storage = Arc::new(DiskStorage::new(dir.path()));
    (MedienDienst::neu(storage, max), dir)
}

/// Minimale PCM-WAV-Datei (16 bit, mono)
fn wav(sample_rate: u32, samples: usize) -> Vec<u8> {
    let data_len = (samples * 2) as u32;
    let byte_rate = sample_rate * 2;
    let mut v = Vec::new();
    v.extend_from_slice(b"RIFF");
    v.extend_from_slice(&(36 + data_len).to_le_bytes());
    v.extend_from_slice(b"WAVE");
    v.extend_from_slice(b"fmt ");
    v.extend_from_slice(&16u32.to_le_bytes());
    v.extend_from_slice(&1u16.to_le_bytes()); // PCM
    v.extend_from_slice(&1u16.to_le_bytes()); // mono
    v.extend_from_slice(&sample_rate.to_le_bytes());
    v.extend_from_slice(&byte_rate.to_le_bytes());
    v.extend_from_slice(&2u16.to_le_bytes());
    v.extend_from_slice(&16u16.to_le_bytes());
    v.extend_from_slice(b"data");
    v.extend_from_slice(&data_len.to_le_bytes());
    v.extend(std::iter::repeat(0u8).take(data_len as usize));
    v
}

#[tokio::test]
async fn test_voicemail_speichern_und_laden() {
    let (dienst, dir) = dienst(1024 * 1024);
    let daten = wav(8000, 16_000);

    let vm = dienst.voicemail_speichern(&daten).await.unwrap();
    assert_eq!(vm.id, ERSTE_ID.to_string());
    assert!((vm.dauer_sek - 2.0).abs() < 1e-9);
    assert!(dir.path().join("audio/100.wav").exists());

    let geladen = dienst.voicemail_laden("100").await.unwrap();
    assert_eq!(geladen, daten);
}

#[tokio::test]
async fn test_unbekannte_voicemail() {
    let (dienst, _dir) = dienst(1024);
    assert!(matches!(
        dienst.voicemail_laden("999").await,
        Err(ChatError::DateiNichtGefunden(_))
    ));
    assert!(matches!(
        dienst.voicemail_laden("../users").await,
        Err(ChatError::DateiNichtGefunden(_))
    ));
}

#[tokio::test]
async fn test_ids_sind_fortlaufend() {
    let (dienst, _dir) = dienst(1024);
    let a = dienst.voicemail_speichern(b"kein wav").await.unwrap();
    let b = dienst.datei_speichern("notiz.txt", b"hallo").await.unwrap();
    assert_eq!(a.id, "100");
    assert_eq!(b.id, "101");
    assert_eq!(a.dauer_sek, 0.0);

    dienst.ids_fortsetzen_ab(500);
    assert_eq!(dienst.datei_speichern("x.txt", b"").await.unwrap().id, "500");
    // Kleinere Werte setzen den Zaehler nicht zurueck
    dienst.ids_fortsetzen_ab(10);
    assert_eq!(dienst.datei_speichern("y.txt", b"").await.unwrap().id, "501");
}

#[tokio::test]
async fn test_datei_mit_erlaubter_endung() {
    let (dienst, dir) = dienst(1024);
    let datei = dienst.datei_speichern("Urlaub.JPG", b"bild").await.unwrap();
    assert_eq!(datei.endung.as_deref(), Some(".jpg"));
    assert_eq!(datei.groesse, 4);
    assert!(dir.path().join(format!("files/{}.jpg", datei.id)).exists());
}

#[tokio::test]
async fn test_datei_endung_nicht_erlaubt() {
    let (dienst, dir) = dienst(1024);
    for name in ["virus.exe", "ohne_endung", "skript.sh"] {
        assert!(matches!(
            dienst.datei_speichern(name, b"x").await,
            Err(ChatError::EndungNichtErlaubt(_))
        ));
    }
    assert!(!dir.path().join("files").exists());
}

#[tokio::test]
async fn test_datei_zu_gross() {
    let (dienst, _dir) = dienst(8);
    assert!(matches!(
        dienst.datei_speichern("a.txt", &[0u8; 9]).await,
        Err(ChatError::DateiZuGross { size: 9, max: 8 })
    ));
    assert!(dienst.datei_speichern("a.txt", &[0u8; 8]).await.is_ok());
}

#[test]
fn test_endung_von() {
    assert_eq!(endung_von("a.tar.ZIP").as_deref(), Some(".zip"));
    assert_eq!(endung_von("ordner.d/datei"), None);
    assert_eq!(endung_von(".versteckt"), None);
    assert_eq!(endung_von("punkt."), None);
}

#[test]
fn test_wav_dauer_ungueltig() {
    assert_eq!(wav_dauer(b""), 0.0);
    assert_eq!(wav_dauer(b"RIFF\0\0\0\0WAVX"), 0.0);
    // Header ohne data-Chunk
    assert_eq!(wav_dauer(&wav(8000, 0)[..36]), 0.0);
}

#[test]
fn test_wav_dauer_abgeschnitten() {
    let mut daten = wav(1000, 1000);
    daten.truncate(44 + 1000);
    assert!((wav_dauer(&daten) - 0.5).abs() < 1e-9);
}
