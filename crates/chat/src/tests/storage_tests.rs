//! DiskStorage: Ablage unter dem Basisverzeichnis

use crate::error::ChatError;
use crate::storage::{DiskStorage, StorageBackend};

fn ablage() -> (DiskStorage, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Temp-Verzeichnis");
    (DiskStorage::new(dir.path()), dir)
}

#[tokio::test]
async fn voicemail_landet_im_unterverzeichnis() {
    let (storage, dir) = ablage();
    let wav: Vec<u8> = (0u8..=255).cycle().take(4096).collect();

    storage.store("audio/150.wav", &wav).await.unwrap();

    assert!(dir.path().join("audio/150.wav").is_file());
    assert_eq!(storage.retrieve("audio/150.wav").await.unwrap(), wav);
}

#[tokio::test]
async fn gleiche_id_ersetzt_inhalt() {
    let (storage, _dir) = ablage();
    storage.store("files/7.txt", b"alt").await.unwrap();
    storage.store("files/7.txt", b"neu").await.unwrap();
    assert_eq!(storage.retrieve("files/7.txt").await.unwrap(), b"neu");
}

#[tokio::test]
async fn fehlende_datei() {
    let (storage, _dir) = ablage();
    assert!(matches!(
        storage.retrieve("audio/999.wav").await,
        Err(ChatError::DateiNichtGefunden(p)) if p == "audio/999.wav"
    ));
}

#[tokio::test]
async fn pfade_ausserhalb_der_ablage() {
    let (storage, dir) = ablage();

    for pfad in ["", "../raus.wav", "/tmp/raus.wav", "audio/../../raus.wav", "./audio/1.wav"] {
        assert!(
            matches!(storage.store(pfad, b"x").await, Err(ChatError::UngueltigeEingabe(_))),
            "{pfad:?}"
        );
        assert!(matches!(
            storage.retrieve(pfad).await,
            Err(ChatError::UngueltigeEingabe(_))
        ));
    }
    assert!(!dir.path().parent().unwrap().join("raus.wav").exists());
}
