//! Integration-Tests fuer Server-Aufbau, TCP-Listener und Konsole

use futures_util::{SinkExt, StreamExt};
use plauderei_db::VerlaufEintrag;
use plauderei_protocol::{wire::FrameCodec, Flag, Frame};
use plauderei_server::config::{ServerConfig, StoreBackend};
use plauderei_server::{konsole, zustand_aufbauen};
use plauderei_signaling::SignalingServer;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::Framed;

fn test_config(verzeichnis: &std::path::Path, backend: StoreBackend) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.speicher.verzeichnis = verzeichnis.to_path_buf();
    config.speicher.backend = backend;
    config.auth.speicher_kib = 1024;
    config.auth.iterationen = 1;
    config.konsole.aktiviert = false;
    config
}

async fn empfangen(client: &mut Framed<TcpStream, FrameCodec>) -> Frame {
    tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("Timeout")
        .expect("Verbindung geschlossen")
        .expect("Frame-Fehler")
}

#[tokio::test]
async fn registrierung_ueber_tcp_bleibt_erhalten() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), StoreBackend::Datei);
    let state = zustand_aufbauen(&config).unwrap();

    let server = SignalingServer::binden(state.clone(), "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let adresse = server.lokale_adresse().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(server.starten(shutdown_rx));

    let stream = TcpStream::connect(adresse).await.unwrap();
    let mut client = Framed::new(stream, FrameCodec::new());
    for (flag, text, erwartet) in [
        (Flag::LoginSignUp, "ann1", Flag::CheckLogin),
        (Flag::PasswordSignUp, "Abcdef1!", Flag::CheckPassword),
        (Flag::Nick, "Ann", Flag::CheckNickname),
    ] {
        client.send(Frame::text(flag, text)).await.unwrap();
        assert_eq!(empfangen(&mut client).await.flag, erwartet);
    }
    assert_eq!(empfangen(&mut client).await.flag, Flag::Registered);

    shutdown_tx.send(true).unwrap();
    task.await.unwrap().unwrap();
    drop(client);
    drop(state);

    // Neuer Zustand aus demselben Verzeichnis kennt den Benutzer
    let neu = zustand_aufbauen(&config).unwrap();
    let user = neu.store.lock().find_user_by_login("ann1").unwrap();
    assert_eq!(user.unwrap().nickname, "Ann");
}

#[tokio::test]
async fn anhang_ids_werden_fortgesetzt() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), StoreBackend::Datei);

    {
        let state = zustand_aufbauen(&config).unwrap();
        let mut store = state.store.lock();
        store.create_channel("general").unwrap();
        store
            .append_history(
                "general",
                VerlaufEintrag::Voicemail {
                    time: chrono::Utc::now(),
                    user_id: "u1".into(),
                    voicemail_id: "150".into(),
                    duration: 1.0,
                },
            )
            .unwrap();
    }

    let state = zustand_aufbauen(&config).unwrap();
    let voicemail = state.medien.voicemail_speichern(b"daten").await.unwrap();
    assert_eq!(voicemail.id, "151");
}

#[tokio::test]
async fn konsolenbefehle() {
    let dir = tempfile::tempdir().unwrap();
    let state = zustand_aufbauen(&test_config(dir.path(), StoreBackend::Memory)).unwrap();

    assert_eq!(konsole::befehl_ausfuehren(&state, "/channels"), "No existing channels.\n");
    assert_eq!(konsole::befehl_ausfuehren(&state, "/add_channel news"), "Channel news created\n");
    assert_eq!(
        konsole::befehl_ausfuehren(&state, "/add_channel news"),
        "Channel news already exists\n"
    );
    assert_eq!(
        konsole::befehl_ausfuehren(&state, "/channels"),
        "Name: news, Number of active users: 0\n"
    );
    assert_eq!(konsole::befehl_ausfuehren(&state, "/del_channel news"), "Channel news deleted\n");
    assert_eq!(konsole::befehl_ausfuehren(&state, "/del_channel news"), "Channel news not found\n");
    assert_eq!(konsole::befehl_ausfuehren(&state, "/tanzen"), konsole::FALSCHER_BEFEHL);
    assert_eq!(konsole::befehl_ausfuehren(&state, "/help"), konsole::HILFE);
    assert!(konsole::befehl_ausfuehren(&state, "/add_channel ../x").starts_with("Error:"));
}

#[tokio::test]
async fn konsole_liest_bis_eof() {
    let dir = tempfile::tempdir().unwrap();
    let state = zustand_aufbauen(&test_config(dir.path(), StoreBackend::Memory)).unwrap();
    let (_tx, rx) = watch::channel(false);

    let eingabe: &[u8] = b"/add_channel a\n\n/channels\n";
    let mut ausgabe = Vec::new();
    konsole::konsole_ausfuehren(state, eingabe, &mut ausgabe, rx)
        .await
        .unwrap();

    assert_eq!(
        String::from_utf8(ausgabe).unwrap(),
        "Channel a created\nName: a, Number of active users: 0\n"
    );
}
