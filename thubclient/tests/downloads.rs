//! Téléchargeur : borne de reprise, progression, contrat de l'observateur

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thubclient::Downloader;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn downloader(max_retries: usize) -> Downloader {
    // Backoff court pour les tests ; la valeur de production vient de la
    // configuration
    Downloader::new(Duration::from_secs(5), max_retries, Duration::from_millis(20)).unwrap()
}

#[tokio::test]
async fn always_failing_url_is_tried_exactly_max_retries_times() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/broken.mp3")
        .with_status(500)
        .expect(3)
        .create_async()
        .await;

    let bytes = downloader(3)
        .download_audio(&format!("{}/broken.mp3", server.url()), None)
        .await;

    mock.assert_async().await;
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn successful_download_returns_full_payload() {
    let payload: Vec<u8> = (0u32..100_000).map(|i| (i % 251) as u8).collect();

    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/track.mp3")
        .with_status(200)
        .with_header("content-type", "audio/mpeg")
        .with_body(payload.clone())
        .create_async()
        .await;

    let bytes = downloader(3)
        .download_audio(&format!("{}/track.mp3", server.url()), None)
        .await;

    assert_eq!(bytes, payload);
}

#[tokio::test]
async fn progress_observer_sees_monotonic_totals() {
    let payload = vec![7u8; 65_536];

    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/track.mp3")
        .with_status(200)
        .with_body(payload.clone())
        .create_async()
        .await;

    let calls = Arc::new(std::sync::Mutex::new(Vec::<(u64, u64)>::new()));
    let seen = calls.clone();
    let bytes = downloader(1)
        .download_audio(
            &format!("{}/track.mp3", server.url()),
            Some(&move |done, total| {
                seen.lock().unwrap().push((done, total));
            }),
        )
        .await;

    assert_eq!(bytes.len(), payload.len());
    let calls = calls.lock().unwrap();
    assert!(!calls.is_empty());
    // Progression monotone, total constant, dernière valeur complète
    for window in calls.windows(2) {
        assert!(window[0].0 <= window[1].0);
        assert_eq!(window[0].1, window[1].1);
    }
    assert_eq!(*calls.last().unwrap(), (payload.len() as u64, payload.len() as u64));
}

#[tokio::test]
async fn panicking_observer_does_not_abort_download() {
    let payload = vec![1u8; 4096];

    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/track.mp3")
        .with_status(200)
        .with_body(payload.clone())
        .create_async()
        .await;

    let panics = Arc::new(AtomicUsize::new(0));
    let counter = panics.clone();
    let bytes = downloader(1)
        .download_audio(
            &format!("{}/track.mp3", server.url()),
            Some(&move |_done, _total| {
                counter.fetch_add(1, Ordering::SeqCst);
                panic!("observer failure");
            }),
        )
        .await;

    assert_eq!(bytes, payload);
    assert!(panics.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn download_bytes_makes_a_single_attempt() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/cover.jpg")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let bytes = downloader(3)
        .download_bytes(&format!("{}/cover.jpg", server.url()))
        .await;

    mock.assert_async().await;
    assert!(bytes.is_empty());
}

/// Serveur minimal qui échoue à la première connexion puis sert le corps
async fn flaky_server(payload: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        serve_once(
            &listener,
            b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                .to_vec(),
        )
        .await;

        let mut response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: audio/mpeg\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            payload.len()
        )
        .into_bytes();
        response.extend_from_slice(&payload);
        serve_once(&listener, response).await;
    });

    format!("http://{addr}/audio.mp3")
}

async fn serve_once(listener: &TcpListener, response: Vec<u8>) {
    if let Ok((mut socket, _)) = listener.accept().await {
        let mut request = [0u8; 2048];
        let _ = socket.read(&mut request).await;
        let _ = socket.write_all(&response).await;
        let _ = socket.shutdown().await;
    }
}

#[tokio::test]
async fn transient_failure_then_success_returns_payload() {
    let payload: Vec<u8> = (0u32..10_000).map(|i| (i % 13) as u8).collect();
    let url = flaky_server(payload.clone()).await;

    let bytes = downloader(3).download_audio(&url, None).await;

    assert_eq!(bytes, payload);
}
