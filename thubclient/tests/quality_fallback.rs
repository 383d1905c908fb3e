//! Marche de repli des paliers de qualité

use mockito::Matcher;
use serde_json::json;
use thubclient::{Quality, TuneHubClient};
use thubconfig::Config;

fn parse_success(id: &str, url: &str, size: u64, quality: &str) -> String {
    json!({
        "code": 0,
        "data": {
            "data": [{
                "id": id,
                "success": true,
                "url": url,
                "fileSize": size,
                "actualQuality": quality,
                "wasDowngraded": false,
                "info": {"name": "T", "artist": "A", "album": "L", "duration": 180}
            }]
        }
    })
    .to_string()
}

fn parse_unavailable(id: &str) -> String {
    json!({
        "code": 0,
        "data": {
            "data": [{
                "id": id,
                "success": false,
                "error": "quality not offered"
            }]
        }
    })
    .to_string()
}

fn quality_matcher(quality: &str) -> Matcher {
    Matcher::PartialJson(json!({ "quality": quality }))
}

fn small_ceiling_client(server: &mockito::ServerGuard, ceiling: u64) -> TuneHubClient {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
    config.set_api_base_url(server.url()).unwrap();
    config.set_max_file_size(ceiling).unwrap();
    TuneHubClient::from_config_obj(&config).unwrap()
}

#[tokio::test]
async fn availability_fallback_walks_to_next_tier() {
    let mut server = mockito::Server::new_async().await;

    let flac24 = server
        .mock("POST", "/v1/parse")
        .match_body(quality_matcher("flac24bit"))
        .with_status(200)
        .with_body(parse_unavailable("s1"))
        .expect(1)
        .create_async()
        .await;
    let flac = server
        .mock("POST", "/v1/parse")
        .match_body(quality_matcher("flac"))
        .with_status(200)
        .with_body(parse_success("s1", "https://cdn.example/s1.flac", 1024, "flac"))
        .expect(1)
        .create_async()
        .await;

    let client = TuneHubClient::new(server.url()).unwrap();
    let resolution = client
        .resolve_audio("netease", "s1", Quality::Flac24Bit, false)
        .await;

    flac24.assert_async().await;
    flac.assert_async().await;
    assert!(resolution.success);
    assert_eq!(resolution.requested_quality, Quality::Flac24Bit);
    assert_eq!(resolution.actual_quality, Some(Quality::Flac));
    assert!(resolution.downgraded);
    assert_eq!(resolution.url, "https://cdn.example/s1.flac");
}

#[tokio::test]
async fn size_fallback_respects_ceiling() {
    let mut server = mockito::Server::new_async().await;

    // flac dépasse le plafond, 320k passe
    server
        .mock("POST", "/v1/parse")
        .match_body(quality_matcher("flac"))
        .with_status(200)
        .with_body(parse_success("s2", "https://cdn.example/s2.flac", 90_000, "flac"))
        .create_async()
        .await;
    server
        .mock("POST", "/v1/parse")
        .match_body(quality_matcher("320k"))
        .with_status(200)
        .with_body(parse_success("s2", "https://cdn.example/s2.mp3", 4_000, "320k"))
        .create_async()
        .await;

    let client = small_ceiling_client(&server, 50_000);
    let resolution = client.resolve_audio("netease", "s2", Quality::Flac, false).await;

    assert!(resolution.success);
    assert_eq!(resolution.actual_quality, Some(Quality::Kbps320));
    assert!(resolution.downgraded);
    assert_eq!(resolution.size_bytes, 4_000);
}

#[tokio::test]
async fn skip_size_check_accepts_oversized_files() {
    let mut server = mockito::Server::new_async().await;

    let flac = server
        .mock("POST", "/v1/parse")
        .match_body(quality_matcher("flac"))
        .with_status(200)
        .with_body(parse_success("s3", "https://cdn.example/s3.flac", 90_000, "flac"))
        .expect(1)
        .create_async()
        .await;
    // Aucun appel au palier inférieur ne doit partir
    let kbps320 = server
        .mock("POST", "/v1/parse")
        .match_body(quality_matcher("320k"))
        .with_status(200)
        .with_body(parse_success("s3", "https://cdn.example/s3.mp3", 4_000, "320k"))
        .expect(0)
        .create_async()
        .await;

    let client = small_ceiling_client(&server, 50_000);
    let resolution = client.resolve_audio("netease", "s3", Quality::Flac, true).await;

    flac.assert_async().await;
    kbps320.assert_async().await;
    assert!(resolution.success);
    assert_eq!(resolution.actual_quality, Some(Quality::Flac));
    assert!(!resolution.downgraded);
    assert_eq!(resolution.size_bytes, 90_000);
}

#[tokio::test]
async fn exhausted_tiers_return_last_failure() {
    let mut server = mockito::Server::new_async().await;

    let all = server
        .mock("POST", "/v1/parse")
        .match_body(Matcher::Any)
        .with_status(200)
        .with_body(parse_unavailable("s4"))
        .expect(4)
        .create_async()
        .await;

    let client = TuneHubClient::new(server.url()).unwrap();
    let resolution = client
        .resolve_audio("netease", "s4", Quality::Flac24Bit, false)
        .await;

    all.assert_async().await;
    assert!(!resolution.success);
    assert_eq!(resolution.actual_quality, None);
    assert!(resolution.error.is_some());
}

#[tokio::test]
async fn fallback_never_climbs_above_requested_tier() {
    let mut server = mockito::Server::new_async().await;

    // Des paliers supérieurs existent côté service mais ne doivent jamais
    // être consultés pour une demande 320k
    let higher = server
        .mock("POST", "/v1/parse")
        .match_body(Matcher::AnyOf(vec![
            quality_matcher("flac24bit"),
            quality_matcher("flac"),
        ]))
        .with_status(200)
        .with_body(parse_success("s5", "https://cdn.example/s5.flac", 10, "flac"))
        .expect(0)
        .create_async()
        .await;
    server
        .mock("POST", "/v1/parse")
        .match_body(quality_matcher("320k"))
        .with_status(200)
        .with_body(parse_unavailable("s5"))
        .create_async()
        .await;
    server
        .mock("POST", "/v1/parse")
        .match_body(quality_matcher("128k"))
        .with_status(200)
        .with_body(parse_success("s5", "https://cdn.example/s5.mp3", 10, "128k"))
        .create_async()
        .await;

    let client = TuneHubClient::new(server.url()).unwrap();
    let resolution = client
        .resolve_audio("netease", "s5", Quality::Kbps320, false)
        .await;

    higher.assert_async().await;
    assert!(resolution.success);
    let actual = resolution.actual_quality.unwrap();
    assert!(actual == Quality::Kbps320 || !actual.is_higher_than(Quality::Kbps320));
    assert_eq!(actual, Quality::Kbps128);
}

#[tokio::test]
async fn missing_file_size_falls_back_to_head_probe() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    // fileSize absent : le resolver sonde l'URL en HEAD ; la sonde échoue
    // (pas de mock), la taille vaut 0 et passe toujours le plafond
    server
        .mock("POST", "/v1/parse")
        .match_body(quality_matcher("320k"))
        .with_status(200)
        .with_body(
            json!({
                "code": 0,
                "data": {"data": [{"id": "s6", "success": true, "url": format!("{base}/cdn/s6.mp3")}]}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = TuneHubClient::new(server.url()).unwrap();
    let resolution = client
        .resolve_audio("netease", "s6", Quality::Kbps320, false)
        .await;

    assert!(resolution.success);
    assert_eq!(resolution.size_bytes, 0);
    assert_eq!(resolution.actual_quality, Some(Quality::Kbps320));
}
