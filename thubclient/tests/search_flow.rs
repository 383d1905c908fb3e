//! Recherche pilotée par descripteur : expansion, transformation, projection

use mockito::Matcher;
use thubclient::TuneHubClient;

/// Descripteur de recherche pointant vers le serveur de test
fn search_descriptor(base: &str, platform: &str) -> String {
    format!(
        r#"{{
            "code": 0,
            "data": {{
                "platform": "{platform}",
                "operation": "search",
                "url_template": "{base}/{platform}/cloudsearch",
                "params": {{
                    "keywords": "{{{{keyword}}}}",
                    "limit": 20,
                    "offset": "{{{{(page || 1) - 1}}}}"
                }},
                "headers": {{"X-Requested-With": "thubclient"}},
                "http_method": "GET",
                "transform_script": "resp => resp.result.songs.map(s => ({{id: s.id, name: s.name, artist: s.ar.map(a => a.name).join('/'), album: s.al.name}}))"
            }}
        }}"#
    )
}

const SONGS_BODY: &str = r#"{
    "code": 0,
    "result": {
        "songs": [
            {"id": 1001, "name": "Alpha", "ar": [{"name": "Ann"}, {"name": "Bob"}], "al": {"name": "First"}},
            {"id": 1002, "name": "Beta", "ar": [{"name": "Cid"}], "al": {"name": "Second"}}
        ]
    }
}"#;

#[tokio::test]
async fn search_expands_template_and_normalizes_records() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    server
        .mock("GET", "/v1/methods/netease/search")
        .with_status(200)
        .with_body(search_descriptor(&base, "netease"))
        .create_async()
        .await;

    let upstream = server
        .mock("GET", "/netease/cloudsearch")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("keywords".into(), "test".into()),
            Matcher::UrlEncoded("limit".into(), "20".into()),
            // page vaut 1 par défaut : l'expression (page || 1) - 1 donne 0
            Matcher::UrlEncoded("offset".into(), "0".into()),
        ]))
        .match_header("X-Requested-With", "thubclient")
        // JSON volontairement étiqueté en texte brut
        .with_header("content-type", "text/plain")
        .with_status(200)
        .with_body(SONGS_BODY)
        .create_async()
        .await;

    let client = TuneHubClient::new(base).unwrap();
    let results = client.search("netease", "test").await;

    upstream.assert_async().await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "1001");
    assert_eq!(results[0].name, "Alpha");
    assert_eq!(results[0].artist, "Ann/Bob");
    assert_eq!(results[0].album, "First");
    assert_eq!(results[0].platform, "netease");
    assert_eq!(results[1].id, "1002");
}

#[tokio::test]
async fn upstream_error_code_yields_empty_results() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    server
        .mock("GET", "/v1/methods/netease/search")
        .with_status(200)
        .with_body(search_descriptor(&base, "netease"))
        .create_async()
        .await;

    server
        .mock("GET", "/netease/cloudsearch")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"code": -460, "message": "forbidden"}"#)
        .create_async()
        .await;

    let client = TuneHubClient::new(base).unwrap();
    assert!(client.search("netease", "test").await.is_empty());
}

#[tokio::test]
async fn non_json_body_yields_empty_results() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    server
        .mock("GET", "/v1/methods/netease/search")
        .with_status(200)
        .with_body(search_descriptor(&base, "netease"))
        .create_async()
        .await;

    server
        .mock("GET", "/netease/cloudsearch")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>definitely not json</html>")
        .create_async()
        .await;

    let client = TuneHubClient::new(base).unwrap();
    assert!(client.search("netease", "test").await.is_empty());
}

#[tokio::test]
async fn missing_transform_passes_arrays_through() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    // Descripteur sans script : la réponse déjà séquentielle passe telle
    // quelle
    server
        .mock("GET", "/v1/methods/kuwo/search")
        .with_status(200)
        .with_body(format!(
            r#"{{
                "code": 0,
                "data": {{
                    "platform": "kuwo",
                    "operation": "search",
                    "url_template": "{base}/kuwo/raw",
                    "http_method": "GET"
                }}
            }}"#
        ))
        .create_async()
        .await;

    server
        .mock("GET", "/kuwo/raw")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"id": "k1", "name": "Raw", "artist": "R"}, 17]"#)
        .create_async()
        .await;

    let client = TuneHubClient::new(base).unwrap();
    let results = client.search("kuwo", "anything").await;
    // L'élément non-enregistrement est écarté
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "k1");
    assert_eq!(results[0].name, "Raw");
}

#[tokio::test]
async fn toplists_flow_projects_items() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    server
        .mock("GET", "/v1/methods/netease/toplists")
        .with_status(200)
        .with_body(format!(
            r#"{{
                "code": 0,
                "data": {{
                    "platform": "netease",
                    "operation": "toplists",
                    "url_template": "{base}/netease/toplists",
                    "http_method": "GET",
                    "transform_script": "resp => resp.list.map(l => ({{id: l.id, name: l.name, pic: l.coverImgUrl, updateFrequency: l.updateFrequency}}))"
                }}
            }}"#
        ))
        .create_async()
        .await;

    server
        .mock("GET", "/netease/toplists")
        .with_status(200)
        .with_body(
            r#"{"code": 0, "list": [
                {"id": 3778678, "name": "Hot Songs", "coverImgUrl": "https://img/1.jpg", "updateFrequency": "daily"}
            ]}"#,
        )
        .create_async()
        .await;

    let client = TuneHubClient::new(base).unwrap();
    let toplists = client.get_toplists("netease").await;
    assert_eq!(toplists.len(), 1);
    assert_eq!(toplists[0].id, "3778678");
    assert_eq!(toplists[0].name, "Hot Songs");
    assert_eq!(toplists[0].update_frequency, "daily");
}

#[tokio::test]
async fn song_info_feeds_lyrics_fetch() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    server
        .mock("GET", "/v1/methods/netease/info")
        .with_status(200)
        .with_body(format!(
            r#"{{
                "code": 0,
                "data": {{
                    "platform": "netease",
                    "operation": "info",
                    "url_template": "{base}/netease/detail",
                    "params": {{"id": "{{{{id}}}}"}},
                    "http_method": "GET",
                    "transform_script": "resp => [{{id: resp.song.id, name: resp.song.name, artist: resp.song.artist, pic: resp.song.pic, lrc: '{base}/netease/lyric'}}]"
                }}
            }}"#
        ))
        .create_async()
        .await;

    server
        .mock("GET", "/netease/detail")
        .match_query(Matcher::UrlEncoded("id".into(), "77".into()))
        .with_status(200)
        .with_body(r#"{"code": 0, "song": {"id": 77, "name": "Song", "artist": "Someone", "pic": ""}}"#)
        .create_async()
        .await;

    server
        .mock("GET", "/netease/lyric")
        .with_status(200)
        .with_body("[00:01.00] first line")
        .create_async()
        .await;

    let client = TuneHubClient::new(base).unwrap();

    let info = client.get_song_info("netease", "77").await.unwrap();
    assert_eq!(info.name, "Song");
    assert_eq!(info.song_id, "77");

    let lyrics = client.get_lyrics("netease", "77").await;
    assert_eq!(lyrics, "[00:01.00] first line");
}
