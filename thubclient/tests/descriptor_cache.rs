//! Cycle de vie des descripteurs : fetch, cache, échec non mis en cache

use mockito::Matcher;
use thubclient::{Operation, TuneHubClient};

fn descriptor_body(platform: &str) -> String {
    format!(
        r#"{{
            "code": 0,
            "data": {{
                "platform": "{platform}",
                "operation": "search",
                "url_template": "https://upstream.example/s",
                "params": {{"kw": "{{{{keyword}}}}"}},
                "http_method": "GET",
                "transform_script": "resp => resp.songs"
            }}
        }}"#
    )
}

#[tokio::test]
async fn descriptor_is_fetched_once_then_cached() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/methods/netease/search")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(descriptor_body("netease"))
        .expect(1)
        .create_async()
        .await;

    let client = TuneHubClient::new(server.url()).unwrap();

    let first = client.descriptor("netease", Operation::Search).await.unwrap();
    let second = client.descriptor("netease", Operation::Search).await.unwrap();

    assert_eq!(first.url_template, second.url_template);
    assert_eq!(first.platform, "netease");
    mock.assert_async().await;

    let stats = client.descriptor_cache_stats().await;
    assert_eq!(stats.descriptors_count, 1);
}

#[tokio::test]
async fn failed_fetch_is_not_cached_and_is_retried() {
    let mut server = mockito::Server::new_async().await;
    // Code de service non nul : échec franc, rien en cache
    let mock = server
        .mock("GET", "/v1/methods/netease/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"code": 42, "message": "rotated"}"#)
        .expect(2)
        .create_async()
        .await;

    let client = TuneHubClient::new(server.url()).unwrap();

    assert!(client.descriptor("netease", Operation::Search).await.is_err());
    assert!(client.descriptor("netease", Operation::Search).await.is_err());

    mock.assert_async().await;
    let stats = client.descriptor_cache_stats().await;
    assert_eq!(stats.descriptors_count, 0);
}

#[tokio::test]
async fn clear_forces_a_refetch() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/methods/kuwo/search")
        .with_status(200)
        .with_body(descriptor_body("kuwo"))
        .expect(2)
        .create_async()
        .await;

    let client = TuneHubClient::new(server.url()).unwrap();

    client.descriptor("kuwo", Operation::Search).await.unwrap();
    client.clear_descriptor_cache();
    client.descriptor("kuwo", Operation::Search).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn missing_descriptor_maps_to_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/methods/netease/toplists")
        .with_status(200)
        .with_body(r#"{"code": 0, "data": null}"#)
        .create_async()
        .await;

    let client = TuneHubClient::new(server.url()).unwrap();
    let err = client
        .descriptor("netease", Operation::Toplists)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("descriptor not found"));
}
