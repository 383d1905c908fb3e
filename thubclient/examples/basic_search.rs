//! Exemple basique : recherche agrégée
//!
//! ```bash
//! cargo run --example basic_search -- "Daft Punk"
//! ```

use thubclient::TuneHubClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let keyword = std::env::args().nth(1).unwrap_or_else(|| "Daft Punk".to_string());

    let client = TuneHubClient::from_config()?;
    let results = client.aggregate_search(&keyword).await;

    if results.is_empty() {
        println!("No results for '{keyword}'");
        return Ok(());
    }

    for (i, song) in results.iter().enumerate() {
        println!(
            "{:2}. [{}] {} - {} ({})",
            i + 1,
            song.platform,
            song.artist,
            song.name,
            song.album
        );
    }

    Ok(())
}
