//! Exemple : résolution de qualité puis téléchargement avec progression
//!
//! ```bash
//! cargo run --example resolve_and_download -- netease 1962165898 flac
//! ```

use std::io::Write;
use thubclient::{Quality, TuneHubClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let platform = args.next().unwrap_or_else(|| "netease".to_string());
    let song_id = args.next().unwrap_or_else(|| "1962165898".to_string());
    let quality: Quality = args
        .next()
        .unwrap_or_else(|| "320k".to_string())
        .parse()?;

    let client = TuneHubClient::from_config()?;

    let resolution = client.resolve_audio(&platform, &song_id, quality, false).await;
    if !resolution.success {
        println!(
            "Resolution failed: {}",
            resolution.error.as_deref().unwrap_or("unknown")
        );
        return Ok(());
    }

    println!(
        "Resolved at {} ({} bytes){}",
        resolution.actual_quality.expect("success implies a tier"),
        resolution.size_bytes,
        if resolution.downgraded { " [downgraded]" } else { "" }
    );

    let bytes = client
        .download_audio(
            &resolution.url,
            Some(&|done, total| {
                print!("\r{:3}%", done * 100 / total);
                let _ = std::io::stdout().flush();
            }),
        )
        .await;
    println!();

    if bytes.is_empty() {
        println!("Download failed");
    } else {
        println!("Downloaded {} bytes", bytes.len());
    }

    Ok(())
}
