//! # thubclient - Client du protocole TuneHub
//!
//! Cette crate fournit un client Rust pour le service de métadonnées
//! musicales TuneHub, dont la forme des requêtes et la normalisation des
//! réponses ne sont pas figées à la compilation : le service distribue, par
//! couple (plateforme, opération), un descripteur portant un template d'URL,
//! des paramètres, des en-têtes et un script de transformation.
//!
//! ## Vue d'ensemble
//!
//! `thubclient` permet :
//! - La récupération et la mise en cache des descripteurs (durée de vie du
//!   processus, pas de TTL)
//! - L'exécution des requêtes décrites, templates expansés et réponses
//!   normalisées en bac à sable (via `thubscript`)
//! - La recherche agrégée multi-plateformes, tolérante aux échecs partiels
//! - La résolution d'URL audio par paliers de qualité avec repli automatique
//! - Le téléchargement binaire par chunks, avec reprise et progression
//!
//! Toutes les opérations publiques sont totales : résultat peuplé ou
//! sentinelle vide, jamais d'erreur non gérée.
//!
//! ## Architecture
//!
//! La crate suit le pattern des autres crates thub :
//! - `TuneHubClient` : client principal avec cache intégré
//! - `models` : structures de données (descripteurs, résultats, paliers)
//! - `api` : couche d'accès aux endpoints fixes du service
//! - `executor` : exécution des requêtes décrites par descripteur
//! - `quality` : marche de repli des paliers de qualité
//! - `download` : transferts binaires sur transport dédié
//! - `cache` : cache en mémoire des descripteurs
//!
//! ## Structure des modules
//!
//! ```text
//! thubclient/
//! ├── src/
//! │   ├── lib.rs              # Module principal (ce fichier)
//! │   ├── client.rs           # Client TuneHub principal
//! │   ├── models.rs           # Structures de données
//! │   ├── api/
//! │   │   ├── mod.rs          # Transport HTTP des métadonnées
//! │   │   ├── methods.rs      # Distribution des descripteurs
//! │   │   └── parse.rs        # Résolution d'URL audio
//! │   ├── executor.rs         # Exécution des descripteurs
//! │   ├── aggregate.rs        # Fusion de la recherche agrégée
//! │   ├── quality.rs          # Repli de qualité
//! │   ├── download.rs         # Téléchargements binaires
//! │   ├── cache.rs            # Cache des descripteurs
//! │   └── error.rs            # Gestion des erreurs
//! ```
//!
//! ## Utilisation
//!
//! ### Recherche agrégée et résolution
//!
//! ```rust,no_run
//! use thubclient::{Quality, TuneHubClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Utilise automatiquement la config depuis thubconfig
//!     let client = TuneHubClient::from_config()?;
//!
//!     for song in client.aggregate_search("Daft Punk").await {
//!         println!("[{}] {} - {}", song.platform, song.artist, song.name);
//!     }
//!
//!     let resolution = client
//!         .resolve_audio("netease", "12345", Quality::Flac, false)
//!         .await;
//!     if resolution.success {
//!         let bytes = client.download_audio(&resolution.url, None).await;
//!         println!("downloaded {} bytes", bytes.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Progression de téléchargement
//!
//! ```rust,no_run
//! use thubclient::TuneHubClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = TuneHubClient::new("https://tunehub.sayqz.com")?;
//!     let bytes = client
//!         .download_audio(
//!             "https://cdn.example.com/track.flac",
//!             Some(&|done, total| {
//!                 // Peut être appelé plusieurs fois par seconde : l'appelant
//!                 // limite lui-même ses effets de bord
//!                 let _ = (done, total);
//!             }),
//!         )
//!         .await;
//!     println!("received {} bytes", bytes.len());
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod client;
pub mod download;
pub mod error;
pub mod executor;
pub mod models;
pub mod quality;

pub use api::TuneHubApi;
pub use cache::{CacheStats, DescriptorCache};
pub use client::TuneHubClient;
pub use download::{Downloader, ProgressObserver};
pub use error::{Result, ThubError};
pub use executor::RequestExecutor;
pub use models::{
    AudioResolution, HttpMethod, MethodDescriptor, Operation, ParseEntry, ParseTrackInfo, Quality,
    SearchResult, SongInfo, ToplistItem,
};

// Ré-exports de la couche script utiles aux appelants
pub use thubscript::{NormalizedRecord, Variables};
