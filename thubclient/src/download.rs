//! Téléchargement binaire avec reprise et progression
//!
//! Le téléchargement utilise un transport dédié, au profil de timeout
//! distinct de celui des métadonnées : un transfert lent ne doit pas affamer
//! les recherches et résolutions concurrentes. Le corps est accumulé en
//! mémoire par chunks ; l'observateur de progression est invoqué après
//! chaque chunk quand la taille totale est connue.
//!
//! Contrat de l'observateur : il peut être appelé zéro ou de nombreuses fois
//! par seconde, ne doit pas bloquer matériellement, et une panique chez lui
//! n'interrompt jamais le transfert.

use crate::error::Result;
use futures::StreamExt;
use reqwest::{Client, header};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Observateur de progression : (octets reçus, octets attendus)
pub type ProgressObserver = dyn Fn(u64, u64) + Send + Sync;

/// User-Agent navigateur : certaines origines refusent les clients inconnus
const DOWNLOAD_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Timeout de connexion, séparé du timeout total de transfert
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Origines qui rejettent les requêtes sans Referer
const KNOWN_REFERERS: &[(&str, &str)] = &[
    ("kuwo", "https://www.kuwo.cn/"),
    ("kugou", "https://www.kugou.com/"),
];

/// Téléchargeur binaire
pub struct Downloader {
    /// Transport dédié aux transferts longs
    http: Client,
    /// Nombre maximum de tentatives
    max_retries: usize,
    /// Pause fixe entre deux tentatives
    backoff: Duration,
}

impl Downloader {
    /// Crée un téléchargeur
    ///
    /// `timeout` borne connexion + transfert complet d'une tentative ; un
    /// dépassement compte comme un échec réessayable.
    pub fn new(timeout: Duration, max_retries: usize, backoff: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(DOWNLOAD_USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            max_retries,
            backoff,
        })
    }

    /// Télécharge une ressource audio, avec reprise automatique
    ///
    /// Retourne les octets complets, ou un résultat vide après épuisement des
    /// tentatives : le vide est le signal d'échec, il n'y a pas de canal
    /// d'erreur distinct.
    pub async fn download_audio(
        &self,
        url: &str,
        on_progress: Option<&ProgressObserver>,
    ) -> Vec<u8> {
        for attempt in 1..=self.max_retries {
            debug!(attempt, max_retries = self.max_retries, %url, "starting download");
            match self.attempt(url, on_progress).await {
                Ok(bytes) => {
                    debug!(size = bytes.len(), "download complete");
                    return bytes;
                }
                Err(err) => {
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        %url,
                        error = %err,
                        "download attempt failed"
                    );
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }
        Vec::new()
    }

    /// Télécharge une ressource annexe (pochette, illustration) en une seule
    /// tentative, sans politique de reprise
    pub async fn download_bytes(&self, url: &str) -> Vec<u8> {
        match self.attempt(url, None).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%url, error = %err, "download failed");
                Vec::new()
            }
        }
    }

    async fn attempt(&self, url: &str, on_progress: Option<&ProgressObserver>) -> Result<Vec<u8>> {
        let mut request = self.http.get(url);
        if let Some(referer) = referer_for(url) {
            request = request.header(header::REFERER, referer);
        }

        let response = request.send().await?.error_for_status()?;
        let total = response.content_length().unwrap_or(0);

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            downloaded += chunk.len() as u64;
            buffer.extend_from_slice(&chunk);
            if total > 0 {
                if let Some(callback) = on_progress {
                    // Une panique de l'observateur n'interrompt pas le
                    // transfert
                    let _ = catch_unwind(AssertUnwindSafe(|| callback(downloaded, total)));
                }
            }
        }

        Ok(buffer)
    }
}

/// Referer à attacher selon l'hôte cible, s'il est connu
fn referer_for(url: &str) -> Option<&'static str> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    KNOWN_REFERERS
        .iter()
        .find(|(pattern, _)| host.contains(pattern))
        .map(|(_, referer)| *referer)
}
