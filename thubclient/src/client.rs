//! Client principal pour interagir avec le service TuneHub
//!
//! Ce module fournit la façade haut-niveau : cache de descripteurs intégré,
//! recherche agrégée, résolution de qualité et téléchargements. Toutes les
//! opérations publiques sont totales : elles retournent un résultat peuplé ou
//! une sentinelle vide, jamais une erreur non gérée.

use crate::aggregate::dedup_by_platform_id;
use crate::api::TuneHubApi;
use crate::cache::{CacheStats, DescriptorCache};
use crate::download::{Downloader, ProgressObserver};
use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::models::{
    AudioResolution, MethodDescriptor, Operation, Quality, SearchResult, SongInfo, ToplistItem,
};
use crate::quality::resolve_with_fallback;
use futures::future;
use serde_json::{Value, json};
use std::time::Duration;
use thubconfig::Config;
use thubscript::Variables;
use tracing::{debug, warn};

// Valeurs par défaut du constructeur direct, alignées sur thubconfig
const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(180);
const DEFAULT_DOWNLOAD_BACKOFF: Duration = Duration::from_secs(2);
const DEFAULT_DOWNLOAD_RETRIES: usize = 3;
const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
const DEFAULT_PLATFORMS: &[&str] = &["netease", "kuwo", "qq"];

/// Nombre de résultats demandé par plateforme lors d'une recherche
const DEFAULT_SEARCH_LIMIT: u64 = 20;

/// Client TuneHub haut-niveau avec cache de descripteurs
pub struct TuneHubClient {
    /// API bas-niveau (endpoints fixes du service)
    api: TuneHubApi,
    /// Exécuteur des requêtes décrites par descripteur
    executor: RequestExecutor,
    /// Cache des descripteurs, durée de vie du processus
    cache: DescriptorCache,
    /// Téléchargeur binaire (transport dédié)
    downloader: Downloader,
    /// Plateformes connues, dans l'ordre d'agrégation
    platforms: Vec<String>,
    /// Plafond de taille au-delà duquel le resolver rétrograde
    max_file_size: u64,
    /// Palier demandé par défaut
    default_quality: Quality,
}

impl TuneHubClient {
    /// Crée un client avec les valeurs par défaut
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// use thubclient::TuneHubClient;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let client = TuneHubClient::new("https://tunehub.sayqz.com")?;
    ///     let results = client.aggregate_search("Miles Davis").await;
    ///     Ok(())
    /// }
    /// ```
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::build(
            base_url.into(),
            DEFAULT_API_TIMEOUT,
            None,
            DEFAULT_PLATFORMS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_MAX_FILE_SIZE,
            Quality::Kbps320,
            DEFAULT_DOWNLOAD_TIMEOUT,
            DEFAULT_DOWNLOAD_RETRIES,
            DEFAULT_DOWNLOAD_BACKOFF,
        )
    }

    /// Crée un client en utilisant la configuration globale de thubconfig
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// use thubclient::TuneHubClient;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let client = TuneHubClient::from_config()?;
    ///     Ok(())
    /// }
    /// ```
    pub fn from_config() -> Result<Self> {
        let config = thubconfig::get_config();
        Self::from_config_obj(config.as_ref())
    }

    /// Crée un client depuis un objet Config spécifique
    ///
    /// Les valeurs sont lues une fois à la construction : plusieurs clients
    /// (par exemple sous test) n'interfèrent jamais entre eux.
    pub fn from_config_obj(config: &Config) -> Result<Self> {
        let default_quality: Quality = config.get_default_quality().parse()?;
        Self::build(
            config.get_api_base_url(),
            Duration::from_secs(config.get_api_timeout_secs()),
            config.get_api_key(),
            config.get_platforms(),
            config.get_max_file_size(),
            default_quality,
            Duration::from_secs(config.get_download_timeout_secs()),
            config.get_download_max_retries(),
            Duration::from_secs(config.get_download_backoff_secs()),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        base_url: String,
        api_timeout: Duration,
        api_key: Option<String>,
        platforms: Vec<String>,
        max_file_size: u64,
        default_quality: Quality,
        download_timeout: Duration,
        download_retries: usize,
        download_backoff: Duration,
    ) -> Result<Self> {
        let api = TuneHubApi::new(base_url, api_timeout, api_key)?;
        let executor = RequestExecutor::new(api.http().clone());
        let downloader = Downloader::new(download_timeout, download_retries, download_backoff)?;

        Ok(Self {
            api,
            executor,
            cache: DescriptorCache::new(),
            downloader,
            platforms,
            max_file_size,
            default_quality,
        })
    }

    /// Retourne les plateformes connues, dans l'ordre d'agrégation
    pub fn platforms(&self) -> &[String] {
        &self.platforms
    }

    /// Retourne le palier de qualité par défaut
    pub fn default_quality(&self) -> Quality {
        self.default_quality
    }

    // ============ Descripteurs ============

    /// Récupère le descripteur d'une opération, depuis le cache ou le service
    ///
    /// Un échec de récupération ne peuple pas le cache : l'appel suivant
    /// retentera le fetch.
    pub async fn descriptor(
        &self,
        platform: &str,
        operation: Operation,
    ) -> Result<MethodDescriptor> {
        if let Some(descriptor) = self.cache.get(platform, operation.as_str()).await {
            debug!(platform, %operation, "descriptor found in cache");
            return Ok(descriptor);
        }

        let descriptor = self.api.get_method(platform, operation.as_str()).await?;
        self.cache.put(descriptor.clone()).await;
        Ok(descriptor)
    }

    /// Vide le cache de descripteurs
    pub fn clear_descriptor_cache(&self) {
        self.cache.clear_all();
    }

    /// Retourne des statistiques sur le cache de descripteurs
    pub async fn descriptor_cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    // ============ Recherche ============

    /// Recherche sur une seule plateforme
    ///
    /// Retourne une liste vide en cas d'échec, quel qu'il soit.
    pub async fn search(&self, platform: &str, keyword: &str) -> Vec<SearchResult> {
        let descriptor = match self.descriptor(platform, Operation::Search).await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(platform, error = %err, "search descriptor unavailable");
                return Vec::new();
            }
        };

        let vars = variables(&[
            ("keyword", json!(keyword)),
            ("limit", json!(DEFAULT_SEARCH_LIMIT)),
            ("page", json!(1)),
        ]);
        let records = self.executor.execute(&descriptor, &vars).await;
        records
            .iter()
            .map(|record| SearchResult::from_record(platform, record))
            .collect()
    }

    /// Recherche agrégée sur toutes les plateformes connues
    ///
    /// Une branche par plateforme, lancées de front ; l'échec d'une branche
    /// n'affecte jamais les autres. Résultats concaténés dans l'ordre de
    /// déclaration des plateformes puis dédupliqués par (plateforme, id).
    pub async fn aggregate_search(&self, keyword: &str) -> Vec<SearchResult> {
        let branches = self
            .platforms
            .iter()
            .map(|platform| self.search(platform, keyword));
        let merged: Vec<SearchResult> = future::join_all(branches)
            .await
            .into_iter()
            .flatten()
            .collect();
        dedup_by_platform_id(merged)
    }

    // ============ Classements ============

    /// Liste les classements proposés par une plateforme
    pub async fn get_toplists(&self, platform: &str) -> Vec<ToplistItem> {
        let descriptor = match self.descriptor(platform, Operation::Toplists).await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(platform, error = %err, "toplists descriptor unavailable");
                return Vec::new();
            }
        };

        let records = self.executor.execute(&descriptor, &Variables::new()).await;
        records.iter().map(ToplistItem::from_record).collect()
    }

    /// Liste les titres d'un classement
    pub async fn get_toplist_songs(&self, platform: &str, list_id: &str) -> Vec<SearchResult> {
        let descriptor = match self.descriptor(platform, Operation::ToplistSongs).await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(platform, error = %err, "toplist descriptor unavailable");
                return Vec::new();
            }
        };

        let vars = variables(&[("id", json!(list_id))]);
        let records = self.executor.execute(&descriptor, &vars).await;
        records
            .iter()
            .map(|record| SearchResult::from_record(platform, record))
            .collect()
    }

    // ============ Informations d'un titre ============

    /// Récupère les métadonnées d'un titre
    pub async fn get_song_info(&self, platform: &str, song_id: &str) -> Option<SongInfo> {
        let descriptor = match self.descriptor(platform, Operation::SongInfo).await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(platform, error = %err, "info descriptor unavailable");
                return None;
            }
        };

        let vars = variables(&[("id", json!(song_id))]);
        let records = self.executor.execute(&descriptor, &vars).await;
        records
            .first()
            .map(|record| SongInfo::from_record(platform, song_id, record))
    }

    /// Récupère les paroles d'un titre (chaîne vide en cas d'échec)
    pub async fn get_lyrics(&self, platform: &str, song_id: &str) -> String {
        let Some(info) = self.get_song_info(platform, song_id).await else {
            return String::new();
        };
        if info.lrc_url.is_empty() {
            return String::new();
        }

        match self.api.http().get(&info.lrc_url).send().await {
            Ok(response) if response.status().is_success() => {
                response.text().await.unwrap_or_default()
            }
            Ok(response) => {
                warn!(url = %info.lrc_url, status = %response.status(), "lyrics fetch rejected");
                String::new()
            }
            Err(err) => {
                warn!(url = %info.lrc_url, error = %err, "lyrics fetch failed");
                String::new()
            }
        }
    }

    /// Récupère la pochette d'un titre (octets vides en cas d'échec)
    pub async fn get_cover(&self, platform: &str, song_id: &str) -> Vec<u8> {
        let Some(info) = self.get_song_info(platform, song_id).await else {
            return Vec::new();
        };
        if info.pic_url.is_empty() {
            return Vec::new();
        }
        self.downloader.download_bytes(&info.pic_url).await
    }

    // ============ Résolution audio ============

    /// Résout une URL jouable pour un titre, en rétrogradant au besoin
    ///
    /// `skip_size_check` désactive le repli sur dépassement de taille (chemin
    /// gros fichiers disponible en aval) ; le repli sur indisponibilité reste
    /// actif.
    pub async fn resolve_audio(
        &self,
        platform: &str,
        song_id: &str,
        quality: Quality,
        skip_size_check: bool,
    ) -> AudioResolution {
        resolve_with_fallback(
            &self.api,
            platform,
            song_id,
            quality,
            self.max_file_size,
            skip_size_check,
        )
        .await
    }

    // ============ Téléchargements ============

    /// Télécharge une ressource audio avec reprise et progression
    pub async fn download_audio(
        &self,
        url: &str,
        on_progress: Option<&ProgressObserver>,
    ) -> Vec<u8> {
        self.downloader.download_audio(url, on_progress).await
    }

    /// Télécharge une ressource annexe en une seule tentative
    pub async fn download_bytes(&self, url: &str) -> Vec<u8> {
        self.downloader.download_bytes(url).await
    }
}

/// Construit un jeu de variables depuis des paires clé/valeur
fn variables(pairs: &[(&str, Value)]) -> Variables {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_platforms() {
        let client = TuneHubClient::new("https://example.com").unwrap();
        assert_eq!(client.platforms(), ["netease", "kuwo", "qq"]);
        assert_eq!(client.default_quality(), Quality::Kbps320);
    }

    #[test]
    fn test_variables_builder() {
        let vars = variables(&[("keyword", json!("x")), ("page", json!(2))]);
        assert_eq!(vars.get("keyword"), Some(&json!("x")));
        assert_eq!(vars.get("page"), Some(&json!(2)));
    }
}
