//! Couche d'accès bas-niveau au service TuneHub
//!
//! Ce module porte le transport HTTP partagé par toutes les opérations de
//! métadonnées et les deux endpoints fixes du service : la distribution de
//! descripteurs (`methods`) et la résolution d'URL audio (`parse`). Les
//! téléchargements binaires utilisent un transport distinct, voir
//! [`crate::download`].

pub mod methods;
pub mod parse;

use crate::error::{Result, ThubError};
use reqwest::{Client, RequestBuilder, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// User-Agent par défaut du client de métadonnées
pub const DEFAULT_USER_AGENT: &str = "thubclient/0.1";

/// En-tête portant la clé d'API quand elle est configurée
const API_KEY_HEADER: &str = "X-API-Key";

/// Client API bas-niveau pour communiquer avec TuneHub
pub struct TuneHubApi {
    /// Client HTTP des appels de métadonnées
    client: Client,
    /// URL de base du service, sans slash final
    base_url: String,
    /// Clé d'API optionnelle
    api_key: Option<String>,
}

impl TuneHubApi {
    /// Crée une nouvelle instance de l'API
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        api_key: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Retourne l'URL de base du service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retourne le client HTTP partagé (pool de connexions des métadonnées)
    pub fn http(&self) -> &Client {
        &self.client
    }

    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    /// Effectue une requête GET et décode le corps en JSON
    ///
    /// Le corps est parsé en JSON quel que soit le Content-Type annoncé :
    /// certains endpoints amont étiquettent leur JSON en texte brut.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(%url, "GET");
        let response = self
            .with_api_key(self.client.get(url))
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Effectue une requête POST JSON et décode le corps en JSON
    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(%url, "POST");
        let response = self
            .with_api_key(self.client.post(url).json(body))
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Taille annoncée d'une ressource, via une requête HEAD
    ///
    /// Retourne 0 quand la taille est inconnue ou que la requête échoue : la
    /// taille ne sert qu'au contrôle de plafond, et 0 passe toujours.
    pub async fn content_length(&self, url: &str) -> u64 {
        let response = match self.client.head(url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(%url, status = %response.status(), "HEAD request rejected");
                return 0;
            }
            Err(err) => {
                warn!(%url, error = %err, "HEAD request failed");
                return 0;
            }
        };
        response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(0)
    }

    /// Signale une enveloppe de service en erreur (code non nul)
    pub(crate) fn check_service_code(code: i64, message: Option<String>) -> Result<()> {
        if code != 0 {
            return Err(ThubError::from_service_code(code, message));
        }
        Ok(())
    }
}
