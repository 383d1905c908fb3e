//! Endpoint de résolution d'URL audio
//!
//! `POST /v1/parse` résout une liste de titres vers des URLs jouables pour un
//! palier de qualité donné. Le service accepte plusieurs identifiants joints
//! par des virgules ; le resolver n'en passe qu'un à la fois mais l'API
//! expose la forme batch.

use super::TuneHubApi;
use crate::error::Result;
use crate::models::{ParseEntry, ParseResponse, Quality};
use serde_json::json;
use tracing::warn;

impl TuneHubApi {
    /// Résout un lot de titres pour un palier de qualité
    pub async fn parse(
        &self,
        platform: &str,
        ids: &[&str],
        quality: Quality,
    ) -> Result<Vec<ParseEntry>> {
        let url = format!("{}/v1/parse", self.base_url());
        let body = json!({
            "platform": platform,
            "ids": ids.join(","),
            "quality": quality.as_str(),
        });

        let response: ParseResponse = self.post_json(&url, &body).await?;
        Self::check_service_code(response.code, response.message)?;

        let data = response.data.unwrap_or_default();
        if let Some(error) = data.error {
            warn!(platform, %quality, error, "parse endpoint reported a batch error");
        }
        Ok(data.data)
    }
}
