//! Endpoint de distribution des descripteurs
//!
//! `GET /v1/methods/{platform}/{operation}` retourne la recette de requête
//! pour un couple (plateforme, opération). Un code de service non nul est un
//! échec franc : rien n'est mis en cache et l'appel sera retenté à la
//! prochaine demande.

use super::TuneHubApi;
use crate::error::{Result, ThubError};
use crate::models::{MethodDescriptor, MethodsResponse};

impl TuneHubApi {
    /// Récupère le descripteur d'une opération auprès du service
    pub async fn get_method(&self, platform: &str, operation: &str) -> Result<MethodDescriptor> {
        let url = format!("{}/v1/methods/{}/{}", self.base_url(), platform, operation);
        let response: MethodsResponse = self.get_json(&url).await?;

        Self::check_service_code(response.code, response.message)?;

        let mut descriptor = response.data.ok_or_else(|| ThubError::DescriptorNotFound {
            platform: platform.to_string(),
            operation: operation.to_string(),
        })?;

        // Le corps peut omettre la clé : elle est rétablie depuis l'appel
        if descriptor.platform.is_empty() {
            descriptor.platform = platform.to_string();
        }
        if descriptor.operation.is_empty() {
            descriptor.operation = operation.to_string();
        }

        Ok(descriptor)
    }
}
