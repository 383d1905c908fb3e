//! Gestion des erreurs pour le client TuneHub

use thiserror::Error;

/// Type Result personnalisé pour thubclient
pub type Result<T> = std::result::Result<T, ThubError>;

/// Erreurs possibles lors de l'utilisation du client TuneHub
///
/// Ces erreurs circulent entre les couches internes ; la façade publique les
/// dégrade en sentinelles (séquence vide, octets vides, résolution en échec)
/// et ne les propage jamais à l'appelant.
#[derive(Error, Debug)]
pub enum ThubError {
    /// Descripteur introuvable pour un couple (plateforme, opération)
    #[error("descriptor not found for ({platform}, {operation})")]
    DescriptorNotFound { platform: String, operation: String },

    /// Erreur HTTP
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur de parsing JSON
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Erreur explicite du service TuneHub (code non nul)
    #[error("TuneHub API error (code {code}): {message}")]
    Api { code: i64, message: String },

    /// Palier de qualité inconnu
    #[error("invalid quality tier: {0}")]
    InvalidQuality(String),

    /// Palier de qualité non offert pour ce titre
    #[error("quality not available: {0}")]
    QualityUnavailable(String),

    /// Erreur de configuration (anyhow)
    #[error("configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// Erreur générique
    #[error("TuneHub client error: {0}")]
    Other(String),
}

impl ThubError {
    /// Crée une erreur API depuis un code de service et un message optionnel
    pub fn from_service_code(code: i64, message: Option<String>) -> Self {
        Self::Api {
            code,
            message: message.unwrap_or_else(|| "unknown service error".to_string()),
        }
    }

    /// Vérifie si l'erreur signale un palier de qualité indisponible
    pub fn is_quality_unavailable(&self) -> bool {
        matches!(self, ThubError::QualityUnavailable(_))
    }
}
