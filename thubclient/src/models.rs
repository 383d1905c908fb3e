//! Structures de données pour représenter les objets TuneHub

use crate::error::ThubError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thubscript::NormalizedRecord;

/// Désérialiseur flexible pour les IDs qui peuvent être des strings ou des integers
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(Error::custom("ID must be a string or number")),
    }
}

/// Extrait un champ textuel d'un enregistrement normalisé
///
/// Les scripts de transformation renvoient indifféremment des strings ou des
/// nombres pour les identifiants ; tout le reste vaut absence.
fn record_string(record: &NormalizedRecord, key: &str) -> Option<String> {
    match record.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

// ============ Méthodes HTTP ============

/// Méthode HTTP d'un descripteur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HttpMethod {
    #[default]
    #[serde(rename = "GET", alias = "get")]
    Get,
    #[serde(rename = "POST", alias = "post")]
    Post,
}

// ============ Descripteurs ============

/// Recette de requête fournie par le service pour un couple
/// (plateforme, opération)
///
/// Immuable une fois récupérée ; mise en cache pour la durée du processus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Plateforme concernée (renseignée par le client si absente du corps)
    #[serde(default)]
    pub platform: String,
    /// Opération concernée (renseignée par le client si absente du corps)
    #[serde(default)]
    pub operation: String,
    /// Template de l'URL, avec placeholders `{{var}}` / `{var}`
    pub url_template: String,
    /// Paramètres de requête : valeur templatée (string) ou littéral
    #[serde(default)]
    pub params: serde_json::Map<String, Value>,
    /// En-têtes HTTP envoyés tels quels
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Méthode HTTP
    #[serde(default)]
    pub http_method: HttpMethod,
    /// Corps JSON pour les requêtes non-GET
    #[serde(default)]
    pub body: Option<serde_json::Map<String, Value>>,
    /// Script de normalisation de la réponse, exécuté en bac à sable
    #[serde(default)]
    pub transform_script: Option<String>,
}

/// Opérations connues du protocole descripteur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Search,
    Toplists,
    ToplistSongs,
    SongInfo,
}

impl Operation {
    /// Forme courte utilisée dans l'URL du service et comme clé de cache
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Search => "search",
            Operation::Toplists => "toplists",
            Operation::ToplistSongs => "toplist",
            Operation::SongInfo => "info",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============ Qualité audio ============

/// Palier de qualité audio, du plus haut au plus bas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "flac24bit")]
    Flac24Bit,
    #[serde(rename = "flac")]
    Flac,
    #[serde(rename = "320k")]
    Kbps320,
    #[serde(rename = "128k")]
    Kbps128,
}

impl Quality {
    /// Ordre de repli, du plus haut palier au plus bas
    pub const ORDER: [Quality; 4] = [
        Quality::Flac24Bit,
        Quality::Flac,
        Quality::Kbps320,
        Quality::Kbps128,
    ];

    /// Forme textuelle attendue par le service
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Flac24Bit => "flac24bit",
            Quality::Flac => "flac",
            Quality::Kbps320 => "320k",
            Quality::Kbps128 => "128k",
        }
    }

    /// Palier immédiatement inférieur, s'il existe
    pub fn next_lower(&self) -> Option<Quality> {
        let index = Quality::ORDER.iter().position(|q| q == self)?;
        Quality::ORDER.get(index + 1).copied()
    }

    /// Vrai si `self` est un palier strictement supérieur à `other`
    pub fn is_higher_than(&self, other: Quality) -> bool {
        let rank = |q: Quality| Quality::ORDER.iter().position(|x| *x == q).unwrap_or(usize::MAX);
        rank(*self) < rank(other)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = ThubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flac24bit" => Ok(Quality::Flac24Bit),
            "flac" => Ok(Quality::Flac),
            "320k" => Ok(Quality::Kbps320),
            "128k" => Ok(Quality::Kbps128),
            other => Err(ThubError::InvalidQuality(other.to_string())),
        }
    }
}

// ============ Résultats de recherche ============

/// Une ligne d'une recherche, agrégée ou mono-plateforme
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// Plateforme d'origine
    pub platform: String,
    /// Identifiant du titre sur sa plateforme
    pub id: String,
    /// Titre
    pub name: String,
    /// Artiste
    pub artist: String,
    /// Album
    #[serde(default)]
    pub album: String,
}

impl SearchResult {
    /// Projette un enregistrement normalisé en résultat de recherche
    ///
    /// Chaque champ absent reçoit sa valeur par défaut ; aucune ligne n'est
    /// rejetée à ce niveau.
    pub fn from_record(platform: &str, record: &NormalizedRecord) -> Self {
        Self {
            platform: platform.to_string(),
            id: record_string(record, "id").unwrap_or_default(),
            name: record_string(record, "name").unwrap_or_else(|| "Unknown Title".to_string()),
            artist: record_string(record, "artist")
                .unwrap_or_else(|| "Unknown Artist".to_string()),
            album: record_string(record, "album").unwrap_or_default(),
        }
    }
}

// ============ Classements ============

/// Un classement proposé par une plateforme
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToplistItem {
    /// Identifiant du classement
    pub id: String,
    /// Nom du classement
    pub name: String,
    /// URL de l'illustration
    #[serde(default)]
    pub pic: String,
    /// Fréquence de mise à jour annoncée
    #[serde(default)]
    pub update_frequency: String,
}

impl ToplistItem {
    /// Projette un enregistrement normalisé en classement
    pub fn from_record(record: &NormalizedRecord) -> Self {
        Self {
            id: record_string(record, "id").unwrap_or_default(),
            name: record_string(record, "name").unwrap_or_default(),
            pic: record_string(record, "pic").unwrap_or_default(),
            update_frequency: record_string(record, "updateFrequency").unwrap_or_default(),
        }
    }
}

// ============ Informations d'un titre ============

/// Métadonnées d'un titre
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SongInfo {
    /// Plateforme d'origine
    pub platform: String,
    /// Identifiant du titre
    pub song_id: String,
    /// Titre
    pub name: String,
    /// Artiste
    pub artist: String,
    /// Album
    #[serde(default)]
    pub album: String,
    /// URL de la pochette
    #[serde(default)]
    pub pic_url: String,
    /// URL des paroles
    #[serde(default)]
    pub lrc_url: String,
    /// URL du flux, quand l'opération info la fournit
    #[serde(default)]
    pub url: String,
}

impl SongInfo {
    /// Projette un enregistrement normalisé en métadonnées de titre
    pub fn from_record(platform: &str, song_id: &str, record: &NormalizedRecord) -> Self {
        Self {
            platform: platform.to_string(),
            song_id: song_id.to_string(),
            name: record_string(record, "name").unwrap_or_else(|| "Unknown Title".to_string()),
            artist: record_string(record, "artist")
                .unwrap_or_else(|| "Unknown Artist".to_string()),
            album: record_string(record, "album").unwrap_or_default(),
            pic_url: record_string(record, "pic").unwrap_or_default(),
            lrc_url: record_string(record, "lrc").unwrap_or_default(),
            url: record_string(record, "url").unwrap_or_default(),
        }
    }
}

// ============ Résolution audio ============

/// Issue d'une résolution de qualité pour un titre
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioResolution {
    /// Vrai si une URL jouable a été obtenue
    pub success: bool,
    /// URL résolue (vide en cas d'échec)
    #[serde(default)]
    pub url: String,
    /// Taille annoncée du fichier, en octets (0 si inconnue)
    #[serde(default)]
    pub size_bytes: u64,
    /// Palier demandé par l'appelant
    pub requested_quality: Quality,
    /// Palier effectivement servi (None en cas d'échec)
    #[serde(default)]
    pub actual_quality: Option<Quality>,
    /// Vrai si le palier servi est inférieur au palier demandé
    #[serde(default)]
    pub downgraded: bool,
    /// Dernière erreur rencontrée (None en cas de succès)
    #[serde(default)]
    pub error: Option<String>,
}

impl AudioResolution {
    /// Résolution aboutie à un palier donné
    pub(crate) fn resolved(requested: Quality, actual: Quality, url: String, size: u64) -> Self {
        Self {
            success: true,
            url,
            size_bytes: size,
            requested_quality: requested,
            actual_quality: Some(actual),
            downgraded: actual != requested,
            error: None,
        }
    }

    /// Résolution en échec
    pub(crate) fn failure(requested: Quality, error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: String::new(),
            size_bytes: 0,
            requested_quality: requested,
            actual_quality: None,
            downgraded: false,
            error: Some(error.into()),
        }
    }
}

// ============ Modèles de l'endpoint methods ============

/// Enveloppe de `GET /v1/methods/{platform}/{operation}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MethodsResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<MethodDescriptor>,
}

// ============ Modèles de l'endpoint parse ============

/// Enveloppe de `POST /v1/parse`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ParseResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<ParseData>,
}

/// Corps de la réponse parse
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ParseData {
    #[serde(default)]
    pub data: Vec<ParseEntry>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Une entrée de résolution par titre
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseEntry {
    /// Identifiant du titre
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Vrai si le service a résolu ce titre
    pub success: bool,
    /// Métadonnées associées
    pub info: Option<ParseTrackInfo>,
    /// URL jouable
    pub url: String,
    /// URL de la pochette
    pub cover: String,
    /// URL des paroles
    pub lyrics: String,
    /// Taille annoncée, en octets
    pub file_size: u64,
    /// Palier servi côté service (informatif)
    pub actual_quality: String,
    /// Vrai si le service a lui-même rétrogradé le palier
    pub was_downgraded: bool,
    /// Timestamp d'expiration de l'URL
    pub expire: i64,
    /// Message d'erreur par titre
    pub error: Option<String>,
}

/// Métadonnées portées par une entrée parse
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseTrackInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub duration: u64,
}
