//! Exécution des requêtes décrites par un descripteur
//!
//! L'exécuteur expanse l'URL et chaque champ textuel des paramètres et du
//! corps avec le même jeu de variables, émet la requête HTTP décrite, parse
//! la réponse en JSON quel que soit son Content-Type annoncé, puis route le
//! résultat vers le bac à sable de transformation.
//!
//! Le contrat est total : toute erreur (transport, statut, corps non-JSON,
//! code de service non nul, script rejeté) dégrade en séquence vide avec un
//! avertissement, jamais en exception. Un descripteur n'est jamais appliqué
//! partiellement : l'expansion et la transformation voient le même jeu de
//! variables ou l'opération entière échoue.

use crate::models::{HttpMethod, MethodDescriptor};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use thubscript::{NormalizedRecord, Variables, expand, run_transform};
use tracing::{debug, warn};

/// Exécuteur de requêtes descripteur
///
/// Partage le pool de connexions des appels de métadonnées.
pub struct RequestExecutor {
    http: Client,
}

impl RequestExecutor {
    /// Crée un exécuteur sur un transport existant
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Exécute un descripteur avec les variables fournies
    ///
    /// Retourne les enregistrements normalisés, ou une séquence vide en cas
    /// d'échec de n'importe quelle étape.
    pub async fn execute(
        &self,
        descriptor: &MethodDescriptor,
        vars: &Variables,
    ) -> Vec<NormalizedRecord> {
        let url = expand(&descriptor.url_template, vars);
        debug!(
            platform = %descriptor.platform,
            operation = %descriptor.operation,
            %url,
            "executing descriptor request"
        );

        // Paramètres de requête : champs string expansés, littéraux rendus
        let query: Vec<(String, String)> = descriptor
            .params
            .iter()
            .map(|(name, value)| (name.clone(), expand_field(value, vars)))
            .collect();

        let mut request = match descriptor.http_method {
            HttpMethod::Get => self.http.get(&url),
            HttpMethod::Post => {
                let body: serde_json::Map<String, Value> = descriptor
                    .body
                    .as_ref()
                    .map(|body| {
                        body.iter()
                            .map(|(name, value)| (name.clone(), expand_value(value, vars)))
                            .collect()
                    })
                    .unwrap_or_default();
                self.http.post(&url).json(&body)
            }
        };
        if !query.is_empty() {
            request = request.query(&query);
        }
        request = request.headers(header_map(descriptor));

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(%url, error = %err, "descriptor request failed");
                return Vec::new();
            }
        };
        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "descriptor request rejected");
            return Vec::new();
        }

        // JSON quel que soit le Content-Type : certains endpoints amont
        // étiquettent leur JSON en text/plain
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%url, error = %err, "failed to read response body");
                return Vec::new();
            }
        };
        let payload: Value = match serde_json::from_slice(&bytes) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%url, error = %err, "response body is not JSON");
                return Vec::new();
            }
        };

        // Code d'erreur explicite : échec sans passer par le bac à sable
        if let Some(code) = payload.get("code").and_then(Value::as_i64) {
            if code != 0 {
                let message = payload
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                warn!(%url, code, message, "service returned an error code");
                return Vec::new();
            }
        }

        match &descriptor.transform_script {
            Some(script) => run_transform(script, &payload),
            None => match payload {
                // Sans script, une réponse déjà séquentielle passe telle
                // quelle (seuls les enregistrements sont conservés)
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            },
        }
    }
}

/// Expansion d'un champ de paramètre : les strings passent par le template,
/// les littéraux sont rendus tels quels
fn expand_field(value: &Value, vars: &Variables) -> String {
    match value {
        Value::String(template) => expand(template, vars),
        other => thubscript::eval::render(other),
    }
}

/// Expansion d'un champ de corps : les strings passent par le template, les
/// autres valeurs sont inchangées
fn expand_value(value: &Value, vars: &Variables) -> Value {
    match value {
        Value::String(template) => Value::String(expand(template, vars)),
        other => other.clone(),
    }
}

/// Conversion des en-têtes du descripteur ; les entrées invalides sont
/// ignorées avec un avertissement
fn header_map(descriptor: &MethodDescriptor) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in &descriptor.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => {
                warn!(header = %name, "invalid descriptor header, skipped");
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expand_field_literal_passthrough() {
        let vars = Variables::new();
        assert_eq!(expand_field(&json!(20), &vars), "20");
        assert_eq!(expand_field(&json!(true), &vars), "true");
    }

    #[test]
    fn test_expand_field_template() {
        let mut vars = Variables::new();
        vars.insert("keyword".to_string(), json!("rust"));
        assert_eq!(expand_field(&json!("{{keyword}}"), &vars), "rust");
    }

    #[test]
    fn test_header_map_skips_invalid_entries() {
        let mut descriptor = MethodDescriptor {
            platform: "p".into(),
            operation: "o".into(),
            url_template: "https://x".into(),
            params: serde_json::Map::new(),
            headers: std::collections::HashMap::new(),
            http_method: HttpMethod::Get,
            body: None,
            transform_script: None,
        };
        descriptor
            .headers
            .insert("Referer".to_string(), "https://ok".to_string());
        descriptor
            .headers
            .insert("Bad Name".to_string(), "x".to_string());
        let headers = header_map(&descriptor);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Referer").unwrap(), "https://ok");
    }
}
