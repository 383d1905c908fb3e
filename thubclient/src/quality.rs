//! Résolution d'URL audio avec repli de qualité
//!
//! La marche de repli est strictement séquentielle et itérative : chaque
//! palier inférieur n'est tenté qu'une fois l'issue du précédent connue, et
//! l'épuisement de la liste est la condition d'arrêt structurelle. Deux
//! déclencheurs indépendants descendent la même liste ordonnée :
//!
//! - dépassement du plafond de taille (désactivable par l'appelant quand un
//!   chemin gros fichiers existe en aval) ;
//! - palier non offert par la plateforme (toujours actif).

use crate::api::TuneHubApi;
use crate::error::Result;
use crate::models::{AudioResolution, ParseEntry, Quality};
use tracing::{debug, info, warn};

/// Résout une URL jouable pour un titre, en rétrogradant au besoin
///
/// Retourne la première résolution acceptable, ou la dernière issue
/// (échec ou fichier surdimensionné au palier le plus bas) quand la liste
/// des paliers est épuisée.
pub(crate) async fn resolve_with_fallback(
    api: &TuneHubApi,
    platform: &str,
    song_id: &str,
    requested: Quality,
    max_file_size: u64,
    skip_size_check: bool,
) -> AudioResolution {
    let start = Quality::ORDER
        .iter()
        .position(|quality| *quality == requested)
        .unwrap_or(0);

    let mut last = AudioResolution::failure(requested, "quality tiers exhausted");

    for tier in Quality::ORDER[start..].iter().copied() {
        match resolve_once(api, platform, song_id, tier).await {
            Ok((url, size)) => {
                if size > max_file_size && !skip_size_check {
                    info!(
                        platform,
                        song_id,
                        %tier,
                        size,
                        max_file_size,
                        "resolved file exceeds size ceiling, trying a lower tier"
                    );
                    // Issue surdimensionnée conservée : si la liste s'épuise
                    // ici, l'appelant reçoit l'URL du palier le plus bas avec
                    // sa taille et tranche lui-même
                    last = AudioResolution::resolved(requested, tier, url, size);
                    continue;
                }
                debug!(platform, song_id, %tier, size, "audio URL resolved");
                return AudioResolution::resolved(requested, tier, url, size);
            }
            Err(err) => {
                info!(
                    platform,
                    song_id,
                    %tier,
                    error = %err,
                    "tier unavailable, trying a lower tier"
                );
                last = AudioResolution::failure(requested, err.to_string());
            }
        }
    }

    if !last.success {
        warn!(platform, song_id, %requested, "audio resolution exhausted all tiers");
    }
    last
}

/// Une tentative de résolution pour un palier donné
async fn resolve_once(
    api: &TuneHubApi,
    platform: &str,
    song_id: &str,
    tier: Quality,
) -> Result<(String, u64)> {
    let entries = api.parse(platform, &[song_id], tier).await?;
    let entry = entries
        .into_iter()
        .find(|entry| entry.id == song_id || entry.id.is_empty())
        .unwrap_or_default();

    if !entry.success || entry.url.is_empty() {
        return Err(crate::error::ThubError::QualityUnavailable(
            entry_error(&entry, tier),
        ));
    }

    // Taille absente de la réponse : une requête HEAD la complète pour le
    // contrôle de plafond
    let size = if entry.file_size > 0 {
        entry.file_size
    } else {
        api.content_length(&entry.url).await
    };

    Ok((entry.url, size))
}

fn entry_error(entry: &ParseEntry, tier: Quality) -> String {
    entry
        .error
        .clone()
        .unwrap_or_else(|| format!("tier {tier} not offered"))
}
