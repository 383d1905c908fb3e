//! Fusion des résultats de la recherche agrégée
//!
//! La recherche agrégée lance une branche par plateforme ; la fusion
//! concatène les branches dans l'ordre de déclaration des plateformes puis
//! déduplique par (plateforme, id), première occurrence gagnante. Aucun
//! re-classement inter-plateformes : l'ordre d'agrégation est l'ordre
//! d'affichage.

use crate::models::SearchResult;
use std::collections::HashSet;

/// Déduplique une liste de résultats par (plateforme, id)
///
/// La première occurrence gagne ; l'ordre relatif des survivants est
/// inchangé.
pub(crate) fn dedup_by_platform_id(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(results.len());
    results
        .into_iter()
        .filter(|result| seen.insert((result.platform.clone(), result.id.clone())))
        .collect()
}
