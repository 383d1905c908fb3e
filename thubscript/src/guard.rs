//! Deny-list appliquée aux expressions de template et aux scripts de
//! transformation avant toute évaluation.
//!
//! La correspondance est une simple recherche de sous-chaîne, sensible à la
//! casse. Un faux positif (par exemple `retrieval` qui contient `eval`) laisse
//! le span inchangé ou vide le résultat au lieu de l'évaluer : les
//! descripteurs sont semi-fiables et la dégradation partielle est la politique
//! retenue.

/// Jetons interdits : primitives de processus, de fichiers, de réseau, de
/// timers et de chargement dynamique de code.
pub const DENY_LIST: &[&str] = &[
    // Processus / environnement hôte
    "process",
    "child_process",
    "Deno",
    "Bun",
    // Système de fichiers
    "require",
    "readFile",
    "writeFile",
    "fs.",
    // Réseau
    "fetch",
    "XMLHttpRequest",
    "WebSocket",
    "http.",
    "net.",
    // Timers
    "setTimeout",
    "setInterval",
    "setImmediate",
    "queueMicrotask",
    // Chargement dynamique / évasion du bac à sable
    "import",
    "eval",
    "Function",
    "globalThis",
    "constructor",
    "__proto__",
    "prototype",
];

/// Retourne le premier jeton interdit présent dans `text`, s'il y en a un
pub fn find_denied(text: &str) -> Option<&'static str> {
    DENY_LIST.iter().copied().find(|token| text.contains(token))
}

/// Tronque un texte pour les messages de log (les scripts complets ne sont
/// jamais journalisés)
pub(crate) fn snippet(text: &str) -> String {
    const MAX: usize = 80;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(MAX).collect();
        format!("{truncated}…")
    }
}
