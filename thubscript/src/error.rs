//! Gestion des erreurs pour la couche script

use thiserror::Error;

/// Type Result personnalisé pour thubscript
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Erreurs possibles lors de l'analyse ou de l'exécution d'un script
#[derive(Error, Debug)]
pub enum ScriptError {
    /// Le texte contient un jeton interdit par la deny-list
    #[error("denied token in script: {0}")]
    DeniedToken(&'static str),

    /// Erreur d'analyse lexicale
    #[error("lexical error: {0}")]
    Lex(String),

    /// Erreur d'analyse syntaxique
    #[error("parse error: {0}")]
    Parse(String),

    /// Erreur d'évaluation
    #[error("evaluation error: {0}")]
    Eval(String),

    /// Budget d'exécution épuisé (script pathologique)
    #[error("step budget exhausted")]
    StepBudget,

    /// Profondeur d'appel maximale dépassée
    #[error("recursion limit exceeded")]
    RecursionLimit,

    /// Le script de transformation n'a pas retourné une séquence
    #[error("transform did not return a sequence")]
    NotASequence,
}
