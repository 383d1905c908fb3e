//! Exécution bac-à-sable des scripts de transformation
//!
//! Un script de transformation est la fonction de normalisation embarquée
//! dans un descripteur : elle reçoit la réponse JSON brute et retourne une
//! séquence d'enregistrements. Le texte vient du service distant, considéré
//! semi-fiable : il est d'abord passé à la deny-list, puis évalué par
//! l'interpréteur borné, sans aucune capacité ambiante ; la seule valeur
//! accessible est la réponse passée en argument.
//!
//! Toute violation, erreur d'exécution ou valeur de retour non-séquence
//! produit une séquence vide ; rien ne remonte jamais à l'appelant sous forme
//! d'exception.

use crate::error::{Result, ScriptError};
use crate::eval::{Interpreter, Scope, ScriptValue, to_json};
use crate::expr::{Body, Expr, parse};
use crate::guard::{find_denied, snippet};
use serde_json::Value;
use tracing::warn;

/// Enregistrement normalisé produit par un script de transformation
pub type NormalizedRecord = serde_json::Map<String, Value>;

// Nom sous lequel une expression nue voit la réponse
const IMPLICIT_PARAM: &str = "data";

/// Exécute un script de transformation sur une réponse brute
///
/// Total par construction : tout échec produit une séquence vide et un
/// avertissement.
pub fn run_transform(script: &str, response: &Value) -> Vec<NormalizedRecord> {
    match try_run(script, response) {
        Ok(records) => records,
        Err(err) => {
            warn!(
                error = %err,
                script = %snippet(script),
                "transform script rejected, returning empty sequence"
            );
            Vec::new()
        }
    }
}

fn try_run(script: &str, response: &Value) -> Result<Vec<NormalizedRecord>> {
    // La deny-list s'applique au texte complet, avant toute analyse
    if let Some(token) = find_denied(script) {
        return Err(ScriptError::DeniedToken(token));
    }

    let entry = wrap_script(script)?;
    let interpreter = Interpreter::new();
    let scope = Scope::root();
    let callee = interpreter.eval(&entry, &scope, 0)?;
    let result = interpreter.call(
        &callee,
        vec![ScriptValue::Json(response.clone())],
        0,
    )?;

    let Value::Array(items) = to_json(result)? else {
        return Err(ScriptError::NotASequence);
    };

    let mut records = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for item in items {
        match item {
            Value::Object(map) => records.push(map),
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!(dropped, "transform returned non-record elements, dropped");
    }
    Ok(records)
}

/// Normalise la forme textuelle du script en un point d'entrée appelable
///
/// Trois formes sont acceptées : lambda fléchée, déclaration `function`
/// (nommée ou non) et expression nue ; cette dernière voit la réponse liée
/// sous le nom `data`.
fn wrap_script(script: &str) -> Result<Expr> {
    let expr = parse(script.trim())?;
    match expr {
        Expr::Lambda(_, _) => Ok(expr),
        other => Ok(Expr::Lambda(
            vec![IMPLICIT_PARAM.to_string()],
            Body::Expr(Box::new(other)),
        )),
    }
}
