//! Expansion de templates de descripteurs
//!
//! L'expansion se fait en deux phases, dans cet ordre obligatoirement :
//!
//! 1. **Substitution littérale** : chaque occurrence de `{{cle}}` ou `{cle}`
//!    pour une clé présente dans les variables est remplacée par la valeur
//!    rendue telle quelle. Le texte substitué est masqué jusqu'à la fin de
//!    l'expansion : une valeur qui contient elle-même de la syntaxe
//!    d'expression ne sera jamais ré-évaluée.
//! 2. **Substitution d'expressions** : chaque span `{{ expr }}` restant est
//!    évalué dans un environnement ne contenant que les variables fournies
//!    (identifiants assainis). Un jeton interdit ou une erreur d'évaluation
//!    laisse le span intact (dégradation partielle, jamais d'échec global) et
//!    émet un avertissement.

use crate::eval::{Interpreter, Scope, ScriptValue, render, to_json};
use crate::expr::parse;
use crate::guard::{find_denied, snippet};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::rc::Rc;
use tracing::warn;

/// Variables scalaires fournies par l'appelant pour une expansion
pub type Variables = serde_json::Map<String, Value>;

static EXPR_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("invalid span regex"));

// Sentinelles de masquage (zone privée Unicode), jamais présentes dans un
// template réel
const MASK_OPEN: char = '\u{E000}';
const MASK_CLOSE: char = '\u{E001}';

/// Assainit un nom de variable en identifiant sûr
///
/// Tout caractère hors `[A-Za-z0-9_]` devient `_` ; les expressions
/// référencent la forme assainie.
pub fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Expanse un template avec les variables fournies
///
/// Total par construction : le pire cas rend le template inchangé.
pub fn expand(template: &str, vars: &Variables) -> String {
    // Phase 1 : substitution littérale, texte masqué
    let mut text = template.to_string();
    let mut masked: Vec<String> = Vec::new();
    for (key, value) in vars {
        let rendered = render(value);
        for pattern in [format!("{{{{{key}}}}}"), format!("{{{key}}}")] {
            while text.contains(&pattern) {
                let token = format!("{MASK_OPEN}{}{MASK_CLOSE}", masked.len());
                masked.push(rendered.clone());
                text = text.replacen(&pattern, &token, 1);
            }
        }
    }

    // Phase 2 : les spans {{ ... }} restants sont des expressions
    let scope = Scope::root();
    for (key, value) in vars {
        scope.define(sanitize_identifier(key), ScriptValue::Json(value.clone()));
    }
    let expanded = EXPR_SPAN.replace_all(&text, |caps: &Captures| {
        let span = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let source = caps.get(1).map(|m| m.as_str()).unwrap_or_default().trim();
        expand_span(span, source, &scope)
    });

    // Phase 3 : restauration des substitutions littérales
    let mut out = expanded.into_owned();
    for (i, value) in masked.iter().enumerate() {
        out = out.replace(&format!("{MASK_OPEN}{i}{MASK_CLOSE}"), value);
    }
    out
}

fn expand_span(span: &str, source: &str, scope: &Rc<Scope>) -> String {
    if let Some(token) = find_denied(source) {
        warn!(
            token,
            expression = %snippet(source),
            "denied token in template expression, span left untouched"
        );
        return span.to_string();
    }

    let result = parse(source)
        .and_then(|expr| Interpreter::new().eval(&expr, scope, 0))
        .and_then(to_json);

    match result {
        Ok(value) => render(&value),
        Err(err) => {
            warn!(
                error = %err,
                expression = %snippet(source),
                "template expression failed, span left untouched"
            );
            span.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_no_placeholder_is_identity() {
        let v = vars(&[("keyword", json!("x"))]);
        assert_eq!(expand("https://x/plain?a=1", &v), "https://x/plain?a=1");
        assert_eq!(expand("", &v), "");
    }

    #[test]
    fn test_literal_substitution_both_forms() {
        let v = vars(&[("keyword", json!("test")), ("limit", json!(20))]);
        assert_eq!(
            expand("s?kw={{keyword}}&n={limit}", &v),
            "s?kw=test&n=20"
        );
    }

    #[test]
    fn test_expression_with_default_idiom() {
        let v = vars(&[("keyword", json!("test")), ("page", json!(3))]);
        assert_eq!(
            expand("https://x/s?kw={{keyword}}&p={{(page || 1) - 1}}", &v),
            "https://x/s?kw=test&p=2"
        );
    }

    #[test]
    fn test_expression_default_when_var_absent() {
        let v = vars(&[("keyword", json!("test"))]);
        assert_eq!(
            expand("p={{(page || 1) - 1}}", &v),
            "p=0"
        );
    }

    #[test]
    fn test_literal_before_expression_ordering() {
        // Une valeur contenant de la syntaxe d'expression ne doit jamais être
        // ré-évaluée
        let v = vars(&[("kw", json!("{{danger}}"))]);
        assert_eq!(expand("q={{kw}}", &v), "q={{danger}}");

        let v = vars(&[("kw", json!("{{1+1}}"))]);
        assert_eq!(expand("q={{kw}}", &v), "q={{1+1}}");
    }

    #[test]
    fn test_denied_expression_left_untouched() {
        let v = vars(&[("id", json!(5))]);
        assert_eq!(
            expand("u={{fetch(id)}}", &v),
            "u={{fetch(id)}}"
        );
    }

    #[test]
    fn test_invalid_expression_left_untouched() {
        let v = Variables::new();
        assert_eq!(expand("u={{+++}}", &v), "u={{+++}}");
    }

    #[test]
    fn test_sanitized_variable_names() {
        let mut v = Variables::new();
        v.insert("song-id".to_string(), json!(42));
        // La forme littérale utilise la clé d'origine
        assert_eq!(expand("id={{song-id}}", &v), "id=42");
        // Les expressions référencent l'identifiant assaini
        assert_eq!(expand("next={{song_id + 1}}", &v), "next=43");
    }

    #[test]
    fn test_ternary_expression() {
        let v = vars(&[("vip", json!(true))]);
        assert_eq!(expand("t={{vip ? 'v' : 's'}}", &v), "t=v");
    }

    #[test]
    fn test_integer_rendering() {
        let v = vars(&[("page", json!(2.0))]);
        assert_eq!(expand("p={{page}}", &v), "p=2");
        assert_eq!(expand("h={{page / 4}}", &v), "h=0.5");
    }
}
