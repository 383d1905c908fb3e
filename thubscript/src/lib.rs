//! # thubscript - Couche script des descripteurs TuneHub
//!
//! Cette crate isole tout ce qui touche au texte semi-fiable fourni par le
//! service TuneHub dans ses descripteurs : templates d'URL et de paramètres,
//! et scripts de transformation des réponses.
//!
//! ## Vue d'ensemble
//!
//! - Expansion de templates `{{var}}` / `{var}` en deux phases, la
//!   substitution littérale précédant toujours l'évaluation d'expressions
//! - Mini-interpréteur d'expressions borné (budget d'étapes, profondeur
//!   limitée) opérant sur des valeurs JSON
//! - Deny-list statique appliquée avant toute évaluation
//! - Bac à sable d'exécution des scripts de transformation, sans aucune
//!   capacité d'E/S
//!
//! La crate n'a volontairement aucune dépendance réseau ou fichier : le
//! confinement est structurel, pas seulement déclaratif.
//!
//! ## Structure des modules
//!
//! ```text
//! thubscript/
//! ├── src/
//! │   ├── lib.rs              # Module principal (ce fichier)
//! │   ├── guard.rs            # Deny-list partagée
//! │   ├── lexer.rs            # Analyse lexicale
//! │   ├── expr.rs             # AST et analyse syntaxique
//! │   ├── eval.rs             # Évaluation bornée
//! │   ├── template.rs         # Expansion de templates
//! │   └── sandbox.rs          # Exécution des scripts de transformation
//! ```
//!
//! ## Utilisation
//!
//! ```rust
//! use serde_json::json;
//! use thubscript::{Variables, expand, run_transform};
//!
//! let mut vars = Variables::new();
//! vars.insert("keyword".to_string(), json!("test"));
//! vars.insert("page".to_string(), json!(3));
//!
//! let url = expand("https://x/s?kw={{keyword}}&p={{(page || 1) - 1}}", &vars);
//! assert_eq!(url, "https://x/s?kw=test&p=2");
//!
//! let response = json!({"songs": [{"id": 1, "name": "A"}]});
//! let records = run_transform("resp => resp.songs", &response);
//! assert_eq!(records.len(), 1);
//! ```

pub mod error;
pub mod eval;
pub mod expr;
pub mod guard;
pub mod lexer;
pub mod sandbox;
pub mod template;

pub use error::{Result, ScriptError};
pub use guard::{DENY_LIST, find_denied};
pub use sandbox::{NormalizedRecord, run_transform};
pub use template::{Variables, expand, sanitize_identifier};
