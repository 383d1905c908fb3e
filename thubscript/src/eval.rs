//! Évaluation bornée des expressions
//!
//! L'interpréteur travaille sur des valeurs JSON (`serde_json::Value`) plus
//! des fermetures. L'environnement d'exécution ne contient que ce que
//! l'appelant y place : aucune capacité d'E/S, pas d'horloge, pas d'accès au
//! processus hôte. Deux bornes s'appliquent en profondeur de défense après la
//! deny-list : un budget d'étapes et une limite de profondeur d'appel.

use crate::error::{Result, ScriptError};
use crate::expr::{BinOp, Body, Expr, Stmt, UnaryOp};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Budget d'étapes d'évaluation par exécution
pub const MAX_STEPS: usize = 100_000;

/// Profondeur maximale d'appels imbriqués
pub const MAX_DEPTH: usize = 64;

/// Valeur manipulée par l'interpréteur
#[derive(Debug, Clone)]
pub enum ScriptValue {
    Json(Value),
    Lambda(Rc<Closure>),
}

impl ScriptValue {
    pub fn null() -> Self {
        ScriptValue::Json(Value::Null)
    }
}

/// Fermeture : paramètres, corps et environnement capturé
#[derive(Debug)]
pub struct Closure {
    pub params: Vec<String>,
    pub body: Body,
    pub env: Rc<Scope>,
}

/// Environnement lexical chaîné
#[derive(Debug, Default)]
pub struct Scope {
    vars: RefCell<HashMap<String, ScriptValue>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn child(parent: Rc<Scope>) -> Rc<Self> {
        Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    pub fn define(&self, name: String, value: ScriptValue) {
        self.vars.borrow_mut().insert(name, value);
    }

    pub fn lookup(&self, name: &str) -> Option<ScriptValue> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }
}

/// Convertit une valeur d'interpréteur en JSON pur
pub fn to_json(value: ScriptValue) -> Result<Value> {
    match value {
        ScriptValue::Json(v) => Ok(v),
        ScriptValue::Lambda(_) => Err(ScriptError::Eval(
            "function value cannot be used as data".into(),
        )),
    }
}

/// Valeur numérique JSON, en forme entière quand elle est exacte
pub fn number_value(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= 9_007_199_254_740_992.0 {
        Value::Number(serde_json::Number::from(n as i64))
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Rendu textuel d'un scalaire pour l'expansion de template
///
/// Les entiers exacts s'affichent sans point décimal ; null devient la chaîne
/// vide ; les valeurs composites passent par leur forme JSON.
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                let f = n.as_f64().unwrap_or(0.0);
                if f.is_finite() && f.fract() == 0.0 && f.abs() <= 9_007_199_254_740_992.0 {
                    (f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
        }
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Valeur de vérité, sémantique JavaScript
pub fn is_truthy(value: &ScriptValue) -> bool {
    match value {
        ScriptValue::Lambda(_) => true,
        ScriptValue::Json(v) => match v {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        },
    }
}

fn to_number(value: &ScriptValue) -> Option<f64> {
    match value {
        ScriptValue::Lambda(_) => None,
        ScriptValue::Json(v) => match v {
            Value::Null => Some(0.0),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        },
    }
}

/// Égalité large : les nombres se comparent par valeur, le reste par
/// structure
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Interpréteur avec budget d'étapes
pub struct Interpreter {
    steps: Cell<usize>,
    max_steps: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_budget(MAX_STEPS)
    }

    pub fn with_budget(max_steps: usize) -> Self {
        Self {
            steps: Cell::new(0),
            max_steps,
        }
    }

    fn tick(&self) -> Result<()> {
        let steps = self.steps.get() + 1;
        self.steps.set(steps);
        if steps > self.max_steps {
            Err(ScriptError::StepBudget)
        } else {
            Ok(())
        }
    }

    /// Évalue une expression dans un environnement donné
    pub fn eval(&self, expr: &Expr, scope: &Rc<Scope>, depth: usize) -> Result<ScriptValue> {
        self.tick()?;
        if depth > MAX_DEPTH {
            return Err(ScriptError::RecursionLimit);
        }

        match expr {
            Expr::Null => Ok(ScriptValue::null()),
            Expr::Bool(b) => Ok(ScriptValue::Json(Value::Bool(*b))),
            Expr::Num(n) => Ok(ScriptValue::Json(number_value(*n))),
            Expr::Str(s) => Ok(ScriptValue::Json(Value::String(s.clone()))),
            // Un identifiant absent vaut null : c'est ce qui donne son sens à
            // l'idiome de défaut `a || b`
            Expr::Ident(name) => Ok(scope.lookup(name).unwrap_or_else(ScriptValue::null)),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(to_json(self.eval(item, scope, depth + 1)?)?);
                }
                Ok(ScriptValue::Json(Value::Array(values)))
            }
            Expr::Object(entries) => {
                let mut map = serde_json::Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), to_json(self.eval(value, scope, depth + 1)?)?);
                }
                Ok(ScriptValue::Json(Value::Object(map)))
            }
            Expr::Member(recv, name) => {
                let recv = self.eval(recv, scope, depth + 1)?;
                Ok(self.member(recv, name))
            }
            Expr::Index(recv, index) => {
                let recv = self.eval(recv, scope, depth + 1)?;
                let index = self.eval(index, scope, depth + 1)?;
                Ok(self.index(recv, index))
            }
            Expr::Call(recv, name, args) => {
                let recv = self.eval(recv, scope, depth + 1)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, scope, depth + 1)?);
                }
                self.method(recv, name, values, depth)
            }
            Expr::Invoke(callee, args) => {
                let callee = self.eval(callee, scope, depth + 1)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, scope, depth + 1)?);
                }
                self.call(&callee, values, depth + 1)
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand, scope, depth + 1)?;
                match op {
                    UnaryOp::Not => Ok(ScriptValue::Json(Value::Bool(!is_truthy(&value)))),
                    UnaryOp::Neg => {
                        let n = to_number(&value)
                            .ok_or_else(|| ScriptError::Eval("operand is not a number".into()))?;
                        Ok(ScriptValue::Json(number_value(-n)))
                    }
                }
            }
            Expr::Binary(op, left, right) => self.binary(*op, left, right, scope, depth),
            Expr::Ternary(cond, then, otherwise) => {
                let cond = self.eval(cond, scope, depth + 1)?;
                if is_truthy(&cond) {
                    self.eval(then, scope, depth + 1)
                } else {
                    self.eval(otherwise, scope, depth + 1)
                }
            }
            Expr::Lambda(params, body) => Ok(ScriptValue::Lambda(Rc::new(Closure {
                params: params.clone(),
                body: body.clone(),
                env: scope.clone(),
            }))),
        }
    }

    /// Appelle une fermeture avec les arguments donnés
    pub fn call(
        &self,
        callee: &ScriptValue,
        args: Vec<ScriptValue>,
        depth: usize,
    ) -> Result<ScriptValue> {
        self.tick()?;
        if depth > MAX_DEPTH {
            return Err(ScriptError::RecursionLimit);
        }
        let ScriptValue::Lambda(closure) = callee else {
            return Err(ScriptError::Eval("value is not callable".into()));
        };
        let scope = Scope::child(closure.env.clone());
        for (i, param) in closure.params.iter().enumerate() {
            let value = args.get(i).cloned().unwrap_or_else(ScriptValue::null);
            scope.define(param.clone(), value);
        }
        self.body(&closure.body, &scope, depth)
    }

    fn body(&self, body: &Body, scope: &Rc<Scope>, depth: usize) -> Result<ScriptValue> {
        match body {
            Body::Expr(expr) => self.eval(expr, scope, depth + 1),
            Body::Block(stmts) => {
                for stmt in stmts {
                    match stmt {
                        Stmt::Decl(name, expr) => {
                            let value = self.eval(expr, scope, depth + 1)?;
                            scope.define(name.clone(), value);
                        }
                        Stmt::Return(None) => return Ok(ScriptValue::null()),
                        Stmt::Return(Some(expr)) => return self.eval(expr, scope, depth + 1),
                    }
                }
                Ok(ScriptValue::null())
            }
        }
    }

    fn binary(
        &self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        scope: &Rc<Scope>,
        depth: usize,
    ) -> Result<ScriptValue> {
        // && et || court-circuitent et retournent l'opérande, comme en JS
        if op == BinOp::And {
            let left = self.eval(left, scope, depth + 1)?;
            if !is_truthy(&left) {
                return Ok(left);
            }
            return self.eval(right, scope, depth + 1);
        }
        if op == BinOp::Or {
            let left = self.eval(left, scope, depth + 1)?;
            if is_truthy(&left) {
                return Ok(left);
            }
            return self.eval(right, scope, depth + 1);
        }

        let lhs = self.eval(left, scope, depth + 1)?;
        let rhs = self.eval(right, scope, depth + 1)?;

        match op {
            BinOp::Add => {
                // Concaténation dès qu'un côté est une chaîne
                let is_string = |v: &ScriptValue| {
                    matches!(v, ScriptValue::Json(Value::String(_)))
                };
                if is_string(&lhs) || is_string(&rhs) {
                    let concat = |v: &ScriptValue| -> Result<String> {
                        Ok(render(&to_json(v.clone())?))
                    };
                    return Ok(ScriptValue::Json(Value::String(format!(
                        "{}{}",
                        concat(&lhs)?,
                        concat(&rhs)?
                    ))));
                }
                self.arith(op, &lhs, &rhs)
            }
            BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => self.arith(op, &lhs, &rhs),
            BinOp::Eq | BinOp::Ne => {
                let equal = match (&lhs, &rhs) {
                    (ScriptValue::Json(a), ScriptValue::Json(b)) => loose_eq(a, b),
                    _ => false,
                };
                Ok(ScriptValue::Json(Value::Bool(if op == BinOp::Eq {
                    equal
                } else {
                    !equal
                })))
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let result = if let (Some(a), Some(b)) = (to_number(&lhs), to_number(&rhs)) {
                    match op {
                        BinOp::Lt => a < b,
                        BinOp::Le => a <= b,
                        BinOp::Gt => a > b,
                        _ => a >= b,
                    }
                } else if let (
                    ScriptValue::Json(Value::String(a)),
                    ScriptValue::Json(Value::String(b)),
                ) = (&lhs, &rhs)
                {
                    match op {
                        BinOp::Lt => a < b,
                        BinOp::Le => a <= b,
                        BinOp::Gt => a > b,
                        _ => a >= b,
                    }
                } else {
                    return Err(ScriptError::Eval("operands are not comparable".into()));
                };
                Ok(ScriptValue::Json(Value::Bool(result)))
            }
            BinOp::And | BinOp::Or => unreachable!("short-circuit handled above"),
        }
    }

    fn arith(&self, op: BinOp, lhs: &ScriptValue, rhs: &ScriptValue) -> Result<ScriptValue> {
        let a = to_number(lhs).ok_or_else(|| ScriptError::Eval("operand is not a number".into()))?;
        let b = to_number(rhs).ok_or_else(|| ScriptError::Eval("operand is not a number".into()))?;
        let result = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            BinOp::Mod => a % b,
            _ => unreachable!("non-arithmetic operator"),
        };
        Ok(ScriptValue::Json(number_value(result)))
    }

    fn member(&self, recv: ScriptValue, name: &str) -> ScriptValue {
        match recv {
            ScriptValue::Json(Value::Object(map)) => {
                ScriptValue::Json(map.get(name).cloned().unwrap_or(Value::Null))
            }
            ScriptValue::Json(Value::Array(items)) if name == "length" => {
                ScriptValue::Json(number_value(items.len() as f64))
            }
            ScriptValue::Json(Value::String(s)) if name == "length" => {
                ScriptValue::Json(number_value(s.chars().count() as f64))
            }
            // Accès membre tolérant : null.x vaut null, pas une erreur
            _ => ScriptValue::null(),
        }
    }

    fn index(&self, recv: ScriptValue, index: ScriptValue) -> ScriptValue {
        match recv {
            ScriptValue::Json(Value::Array(items)) => {
                let Some(i) = to_number(&index) else {
                    return ScriptValue::null();
                };
                if i < 0.0 || i.fract() != 0.0 {
                    return ScriptValue::null();
                }
                ScriptValue::Json(items.get(i as usize).cloned().unwrap_or(Value::Null))
            }
            ScriptValue::Json(Value::Object(map)) => match index {
                ScriptValue::Json(Value::String(key)) => {
                    ScriptValue::Json(map.get(&key).cloned().unwrap_or(Value::Null))
                }
                _ => ScriptValue::null(),
            },
            _ => ScriptValue::null(),
        }
    }

    /// Méthodes intégrées disponibles sur les valeurs
    fn method(
        &self,
        recv: ScriptValue,
        name: &str,
        args: Vec<ScriptValue>,
        depth: usize,
    ) -> Result<ScriptValue> {
        match recv {
            ScriptValue::Json(Value::Array(items)) => match name {
                "map" => {
                    let callback = args
                        .first()
                        .ok_or_else(|| ScriptError::Eval("map expects a callback".into()))?;
                    let mut out = Vec::with_capacity(items.len());
                    for (i, item) in items.iter().enumerate() {
                        let mapped = self.call(
                            callback,
                            vec![
                                ScriptValue::Json(item.clone()),
                                ScriptValue::Json(number_value(i as f64)),
                            ],
                            depth + 1,
                        )?;
                        out.push(to_json(mapped)?);
                    }
                    Ok(ScriptValue::Json(Value::Array(out)))
                }
                "filter" => {
                    let callback = args
                        .first()
                        .ok_or_else(|| ScriptError::Eval("filter expects a callback".into()))?;
                    let mut out = Vec::new();
                    for (i, item) in items.iter().enumerate() {
                        let keep = self.call(
                            callback,
                            vec![
                                ScriptValue::Json(item.clone()),
                                ScriptValue::Json(number_value(i as f64)),
                            ],
                            depth + 1,
                        )?;
                        if is_truthy(&keep) {
                            out.push(item.clone());
                        }
                    }
                    Ok(ScriptValue::Json(Value::Array(out)))
                }
                "slice" => {
                    let (start, end) = js_range(
                        items.len(),
                        args.first().and_then(to_number),
                        args.get(1).and_then(to_number),
                    );
                    Ok(ScriptValue::Json(Value::Array(items[start..end].to_vec())))
                }
                "join" => {
                    let sep = match args.first() {
                        Some(ScriptValue::Json(Value::String(s))) => s.clone(),
                        None => ",".to_string(),
                        Some(other) => render(&to_json(other.clone())?),
                    };
                    let parts: Vec<String> = items.iter().map(render).collect();
                    Ok(ScriptValue::Json(Value::String(parts.join(&sep))))
                }
                "includes" => {
                    let needle = to_json(
                        args.first()
                            .cloned()
                            .unwrap_or_else(ScriptValue::null),
                    )?;
                    let found = items.iter().any(|item| loose_eq(item, &needle));
                    Ok(ScriptValue::Json(Value::Bool(found)))
                }
                other => Err(ScriptError::Eval(format!("unknown array method: {other}"))),
            },
            ScriptValue::Json(Value::String(s)) => match name {
                "split" => {
                    let sep = match args.first() {
                        Some(ScriptValue::Json(Value::String(sep))) => sep.clone(),
                        _ => return Err(ScriptError::Eval("split expects a string".into())),
                    };
                    let parts: Vec<Value> = if sep.is_empty() {
                        s.chars().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        s.split(&sep).map(|p| Value::String(p.to_string())).collect()
                    };
                    Ok(ScriptValue::Json(Value::Array(parts)))
                }
                "slice" => {
                    let chars: Vec<char> = s.chars().collect();
                    let (start, end) = js_range(
                        chars.len(),
                        args.first().and_then(to_number),
                        args.get(1).and_then(to_number),
                    );
                    let out: String = chars[start..end].iter().collect();
                    Ok(ScriptValue::Json(Value::String(out)))
                }
                "trim" => Ok(ScriptValue::Json(Value::String(s.trim().to_string()))),
                "includes" => {
                    let needle = match args.first() {
                        Some(ScriptValue::Json(Value::String(n))) => n.clone(),
                        _ => return Err(ScriptError::Eval("includes expects a string".into())),
                    };
                    Ok(ScriptValue::Json(Value::Bool(s.contains(&needle))))
                }
                "replace" => {
                    let (Some(ScriptValue::Json(Value::String(from))), Some(ScriptValue::Json(Value::String(to)))) =
                        (args.first(), args.get(1))
                    else {
                        return Err(ScriptError::Eval("replace expects two strings".into()));
                    };
                    // Comme en JS, seule la première occurrence est remplacée
                    Ok(ScriptValue::Json(Value::String(s.replacen(from, to, 1))))
                }
                "toLowerCase" => Ok(ScriptValue::Json(Value::String(s.to_lowercase()))),
                "toUpperCase" => Ok(ScriptValue::Json(Value::String(s.to_uppercase()))),
                "toString" => Ok(ScriptValue::Json(Value::String(s))),
                other => Err(ScriptError::Eval(format!("unknown string method: {other}"))),
            },
            ScriptValue::Json(value) => match name {
                "toString" => Ok(ScriptValue::Json(Value::String(render(&value)))),
                other => Err(ScriptError::Eval(format!("unknown method: {other}"))),
            },
            ScriptValue::Lambda(_) => {
                Err(ScriptError::Eval("functions have no methods".into()))
            }
        }
    }
}

/// Normalisation d'un intervalle `slice` à la JavaScript (indices négatifs
/// comptés depuis la fin, bornes serrées)
fn js_range(len: usize, start: Option<f64>, end: Option<f64>) -> (usize, usize) {
    let clamp = |v: f64| -> usize {
        if v < 0.0 {
            let adjusted = len as f64 + v;
            if adjusted < 0.0 { 0 } else { adjusted as usize }
        } else if v as usize > len {
            len
        } else {
            v as usize
        }
    };
    let start = start.map(clamp).unwrap_or(0);
    let mut end = end.map(clamp).unwrap_or(len);
    if end < start {
        end = start;
    }
    (start, end)
}
