//! AST et analyse syntaxique du mini-langage d'expressions
//!
//! Descente récursive classique. La grammaire accepte les trois formes que
//! les descripteurs emploient pour leurs scripts : expression nue, lambda
//! fléchée et déclaration `function` (nommée ou non).

use crate::error::{Result, ScriptError};
use crate::lexer::{Token, tokenize};

/// Opérateur unaire
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Opérateur binaire
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Corps d'une lambda : expression simple ou bloc d'instructions
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

/// Instruction autorisée dans un bloc
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `const x = expr;` ou `let x = expr;`
    Decl(String, Expr),
    /// `return expr;` ou `return;`
    Return(Option<Expr>),
}

/// Nœud d'expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    /// `recv.name`
    Member(Box<Expr>, String),
    /// `recv[index]`
    Index(Box<Expr>, Box<Expr>),
    /// `recv.name(args)`, méthode intégrée
    Call(Box<Expr>, String, Vec<Expr>),
    /// `callee(args)`, appel d'une lambda
    Invoke(Box<Expr>, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// `cond ? then : else`
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    /// `(a, b) => body` ou `function f(a, b) { ... }`
    Lambda(Vec<String>, Body),
}

/// Analyse un texte source complet en une expression unique
pub fn parse(src: &str) -> Result<Expr> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(ScriptError::Parse(format!(
            "unexpected trailing token: {:?}",
            parser.peek()
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(ScriptError::Parse(format!(
                "expected {:?}, found {:?}",
                token,
                self.peek()
            )))
        }
    }

    fn ident(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name),
            other => Err(ScriptError::Parse(format!(
                "expected identifier, found {other:?}"
            ))),
        }
    }

    fn expression(&mut self) -> Result<Expr> {
        self.ternary()
    }

    fn ternary(&mut self) -> Result<Expr> {
        let cond = self.logical_or()?;
        if self.eat(&Token::Question) {
            let then = self.ternary()?;
            self.expect(&Token::Colon)?;
            let otherwise = self.ternary()?;
            return Ok(Expr::Ternary(
                Box::new(cond),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(cond)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut left = self.logical_and()?;
        while self.eat(&Token::OrOr) {
            let right = self.logical_and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut left = self.equality()?;
        while self.eat(&Token::AndAnd) {
            let right = self.equality()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut left = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinOp::Eq,
                Some(Token::NotEq) => BinOp::Ne,
                _ => break,
            };
            self.pos += 1;
            let right = self.comparison()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Le) => BinOp::Le,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::Ge) => BinOp::Ge,
                _ => break,
            };
            self.pos += 1;
            let right = self.additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Bang) {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat(&Token::Minus) {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        let primary = self.primary()?;
        self.postfix(primary)
    }

    fn postfix(&mut self, mut expr: Expr) -> Result<Expr> {
        loop {
            if self.eat(&Token::Dot) {
                let name = self.ident()?;
                if self.eat(&Token::LParen) {
                    let args = self.arguments()?;
                    expr = Expr::Call(Box::new(expr), name, args);
                } else {
                    expr = Expr::Member(Box::new(expr), name);
                }
            } else if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(&Token::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.eat(&Token::LParen) {
                let args = self.arguments()?;
                expr = Expr::Invoke(Box::new(expr), args);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Arguments d'appel, la parenthèse ouvrante étant déjà consommée
    fn arguments(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen)?;
            return Ok(args);
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Null) => Ok(Expr::Null),
            Some(Token::Ident(name)) => {
                // `x => body`
                if self.eat(&Token::Arrow) {
                    let body = self.lambda_body()?;
                    return Ok(Expr::Lambda(vec![name], body));
                }
                Ok(Expr::Ident(name))
            }
            Some(Token::LParen) => {
                // Tentative : `(a, b) => body`
                if let Some(params) = self.try_lambda_params() {
                    let body = self.lambda_body()?;
                    return Ok(Expr::Lambda(params, body));
                }
                let expr = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if self.eat(&Token::RBracket) {
                    return Ok(Expr::Array(items));
                }
                loop {
                    items.push(self.expression()?);
                    if self.eat(&Token::Comma) {
                        if self.eat(&Token::RBracket) {
                            break;
                        }
                        continue;
                    }
                    self.expect(&Token::RBracket)?;
                    break;
                }
                Ok(Expr::Array(items))
            }
            Some(Token::LBrace) => {
                let mut entries = Vec::new();
                if self.eat(&Token::RBrace) {
                    return Ok(Expr::Object(entries));
                }
                loop {
                    let key = match self.next() {
                        Some(Token::Ident(name)) => name,
                        Some(Token::Str(s)) => s,
                        other => {
                            return Err(ScriptError::Parse(format!(
                                "expected object key, found {other:?}"
                            )));
                        }
                    };
                    let value = if self.eat(&Token::Colon) {
                        self.expression()?
                    } else {
                        // Raccourci `{id, name}`
                        Expr::Ident(key.clone())
                    };
                    entries.push((key, value));
                    if self.eat(&Token::Comma) {
                        if self.eat(&Token::RBrace) {
                            break;
                        }
                        continue;
                    }
                    self.expect(&Token::RBrace)?;
                    break;
                }
                Ok(Expr::Object(entries))
            }
            Some(Token::Function) => {
                // Le nom éventuel est accepté mais ignoré
                if matches!(self.peek(), Some(Token::Ident(_))) {
                    self.pos += 1;
                }
                self.expect(&Token::LParen)?;
                let mut params = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        params.push(self.ident()?);
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        self.expect(&Token::RParen)?;
                        break;
                    }
                }
                self.expect(&Token::LBrace)?;
                let stmts = self.block()?;
                Ok(Expr::Lambda(params, Body::Block(stmts)))
            }
            other => Err(ScriptError::Parse(format!(
                "unexpected token: {other:?}"
            ))),
        }
    }

    /// Tentative de lecture des paramètres d'une lambda parenthésée, la
    /// parenthèse ouvrante étant déjà consommée ; restaure la position en cas
    /// d'échec
    fn try_lambda_params(&mut self) -> Option<Vec<String>> {
        let save = self.pos;
        let mut params = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                match self.next() {
                    Some(Token::Ident(name)) => params.push(name),
                    _ => {
                        self.pos = save;
                        return None;
                    }
                }
                if self.eat(&Token::Comma) {
                    continue;
                }
                if self.eat(&Token::RParen) {
                    break;
                }
                self.pos = save;
                return None;
            }
        }
        if self.eat(&Token::Arrow) {
            Some(params)
        } else {
            self.pos = save;
            None
        }
    }

    fn lambda_body(&mut self) -> Result<Body> {
        if self.eat(&Token::LBrace) {
            Ok(Body::Block(self.block()?))
        } else {
            Ok(Body::Expr(Box::new(self.expression()?)))
        }
    }

    /// Corps d'un bloc, l'accolade ouvrante étant déjà consommée
    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.eat(&Token::RBrace) {
            match self.next() {
                Some(Token::Const) | Some(Token::Let) => {
                    let name = self.ident()?;
                    self.expect(&Token::Assign)?;
                    let value = self.expression()?;
                    self.eat(&Token::Semicolon);
                    stmts.push(Stmt::Decl(name, value));
                }
                Some(Token::Return) => {
                    if self.eat(&Token::Semicolon) || self.peek() == Some(&Token::RBrace) {
                        stmts.push(Stmt::Return(None));
                    } else {
                        let value = self.expression()?;
                        self.eat(&Token::Semicolon);
                        stmts.push(Stmt::Return(Some(value)));
                    }
                }
                other => {
                    return Err(ScriptError::Parse(format!(
                        "unexpected statement token: {other:?}"
                    )));
                }
            }
        }
        Ok(stmts)
    }
}
