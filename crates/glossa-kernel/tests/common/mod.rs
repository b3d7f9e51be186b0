//! Shared fixtures: two toy language runtimes.
//!
//! `CalcRuntime` is a small integer-expression language with C-ish surface
//! syntax, using the balance analyzer for completeness. `TableRuntime` is a
//! guest-style language with no structural analysis: assignments only, whole
//! fragments executed as one unit.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use glossa_core::{
    AbortHandle, BalancedAnalyzer, BindingWriteError, CompileFailure, CompiledUnit,
    CompletenessVerdict, Diagnostic, LanguageRuntime, Value, WorkloadError,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// =============================================================================
// CalcRuntime: integer expressions, `int NAME = EXPR;`, `sleep(MILLIS)`
// =============================================================================

type CalcVars = Arc<Mutex<BTreeMap<String, i64>>>;

pub struct CalcRuntime {
    vars: CalcVars,
    frozen: HashSet<String>,
}

impl CalcRuntime {
    pub fn new() -> Self {
        Self {
            vars: Arc::new(Mutex::new(BTreeMap::new())),
            frozen: HashSet::new(),
        }
    }

    /// Seed built-in variables that exist before any user code.
    pub fn with_builtins(self, builtins: &[(&str, i64)]) -> Self {
        {
            let mut vars = self.vars.lock().unwrap();
            for &(name, value) in builtins {
                vars.insert(name.to_string(), value);
            }
        }
        self
    }

    /// Mark names whose bindings refuse writes.
    pub fn with_frozen(mut self, names: &[&str]) -> Self {
        self.frozen.extend(names.iter().map(|n| n.to_string()));
        self
    }
}

impl LanguageRuntime for CalcRuntime {
    fn language(&self) -> &str {
        "calc"
    }

    fn analyze(&self, text: &str) -> CompletenessVerdict {
        BalancedAnalyzer::new().analyze(text)
    }

    fn compile(&self, source: &str) -> Result<CompiledUnit, CompileFailure> {
        let statement = parse_statement(source)?;
        let vars = self.vars.clone();
        Ok(CompiledUnit::new(source, move |abort| {
            run_statement(&statement, &vars, abort)
        }))
    }

    fn bindings(&self) -> Vec<String> {
        self.vars.lock().unwrap().keys().cloned().collect()
    }

    fn binding(&self, name: &str) -> Option<Value> {
        self.vars.lock().unwrap().get(name).map(|&v| json!(v))
    }

    fn set_binding(&self, name: &str, value: Value) -> Result<(), BindingWriteError> {
        if self.frozen.contains(name) {
            return Err(BindingWriteError::Unsupported);
        }
        // Only integers exist in this language; anything else cannot be
        // represented and is refused.
        let Some(number) = value.as_i64() else {
            return Err(BindingWriteError::Unsupported);
        };
        self.vars.lock().unwrap().insert(name.to_string(), number);
        Ok(())
    }
}

#[derive(Clone)]
enum Statement {
    Empty,
    Assign { name: String, expr: Expr },
    Expr(Expr),
    Sleep(u64),
}

#[derive(Clone)]
enum Expr {
    Num(i64),
    Var(String),
    Neg(Box<Expr>),
    Binary {
        op: char,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

fn parse_statement(source: &str) -> Result<Statement, CompileFailure> {
    let mut body = source.trim();
    if let Some(stripped) = body.strip_suffix(';') {
        body = stripped.trim_end();
    }
    if body.is_empty() {
        return Ok(Statement::Empty);
    }

    if let Some(rest) = body.strip_prefix("int ") {
        let rest = rest.trim_start();
        let Some((name, expr_text)) = rest.split_once('=') else {
            return Err(CompileFailure::message("expected '=' in declaration"));
        };
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(CompileFailure::message("invalid variable name"));
        }
        let expr = parse_expr_text(expr_text)?;
        return Ok(Statement::Assign {
            name: name.to_string(),
            expr,
        });
    }

    let tokens = tokenize(body)?;

    // sleep(MILLIS) is the one built-in statement form.
    if let [
        (Token::Ident(name), _),
        (Token::LParen, _),
        (Token::Num(millis), _),
        (Token::RParen, _),
    ] = tokens.as_slice()
        && name.as_str() == "sleep"
    {
        return Ok(Statement::Sleep(*millis as u64));
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    parser.expect_end()?;
    Ok(Statement::Expr(expr))
}

fn parse_expr_text(text: &str) -> Result<Expr, CompileFailure> {
    let tokens = tokenize(text.trim())?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    parser.expect_end()?;
    Ok(expr)
}

fn run_statement(
    statement: &Statement,
    vars: &CalcVars,
    abort: &AbortHandle,
) -> Result<Option<Value>, WorkloadError> {
    match statement {
        Statement::Empty => Ok(None),
        Statement::Assign { name, expr } => {
            let value = eval_expr(expr, vars)?;
            vars.lock().unwrap().insert(name.clone(), value);
            Ok(Some(json!(value)))
        }
        Statement::Expr(expr) => Ok(Some(json!(eval_expr(expr, vars)?))),
        Statement::Sleep(millis) => {
            let deadline = std::time::Instant::now() + Duration::from_millis(*millis);
            while std::time::Instant::now() < deadline {
                if abort.is_aborted() {
                    return Ok(None);
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Ok(None)
        }
    }
}

fn eval_expr(expr: &Expr, vars: &CalcVars) -> Result<i64, WorkloadError> {
    match expr {
        Expr::Num(n) => Ok(*n),
        Expr::Var(name) => {
            vars.lock()
                .unwrap()
                .get(name)
                .copied()
                .ok_or_else(|| WorkloadError::Raised {
                    type_name: "UndefinedVariable".to_string(),
                    message: format!("variable '{}' is not defined", name),
                    trace: Vec::new(),
                })
        }
        Expr::Neg(inner) => Ok(-eval_expr(inner, vars)?),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval_expr(lhs, vars)?;
            let rhs = eval_expr(rhs, vars)?;
            match op {
                '+' => Ok(lhs + rhs),
                '-' => Ok(lhs - rhs),
                '*' => Ok(lhs * rhs),
                '/' => {
                    if rhs == 0 {
                        Err(WorkloadError::Raised {
                            type_name: "DivisionByZero".to_string(),
                            message: "division by zero".to_string(),
                            trace: Vec::new(),
                        })
                    } else {
                        Ok(lhs / rhs)
                    }
                }
                other => Err(WorkloadError::Raised {
                    type_name: "BadOperator".to_string(),
                    message: format!("unknown operator '{}'", other),
                    trace: Vec::new(),
                }),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(i64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(text: &str) -> Result<Vec<(Token, Range<usize>)>, CompileFailure> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() {
            let mut end = start;
            let mut number = 0i64;
            while let Some(&(i, d)) = chars.peek() {
                if let Some(digit) = d.to_digit(10) {
                    number = number * 10 + digit as i64;
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push((Token::Num(number), start..end));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let mut end = start;
            let mut ident = String::new();
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_alphanumeric() || d == '_' {
                    ident.push(d);
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push((Token::Ident(ident), start..end));
        } else {
            chars.next();
            let end = start + c.len_utf8();
            match c {
                '(' => tokens.push((Token::LParen, start..end)),
                ')' => tokens.push((Token::RParen, start..end)),
                '+' | '-' | '*' | '/' => tokens.push((Token::Op(c), start..end)),
                other => {
                    return Err(CompileFailure {
                        diagnostics: vec![Diagnostic::spanned(
                            format!("unexpected character '{}'", other),
                            start..end,
                        )],
                        unresolved: Vec::new(),
                    });
                }
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<Expr, CompileFailure> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = *op;
            self.next();
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, CompileFailure> {
        let mut lhs = self.factor()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek() {
            let op = *op;
            self.next();
            let rhs = self.factor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, CompileFailure> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::Ident(name)) => Ok(Expr::Var(name)),
            Some(Token::Op('-')) => Ok(Expr::Neg(Box::new(self.factor()?))),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(CompileFailure::message("expected ')'")),
                }
            }
            other => Err(CompileFailure::message(format!(
                "expected expression, found {:?}",
                other
            ))),
        }
    }

    fn expect_end(&mut self) -> Result<(), CompileFailure> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(CompileFailure::message("trailing tokens after expression"))
        }
    }
}

// =============================================================================
// TableRuntime: guest-style assignments with no structural analysis
// =============================================================================

pub struct TableRuntime {
    language: String,
    vars: Arc<Mutex<BTreeMap<String, Value>>>,
    frozen: HashSet<String>,
}

impl TableRuntime {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            vars: Arc::new(Mutex::new(BTreeMap::new())),
            frozen: HashSet::new(),
        }
    }

    /// Seed a built-in variable that exists before any user code.
    pub fn with_var(self, name: &str, value: Value) -> Self {
        self.vars
            .lock()
            .unwrap()
            .insert(name.to_string(), value);
        self
    }

    /// Mark names whose bindings refuse writes.
    pub fn with_frozen(mut self, names: &[&str]) -> Self {
        self.frozen.extend(names.iter().map(|n| n.to_string()));
        self
    }
}

enum LineOp {
    Assign { name: String, value: Value },
    Read { name: String },
}

impl LanguageRuntime for TableRuntime {
    fn language(&self) -> &str {
        &self.language
    }

    fn analyze(&self, text: &str) -> CompletenessVerdict {
        if text.trim().is_empty() {
            CompletenessVerdict::empty()
        } else {
            CompletenessVerdict::unknown(text)
        }
    }

    fn compile(&self, source: &str) -> Result<CompiledUnit, CompileFailure> {
        let mut ops = Vec::new();
        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some((name, rhs)) = line.split_once('=') {
                let value: i64 = rhs
                    .trim()
                    .parse()
                    .map_err(|_| CompileFailure::message(format!("bad value in '{}'", line)))?;
                ops.push(LineOp::Assign {
                    name: name.trim().to_string(),
                    value: json!(value),
                });
            } else {
                ops.push(LineOp::Read {
                    name: line.to_string(),
                });
            }
        }
        let vars = self.vars.clone();
        Ok(CompiledUnit::new(source, move |_abort| {
            let mut result = None;
            for op in &ops {
                match op {
                    LineOp::Assign { name, value } => {
                        vars.lock().unwrap().insert(name.clone(), value.clone());
                        result = Some(value.clone());
                    }
                    LineOp::Read { name } => {
                        let value = vars.lock().unwrap().get(name).cloned();
                        match value {
                            Some(value) => result = Some(value),
                            None => {
                                return Err(WorkloadError::Raised {
                                    type_name: "NameError".to_string(),
                                    message: format!("'{}' is not defined", name),
                                    trace: Vec::new(),
                                });
                            }
                        }
                    }
                }
            }
            Ok(result)
        }))
    }

    fn bindings(&self) -> Vec<String> {
        self.vars.lock().unwrap().keys().cloned().collect()
    }

    fn binding(&self, name: &str) -> Option<Value> {
        self.vars.lock().unwrap().get(name).cloned()
    }

    fn set_binding(&self, name: &str, value: Value) -> Result<(), BindingWriteError> {
        if self.frozen.contains(name) {
            return Err(BindingWriteError::Unsupported);
        }
        self.vars.lock().unwrap().insert(name.to_string(), value);
        Ok(())
    }

    fn can_analyze(&self) -> bool {
        false
    }
}
