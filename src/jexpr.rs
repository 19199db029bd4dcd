// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The Jexpr evaluator (`spec.md` §4.1).
//!
//! Expands a JSON-shaped data tree in which strings may embed
//! brace-delimited expressions (`{shell.which('clang')}`) and lists may be
//! macro-call forms (`["@utils.union", a, b]`), into a plain tree.
//!
//! Unlike the original Python implementation (`original_source/cutekit/jexpr.py`),
//! which evaluates expressions with the host's real `eval()` against a module-
//! level namespace, this crate never imports a general-purpose evaluator: the
//! expression grammar below is a small, closed recursive-descent parser whose
//! only side effects are calls into the fixed [`Globals`] surface (Design
//! Notes: "a restricted expression DSL whose only side-effects are invocations
//! of a closed set of exposed functions").

use crate::error::ConfigError;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

pub type Jexpr = Value;
pub type Locals = HashMap<String, Value>;

const MAX_DEPTH: u32 = 10;

/// Expand a Jexpr tree against `globals` and optional `locals`.
pub fn expand(expr: &Jexpr, locals: &Locals, globals: &Globals) -> Result<Jexpr, ConfigError> {
  expand_depth(expr, locals, globals, 0)
}

fn expand_depth(
  expr: &Jexpr,
  locals: &Locals,
  globals: &Globals,
  depth: u32,
) -> Result<Jexpr, ConfigError> {
  if depth > MAX_DEPTH {
    return Err(ConfigError::Expansion {
      expr: expr.to_string(),
      cause: "recursion limit reached".into(),
    });
  }

  match expr {
    Value::Object(map) => {
      let mut result = Map::new();
      for (k, v) in map {
        let key = expand_depth(&Value::String(k.clone()), locals, globals, depth + 1)?;
        let key = key.as_str().unwrap_or(k).to_string();
        result.insert(key, expand_depth(v, locals, globals, depth + 1)?);
      }
      Ok(Value::Object(result))
    }
    Value::Array(items) if is_call_form(items) => {
      let name_raw = items[0].as_str().expect("checked by is_call_form");
      let name_expanded = expand_depth(
        &Value::String(name_raw[1..].to_string()),
        locals,
        globals,
        depth + 1,
      )?;
      let name = name_expanded
        .as_str()
        .ok_or_else(|| ConfigError::Expansion {
          expr: name_raw.to_string(),
          cause: "macro name did not expand to a string".into(),
        })?
        .to_string();

      let mut args = Vec::with_capacity(items.len() - 1);
      for item in &items[1..] {
        args.push(expand_depth(item, locals, globals, depth + 1)?);
      }

      let result = globals.call(&name, args).map_err(|cause| ConfigError::Expansion {
        expr: name.clone(),
        cause: cause.to_string(),
      })?;

      expand_depth(&result, locals, globals, depth + 1)
    }
    Value::Array(items) => {
      let mut result = Vec::with_capacity(items.len());
      for item in items {
        result.push(expand_depth(item, locals, globals, depth + 1)?);
      }
      Ok(Value::Array(result))
    }
    Value::String(s) => Ok(Value::String(expand_str(s, locals, globals, depth)?)),
    other => Ok(other.clone()),
  }
}

fn is_call_form(items: &[Value]) -> bool {
  matches!(items.first(), Some(Value::String(s)) if s.starts_with('@'))
}

/// Scan `s` for balanced `{...}` regions, evaluate each as an expression,
/// coerce to string, and splice the results back in.
fn expand_str(s: &str, locals: &Locals, globals: &Globals, depth: u32) -> Result<String, ConfigError> {
  let mut res = String::new();
  let mut depth_braces = 0i32;
  let mut str_start = 0usize;
  let mut expr_start = 0usize;
  let chars: Vec<char> = s.chars().collect();

  for (i, &c) in chars.iter().enumerate() {
    if c == '{' {
      if depth_braces == 0 {
        res.push_str(&chars[str_start..i].iter().collect::<String>());
        expr_start = i + 1;
      }
      depth_braces += 1;
    } else if c == '}' {
      depth_braces -= 1;
      if depth_braces == 0 {
        let subexpr: String = chars[expr_start..i].iter().collect();
        let value = eval_expr_str(&subexpr, locals, globals, depth + 1).map_err(|cause| {
          ConfigError::Expansion {
            expr: subexpr.clone(),
            cause: cause.to_string(),
          }
        })?;
        res.push_str(&value_to_string(&value));
        str_start = i + 1;
      } else if depth_braces < 0 {
        return Err(ConfigError::Expansion {
          expr: s.to_string(),
          cause: "unbalanced braces".into(),
        });
      }
    }
  }

  if depth_braces != 0 {
    return Err(ConfigError::Expansion {
      expr: s.to_string(),
      cause: "unbalanced braces".into(),
    });
  }

  res.push_str(&chars[str_start..].iter().collect::<String>());
  Ok(res)
}

fn value_to_string(v: &Value) -> String {
  match v {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

// --- A small restricted expression language for `{...}` regions ---------- //

#[derive(Debug, Clone)]
enum Expr {
  Path(Vec<String>),
  Call(Vec<String>, Vec<Expr>),
  Field(Box<Expr>, String),
  Str(String),
  Int(i64),
  Bool(bool),
}

fn eval_expr_str(src: &str, locals: &Locals, globals: &Globals, depth: u32) -> Result<Value, ConfigError> {
  if depth > MAX_DEPTH {
    return Err(ConfigError::Expansion {
      expr: src.to_string(),
      cause: "recursion limit reached".into(),
    });
  }
  let mut p = Parser::new(src);
  let expr = p.parse_expr()?;
  p.expect_end()?;
  eval_expr(&expr, locals, globals)
}

fn eval_expr(expr: &Expr, locals: &Locals, globals: &Globals) -> Result<Value, ConfigError> {
  match expr {
    Expr::Str(s) => Ok(Value::String(s.clone())),
    Expr::Int(n) => Ok(Value::from(*n)),
    Expr::Bool(b) => Ok(Value::Bool(*b)),
    Expr::Path(segments) => resolve_path(segments, locals),
    Expr::Call(path, args) => {
      let mut values = Vec::with_capacity(args.len());
      for a in args {
        values.push(eval_expr(a, locals, globals)?);
      }
      globals.call(&path.join("."), values)
    }
    Expr::Field(inner, name) => {
      let v = eval_expr(inner, locals, globals)?;
      v.as_object()
        .and_then(|o| o.get(name))
        .cloned()
        .ok_or_else(|| ConfigError::Expansion {
          expr: name.clone(),
          cause: "no such field".into(),
        })
    }
  }
}

fn resolve_path(segments: &[String], locals: &Locals) -> Result<Value, ConfigError> {
  let head = &segments[0];
  let mut value = locals.get(head).cloned().ok_or_else(|| ConfigError::Expansion {
    expr: segments.join("."),
    cause: format!("unknown name '{head}'"),
  })?;
  for seg in &segments[1..] {
    value = value
      .as_object()
      .and_then(|o| o.get(seg))
      .cloned()
      .ok_or_else(|| ConfigError::Expansion {
        expr: segments.join("."),
        cause: format!("no such field '{seg}'"),
      })?;
  }
  Ok(value)
}

struct Parser<'a> {
  chars: Vec<char>,
  pos: usize,
  src: &'a str,
}

impl<'a> Parser<'a> {
  fn new(src: &'a str) -> Self {
    Self {
      chars: src.chars().collect(),
      pos: 0,
      src,
    }
  }

  fn peek(&self) -> Option<char> {
    self.chars.get(self.pos).copied()
  }

  fn skip_ws(&mut self) {
    while matches!(self.peek(), Some(c) if c.is_whitespace()) {
      self.pos += 1;
    }
  }

  fn expect_end(&mut self) -> Result<(), ConfigError> {
    self.skip_ws();
    if self.pos != self.chars.len() {
      return Err(ConfigError::Expansion {
        expr: self.src.to_string(),
        cause: format!("unexpected trailing input at byte {}", self.pos),
      });
    }
    Ok(())
  }

  fn parse_expr(&mut self) -> Result<Expr, ConfigError> {
    let atom = self.parse_atom()?;
    self.parse_postfix(atom)
  }

  fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, ConfigError> {
    loop {
      self.skip_ws();
      if self.peek() == Some('.') {
        self.pos += 1;
        let name = self.parse_ident()?;
        expr = Expr::Field(Box::new(expr), name);
      } else {
        break;
      }
    }
    Ok(expr)
  }

  fn parse_atom(&mut self) -> Result<Expr, ConfigError> {
    self.skip_ws();
    match self.peek() {
      Some('\'') | Some('"') => self.parse_string(),
      Some(c) if c.is_ascii_digit() || c == '-' => self.parse_number(),
      Some(c) if c.is_alphabetic() || c == '_' => self.parse_path_or_call(),
      other => Err(ConfigError::Expansion {
        expr: self.src.to_string(),
        cause: format!("unexpected character {other:?}"),
      }),
    }
  }

  fn parse_string(&mut self) -> Result<Expr, ConfigError> {
    let quote = self.peek().unwrap();
    self.pos += 1;
    let mut s = String::new();
    loop {
      match self.peek() {
        None => {
          return Err(ConfigError::Expansion {
            expr: self.src.to_string(),
            cause: "unterminated string literal".into(),
          })
        }
        Some(c) if c == quote => {
          self.pos += 1;
          break;
        }
        Some(c) => {
          s.push(c);
          self.pos += 1;
        }
      }
    }
    Ok(Expr::Str(s))
  }

  fn parse_number(&mut self) -> Result<Expr, ConfigError> {
    let start = self.pos;
    if self.peek() == Some('-') {
      self.pos += 1;
    }
    while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
      self.pos += 1;
    }
    let text: String = self.chars[start..self.pos].iter().collect();
    text.parse::<i64>().map(Expr::Int).map_err(|_| ConfigError::Expansion {
      expr: self.src.to_string(),
      cause: format!("invalid integer literal '{text}'"),
    })
  }

  fn parse_ident(&mut self) -> Result<String, ConfigError> {
    let start = self.pos;
    while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '-') {
      self.pos += 1;
    }
    if start == self.pos {
      return Err(ConfigError::Expansion {
        expr: self.src.to_string(),
        cause: "expected identifier".into(),
      });
    }
    Ok(self.chars[start..self.pos].iter().collect())
  }

  fn parse_path_or_call(&mut self) -> Result<Expr, ConfigError> {
    let mut segments = vec![self.parse_ident()?];
    if matches!(segments[0].as_str(), "true") {
      return Ok(Expr::Bool(true));
    }
    if matches!(segments[0].as_str(), "false") {
      return Ok(Expr::Bool(false));
    }
    loop {
      self.skip_ws();
      if self.peek() == Some('.') {
        let save = self.pos;
        self.pos += 1;
        // Only consume as part of the path if not followed by a call that
        // should bind to a sub-expression instead (we never need that here).
        match self.parse_ident() {
          Ok(seg) => segments.push(seg),
          Err(e) => {
            self.pos = save;
            return Err(e);
          }
        }
      } else {
        break;
      }
    }
    self.skip_ws();
    if self.peek() == Some('(') {
      self.pos += 1;
      let args = self.parse_args()?;
      self.skip_ws();
      if self.peek() != Some(')') {
        return Err(ConfigError::Expansion {
          expr: self.src.to_string(),
          cause: "expected ')'".into(),
        });
      }
      self.pos += 1;
      return Ok(Expr::Call(segments, args));
    }
    Ok(Expr::Path(segments))
  }

  fn parse_args(&mut self) -> Result<Vec<Expr>, ConfigError> {
    let mut args = Vec::new();
    self.skip_ws();
    if self.peek() == Some(')') {
      return Ok(args);
    }
    loop {
      args.push(self.parse_expr()?);
      self.skip_ws();
      match self.peek() {
        Some(',') => {
          self.pos += 1;
        }
        _ => break,
      }
    }
    Ok(args)
  }
}

// --- Exposed globals -------------------------------------------------------- //

/// The closed set of names exposed to Jexpr expressions and macro forms
/// (`spec.md` §4.1 "Standard exposed names"). A real object graph would let
/// arbitrary attribute access leak through; this instead pattern-matches the
/// fully-qualified dotted name, so only these functions are ever reachable.
pub struct Globals {
  base_dir: PathBuf,
}

impl Globals {
  pub fn new(base_dir: impl Into<PathBuf>) -> Self {
    Self {
      base_dir: base_dir.into(),
    }
  }

  pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, ConfigError> {
    match name {
      "shell.uname" => Ok(shell_uname()),
      "shell.popen" => shell_popen(&args),
      "shell.latest" => shell_latest(&args),
      "shell.which" => shell_which(&args),
      "shell.nproc" => Ok(Value::from(
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
      )),
      "jexpr.include" => self.jexpr_include(&args),
      "utils.concat" => Ok(Value::String(
        args.iter().map(value_to_string).collect::<Vec<_>>().join(""),
      )),
      "utils.union" => utils_union(&args),
      "utils.first" => Ok(first_or_null(&args, 0)),
      "utils.last" => Ok(first_or_null(&args, -1)),
      "utils.relpath" => Ok(Value::String(self.relpath(&args))),
      other => Err(ConfigError::Expansion {
        expr: other.to_string(),
        cause: "unknown name".into(),
      }),
    }
  }

  fn jexpr_include(&self, args: &[Value]) -> Result<Value, ConfigError> {
    let rel = args
      .first()
      .and_then(Value::as_str)
      .ok_or_else(|| ConfigError::Expansion {
        expr: "jexpr.include".into(),
        cause: "expected a path argument".into(),
      })?;
    let path = self.base_dir.join(rel);
    let tree = crate::loader::read_tree(&path)?;
    let locals = Locals::new();
    let sub_globals = Globals::new(path.parent().unwrap_or(&self.base_dir));
    expand(&tree, &locals, &sub_globals)
  }

  fn relpath(&self, args: &[Value]) -> String {
    let mut p = self.base_dir.clone();
    for a in args {
      p.push(value_to_string(a));
    }
    normalize_path(&p)
  }
}

fn normalize_path(p: &Path) -> String {
  use std::path::Component;
  let mut stack: Vec<String> = Vec::new();
  for comp in p.components() {
    match comp {
      Component::ParentDir => {
        stack.pop();
      }
      Component::CurDir => {}
      Component::Normal(s) => stack.push(s.to_string_lossy().into_owned()),
      Component::RootDir => stack.clear(),
      Component::Prefix(_) => {}
    }
  }
  stack.join("/")
}

fn shell_uname() -> Value {
  let machine = match std::env::consts::ARCH {
    "aarch64" => "arm64",
    "x86_64" => "x86_64",
    other => other,
  };
  let sysname = match std::env::consts::OS {
    "macos" => "Darwin",
    "linux" => "Linux",
    "windows" => "Windows",
    other => other,
  };
  let mut map = Map::new();
  map.insert("sysname".into(), Value::String(sysname.into()));
  map.insert("nodename".into(), Value::String(hostname()));
  map.insert("release".into(), Value::String(String::new()));
  map.insert("version".into(), Value::String(String::new()));
  map.insert("machine".into(), Value::String(machine.into()));
  Value::Object(map)
}

fn hostname() -> String {
  std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn shell_popen(args: &[Value]) -> Result<Value, ConfigError> {
  let (cmd, rest) = args.split_first().ok_or_else(|| ConfigError::Expansion {
    expr: "shell.popen".into(),
    cause: "expected a command argument".into(),
  })?;
  let cmd = cmd.as_str().unwrap_or_default();
  let rest: Vec<String> = rest.iter().map(value_to_string).collect();
  let output = Command::new(cmd).args(&rest).output().map_err(|e| ConfigError::Expansion {
    expr: format!("shell.popen({cmd})"),
    cause: e.to_string(),
  })?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  let lines: Vec<Value> = stdout.lines().map(|l| Value::String(l.to_string())).collect();
  Ok(Value::Array(lines))
}

fn shell_latest(args: &[Value]) -> Result<Value, ConfigError> {
  let prefix = args.first().and_then(Value::as_str).unwrap_or_default();
  let path = std::env::var_os("PATH").unwrap_or_default();
  let mut best: Option<(u64, String)> = None;
  for dir in std::env::split_paths(&path) {
    let Ok(entries) = std::fs::read_dir(&dir) else {
      continue;
    };
    for entry in entries.flatten() {
      let name = entry.file_name().to_string_lossy().into_owned();
      if let Some(suffix) = name.strip_prefix(prefix) {
        let suffix = suffix.trim_start_matches('-');
        let num: u64 = suffix.parse().unwrap_or(0);
        if best.as_ref().map(|(n, _)| num > *n).unwrap_or(true) {
          best = Some((num, name));
        }
      }
    }
  }
  Ok(best.map(|(_, name)| Value::String(name)).unwrap_or(Value::Null))
}

fn shell_which(args: &[Value]) -> Result<Value, ConfigError> {
  let cmd = args.first().and_then(Value::as_str).unwrap_or_default();
  let path = std::env::var_os("PATH").unwrap_or_default();
  for dir in std::env::split_paths(&path) {
    let candidate = dir.join(cmd);
    if candidate.is_file() {
      return Ok(Value::String(candidate.to_string_lossy().into_owned()));
    }
  }
  Ok(Value::Null)
}

fn utils_union(args: &[Value]) -> Result<Value, ConfigError> {
  let (a, b) = match args {
    [a, b] => (a, b),
    _ => {
      return Err(ConfigError::Expansion {
        expr: "utils.union".into(),
        cause: "expected exactly two arguments".into(),
      })
    }
  };
  match (a, b) {
    (Value::Object(am), Value::Object(bm)) => {
      let mut merged = am.clone();
      for (k, v) in bm {
        merged.insert(k.clone(), v.clone());
      }
      Ok(Value::Object(merged))
    }
    (Value::Array(al), Value::Array(bl)) => {
      let mut merged = al.clone();
      merged.extend(bl.clone());
      Ok(Value::Array(merged))
    }
    _ => Err(ConfigError::Expansion {
      expr: "utils.union".into(),
      cause: "arguments must both be dicts or both be lists".into(),
    }),
  }
}

fn first_or_null(args: &[Value], index: i64) -> Value {
  let Some(Value::Array(items)) = args.first() else {
    return Value::Null;
  };
  if items.is_empty() {
    return Value::Null;
  }
  let idx = if index < 0 {
    items.len() - 1
  } else {
    index as usize
  };
  items.get(idx).cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn g() -> Globals {
    Globals::new(".")
  }

  #[test]
  fn plain_scalars_pass_through() {
    let v = expand(&Value::Bool(true), &Locals::new(), &g()).unwrap();
    assert_eq!(v, Value::Bool(true));
  }

  #[test]
  fn string_with_no_braces_is_unchanged() {
    let v = expand(&Value::String("hello".into()), &Locals::new(), &g()).unwrap();
    assert_eq!(v, Value::String("hello".into()));
  }

  #[test]
  fn splices_expression_result_into_string() {
    let v = expand(
      &Value::String("nproc={shell.nproc()}".into()),
      &Locals::new(),
      &g(),
    )
    .unwrap();
    let s = v.as_str().unwrap();
    assert!(s.starts_with("nproc="));
  }

  #[test]
  fn unbalanced_braces_is_an_error() {
    let err = expand(&Value::String("{oops".into()), &Locals::new(), &g()).unwrap_err();
    assert!(err.to_string().contains("oops") || format!("{err:?}").contains("unbalanced"));
  }

  #[test]
  fn unknown_name_is_an_error() {
    let err = expand(&Value::String("{totally.unknown.thing}".into()), &Locals::new(), &g())
      .unwrap_err();
    let msg = format!("{err}");
    assert!(msg.to_lowercase().contains("unknown") || msg.contains("no such field"));
  }

  #[test]
  fn call_form_invokes_global_and_re_expands_result() {
    let expr: Value = serde_json::json!(["@utils.concat", "a", "b", "c"]);
    let v = expand(&expr, &Locals::new(), &g()).unwrap();
    assert_eq!(v, Value::String("abc".into()));
  }

  #[test]
  fn dict_and_list_recurse() {
    let expr = serde_json::json!({"k": ["x", "y", {"nested": "z"}]});
    let v = expand(&expr, &Locals::new(), &g()).unwrap();
    assert_eq!(v, expr);
  }

  #[test]
  fn utils_union_merges_dicts() {
    let expr = serde_json::json!(["@utils.union", {"a": 1}, {"b": 2}]);
    let v = expand(&expr, &Locals::new(), &g()).unwrap();
    assert_eq!(v, serde_json::json!({"a": 1, "b": 2}));
  }

  #[test]
  fn recursion_depth_is_bounded() {
    let mut v = Value::String("x".into());
    for _ in 0..20 {
      v = Value::Array(vec![Value::String("@utils.first".into()), Value::Array(vec![v])]);
    }
    let err = expand(&v, &Locals::new(), &g());
    assert!(err.is_err());
  }
}
