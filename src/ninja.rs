// Copyright 2011 Google Inc. All Rights Reserved.
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

//! A writer for the Ninja build-runner input file format
//! (`spec.md` §6 "Ninja build-runner input file"), ported from the Ninja
//! project's own `misc/ninja_syntax.py`, via
//! `original_source/cutekit/ninja.py`'s line-for-line translation of it.

const LINE_WIDTH: usize = 78;

pub struct Writer {
  out: String,
  width: usize,
}

impl Default for Writer {
  fn default() -> Self {
    Self::new()
  }
}

impl Writer {
  pub fn new() -> Self {
    Self {
      out: String::new(),
      width: LINE_WIDTH,
    }
  }

  pub fn finish(self) -> String {
    self.out
  }

  pub fn newline(&mut self) {
    self.out.push('\n');
  }

  pub fn comment(&mut self, text: &str) {
    for line in textwrap(text, self.width.saturating_sub(2)) {
      self.line(&format!("# {line}"), 0);
    }
  }

  pub fn separator(&mut self, text: &str) {
    self.newline();
    self.comment(text);
  }

  pub fn variable(&mut self, key: &str, value: &str, indent: usize) {
    if value.is_empty() {
      return;
    }
    self.line(&format!("{key} = {value}"), indent);
  }

  pub fn pool(&mut self, name: &str, depth: usize) {
    self.line(&format!("pool {name}"), 0);
    self.variable("depth", &depth.to_string(), 1);
  }

  #[allow(clippy::too_many_arguments)]
  pub fn rule(
    &mut self,
    name: &str,
    command: &str,
    description: Option<&str>,
    depfile: Option<&str>,
    generator: bool,
    pool: Option<&str>,
    restat: bool,
  ) {
    self.line(&format!("rule {name}"), 0);
    self.variable("command", command, 1);
    if let Some(d) = description {
      self.variable("description", d, 1);
    }
    if let Some(d) = depfile {
      self.variable("depfile", d, 1);
      self.variable("deps", "gcc", 1);
    }
    if generator {
      self.variable("generator", "1", 1);
    }
    if let Some(p) = pool {
      self.variable("pool", p, 1);
    }
    if restat {
      self.variable("restat", "1", 1);
    }
  }

  /// Emit a `build` statement and return the line so callers can append
  /// inline variable bindings (`$flags`, etc) right after it.
  #[allow(clippy::too_many_arguments)]
  pub fn build(
    &mut self,
    outputs: &[String],
    rule: &str,
    inputs: &[String],
    implicit: &[String],
    order_only: &[String],
    variables: &[(&str, String)],
  ) {
    let mut text = format!("build {}: {}", join_escaped(outputs), rule);
    if !inputs.is_empty() {
      text.push(' ');
      text.push_str(&join_escaped(inputs));
    }
    if !implicit.is_empty() {
      text.push_str(" | ");
      text.push_str(&join_escaped(implicit));
    }
    if !order_only.is_empty() {
      text.push_str(" || ");
      text.push_str(&join_escaped(order_only));
    }
    self.line(&text, 0);
    for (key, value) in variables {
      self.variable(key, value, 1);
    }
  }

  pub fn include(&mut self, path: &str) {
    self.line(&format!("include {path}"), 0);
  }

  pub fn subninja(&mut self, path: &str) {
    self.line(&format!("subninja {path}"), 0);
  }

  pub fn default(&mut self, paths: &[String]) {
    self.line(&format!("default {}", join_escaped(paths)), 0);
  }

  /// Write `text` word-wrapped at `self.width`, continuing wrapped lines
  /// with a trailing `$` the way Ninja's own pretty-printer does.
  fn line(&mut self, text: &str, indent: usize) {
    let prefix = "  ".repeat(indent);
    let full = format!("{prefix}{text}");
    if full.len() <= self.width {
      self.out.push_str(&full);
      self.out.push('\n');
      return;
    }

    let continuation = "  ".repeat(indent + 2);
    let mut current = prefix;
    let mut wrote_any_word = false;

    for word in full.trim_start().split(' ') {
      let extra = if wrote_any_word { 1 } else { 0 } + word.len();
      if wrote_any_word && current.len() + extra > self.width - 2 {
        self.out.push_str(&current);
        self.out.push_str(" $\n");
        current = continuation.clone();
        wrote_any_word = false;
      }
      if wrote_any_word {
        current.push(' ');
      }
      current.push_str(word);
      wrote_any_word = true;
    }
    self.out.push_str(&current);
    self.out.push('\n');
  }
}

fn textwrap(text: &str, width: usize) -> Vec<String> {
  if width == 0 {
    return vec![text.to_string()];
  }
  let mut lines = Vec::new();
  let mut current = String::new();
  for word in text.split_whitespace() {
    if !current.is_empty() && current.len() + 1 + word.len() > width {
      lines.push(std::mem::take(&mut current));
    }
    if !current.is_empty() {
      current.push(' ');
    }
    current.push_str(word);
  }
  if !current.is_empty() || lines.is_empty() {
    lines.push(current);
  }
  lines
}

/// Escape a single Ninja token: `$`, `:`, and spaces all need escaping in
/// paths, but not in commands (where the whole line is taken as shell text).
pub fn escape_path(path: &str) -> String {
  path.replace('$', "$$").replace(' ', "$ ").replace(':', "$:")
}

fn join_escaped(paths: &[String]) -> String {
  paths.iter().map(|p| escape_path(p)).collect::<Vec<_>>().join(" ")
}
