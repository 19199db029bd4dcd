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

//! The manifest data model (`spec.md` §3), grounded on
//! `original_source/cutekit/model.py`'s dataclasses. The Python source
//! expresses `Manifest` as a base class with `Project`/`Target`/`Component`
//! subclasses and an informal `type` discriminant; here it is a closed sum
//! type, and every field that was a free-form dict in the original
//! (`props`, `tools`) keeps `BTreeMap` so iteration order is the sort order
//! of the keys rather than insertion order, making the `cdefs`/alias
//! generation stability invariant (`spec.md` §7) structural instead of a
//! place where someone has to remember to call `sorted()`.

use crate::compat::{self, COMPONENT_SCHEMA, PROJECT_SCHEMA, TARGET_SCHEMA};
use crate::error::ConfigError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A manifest scalar: `props` and `enableIf` values are always one of these
/// three shapes (`spec.md` §3 "Scalar").
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
  Bool(bool),
  Int(i64),
  Str(String),
}

impl Scalar {
  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Scalar::Bool(b) => Some(*b),
      _ => None,
    }
  }
}

impl std::fmt::Display for Scalar {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Scalar::Bool(b) => write!(f, "{b}"),
      Scalar::Int(n) => write!(f, "{n}"),
      Scalar::Str(s) => write!(f, "{s}"),
    }
  }
}

pub type Props = BTreeMap<String, Scalar>;

/// An external dependency declared by a project (`spec.md` §3 "Extern").
///
/// `HostPkg` has no counterpart in `original_source/cutekit/model.py`, which
/// only ever fetches git externs; it is a supplemental variant that lets a
/// project depend on a library already installed on the host, resolved via
/// `pkg-config` (see `src/shell.rs::pkg_config`).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Extern {
  Git {
    git: String,
    tag: String,
    /// Clone with `--depth`, the default, instead of the full history.
    #[serde(default = "default_shallow")]
    shallow: bool,
    /// History depth to fetch when `shallow` is set; ignored otherwise.
    #[serde(default = "default_depth")]
    depth: u32,
  },
  HostPkg {
    /// Package names resolved together against the host's `pkg-config`
    /// database, with cflags/libs concatenated in listed order.
    names: Vec<String>,
  },
}

fn default_shallow() -> bool {
  true
}

fn default_depth() -> u32 {
  1
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
  pub id: String,
  #[serde(default)]
  pub description: String,
  #[serde(default, rename = "extern")]
  pub externs: BTreeMap<String, Extern>,
  #[serde(skip)]
  pub path: PathBuf,
}

/// A toolchain entry for a target: a compiler/linker/etc invocation
/// (`spec.md` §3 "Tool"). Mixins are not declared here — they are supplied
/// at build time via `ck build --mixin` (`spec.md` §4.5 "mixins"), the same
/// way a caller asks for a debug or sanitizer build without editing the
/// manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tool {
  pub cmd: Option<String>,
  #[serde(default)]
  pub args: Vec<String>,
  /// Extra suffix globs routed through this tool's rule, on top of the
  /// rule's own built-in `file_in` set (`src/rules.rs`).
  #[serde(default)]
  pub files: Vec<String>,
  /// Overrides which built-in rule (`cc`/`cxx`/`as`/...) this tool's
  /// command is substituted into, for a tool that wants to stand in for a
  /// rule under a different key than its own name.
  #[serde(default)]
  pub rule: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Target {
  pub id: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub props: Props,
  #[serde(default)]
  pub tools: BTreeMap<String, Tool>,
  /// Explicit `requirement spec -> component id` overrides for the provider
  /// resolution step (`spec.md` §4.4 "bake"/routing).
  #[serde(default)]
  pub routing: BTreeMap<String, String>,
  /// Host-scoped targets namespace their build directory with the local
  /// machine's `hostid` (`src/hostid.rs`), so outputs from different
  /// machines sharing a workspace never collide.
  #[serde(default)]
  pub host: bool,
  #[serde(skip)]
  pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
  Lib,
  Exe,
  None,
}

fn default_kind() -> ComponentKind {
  ComponentKind::None
}

#[derive(Debug, Clone, Deserialize)]
pub struct Component {
  pub id: String,
  #[serde(default)]
  pub description: String,
  #[serde(rename = "type", default = "default_kind")]
  pub kind: ComponentKind,
  #[serde(default)]
  pub requires: Vec<String>,
  #[serde(default)]
  pub provides: Vec<String>,
  /// `prop name -> allowed values`; the component is disabled unless every
  /// entry matches the target's resolved props (`spec.md` §4.4 "enableIf").
  #[serde(default, rename = "enableIf")]
  pub enable_if: BTreeMap<String, Vec<Scalar>>,
  #[serde(default)]
  pub props: Props,
  #[serde(default)]
  pub injects: Vec<String>,
  /// Set on components synthesized from a `HostPkg` extern (`src/registry.rs`);
  /// excluded from alias generation and `cincs` per `spec.md` §9's guidance on
  /// virtual components.
  #[serde(default)]
  pub cpp_excluded: bool,
  #[serde(skip)]
  pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub enum Manifest {
  Project(Project),
  Target(Target),
  Component(Component),
}

impl Manifest {
  pub fn id(&self) -> &str {
    match self {
      Manifest::Project(p) => &p.id,
      Manifest::Target(t) => &t.id,
      Manifest::Component(c) => &c.id,
    }
  }

  pub fn path(&self) -> &Path {
    match self {
      Manifest::Project(p) => &p.path,
      Manifest::Target(t) => &t.path,
      Manifest::Component(c) => &c.path,
    }
  }

  pub fn kind_name(&self) -> &'static str {
    match self {
      Manifest::Project(_) => "project",
      Manifest::Target(_) => "target",
      Manifest::Component(_) => "component",
    }
  }
}

/// Dispatch on `$schema` and deserialize into the right manifest kind
/// (`spec.md` §4.2 "Manifest loader"; Design Notes "reflection-free — a
/// small fixed map from schema URI to parser function").
pub fn parse(mut tree: Value, path: &Path) -> Result<Manifest, ConfigError> {
  let schema = tree.get("$schema").and_then(Value::as_str).map(str::to_string);
  let schema = compat::ensure_supported(schema.as_deref(), path)?;

  if let Value::Object(map) = &mut tree {
    map.remove("$schema");
  }

  match schema.as_str() {
    s if s == PROJECT_SCHEMA => {
      let mut project: Project =
        serde_json::from_value(tree).map_err(|source| ConfigError::ParseJson {
          path: path.to_path_buf(),
          source,
        })?;
      project.path = path.to_path_buf();
      Ok(Manifest::Project(project))
    }
    s if s == TARGET_SCHEMA => {
      let mut target: Target =
        serde_json::from_value(tree).map_err(|source| ConfigError::ParseJson {
          path: path.to_path_buf(),
          source,
        })?;
      target.path = path.to_path_buf();
      Ok(Manifest::Target(target))
    }
    s if s == COMPONENT_SCHEMA => {
      let mut component: Component =
        serde_json::from_value(tree).map_err(|source| ConfigError::ParseJson {
          path: path.to_path_buf(),
          source,
        })?;
      component.path = path.to_path_buf();
      Ok(Manifest::Component(component))
    }
    other => Err(ConfigError::UnsupportedSchema {
      schema: other.to_string(),
      path: path.to_path_buf(),
    }),
  }
}

/// Per-target, per-component resolution outcome.
///
/// Mutating a `resolved` attribute in place on each component conflates
/// every target that touches it. Each target has its own view of whether
/// the same component is enabled and who its providers are, so this crate
/// keeps an explicit `ResolvedGraph` keyed by `(target id, component id)`
/// instead (`src/resolver.rs`), and `Resolved` itself stays a plain value
/// type.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
  pub enabled: bool,
  pub disable_reason: Option<String>,
  /// `requirement spec -> provider component id`, direct requires only.
  pub provides: BTreeMap<String, String>,
  /// Ids of components that named this one as an `injects` target, i.e.
  /// that attach themselves to this component at link time.
  pub injected: Vec<String>,
  /// Every component this one needs at build time, transitively: the
  /// closure of `provides` and `injected` across the whole graph. Used by
  /// `src/buildplan.rs` to collect every library an executable must link,
  /// not just its direct dependencies.
  pub required: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_project_manifest() {
    let tree = serde_json::json!({
      "$schema": PROJECT_SCHEMA,
      "id": "demo",
      "extern": {
        "libfoo": {"kind": "git", "git": "https://example.invalid/foo.git", "tag": "v1"}
      }
    });
    let m = parse(tree, Path::new("project.json")).unwrap();
    match m {
      Manifest::Project(p) => {
        assert_eq!(p.id, "demo");
        assert!(matches!(p.externs.get("libfoo"), Some(Extern::Git { .. })));
      }
      _ => panic!("expected a project manifest"),
    }
  }

  #[test]
  fn parses_host_pkg_extern() {
    let tree = serde_json::json!({
      "$schema": PROJECT_SCHEMA,
      "id": "demo",
      "extern": { "zlib": {"kind": "host-pkg", "names": ["zlib"]} }
    });
    let m = parse(tree, Path::new("project.json")).unwrap();
    match m {
      Manifest::Project(p) => match p.externs.get("zlib") {
        Some(Extern::HostPkg { names }) => assert_eq!(names, &vec!["zlib".to_string()]),
        other => panic!("expected a host-pkg extern, got {other:?}"),
      },
      _ => panic!("expected a project manifest"),
    }
  }

  #[test]
  fn git_extern_defaults_to_a_shallow_depth_one_clone() {
    let tree = serde_json::json!({
      "$schema": PROJECT_SCHEMA,
      "id": "demo",
      "extern": { "libfoo": {"kind": "git", "git": "https://example.invalid/foo.git", "tag": "v1"} }
    });
    let m = parse(tree, Path::new("project.json")).unwrap();
    match m {
      Manifest::Project(p) => match p.externs.get("libfoo") {
        Some(Extern::Git { shallow, depth, .. }) => {
          assert!(shallow);
          assert_eq!(*depth, 1);
        }
        other => panic!("expected a git extern, got {other:?}"),
      },
      _ => panic!("expected a project manifest"),
    }
  }

  #[test]
  fn missing_schema_is_an_error() {
    let tree = serde_json::json!({"id": "demo"});
    let err = parse(tree, Path::new("project.json")).unwrap_err();
    assert!(matches!(err, ConfigError::MissingSchema { .. }));
  }

  #[test]
  fn parses_component_with_enable_if() {
    let tree = serde_json::json!({
      "$schema": COMPONENT_SCHEMA,
      "id": "app",
      "type": "exe",
      "requires": ["libfoo"],
      "enableIf": {"freestanding": [false]},
    });
    let m = parse(tree, Path::new("component.json")).unwrap();
    match m {
      Manifest::Component(c) => {
        assert_eq!(c.kind, ComponentKind::Exe);
        assert_eq!(c.enable_if.get("freestanding"), Some(&vec![Scalar::Bool(false)]));
      }
      _ => panic!("expected a component manifest"),
    }
  }

  #[test]
  fn props_are_sorted_by_key() {
    let mut props = Props::new();
    props.insert("z".into(), Scalar::Int(1));
    props.insert("a".into(), Scalar::Int(2));
    let keys: Vec<_> = props.keys().collect();
    assert_eq!(keys, vec!["a", "z"]);
  }
}
