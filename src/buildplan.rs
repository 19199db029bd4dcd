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

//! The build-plan generator (`spec.md` §4.5), grounded on
//! `original_source/cutekit/builder.py`'s `TargetScope`/`ComponentScope`
//! dataclasses and `@var`-computed scope variables (`builddir`, `hashid`,
//! `cincs`, `cdefs`), and on
//! `examples/somombo-impalab/src/builder.rs::process_component`'s
//! `std::process::Command` invocation idiom for actually running the
//! generated build.

use crate::consts;
use crate::error::{BuildError, ConfigError, IoError};
use crate::hostid;
use crate::mixins;
use crate::model::{Component, ComponentKind, Scalar, Target};
use crate::ninja::{self, Writer};
use crate::resolver::ResolvedGraph;
use crate::rules;
use crate::shell;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Per-target build scope: everything that depends only on the target, not
/// on any one component (`builder.py::TargetScope`).
pub struct TargetScope<'a> {
  pub target: &'a Target,
  pub graph: &'a ResolvedGraph,
  pub components: &'a BTreeMap<String, Component>,
  pub workspace: &'a Path,
  /// Mixins requested on the command line (`ck build --mixin`), applied
  /// uniformly to every tool invocation for this build
  /// (`spec.md` §4.5 "mixins" is a build-time choice, not a manifest one).
  pub mixins: &'a [String],
}

impl<'a> TargetScope<'a> {
  pub fn new(
    workspace: &'a Path,
    target: &'a Target,
    components: &'a BTreeMap<String, Component>,
    graph: &'a ResolvedGraph,
    mixins: &'a [String],
  ) -> Self {
    Self {
      target,
      graph,
      components,
      workspace,
      mixins,
    }
  }

  /// 8 hex characters of a content hash over `(props, tools)`, so two
  /// targets that resolve to the same effective configuration share a
  /// build directory and two that differ never collide
  /// (`builder.py::@var(hashid)`).
  pub fn hashid(&self) -> String {
    let mut hasher = Sha256::new();
    for (k, v) in &self.target.props {
      hasher.update(k.as_bytes());
      hasher.update(v.to_string().as_bytes());
    }
    for (k, tool) in &self.target.tools {
      hasher.update(k.as_bytes());
      hasher.update(tool.cmd.as_deref().unwrap_or_default().as_bytes());
      for a in &tool.args {
        hasher.update(a.as_bytes());
      }
    }
    let digest = hasher.finalize();
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
  }

  /// A target marked `host` (`spec.md` §4.5, §6) namespaces its build
  /// directory with the local machine's `hostid` (`src/hostid.rs`), so
  /// outputs from different machines sharing a workspace never collide.
  pub fn builddir(&self) -> PathBuf {
    let mut name = format!("{}-{}", self.target.id, self.hashid());
    if self.target.host {
      name.push('-');
      name.push_str(&hostid::hostid().unwrap_or_else(|_| "unknown".to_string()));
    }
    consts::build_dir(self.workspace).join(name)
  }

  pub fn ninja_file(&self) -> PathBuf {
    self.builddir().join("build.ninja")
  }

  fn tool_cmd(&self, name: &str) -> Result<(String, Vec<String>), ConfigError> {
    match self.target.tools.get(name) {
      Some(tool) => {
        let mut args = tool.args.clone();
        for mixin in self.mixins {
          mixins::apply(mixin, &mut args)?;
        }
        Ok((tool.cmd.clone().unwrap_or_else(|| name.to_string()), args))
      }
      None => {
        let mut args = Vec::new();
        for mixin in self.mixins {
          mixins::apply(mixin, &mut args)?;
        }
        Ok((name.to_string(), args))
      }
    }
  }

  /// Directories every compile job in this target gets `-I`'d with:
  /// `<generated>` and `<generated>/__aliases__` always, plus the source
  /// directory of every enabled, non-`cpp_excluded` component — aggregated
  /// once per target rather than scoped to a single component's own
  /// requires, matching `original_source/cutekit/builder.py::_computeCinc`,
  /// which computes one include set shared by every translation unit in a
  /// target. A component with `cpp-root-include` set additionally pulls in
  /// the workspace's `src` root, so its headers are reachable by their
  /// `component-id/header.h` path from anywhere in the target.
  pub fn cincs(&self) -> Vec<String> {
    let mut dirs = BTreeSet::new();
    dirs.insert(path_str(&consts::generated_dir(self.workspace)));
    dirs.insert(path_str(&consts::aliases_dir(self.workspace)));

    let mut root_requested = false;
    for (id, component) in self.components {
      if !self.is_enabled(id) || component.cpp_excluded {
        continue;
      }
      dirs.insert(path_str(component.path.parent().unwrap_or(Path::new("."))));
      if component.props.get("cpp-root-include").and_then(Scalar::as_bool).unwrap_or(false) {
        root_requested = true;
      }
    }
    if root_requested {
      dirs.insert(path_str(&self.workspace.join(consts::SRC_DIR)));
    }
    dirs.into_iter().collect()
  }

  /// `-D__ck_<key>[_<value>]__` flags from the target's own `props`
  /// (`spec.md` §8 scenario 6), not any one component's — a `cdef` reflects
  /// the target's resolved configuration, which every component in it
  /// shares. A `true` bool defines the bare flag; `false` defines nothing,
  /// matching `#ifdef __ck_<key>__` feature checks; any other scalar value
  /// is appended to the flag name.
  pub fn cdefs(&self) -> Vec<String> {
    self
      .target
      .props
      .iter()
      .filter_map(|(k, v)| match v {
        Scalar::Bool(true) => Some(format!("-D__ck_{k}__")),
        Scalar::Bool(false) => None,
        Scalar::Int(n) => Some(format!("-D__ck_{k}_{n}__")),
        Scalar::Str(s) => Some(format!("-D__ck_{k}_{}__", sanitize_define(s))),
      })
      .collect()
  }

  fn is_enabled(&self, id: &str) -> bool {
    self.graph.get(id).map(|r| r.enabled).unwrap_or(false)
  }
}

fn sanitize_define(s: &str) -> String {
  s.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect()
}

pub struct ComponentScope<'a> {
  pub component: &'a Component,
  pub target: &'a TargetScope<'a>,
}

impl<'a> ComponentScope<'a> {
  fn source_dir(&self) -> PathBuf {
    self.component.path.parent().unwrap_or(Path::new(".")).to_path_buf()
  }

  fn object_dir(&self) -> PathBuf {
    self.target.builddir().join("objs").join(&self.component.id)
  }

  /// `-I` for every directory `TargetScope::cincs` collects, plus the
  /// target's `cdefs` — both are target-wide, not scoped to this one
  /// component (`TargetScope::cincs`/`cdefs`).
  fn compile_flags(&self) -> Vec<String> {
    let mut flags = Vec::new();
    for dir in self.target.cincs() {
      flags.push(format!("-I{dir}"));
    }
    flags.extend(self.target.cdefs());
    flags
  }
}

/// Generate the Ninja build-runner input file for `target`, returning its
/// contents and the path it will be written to
/// (`builder.py::ProductScope`/`build.py`'s single-file-per-target output).
pub fn generate(scope: &TargetScope) -> Result<String, BuildError> {
  let mut w = Writer::new();
  w.comment(&format!("generated for target '{}'", scope.target.id));
  w.newline();

  emit_rules(&mut w, scope)?;

  let mut all_outputs = Vec::new();

  for (id, component) in scope.components {
    match scope.graph.get(id) {
      Some(r) if r.enabled => {}
      _ => continue,
    }
    if component.cpp_excluded {
      continue;
    }
    let cscope = ComponentScope { component, target: scope };
    if let Some(output) = emit_component(&mut w, scope, &cscope)? {
      all_outputs.push(output);
    }
  }

  w.newline();
  w.build(&["all".to_string()], "phony", &all_outputs, &[], &[], &[]);
  w.default(&["all".to_string()]);

  Ok(w.finish())
}

fn emit_rules(w: &mut Writer, scope: &TargetScope) -> Result<(), BuildError> {
  for (name, rule) in rules::rules() {
    let (cmd, _args) = scope.tool_cmd(rule.tool)?;
    let command = rule.command.replace("$tool", &cmd);
    let depfile = if rule.depfile { Some("$out.d") } else { None };
    w.rule(name, &command, Some(&format!("{name} $out")), depfile, false, None, false);
  }
  w.newline();
  Ok(())
}

/// Writes `<generated>/__aliases__/<id>.h` for every enabled, non-excluded
/// component that carries a `mod.h`/`_mod.h` header, each a thin
/// `#include` of the real file. Lets other components reach a component's
/// public header by a stable alias name regardless of where in the source
/// tree that component actually lives, the way `cincs`'s always-included
/// `__aliases__` directory expects to find them.
fn write_aliases(scope: &TargetScope) -> Result<(), IoError> {
  let aliases_dir = consts::aliases_dir(scope.workspace);
  shell::mkdir_p(&aliases_dir)?;

  for (id, component) in scope.components {
    if !scope.is_enabled(id) || component.cpp_excluded {
      continue;
    }
    let source_dir = component.path.parent().unwrap_or(Path::new("."));
    let Some(header) = ["_mod.h", "mod.h"]
      .iter()
      .map(|name| source_dir.join(name))
      .find(|candidate| candidate.is_file())
    else {
      continue;
    };

    let alias_path = aliases_dir.join(format!("{id}.h"));
    let target_path = pathdiff::diff_paths(&header, &aliases_dir).unwrap_or(header);
    let contents = format!("#include \"{}\"\n", target_path.to_string_lossy());
    std::fs::write(&alias_path, contents).map_err(|source| IoError::Write {
      path: alias_path.clone(),
      source,
    })?;
  }
  Ok(())
}

/// Looks up a per-target variable override/extension
/// (`ck-V-override-<name>`/`ck-V-extra-<name>` props, `spec.md` §4.5),
/// letting a target manifest replace or append to a named build variable
/// (e.g. `flags`) without the component or rule that computed it knowing.
fn resolve_var(scope: &TargetScope, name: &str, base: String) -> String {
  if let Some(v) = scope.target.props.get(&format!("ck-V-override-{name}")) {
    return v.to_string();
  }
  match scope.target.props.get(&format!("ck-V-extra-{name}")) {
    Some(extra) if base.is_empty() => extra.to_string(),
    Some(extra) => format!("{base} {extra}"),
    None => base,
  }
}

/// Emit compile + link steps for one component, returning the path to its
/// final artifact (for a lib/exe) if it produces one.
fn emit_component(
  w: &mut Writer,
  scope: &TargetScope,
  cscope: &ComponentScope,
) -> Result<Option<String>, BuildError> {
  let sources = shell::find(&cscope.source_dir(), &["*.c", "*.cpp", "*.cc", "*.cxx", "*.s", "*.S"]);
  if sources.is_empty() && cscope.component.kind == ComponentKind::None {
    return Ok(None);
  }

  let flags = resolve_var(scope, "flags", cscope.compile_flags().join(" "));
  let mut objects = Vec::new();

  for src in &sources {
    let (rule_name, _rule) = match rules::rule_for_file(&file_name(src)) {
      Some(r) => r,
      None => continue,
    };
    let rel = pathdiff::diff_paths(src, &cscope.source_dir()).unwrap_or_else(|| src.clone());
    let object = cscope.object_dir().join(rel).with_extension("o");
    w.build(
      &[path_str(&object)],
      &rule_name,
      &[path_str(src)],
      &[],
      &[],
      &[("flags", flags.clone())],
    );
    objects.push(path_str(&object));
  }

  match cscope.component.kind {
    ComponentKind::Lib => {
      let archive = scope.builddir().join("lib").join(format!("lib{}.a", cscope.component.id));
      w.build(&[path_str(&archive)], "ar", &objects, &[], &[], &[]);
      Ok(Some(path_str(&archive)))
    }
    ComponentKind::Exe => {
      let mut link_inputs = objects;
      link_inputs.extend(transitive_lib_archives(scope, cscope));
      let binary = scope.builddir().join("bin").join(&cscope.component.id);
      let (_, link_args) = scope.tool_cmd("ld")?;
      let link_flags = resolve_var(scope, "flags", link_args.join(" "));
      w.build(&[path_str(&binary)], "ld", &link_inputs, &[], &[], &[("flags", link_flags)]);
      Ok(Some(path_str(&binary)))
    }
    ComponentKind::None => Ok(None),
  }
}

/// Every `Lib` component the executable transitively depends on, walking
/// the full `required` closure (`src/resolver.rs`) rather than stopping at
/// direct requires, so a chain like `exe -> a -> b` links both `a` and `b`
/// instead of failing at link time with undefined symbols from `b`.
fn transitive_lib_archives(scope: &TargetScope, cscope: &ComponentScope) -> Vec<String> {
  let Some(resolved) = scope.graph.get(&cscope.component.id) else {
    return Vec::new();
  };
  let mut archives = Vec::new();
  for dep_id in &resolved.required {
    if let Some(dep) = scope.components.get(dep_id) {
      if dep.kind == ComponentKind::Lib {
        archives.push(path_str(&scope.builddir().join("lib").join(format!("lib{}.a", dep.id))));
      }
    }
  }
  archives
}

fn file_name(path: &Path) -> String {
  path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn path_str(path: &Path) -> String {
  ninja::escape_path(&path.to_string_lossy())
}

/// Write the generated Ninja file atomically (write to a sibling temp file,
/// then rename) so a crash mid-write never leaves a half-written
/// `build.ninja` behind.
pub fn write_atomic(scope: &TargetScope, contents: &str) -> Result<PathBuf, IoError> {
  let dir = scope.builddir();
  shell::mkdir_p(&dir)?;
  let final_path = scope.ninja_file();
  let tmp_path = dir.join(".build.ninja.tmp");
  std::fs::write(&tmp_path, contents).map_err(|source| IoError::Write {
    path: tmp_path.clone(),
    source,
  })?;
  std::fs::rename(&tmp_path, &final_path).map_err(|source| IoError::Write {
    path: final_path.clone(),
    source,
  })?;
  Ok(final_path)
}

/// Generate and write the Ninja file, then invoke the build runner on it,
/// optionally scoped to a single output target.
pub fn build(scope: &TargetScope, only: Option<&str>) -> Result<(), BuildError> {
  write_aliases(scope)?;
  let contents = generate(scope)?;
  let ninja_path = write_atomic(scope, &contents)?;

  if which_ninja_missing() {
    return Err(BuildError::RunnerFailed(None));
  }

  let ninja_path_str = ninja_path.to_string_lossy().into_owned();
  let mut args = vec!["-f", ninja_path_str.as_str()];
  if let Some(target) = only {
    args.push(target);
  }
  shell::run("ninja", &args)?;
  Ok(())
}

fn which_ninja_missing() -> bool {
  shell::which("ninja").is_none()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{ComponentKind, Props};
  use crate::resolver;
  use std::collections::BTreeMap;

  fn target() -> Target {
    Target {
      id: "native".into(),
      description: String::new(),
      props: Props::new(),
      tools: BTreeMap::new(),
      routing: BTreeMap::new(),
      host: false,
      path: Default::default(),
    }
  }

  fn component(id: &str, kind: ComponentKind) -> Component {
    Component {
      id: id.to_string(),
      description: String::new(),
      kind,
      requires: Vec::new(),
      provides: Vec::new(),
      enable_if: BTreeMap::new(),
      props: Props::new(),
      injects: Vec::new(),
      cpp_excluded: false,
      path: PathBuf::from(format!("src/{id}/{id}.json")),
    }
  }

  const NO_MIXINS: &[String] = &[];

  #[test]
  fn hashid_is_stable_for_identical_props() {
    let t = target();
    let components = BTreeMap::new();
    let graph = resolver::resolve(&t, &components).unwrap();
    let workspace = PathBuf::from("/workspace");
    let scope_a = TargetScope::new(&workspace, &t, &components, &graph, NO_MIXINS);
    let scope_b = TargetScope::new(&workspace, &t, &components, &graph, NO_MIXINS);
    assert_eq!(scope_a.hashid(), scope_b.hashid());
    assert_eq!(scope_a.hashid().len(), 8);
  }

  #[test]
  fn hashid_changes_with_props() {
    let workspace = PathBuf::from("/workspace");
    let components = BTreeMap::new();

    let mut t1 = target();
    t1.props.insert("debug".into(), Scalar::Bool(true));
    let graph1 = resolver::resolve(&t1, &components).unwrap();
    let scope1 = TargetScope::new(&workspace, &t1, &components, &graph1, NO_MIXINS);

    let mut t2 = target();
    t2.props.insert("debug".into(), Scalar::Bool(false));
    let graph2 = resolver::resolve(&t2, &components).unwrap();
    let scope2 = TargetScope::new(&workspace, &t2, &components, &graph2, NO_MIXINS);

    assert_ne!(scope1.hashid(), scope2.hashid());
  }

  #[test]
  fn builddir_gets_a_hostid_suffix_only_for_host_targets() {
    let workspace = PathBuf::from("/workspace");
    let components = BTreeMap::new();

    let mut host_target = target();
    host_target.host = true;
    let graph = resolver::resolve(&host_target, &components).unwrap();
    let scope = TargetScope::new(&workspace, &host_target, &components, &graph, NO_MIXINS);
    let dir_name = scope.builddir().file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(dir_name.matches('-').count(), 2);

    let plain_target = target();
    let graph = resolver::resolve(&plain_target, &components).unwrap();
    let scope = TargetScope::new(&workspace, &plain_target, &components, &graph, NO_MIXINS);
    let dir_name = scope.builddir().file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(dir_name.matches('-').count(), 1);
  }

  #[test]
  fn cdefs_renders_each_scalar_kind_from_target_props() {
    let mut t = target();
    t.props.insert("enable_feature".into(), Scalar::Bool(true));
    t.props.insert("disabled_feature".into(), Scalar::Bool(false));
    t.props.insert("max_connections".into(), Scalar::Int(8));
    t.props.insert("build_tag".into(), Scalar::Str("release".into()));
    let components = BTreeMap::new();
    let graph = resolver::resolve(&t, &components).unwrap();
    let workspace = PathBuf::from("/workspace");
    let target_scope = TargetScope::new(&workspace, &t, &components, &graph, NO_MIXINS);
    let defs = target_scope.cdefs();
    assert!(defs.contains(&"-D__ck_enable_feature__".to_string()));
    assert!(defs.contains(&"-D__ck_max_connections_8__".to_string()));
    assert!(defs.contains(&"-D__ck_build_tag_release__".to_string()));
    assert!(!defs.iter().any(|d| d.contains("disabled_feature")));
  }

  #[test]
  fn cincs_always_includes_generated_and_aliases_dirs() {
    let t = target();
    let components = BTreeMap::new();
    let graph = resolver::resolve(&t, &components).unwrap();
    let workspace = PathBuf::from("/workspace");
    let target_scope = TargetScope::new(&workspace, &t, &components, &graph, NO_MIXINS);
    let dirs = target_scope.cincs();
    assert!(dirs.iter().any(|d| d.ends_with("generated")));
    assert!(dirs.iter().any(|d| d.ends_with("__aliases__")));
  }

  #[test]
  fn cpp_excluded_providers_are_left_out_of_cincs() {
    let t = target();
    let mut app = component("app", ComponentKind::Exe);
    app.requires.push("zlib".into());
    let mut zlib = component("zlib", ComponentKind::Lib);
    zlib.provides.push("zlib".into());
    zlib.cpp_excluded = true;
    zlib.path = PathBuf::from("/workspace/.cutekit/generated/zlib.pkgconfig");

    let mut components = BTreeMap::new();
    components.insert("app".to_string(), app);
    components.insert("zlib".to_string(), zlib);
    let graph = resolver::resolve(&t, &components).unwrap();
    let workspace = PathBuf::from("/workspace");
    let target_scope = TargetScope::new(&workspace, &t, &components, &graph, NO_MIXINS);
    let dirs = target_scope.cincs();
    assert!(!dirs.iter().any(|d| d.contains("zlib")));
  }

  #[test]
  fn cpp_root_include_pulls_in_the_workspace_src_root() {
    let t = target();
    let mut app = component("app", ComponentKind::Exe);
    app.props.insert("cpp-root-include".into(), Scalar::Bool(true));
    let mut components = BTreeMap::new();
    components.insert("app".to_string(), app);
    let graph = resolver::resolve(&t, &components).unwrap();
    let workspace = PathBuf::from("/workspace");
    let target_scope = TargetScope::new(&workspace, &t, &components, &graph, NO_MIXINS);
    let dirs = target_scope.cincs();
    assert!(dirs.iter().any(|d| d.ends_with("/workspace/src") || d.ends_with("workspace/src")));
  }

  #[test]
  fn ck_v_override_replaces_and_ck_v_extra_appends() {
    let mut t = target();
    t.props.insert("ck-V-override-flags".into(), Scalar::Str("-O3".into()));
    let components = BTreeMap::new();
    let graph = resolver::resolve(&t, &components).unwrap();
    let workspace = PathBuf::from("/workspace");
    let scope = TargetScope::new(&workspace, &t, &components, &graph, NO_MIXINS);
    assert_eq!(resolve_var(&scope, "flags", "-O0".into()), "-O3");

    let mut t2 = target();
    t2.props.insert("ck-V-extra-flags".into(), Scalar::Str("-Wall".into()));
    let graph2 = resolver::resolve(&t2, &components).unwrap();
    let scope2 = TargetScope::new(&workspace, &t2, &components, &graph2, NO_MIXINS);
    assert_eq!(resolve_var(&scope2, "flags", "-O0".into()), "-O0 -Wall");
  }

  #[test]
  fn unknown_mixin_surfaces_as_a_config_error() {
    let t = target();
    let components = BTreeMap::new();
    let graph = resolver::resolve(&t, &components).unwrap();
    let workspace = PathBuf::from("/workspace");
    let bogus_mixins = vec!["nonexistent".to_string()];
    let scope = TargetScope::new(&workspace, &t, &components, &graph, &bogus_mixins);
    let err = scope.tool_cmd("cc").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownMixin { .. }));
  }
}
