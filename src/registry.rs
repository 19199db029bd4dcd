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

//! Workspace discovery and manifest aggregation (`spec.md` §4.3 "Registry"),
//! grounded on `original_source/cutekit/model.py::Registry.load` for the
//! overall sequence (append project, fetch externs, discover target and
//! component manifests, compose) and on
//! `examples/qryxip-cargo-cpl/src/workspace.rs::locate_project` for walking
//! parent directories to find the project root.

use crate::consts;
use crate::error::{ConfigError, CuteKitError, IoError};
use crate::jexpr::{self, Globals, Locals};
use crate::loader;
use crate::model::{self, Component, ComponentKind, Extern, Manifest, Project, Target};
use crate::shell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub struct Registry {
  pub workspace: PathBuf,
  pub project: Project,
  pub targets: BTreeMap<String, Target>,
  pub components: BTreeMap<String, Component>,
}

/// Walk `start` and its ancestors looking for a project manifest, the way a
/// build tool locates the root of a source tree regardless of the directory
/// the user invoked it from. Projects can nest (a vendored dependency
/// carrying its own `project.json` inside a larger workspace); this returns
/// the highest/outermost ancestor with a manifest, not the nearest one, so
/// a workspace always resolves to its true root rather than to whichever
/// vendored project happens to be closest to the current directory.
pub fn topmost(start: &Path) -> Result<PathBuf, ConfigError> {
  let mut found = None;
  for dir in start.ancestors() {
    if project_manifest_path(dir).is_some() {
      found = Some(dir.to_path_buf());
    }
  }
  found.ok_or(ConfigError::NoProjectFound)
}

fn project_manifest_path(dir: &Path) -> Option<PathBuf> {
  for name in ["project.json", "project.toml"] {
    let candidate = dir.join(name);
    if candidate.is_file() {
      return Some(candidate);
    }
  }
  None
}

fn load_manifest(path: &Path) -> Result<Manifest, ConfigError> {
  let tree = loader::read_tree(path)?;
  let locals = Locals::new();
  let globals = Globals::new(path.parent().unwrap_or(Path::new(".")));
  let expanded = jexpr::expand(&tree, &locals, &globals)?;
  model::parse(expanded, path)
}

impl Registry {
  /// Build a `Registry` by loading `workspace`'s project manifest, fetching
  /// its externs, and discovering every target and component manifest under
  /// it.
  pub fn load(workspace: &Path) -> Result<Registry, CuteKitError> {
    let project_path = project_manifest_path(workspace).ok_or(ConfigError::NoProjectFound)?;
    let project = match load_manifest(&project_path)? {
      Manifest::Project(p) => p,
      other => {
        return Err(
          ConfigError::WrongManifestKind {
            path: project_path,
            expected: "project".into(),
            actual: other.kind_name().into(),
          }
          .into(),
        )
      }
    };

    let mut components = BTreeMap::new();
    let mut targets = BTreeMap::new();

    fetch_externs(workspace, &project, &mut components)?;

    for path in discover_manifests(&workspace.join(consts::TARGETS_SUBDIR))? {
      match load_manifest(&path)? {
        Manifest::Target(t) => insert_unique(&mut targets, t.id.clone(), t, &path)?,
        other => {
          return Err(
            ConfigError::WrongManifestKind {
              path,
              expected: "target".into(),
              actual: other.kind_name().into(),
            }
            .into(),
          )
        }
      }
    }

    for path in discover_manifests(&workspace.join(consts::SRC_DIR))? {
      match load_manifest(&path)? {
        Manifest::Component(c) => insert_unique(&mut components, c.id.clone(), c, &path)?,
        other => {
          return Err(
            ConfigError::WrongManifestKind {
              path,
              expected: "component".into(),
              actual: other.kind_name().into(),
            }
            .into(),
          )
        }
      }
    }

    Ok(Registry {
      workspace: workspace.to_path_buf(),
      project,
      targets,
      components,
    })
  }
}

fn insert_unique<T>(
  map: &mut BTreeMap<String, T>,
  id: String,
  value: T,
  new_path: &Path,
) -> Result<(), ConfigError>
where
  T: HasPath,
{
  if let Some(existing) = map.get(&id) {
    return Err(ConfigError::DuplicateId {
      id,
      new_path: new_path.to_path_buf(),
      existing_path: existing.path().to_path_buf(),
    });
  }
  map.insert(id, value);
  Ok(())
}

trait HasPath {
  fn path(&self) -> &Path;
}

impl HasPath for Target {
  fn path(&self) -> &Path {
    &self.path
  }
}

impl HasPath for Component {
  fn path(&self) -> &Path {
    &self.path
  }
}

/// Recursively collect manifest files (`.json`/`.toml`) under `dir`, sorted
/// by path so discovery order is deterministic regardless of the
/// filesystem's own directory-entry order.
fn discover_manifests(dir: &Path) -> Result<Vec<PathBuf>, IoError> {
  if !dir.exists() {
    return Ok(Vec::new());
  }
  let mut paths = Vec::new();
  for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
    if !entry.file_type().is_file() {
      continue;
    }
    let path = entry.path();
    let is_manifest = matches!(
      path.extension().and_then(|e| e.to_str()),
      Some("json") | Some("toml")
    ) && !path
      .file_name()
      .and_then(|n| n.to_str())
      .map(|n| n == "project.json" || n == "project.toml")
      .unwrap_or(false);
    if is_manifest {
      paths.push(path.to_path_buf());
    }
  }
  paths.sort();
  Ok(paths)
}

/// Fetch (or reuse a cached checkout of) every extern declared by `project`.
///
/// `Extern::Git` clones into `.cutekit/extern/<name>` at the pinned tag,
/// shallow by default (`shallow`/`depth`). `Extern::HostPkg` has no
/// counterpart in `original_source/cutekit/model.py`, which never resolves
/// externs against the host package database; it shells out to
/// `pkg-config` for every listed package name, concatenates their flags,
/// and synthesizes a virtual library component so the resolver can depend
/// on it like any other provider, carrying `cpp_excluded` so alias
/// generation and include-path collection skip it (`spec.md` §9).
fn fetch_externs(
  workspace: &Path,
  project: &Project,
  components: &mut BTreeMap<String, Component>,
) -> Result<(), CuteKitError> {
  for (name, ext) in &project.externs {
    match ext {
      Extern::Git { git, tag, shallow, depth } => {
        let dest = consts::extern_dir(workspace).join(name);
        if !dest.exists() {
          shell::git_clone_tag(git, tag, &dest, *shallow, *depth)?;
        }
      }
      Extern::HostPkg { names } => {
        let info = shell::pkg_config(names)?;
        let virtual_id = format!("__extern_{name}__");
        let component = Component {
          id: virtual_id.clone(),
          description: format!("host package(s) '{}'", names.join(", ")),
          kind: ComponentKind::Lib,
          requires: Vec::new(),
          provides: vec![name.clone()],
          enable_if: BTreeMap::new(),
          props: info.as_props(),
          injects: Vec::new(),
          cpp_excluded: true,
          path: workspace.join(consts::PROJECT_CK_DIR).join("generated").join(format!("{name}.pkgconfig")),
        };
        components.insert(virtual_id, component);
      }
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cutekit-registry-test-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
  }

  #[test]
  fn topmost_finds_project_in_current_dir() {
    let dir = scratch_dir("topmost-here");
    fs::write(dir.join("project.json"), "{}").unwrap();
    assert_eq!(topmost(&dir).unwrap(), dir);
  }

  #[test]
  fn topmost_walks_up_parent_directories() {
    let dir = scratch_dir("topmost-up");
    let nested = dir.join("a").join("b");
    fs::create_dir_all(&nested).unwrap();
    fs::write(dir.join("project.json"), "{}").unwrap();
    assert_eq!(topmost(&nested).unwrap(), dir);
  }

  #[test]
  fn topmost_prefers_the_outermost_of_two_nested_projects() {
    let dir = scratch_dir("topmost-nested");
    let inner = dir.join("vendor").join("nested-dep");
    fs::create_dir_all(&inner).unwrap();
    fs::write(dir.join("project.json"), "{}").unwrap();
    fs::write(inner.join("project.json"), "{}").unwrap();
    let deeper = inner.join("src");
    fs::create_dir_all(&deeper).unwrap();
    assert_eq!(topmost(&deeper).unwrap(), dir);
  }

  #[test]
  fn topmost_errors_without_a_project_manifest() {
    let dir = scratch_dir("topmost-missing");
    assert!(matches!(topmost(&dir), Err(ConfigError::NoProjectFound)));
  }

  #[test]
  fn discover_manifests_sorts_by_path_and_skips_project_files() {
    let dir = scratch_dir("discover");
    fs::write(dir.join("project.json"), "{}").unwrap();
    fs::create_dir_all(dir.join("b")).unwrap();
    fs::create_dir_all(dir.join("a")).unwrap();
    fs::write(dir.join("b").join("two.json"), "{}").unwrap();
    fs::write(dir.join("a").join("one.json"), "{}").unwrap();
    let found = discover_manifests(&dir).unwrap();
    assert_eq!(found, vec![dir.join("a").join("one.json"), dir.join("b").join("two.json")]);
  }
}
