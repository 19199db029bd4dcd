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
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error enum for the cutekit library.
#[derive(Error, Debug)]
pub enum CuteKitError {
  #[error("Configuration error")]
  Config(#[from] ConfigError),

  #[error("Dependency resolution error")]
  Resolution(#[from] ResolutionError),

  #[error("I/O error")]
  Io(#[from] IoError),

  #[error("Shell error")]
  Shell(#[from] ShellError),

  #[error("Build error")]
  Build(#[from] BuildError),
}

/// Errors raised while reading, expanding, or schema-checking manifests
/// (src/jexpr.rs, src/loader.rs, src/registry.rs).
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to read {path}", path = path.display())]
  ReadFailed {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse JSON manifest {path}", path = path.display())]
  ParseJson {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("Failed to parse TOML manifest {path}", path = path.display())]
  ParseToml {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("Missing $schema in {path}", path = path.display())]
  MissingSchema { path: PathBuf },

  #[error("Unsupported manifest schema '{schema}' in {path}", path = path.display())]
  UnsupportedSchema { schema: String, path: PathBuf },

  #[error("Unsupported manifest schema '{schema}' in {path}: {reason}", path = path.display())]
  IncompatibleSchema {
    schema: String,
    path: PathBuf,
    reason: String,
  },

  #[error(
    "{path} should be a {expected} manifest but is a {actual} manifest",
    path = path.display()
  )]
  WrongManifestKind {
    path: PathBuf,
    expected: String,
    actual: String,
  },

  #[error("Could not find manifest at '{}'", path.display())]
  ManifestNotFound { path: PathBuf },

  #[error(
    "Duplicated manifest '{id}' at '{new}' already loaded from '{existing}'",
    new = new_path.display(),
    existing = existing_path.display()
  )]
  DuplicateId {
    id: String,
    new_path: PathBuf,
    existing_path: PathBuf,
  },

  #[error("Could not find {kind} '{id}'")]
  NotFound { kind: &'static str, id: String },

  #[error("Unknown mixin {id}")]
  UnknownMixin { id: String },

  #[error("Invalid --prop '{spec}', expected key=value")]
  InvalidProp { spec: String },

  #[error("No project found in this directory or any parent directory")]
  NoProjectFound,

  #[error("Failed to expand '{expr}': {cause}")]
  Expansion { expr: String, cause: String },
}

/// Errors raised while resolving the dependency graph for a target
/// (src/resolver.rs).
#[derive(Error, Debug)]
pub enum ResolutionError {
  #[error("No provider for '{spec}'")]
  NoProvider { spec: String },

  #[error("Multiple providers for '{spec}': {ids}")]
  MultipleProviders { spec: String, ids: String },

  #[error("Dependency loop while resolving '{what}': {stack} -> {keep}")]
  DependencyLoop {
    what: String,
    stack: String,
    keep: String,
  },

  #[error("Component {id} is disabled: {reason}")]
  ComponentDisabled { id: String, reason: String },
}

/// Errors raised by filesystem access that is not a shelled-out command
/// (src/registry.rs, src/buildplan.rs).
#[derive(Error, Debug)]
pub enum IoError {
  #[error("Failed to create directory {path}", path = path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to remove {path}", path = path.display())]
  Remove {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to write {path}", path = path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to read directory {path}", path = path.display())]
  ReadDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Errors raised invoking external processes (src/shell.rs).
#[derive(Error, Debug)]
pub enum ShellError {
  #[error("Command not found: {cmd}")]
  NotFound { cmd: String },

  #[error("Failed to spawn '{cmd}'")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  #[error(
    "'{cmd}' exited with status {code:?}\n--- STDOUT ---\n{stdout}\n--- STDERR ---\n{stderr}"
  )]
  NonZeroExit {
    cmd: String,
    code: Option<i32>,
    stdout: String,
    stderr: String,
  },

  #[error("HTTP request to {url} failed: {reason}")]
  Http { url: String, reason: String },
}

/// Errors raised emitting or invoking the build-runner input file
/// (src/buildplan.rs, src/ninja.rs).
#[derive(Error, Debug)]
pub enum BuildError {
  #[error("Component {id} is not a library")]
  NotALibrary { id: String },

  #[error("Component {spec} not found")]
  ComponentNotFound { spec: String },

  #[error("Build runner exited with status {0:?}")]
  RunnerFailed(Option<i32>),

  #[error(transparent)]
  Io(#[from] IoError),

  #[error(transparent)]
  Shell(#[from] ShellError),

  #[error(transparent)]
  Resolution(#[from] ResolutionError),

  #[error(transparent)]
  Config(#[from] ConfigError),
}
