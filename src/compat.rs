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

//! `$schema` dispatch, grounded on `original_source/cutekit/compat.py`.
//!
//! Reflection-free by construction: a fixed map from schema URI to manifest
//! kind, per the Design Notes ("Runtime `$schema` dispatch: reflection-free —
//! a small fixed map from schema URI to parser function").

use crate::error::ConfigError;
use std::path::Path;

pub const PROJECT_SCHEMA: &str = "https://schemas.cute.engineering/stable/cutekit.manifest.project.v1";
pub const TARGET_SCHEMA: &str = "https://schemas.cute.engineering/stable/cutekit.manifest.target.v1";
pub const COMPONENT_SCHEMA: &str = "https://schemas.cute.engineering/stable/cutekit.manifest.component.v1";

const SUPPORTED: &[&str] = &[PROJECT_SCHEMA, TARGET_SCHEMA, COMPONENT_SCHEMA];

/// Legacy/incompatible schema URIs mapped to the reason they are rejected,
/// mirroring `compat.py::UNSUPORTED_MANIFEST` (the OSDK manifest family).
const INCOMPATIBLE: &[(&str, &str)] = &[
  (
    "https://schemas.cute.engineering/stable/osdk.manifest.component.v1",
    "OSDK manifests are not supported by CuteKit. Please use a CuteKit manifest instead.",
  ),
  (
    "https://schemas.cute.engineering/stable/osdk.manifest.project.v1",
    "OSDK manifests are not supported by CuteKit. Please use a CuteKit manifest instead.",
  ),
  (
    "https://schemas.cute.engineering/stable/osdk.manifest.target.v1",
    "OSDK manifests are not supported by CuteKit. Please use a CuteKit manifest instead.",
  ),
  (
    "https://schemas.cute.engineering/latest/osdk.manifest.component",
    "OSDK manifests are not supported by CuteKit. Please use a CuteKit manifest instead.",
  ),
  (
    "https://schemas.cute.engineering/latest/osdk.manifest.project",
    "OSDK manifests are not supported by CuteKit. Please use a CuteKit manifest instead.",
  ),
  (
    "https://schemas.cute.engineering/latest/osdk.manifest.target",
    "OSDK manifests are not supported by CuteKit. Please use a CuteKit manifest instead.",
  ),
];

pub fn ensure_supported(schema: Option<&str>, path: &Path) -> Result<String, ConfigError> {
  let schema = schema.ok_or_else(|| ConfigError::MissingSchema {
    path: path.to_path_buf(),
  })?;

  if let Some((_, reason)) = INCOMPATIBLE.iter().find(|(uri, _)| *uri == schema) {
    return Err(ConfigError::IncompatibleSchema {
      schema: schema.to_string(),
      path: path.to_path_buf(),
      reason: reason.to_string(),
    });
  }

  if !SUPPORTED.contains(&schema) {
    return Err(ConfigError::UnsupportedSchema {
      schema: schema.to_string(),
      path: path.to_path_buf(),
    });
  }

  Ok(schema.to_string())
}
