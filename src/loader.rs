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

//! Reads a manifest file (JSON or TOML) into a plain [`serde_json::Value`]
//! tree, before Jexpr expansion ever runs. Grounded on `jexpr.py::read()`,
//! which likewise just loads the raw tree and lets `expand()` do the rest.

use crate::error::ConfigError;
use serde_json::Value;
use std::path::Path;

pub fn read_tree(path: &Path) -> Result<Value, ConfigError> {
  let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
    path: path.to_path_buf(),
    source,
  })?;

  match path.extension().and_then(|e| e.to_str()) {
    Some("toml") => {
      let toml_value: toml::Value = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
      })?;
      serde_json::to_value(toml_value).map_err(|source| ConfigError::ParseJson {
        path: path.to_path_buf(),
        source,
      })
    }
    _ => serde_json::from_str(&text).map_err(|source| ConfigError::ParseJson {
      path: path.to_path_buf(),
      source,
    }),
  }
}
