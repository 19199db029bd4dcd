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

//! Well-known workspace paths, grounded on `original_source/cutekit/const.py`.

use std::path::{Path, PathBuf};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const PROJECT_CK_DIR: &str = ".cutekit";
pub const SRC_DIR: &str = "src";
pub const META_DIR: &str = "meta";
pub const TARGETS_SUBDIR: &str = "meta/targets";
pub const PLUGINS_SUBDIR: &str = "meta/plugins";

pub fn build_dir(workspace: &Path) -> PathBuf {
  workspace.join(PROJECT_CK_DIR).join("build")
}

pub fn cache_dir(workspace: &Path) -> PathBuf {
  workspace.join(PROJECT_CK_DIR).join("cache")
}

pub fn extern_dir(workspace: &Path) -> PathBuf {
  workspace.join(PROJECT_CK_DIR).join("extern")
}

pub fn generated_dir(workspace: &Path) -> PathBuf {
  workspace.join(PROJECT_CK_DIR).join("generated")
}

pub fn aliases_dir(workspace: &Path) -> PathBuf {
  generated_dir(workspace).join("__aliases__")
}

pub fn project_log_file(workspace: &Path) -> PathBuf {
  workspace.join(PROJECT_CK_DIR).join("cutekit.log")
}

/// `~/.cutekit`, used for the cross-workspace host id (see `hostid.rs`).
pub fn global_ck_dir() -> PathBuf {
  dirs_home().join(".cutekit")
}

fn dirs_home() -> PathBuf {
  std::env::var_os("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("."))
}
