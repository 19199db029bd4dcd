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

//! Synchronous process and filesystem helpers used by the registry and
//! build-plan generator, grounded on `original_source/cutekit/shell.py` and
//! on `examples/somombo-impalab/src/builder.rs::process_component`'s
//! `std::process::Command` + captured-`Output` idiom — kept here as plain
//! blocking calls rather than `tokio::process::Command` orchestration,
//! since `spec.md` §5 specifies a single-threaded,
//! synchronous execution model with no concurrent subprocess fan-out.

use crate::error::ShellError;
use crate::model::{Props, Scalar};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Output};

/// Run `cmd args...` to completion and return its captured output, erroring
/// if the process could not be spawned or exited non-zero.
pub fn run(cmd: &str, args: &[&str]) -> Result<Output, ShellError> {
  let output = Command::new(cmd).args(args).output().map_err(|source| ShellError::Spawn {
    cmd: cmd.to_string(),
    source,
  })?;

  if !output.status.success() {
    return Err(ShellError::NonZeroExit {
      cmd: cmd.to_string(),
      code: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    });
  }

  Ok(output)
}

/// Clone `url` at `tag` into `dest`, the way a build tool fetches a pinned
/// external dependency. Shallow by default (`shallow`/`depth`, from
/// `Extern::Git`); set `shallow` false for a full-history checkout.
pub fn git_clone_tag(url: &str, tag: &str, dest: &Path, shallow: bool, depth: u32) -> Result<(), ShellError> {
  if which("git").is_none() {
    return Err(ShellError::NotFound { cmd: "git".into() });
  }
  let dest_str = dest.to_string_lossy();
  let depth_str = depth.to_string();
  let mut args = vec!["clone", "--branch", tag];
  if shallow {
    args.push("--depth");
    args.push(&depth_str);
  }
  args.push(url);
  args.push(dest_str.as_ref());
  run("git", &args)?;
  Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct PkgConfigInfo {
  pub cflags: Vec<String>,
  pub libs: Vec<String>,
}

impl PkgConfigInfo {
  /// Flatten into `Props` so a synthesized host-package component carries
  /// its flags the same way any other component carries `cincs`/`clibs`.
  pub fn as_props(&self) -> Props {
    let mut props: Props = BTreeMap::new();
    props.insert("cflags".into(), Scalar::Str(self.cflags.join(" ")));
    props.insert("libs".into(), Scalar::Str(self.libs.join(" ")));
    props
  }
}

/// Resolve one or more package names against the host's `pkg-config`
/// database in a single invocation each for cflags and libs, so
/// `HostPkg { names: [...] }` gets one merged set of flags covering every
/// listed package.
///
/// Not present in `original_source/cutekit/shell.py`, which never resolves
/// externs against host package metadata; added to back `Extern::HostPkg`
/// (`spec.md` §3, §9).
pub fn pkg_config(names: &[String]) -> Result<PkgConfigInfo, ShellError> {
  if which("pkg-config").is_none() {
    return Err(ShellError::NotFound { cmd: "pkg-config".into() });
  }
  let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();

  let mut cflags_args = vec!["--cflags"];
  cflags_args.extend(&name_refs);
  let cflags_out = run("pkg-config", &cflags_args)?;

  let mut libs_args = vec!["--libs"];
  libs_args.extend(&name_refs);
  let libs_out = run("pkg-config", &libs_args)?;

  Ok(PkgConfigInfo {
    cflags: split_flags(&cflags_out.stdout),
    libs: split_flags(&libs_out.stdout),
  })
}

fn split_flags(bytes: &[u8]) -> Vec<String> {
  String::from_utf8_lossy(bytes)
    .split_whitespace()
    .map(str::to_string)
    .collect()
}

pub fn which(cmd: &str) -> Option<std::path::PathBuf> {
  let path = std::env::var_os("PATH")?;
  std::env::split_paths(&path).map(|dir| dir.join(cmd)).find(|p| p.is_file())
}

pub struct Uname {
  pub sysname: String,
  pub machine: String,
}

pub fn uname() -> Uname {
  let machine = match std::env::consts::ARCH {
    "aarch64" => "arm64",
    other => other,
  };
  let sysname = match std::env::consts::OS {
    "macos" => "Darwin",
    "linux" => "Linux",
    "windows" => "Windows",
    other => other,
  };
  Uname {
    sysname: sysname.into(),
    machine: machine.into(),
  }
}

pub fn mkdir_p(dir: &Path) -> Result<(), crate::error::IoError> {
  std::fs::create_dir_all(dir).map_err(|source| crate::error::IoError::CreateDir {
    path: dir.to_path_buf(),
    source,
  })
}

pub fn rmrf(dir: &Path) -> Result<(), crate::error::IoError> {
  if !dir.exists() {
    return Ok(());
  }
  std::fs::remove_dir_all(dir).map_err(|source| crate::error::IoError::Remove {
    path: dir.to_path_buf(),
    source,
  })
}

/// Recursively collect files under `dir` whose name matches one of
/// `patterns`, where each pattern is a plain `*.ext` suffix glob. Manifest
/// `fileIn` rules never need anything richer than that, so this hand-rolls
/// the match instead of depending on a globbing crate.
pub fn find(dir: &Path, patterns: &[&str]) -> Vec<std::path::PathBuf> {
  let mut out = Vec::new();
  for entry in walkdir::WalkDir::new(dir).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
    if !entry.file_type().is_file() {
      continue;
    }
    let name = entry.file_name().to_string_lossy();
    if patterns.iter().any(|p| glob_suffix_match(p, &name)) {
      out.push(entry.path().to_path_buf());
    }
  }
  out
}

fn glob_suffix_match(pattern: &str, name: &str) -> bool {
  match pattern.strip_prefix('*') {
    Some(suffix) => name.ends_with(suffix),
    None => name == pattern,
  }
}

#[allow(dead_code)]
pub fn env_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
  pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn glob_suffix_matches_extension() {
    assert!(glob_suffix_match("*.c", "main.c"));
    assert!(!glob_suffix_match("*.c", "main.cpp"));
  }

  #[test]
  fn which_finds_a_shell_builtin_like_command() {
    assert!(which("ls").is_some() || which("ls.exe").is_none());
  }

  #[test]
  fn uname_normalizes_aarch64_to_arm64() {
    let u = uname();
    assert!(!u.machine.is_empty());
    assert!(!u.sysname.is_empty());
  }
}
