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

//! `~/.cutekit/hostid`: an 8-byte host-stable identifier, created on first
//! use and reused afterwards. Used by `Target::builddir` to keep
//! host-specific outputs from colliding across machines (`spec.md` §4.5,
//! §6).

use crate::consts;
use crate::error::IoError;
use std::fs;
use std::io::Write;

/// Reads (creating if absent) the 8-byte host id and returns it hex-encoded.
pub fn hostid() -> Result<String, IoError> {
  let dir = consts::global_ck_dir();
  let path = dir.join("hostid");

  if let Ok(bytes) = fs::read(&path) {
    if bytes.len() == 8 {
      return Ok(hex::encode(bytes));
    }
  }

  fs::create_dir_all(&dir).map_err(|source| IoError::CreateDir {
    path: dir.clone(),
    source,
  })?;

  let bytes = random_bytes_8();
  let mut f = fs::File::create(&path).map_err(|source| IoError::Write {
    path: path.clone(),
    source,
  })?;
  f.write_all(&bytes).map_err(|source| IoError::Write {
    path: path.clone(),
    source,
  })?;

  Ok(hex::encode(bytes))
}

/// 8 bytes seeded from the current time and process id — good enough for a
/// "this machine" distinguisher, not a security property.
fn random_bytes_8() -> [u8; 8] {
  let nanos = std::time::SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .map(|d| d.as_nanos())
    .unwrap_or(0);
  let pid = std::process::id() as u128;
  let mixed = nanos ^ (pid << 32) ^ 0x9e3779b97f4a7c15;
  mixed.to_le_bytes()[..8].try_into().unwrap()
}

mod hex {
  pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
  }
}
