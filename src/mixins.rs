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

//! Named flag bundles a `Tool` can layer on top of its base args
//! (`spec.md` §4.5 "mixins"), grounded on
//! `original_source/cutekit/mixins.py`'s fixed `mixins` dict.

use crate::error::ConfigError;

/// Append the flags for `name` onto `args`, in the order mixins are listed
/// on the tool (`Tool::mixins`), so later mixins can override earlier ones
/// the way trailing compiler flags win.
pub fn apply(name: &str, args: &mut Vec<String>) -> Result<(), ConfigError> {
  let flags: &[&str] = match name {
    "cache" => &[],
    "debug" => &["-g", "-O0"],
    "asan" => &["-fsanitize=address"],
    "msan" => &["-fsanitize=memory"],
    "tsan" => &["-fsanitize=thread"],
    "ubsan" => &["-fsanitize=undefined"],
    "tune" => &["-march=native"],
    "o0" => &["-O0"],
    "o1" => &["-O1"],
    "o2" => &["-O2"],
    "o3" | "fast" => &["-O3"],
    other => {
      return Err(ConfigError::UnknownMixin { id: other.to_string() });
    }
  };
  args.extend(flags.iter().map(|s| s.to_string()));
  Ok(())
}

/// `cache` prefixes the compile command with `ccache` instead of appending
/// flags; `buildplan.rs` consults this when building the rule command for a
/// tool that lists it.
pub fn prefixes_with_cache(mixins: &[String]) -> bool {
  mixins.iter().any(|m| m == "cache")
}
