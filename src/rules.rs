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

//! The fixed compile/link rule set (`spec.md` §4.5), grounded on
//! `original_source/cutekit/rules.py`. Every target shares the same six
//! rules; only the tool binaries and flags they invoke (`Target::tools`)
//! vary.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub struct Rule {
  /// Suffix globs a source file must match to be routed through this rule.
  pub file_in: &'static [&'static str],
  /// The tool key (`Target::tools`) this rule's command is built from.
  pub tool: &'static str,
  /// Ninja command template; `$tool`, `$in`, `$out`, `$flags` are
  /// substituted by `src/buildplan.rs`.
  pub command: &'static str,
  /// Whether this rule emits a `.d` depfile alongside its output.
  pub depfile: bool,
}

pub fn rules() -> BTreeMap<&'static str, Rule> {
  let mut m = BTreeMap::new();
  m.insert(
    "cp",
    Rule {
      file_in: &["*"],
      tool: "cp",
      command: "cp $in $out",
      depfile: false,
    },
  );
  m.insert(
    "cc",
    Rule {
      file_in: &["*.c"],
      tool: "cc",
      command: "$tool -c $in -o $out $flags -MMD -MF $out.d",
      depfile: true,
    },
  );
  m.insert(
    "cxx",
    Rule {
      file_in: &["*.cpp", "*.cc", "*.cxx"],
      tool: "cxx",
      command: "$tool -c $in -o $out $flags -MMD -MF $out.d",
      depfile: true,
    },
  );
  m.insert(
    "as",
    Rule {
      file_in: &["*.s", "*.S"],
      tool: "as",
      command: "$tool $in -o $out $flags",
      depfile: false,
    },
  );
  m.insert(
    "ar",
    Rule {
      file_in: &["*.o"],
      tool: "ar",
      command: "$tool rcs $out $in",
      depfile: false,
    },
  );
  m.insert(
    "ld",
    Rule {
      file_in: &["*.o"],
      tool: "ld",
      command: "$tool $in -o $out $flags",
      depfile: false,
    },
  );
  m
}

/// Pick the rule that consumes a source file with this name, if any.
pub fn rule_for_file(name: &str) -> Option<(String, Rule)> {
  for (key, rule) in rules() {
    if key == "ar" || key == "ld" {
      continue;
    }
    if rule.file_in.iter().any(|pat| suffix_matches(pat, name)) {
      return Some((key.to_string(), rule));
    }
  }
  None
}

fn suffix_matches(pattern: &str, name: &str) -> bool {
  match pattern.strip_prefix('*') {
    Some(suffix) if suffix.is_empty() => true,
    Some(suffix) => name.ends_with(suffix),
    None => name == pattern,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn c_files_route_through_cc() {
    let (name, _) = rule_for_file("main.c").unwrap();
    assert_eq!(name, "cc");
  }

  #[test]
  fn cpp_files_route_through_cxx() {
    for name in ["a.cpp", "a.cc", "a.cxx"] {
      assert_eq!(rule_for_file(name).unwrap().0, "cxx");
    }
  }

  #[test]
  fn unrecognized_extension_has_no_compile_rule() {
    assert!(rule_for_file("readme.md").is_none());
  }
}
