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

//! Per-target dependency resolution (`spec.md` §4.4 "Resolver"), grounded on
//! `original_source/cutekit/model.py::Resolver.resolve` for the
//! enable/bake/inject sequence and on
//! `examples/other_examples/4151bef5_arncore-konvoy__crates-konvoy-engine-src-resolve.rs.rs`
//! for the explicit-stack DFS cycle-detection idiom and test style.

use crate::error::ResolutionError;
use crate::model::{Component, Resolved, Scalar, Target};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// All resolution outcomes for one target, keyed by component id.
#[derive(Debug)]
pub struct ResolvedGraph {
  pub target_id: String,
  pub resolved: BTreeMap<String, Resolved>,
}

impl ResolvedGraph {
  pub fn get(&self, id: &str) -> Option<&Resolved> {
    self.resolved.get(id)
  }
}

pub fn resolve(
  target: &Target,
  components: &BTreeMap<String, Component>,
) -> Result<ResolvedGraph, ResolutionError> {
  let mut resolved: BTreeMap<String, Resolved> = BTreeMap::new();

  for (id, component) in components {
    let mut r = Resolved::default();
    match disabled_reason(component, &target.props) {
      Some(reason) => {
        r.enabled = false;
        r.disable_reason = Some(reason);
      }
      None => r.enabled = true,
    }
    resolved.insert(id.clone(), r);
  }

  let providers = build_providers(components, &resolved);

  for (id, component) in components {
    if !resolved[id].enabled {
      continue;
    }
    for req in &component.requires {
      let provider = pick_provider(req, target, &providers)?;
      resolved.get_mut(id).expect("just inserted above").provides.insert(req.clone(), provider);
    }
  }

  for id in components.keys() {
    if !resolved[id].enabled {
      continue;
    }
    let mut stack = Vec::new();
    let mut on_stack = HashSet::new();
    detect_cycle(id, &resolved, &mut stack, &mut on_stack)?;
  }

  // `injects` names a victim spec, not something the injector itself
  // requires: the injector attaches itself onto whoever provides that
  // spec, the way a plugin registers itself with the thing it extends
  // rather than the other way around.
  for (id, component) in components {
    if !resolved[id].enabled {
      continue;
    }
    for inject in &component.injects {
      let victim = pick_provider(inject, target, &providers)?;
      resolved.get_mut(&victim).expect("provider must be a known component").injected.push(id.clone());
    }
  }

  let ids: Vec<String> = resolved.keys().cloned().collect();
  for id in ids {
    if !resolved[&id].enabled {
      continue;
    }
    let mut required = BTreeSet::new();
    let mut stack = vec![id.clone()];
    let mut seen = HashSet::new();
    while let Some(cur) = stack.pop() {
      if !seen.insert(cur.clone()) {
        continue;
      }
      if let Some(r) = resolved.get(&cur) {
        for dep in r.provides.values().chain(r.injected.iter()) {
          if required.insert(dep.clone()) {
            stack.push(dep.clone());
          }
        }
      }
    }
    resolved.get_mut(&id).expect("just inserted above").required = required;
  }

  Ok(ResolvedGraph {
    target_id: target.id.clone(),
    resolved,
  })
}

/// A component fails its `enableIf` if any listed prop's resolved target
/// value is not among the allowed scalars. The two failure shapes get
/// distinct wording: a prop that's entirely absent from the target versus
/// one that's present but holds a disallowed value.
fn disabled_reason(component: &Component, props: &BTreeMap<String, Scalar>) -> Option<String> {
  for (key, allowed) in &component.enable_if {
    match props.get(key) {
      None => return Some(format!("Missing props '{key}' in target")),
      Some(actual) if !allowed.contains(actual) => {
        let allowed_str = allowed.iter().map(scalar_py_repr).collect::<Vec<_>>().join(", ");
        return Some(format!(
          "Props missmatch for '{key}': Got '{got}' but expected [{allowed_str}]",
          got = scalar_py_str(actual),
        ));
      }
      Some(_) => {}
    }
  }
  None
}

/// Renders a scalar the way Python's `str()` would, for the "Got" half of
/// the mismatch message.
fn scalar_py_str(v: &Scalar) -> String {
  match v {
    Scalar::Bool(true) => "True".to_string(),
    Scalar::Bool(false) => "False".to_string(),
    Scalar::Int(n) => n.to_string(),
    Scalar::Str(s) => s.clone(),
  }
}

/// Renders a scalar the way Python's `repr()` would inside a list literal,
/// for the "expected" half of the mismatch message — strings quoted,
/// bools/ints bare.
fn scalar_py_repr(v: &Scalar) -> String {
  match v {
    Scalar::Str(s) => format!("'{s}'"),
    other => scalar_py_str(other),
  }
}

/// `requirement spec -> sorted, deduplicated list of enabled providers`. A
/// component always provides its own id in addition to whatever it lists
/// under `provides`.
fn build_providers(
  components: &BTreeMap<String, Component>,
  resolved: &BTreeMap<String, Resolved>,
) -> BTreeMap<String, Vec<String>> {
  let mut providers: BTreeMap<String, Vec<String>> = BTreeMap::new();
  for (id, component) in components {
    if !resolved[id].enabled {
      continue;
    }
    providers.entry(id.clone()).or_default().push(id.clone());
    for provided in &component.provides {
      providers.entry(provided.clone()).or_default().push(id.clone());
    }
  }
  for ids in providers.values_mut() {
    ids.sort();
    ids.dedup();
  }
  providers
}

fn pick_provider(
  spec: &str,
  target: &Target,
  providers: &BTreeMap<String, Vec<String>>,
) -> Result<String, ResolutionError> {
  if let Some(pinned) = target.routing.get(spec) {
    return Ok(pinned.clone());
  }
  match providers.get(spec).map(Vec::as_slice).unwrap_or(&[]) {
    [] => Err(ResolutionError::NoProvider { spec: spec.to_string() }),
    [one] => Ok(one.clone()),
    many => Err(ResolutionError::MultipleProviders {
      spec: spec.to_string(),
      ids: many.join(", "),
    }),
  }
}

fn detect_cycle(
  id: &str,
  resolved: &BTreeMap<String, Resolved>,
  stack: &mut Vec<String>,
  on_stack: &mut HashSet<String>,
) -> Result<(), ResolutionError> {
  if on_stack.contains(id) {
    return Err(ResolutionError::DependencyLoop {
      what: stack.first().cloned().unwrap_or_else(|| id.to_string()),
      stack: stack.join(" -> "),
      keep: id.to_string(),
    });
  }

  stack.push(id.to_string());
  on_stack.insert(id.to_string());

  if let Some(r) = resolved.get(id) {
    for provider in r.provides.values() {
      detect_cycle(provider, resolved, stack, on_stack)?;
    }
  }

  stack.pop();
  on_stack.remove(id);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::ComponentKind;

  fn comp(id: &str) -> Component {
    Component {
      id: id.to_string(),
      description: String::new(),
      kind: ComponentKind::Lib,
      requires: Vec::new(),
      provides: Vec::new(),
      enable_if: BTreeMap::new(),
      props: BTreeMap::new(),
      injects: Vec::new(),
      cpp_excluded: false,
      path: Default::default(),
    }
  }

  fn target() -> Target {
    Target {
      id: "native".into(),
      description: String::new(),
      props: BTreeMap::new(),
      tools: BTreeMap::new(),
      routing: BTreeMap::new(),
      host: false,
      path: Default::default(),
    }
  }

  #[test]
  fn no_dependencies_resolves_trivially() {
    let mut components = BTreeMap::new();
    components.insert("a".into(), comp("a"));
    let graph = resolve(&target(), &components).unwrap();
    assert!(graph.get("a").unwrap().enabled);
    assert!(graph.get("a").unwrap().provides.is_empty());
  }

  #[test]
  fn single_dependency_resolves_to_sole_provider() {
    let mut components = BTreeMap::new();
    let mut a = comp("a");
    a.requires.push("b".into());
    components.insert("a".into(), a);
    components.insert("b".into(), comp("b"));
    let graph = resolve(&target(), &components).unwrap();
    assert_eq!(graph.get("a").unwrap().provides.get("b"), Some(&"b".to_string()));
  }

  #[test]
  fn diamond_dependency_deduplicates_to_one_provider() {
    let mut components = BTreeMap::new();
    let mut top = comp("top");
    top.requires.push("left".into());
    top.requires.push("right".into());
    let mut left = comp("left");
    left.requires.push("base".into());
    let mut right = comp("right");
    right.requires.push("base".into());
    components.insert("top".into(), top);
    components.insert("left".into(), left);
    components.insert("right".into(), right);
    components.insert("base".into(), comp("base"));

    let graph = resolve(&target(), &components).unwrap();
    assert_eq!(graph.get("left").unwrap().provides.get("base"), Some(&"base".to_string()));
    assert_eq!(graph.get("right").unwrap().provides.get("base"), Some(&"base".to_string()));
  }

  #[test]
  fn missing_provider_is_an_error() {
    let mut components = BTreeMap::new();
    let mut a = comp("a");
    a.requires.push("missing".into());
    components.insert("a".into(), a);
    let err = resolve(&target(), &components).unwrap_err();
    assert!(matches!(err, ResolutionError::NoProvider { spec } if spec == "missing"));
  }

  #[test]
  fn ambiguous_providers_is_an_error() {
    let mut components = BTreeMap::new();
    let mut a = comp("a");
    a.requires.push("iface".into());
    let mut b1 = comp("b1");
    b1.provides.push("iface".into());
    let mut b2 = comp("b2");
    b2.provides.push("iface".into());
    components.insert("a".into(), a);
    components.insert("b1".into(), b1);
    components.insert("b2".into(), b2);
    let err = resolve(&target(), &components).unwrap_err();
    match err {
      ResolutionError::MultipleProviders { spec, ids } => {
        assert_eq!(spec, "iface");
        assert_eq!(ids, "b1, b2");
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn routing_override_pins_an_explicit_provider() {
    let mut components = BTreeMap::new();
    let mut a = comp("a");
    a.requires.push("iface".into());
    let mut b1 = comp("b1");
    b1.provides.push("iface".into());
    let mut b2 = comp("b2");
    b2.provides.push("iface".into());
    components.insert("a".into(), a);
    components.insert("b1".into(), b1);
    components.insert("b2".into(), b2);

    let mut t = target();
    t.routing.insert("iface".into(), "b2".into());
    let graph = resolve(&t, &components).unwrap();
    assert_eq!(graph.get("a").unwrap().provides.get("iface"), Some(&"b2".to_string()));
  }

  #[test]
  fn dependency_cycle_is_detected() {
    let mut components = BTreeMap::new();
    let mut a = comp("a");
    a.requires.push("b".into());
    let mut b = comp("b");
    b.requires.push("a".into());
    components.insert("a".into(), a);
    components.insert("b".into(), b);
    let err = resolve(&target(), &components).unwrap_err();
    assert!(matches!(err, ResolutionError::DependencyLoop { .. }));
  }

  #[test]
  fn disabled_component_is_skipped_by_provider_resolution() {
    let mut components = BTreeMap::new();
    let mut disabled = comp("disabled");
    disabled.provides.push("iface".into());
    disabled.enable_if.insert("freestanding".into(), vec![Scalar::Bool(true)]);
    let mut enabled = comp("enabled");
    enabled.provides.push("iface".into());
    let mut user = comp("user");
    user.requires.push("iface".into());
    components.insert("disabled".into(), disabled);
    components.insert("enabled".into(), enabled);
    components.insert("user".into(), user);

    let mut t = target();
    t.props.insert("freestanding".into(), Scalar::Bool(false));
    let graph = resolve(&t, &components).unwrap();
    assert!(!graph.get("disabled").unwrap().enabled);
    assert_eq!(graph.get("user").unwrap().provides.get("iface"), Some(&"enabled".to_string()));
  }

  #[test]
  fn injects_attach_the_injector_to_the_victim_it_names() {
    let mut components = BTreeMap::new();
    let mut plugin = comp("plugin");
    plugin.injects.push("host".into());
    components.insert("plugin".into(), plugin);
    components.insert("host".into(), comp("host"));
    let graph = resolve(&target(), &components).unwrap();
    assert_eq!(graph.get("host").unwrap().injected, vec!["plugin".to_string()]);
    assert!(graph.get("plugin").unwrap().injected.is_empty());
    assert!(graph.get("host").unwrap().required.contains("plugin"));
  }

  #[test]
  fn required_is_the_transitive_closure_of_provides() {
    let mut components = BTreeMap::new();
    let mut top = comp("top");
    top.requires.push("mid".into());
    let mut mid = comp("mid");
    mid.requires.push("base".into());
    components.insert("top".into(), top);
    components.insert("mid".into(), mid);
    components.insert("base".into(), comp("base"));
    let graph = resolve(&target(), &components).unwrap();
    let required = &graph.get("top").unwrap().required;
    assert!(required.contains("mid"));
    assert!(required.contains("base"));
  }

  #[test]
  fn missing_prop_produces_a_distinct_message_from_a_mismatched_one() {
    let mut components = BTreeMap::new();
    let mut missing = comp("missing");
    missing.enable_if.insert("freestanding".into(), vec![Scalar::Bool(true)]);
    let mut mismatched = comp("mismatched");
    mismatched.enable_if.insert("arch".into(), vec![Scalar::Str("arm".into())]);
    components.insert("missing".into(), missing);
    components.insert("mismatched".into(), mismatched);

    let mut t = target();
    t.props.insert("arch".into(), Scalar::Str("x86".into()));
    let graph = resolve(&t, &components).unwrap();

    assert_eq!(
      graph.get("missing").unwrap().disable_reason.as_deref(),
      Some("Missing props 'freestanding' in target")
    );
    assert_eq!(
      graph.get("mismatched").unwrap().disable_reason.as_deref(),
      Some("Props missmatch for 'arch': Got 'x86' but expected ['arm']")
    );
  }
}
