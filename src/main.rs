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
use clap::Parser;
use cutekit::buildplan::{self, TargetScope};
use cutekit::cli::{Cli, Commands};
use cutekit::error::{ConfigError, CuteKitError};
use cutekit::logging;
use cutekit::model::{Scalar, Target};
use cutekit::registry::{self, Registry};
use cutekit::resolver;
use cutekit::shell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
  let cli = Cli::parse();

  let workspace = match locate_workspace(cli.workspace.clone()) {
    Ok(w) => w,
    Err(e) => {
      eprintln!("error: {e}");
      return ExitCode::FAILURE;
    }
  };

  let _guard = match logging::setup_tracing(&workspace) {
    Ok(g) => g,
    Err(e) => {
      eprintln!("error: failed to set up logging: {e}");
      return ExitCode::FAILURE;
    }
  };

  match run(&workspace, cli.command) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      tracing::error!("{err}");
      eprintln!("error: {err}");
      ExitCode::FAILURE
    }
  }
}

fn locate_workspace(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
  match explicit {
    Some(w) => Ok(w),
    None => {
      let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
      registry::topmost(&cwd)
    }
  }
}

fn run(workspace: &Path, command: Commands) -> Result<(), CuteKitError> {
  match command {
    Commands::Install => {
      let registry = Registry::load(workspace)?;
      tracing::info!(count = registry.project.externs.len(), "externs fetched");
      Ok(())
    }
    Commands::List => {
      let registry = Registry::load(workspace)?;
      for id in registry.targets.keys() {
        println!("target {id}");
      }
      for id in registry.components.keys() {
        println!("component {id}");
      }
      Ok(())
    }
    Commands::Build(args) => {
      let registry = Registry::load(workspace)?;
      let target = resolved_target(&registry, &args.target, &args.props)?;
      let graph = resolver::resolve(&target, &registry.components)?;
      let scope = TargetScope::new(workspace, &target, &registry.components, &graph, &args.mixins);
      buildplan::build(&scope, args.component.as_deref())?;
      Ok(())
    }
    Commands::Run(args) => {
      let registry = Registry::load(workspace)?;
      let target = resolved_target(&registry, &args.target, &args.props)?;
      let graph = resolver::resolve(&target, &registry.components)?;
      let scope = TargetScope::new(workspace, &target, &registry.components, &graph, &args.mixins);
      buildplan::build(&scope, Some(&args.component))?;

      let binary = scope.builddir().join("bin").join(&args.component);
      let binary_str = binary.to_string_lossy().into_owned();
      let forwarded: Vec<&str> = args.args.iter().map(String::as_str).collect();
      shell::run(&binary_str, &forwarded)?;
      Ok(())
    }
  }
}

/// Look up `id` and apply any `--prop key=value` overrides on top of its
/// manifest props, returning an owned `Target` since the override is
/// per-invocation, not a mutation of the registry's own copy.
fn resolved_target(registry: &Registry, id: &str, prop_overrides: &[String]) -> Result<Target, ConfigError> {
  let mut target = find_target(registry, id)?.clone();
  for spec in prop_overrides {
    let (key, value) = parse_prop(spec)?;
    target.props.insert(key, value);
  }
  Ok(target)
}

fn parse_prop(spec: &str) -> Result<(String, Scalar), ConfigError> {
  let (key, value) = spec.split_once('=').ok_or_else(|| ConfigError::InvalidProp { spec: spec.to_string() })?;
  if key.is_empty() {
    return Err(ConfigError::InvalidProp { spec: spec.to_string() });
  }
  let scalar = match value {
    "true" => Scalar::Bool(true),
    "false" => Scalar::Bool(false),
    _ => match value.parse::<i64>() {
      Ok(n) => Scalar::Int(n),
      Err(_) => Scalar::Str(value.to_string()),
    },
  };
  Ok((key.to_string(), scalar))
}

fn find_target<'a>(registry: &'a Registry, id: &str) -> Result<&'a cutekit::model::Target, ConfigError> {
  registry.targets.get(id).ok_or_else(|| ConfigError::NotFound {
    kind: "target",
    id: id.to_string(),
  })
}
