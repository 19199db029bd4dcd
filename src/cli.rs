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

//! The `ck` command-line interface, grounded on
//! `examples/somombo-impalab/src/cli.rs`'s `clap`-derive
//! `OrchestratorCliParser` shape, narrowed to CuteKit's four
//! externally visible operations (`spec.md` §6 "directory layout" and §1
//! "what CuteKit does").

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ck", version, about = "A meta build system & package manager")]
pub struct Cli {
  /// Workspace root. Defaults to searching the current directory and its
  /// parents for a project manifest.
  #[arg(long, global = true)]
  pub workspace: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Fetch every extern declared by the project manifest.
  Install,
  /// List every target and component the registry discovers.
  List,
  /// Generate and run the build for a target.
  Build(BuildArgs),
  /// Build, then run, a single executable component.
  Run(RunArgs),
}

#[derive(Debug, Parser)]
pub struct BuildArgs {
  /// Target id to build (see `ck list`).
  pub target: String,
  /// Restrict the build to a single component id.
  #[arg(long)]
  pub component: Option<String>,
  /// Named flag bundle to layer onto every tool invocation (see
  /// `src/mixins.rs`); may be repeated.
  #[arg(long = "mixin")]
  pub mixins: Vec<String>,
  /// `key=value` override merged into the target's props before
  /// resolution; may be repeated.
  #[arg(long = "prop")]
  pub props: Vec<String>,
}

#[derive(Debug, Parser)]
pub struct RunArgs {
  /// Target id to build against.
  pub target: String,
  /// Executable component id to run.
  pub component: String,
  /// Named flag bundle to layer onto every tool invocation (see
  /// `src/mixins.rs`); may be repeated.
  #[arg(long = "mixin")]
  pub mixins: Vec<String>,
  /// `key=value` override merged into the target's props before
  /// resolution; may be repeated.
  #[arg(long = "prop")]
  pub props: Vec<String>,
  /// Arguments forwarded to the built executable.
  #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
  pub args: Vec<String>,
}
