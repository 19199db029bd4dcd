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

//! # CuteKit
//!
//! `cutekit` is a meta-build system and package manager for low-level C/C++
//! projects: it reads a tree of JSON/TOML manifests, expands the small
//! embedded expression language they may contain, resolves each build
//! target's dependency graph, and emits a Ninja build-runner input file.
//!
//! ## Core modules
//!
//! * [`jexpr`]: the restricted expression/macro language manifests may embed.
//! * [`model`]: the manifest data model (`Project`/`Target`/`Component`/...).
//! * [`loader`]: reads a manifest file into a plain tree before expansion.
//! * [`compat`]: `$schema` dispatch and legacy-manifest rejection.
//! * [`registry`]: workspace discovery and manifest aggregation.
//! * [`resolver`]: per-target dependency resolution.
//! * [`rules`] / [`mixins`]: the fixed compile/link rule set and flag bundles.
//! * [`ninja`]: a writer for the Ninja build-runner input file format.
//! * [`buildplan`]: turns a resolved target into a Ninja file and runs it.
//! * [`shell`]: synchronous process and filesystem helpers.
//! * [`hostid`]: a host-stable identifier used to namespace build output.
//! * [`consts`]: well-known workspace paths.
//! * [`cli`]: the `clap`-based command-line interface.
//! * [`error`]: the custom error types for the library.
//! * [`logging`]: the `setup_tracing` utility.

pub mod buildplan;
pub mod cli;
pub mod compat;
pub mod consts;
pub mod error;
pub mod hostid;
pub mod jexpr;
pub mod loader;
pub mod logging;
pub mod mixins;
pub mod model;
pub mod ninja;
pub mod registry;
pub mod resolver;
pub mod rules;
pub mod shell;
