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
use crate::consts;
use anyhow::Result;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Sets up the global tracing subscriber: stderr always gets a human-
/// readable layer, and `workspace/.cutekit/cutekit.log` always gets a
/// plain-text, non-ANSI copy, so a build's full trace survives even when
/// the terminal scrollback doesn't.
///
/// Log level is controlled by the `RUST_LOG` env var (e.g. `RUST_LOG=debug`).
pub fn setup_tracing(workspace: &Path) -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  let log_path = consts::project_log_file(workspace);
  if let Some(dir) = log_path.parent() {
    std::fs::create_dir_all(dir)?;
  }
  let file_appender = tracing_appender::rolling::never(
    log_path.parent().unwrap_or(Path::new(".")),
    log_path.file_name().unwrap_or_default(),
  );
  let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::registry()
    .with(env_filter)
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(fmt::layer().with_writer(non_blocking_writer).with_ansi(false))
    .init();

  Ok(guard)
}
