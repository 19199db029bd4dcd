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
use assert_cmd::cargo;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

const PROJECT_SCHEMA: &str = "https://schemas.cute.engineering/stable/cutekit.manifest.project.v1";
const TARGET_SCHEMA: &str = "https://schemas.cute.engineering/stable/cutekit.manifest.target.v1";
const COMPONENT_SCHEMA: &str = "https://schemas.cute.engineering/stable/cutekit.manifest.component.v1";

fn ck() -> Command {
  Command::new(cargo::cargo_bin!("ck"))
}

#[test]
fn list_on_a_bare_project_reports_nothing() {
  let temp = tempdir().unwrap();
  fs::write(
    temp.path().join("project.json"),
    serde_json::json!({"$schema": PROJECT_SCHEMA, "id": "bare"}).to_string(),
  )
  .unwrap();

  ck()
    .arg("--workspace")
    .arg(temp.path())
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::is_empty());
}

#[test]
fn list_reports_discovered_targets_and_components() {
  let temp = tempdir().unwrap();
  fs::write(
    temp.path().join("project.json"),
    serde_json::json!({"$schema": PROJECT_SCHEMA, "id": "demo"}).to_string(),
  )
  .unwrap();

  let targets_dir = temp.path().join("meta").join("targets");
  fs::create_dir_all(&targets_dir).unwrap();
  fs::write(
    targets_dir.join("native.json"),
    serde_json::json!({"$schema": TARGET_SCHEMA, "id": "native"}).to_string(),
  )
  .unwrap();

  let app_dir = temp.path().join("src").join("app");
  fs::create_dir_all(&app_dir).unwrap();
  fs::write(
    app_dir.join("app.json"),
    serde_json::json!({"$schema": COMPONENT_SCHEMA, "id": "app", "type": "exe"}).to_string(),
  )
  .unwrap();

  ck()
    .arg("--workspace")
    .arg(temp.path())
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("target native"))
    .stdout(predicate::str::contains("component app"));
}

#[test]
fn build_against_an_unknown_target_fails_with_not_found() {
  let temp = tempdir().unwrap();
  fs::write(
    temp.path().join("project.json"),
    serde_json::json!({"$schema": PROJECT_SCHEMA, "id": "demo"}).to_string(),
  )
  .unwrap();

  ck()
    .arg("--workspace")
    .arg(temp.path())
    .arg("build")
    .arg("bogus")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Could not find target 'bogus'"));
}

#[test]
fn install_with_no_externs_succeeds() {
  let temp = tempdir().unwrap();
  fs::write(
    temp.path().join("project.json"),
    serde_json::json!({"$schema": PROJECT_SCHEMA, "id": "demo", "extern": {}}).to_string(),
  )
  .unwrap();

  ck().arg("--workspace").arg(temp.path()).arg("install").assert().success();
}

#[test]
fn missing_project_manifest_is_a_configuration_error() {
  let temp = tempdir().unwrap();

  ck()
    .arg("--workspace")
    .arg(temp.path())
    .arg("list")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Could not find manifest").or(predicate::str::contains("project")));
}

#[test]
fn unsupported_schema_is_rejected() {
  let temp = tempdir().unwrap();
  fs::write(
    temp.path().join("project.json"),
    serde_json::json!({"$schema": "https://schemas.cute.engineering/latest/osdk.manifest.project", "id": "demo"})
      .to_string(),
  )
  .unwrap();

  ck()
    .arg("--workspace")
    .arg(temp.path())
    .arg("list")
    .assert()
    .failure()
    .stderr(predicate::str::contains("OSDK manifests are not supported"));
}
