#![allow(deprecated)]
use cucumber::{given, then};
use predicates::prelude::*;
use serde_json::Value;

use crate::SyllabusWorld;

/// Instructor used when a step does not name one.
pub const DEFAULT_USER: &str = "instructor";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run `syl` as `user` with the given args against the world's database.
/// Stores stdout, stderr, and exit code on the world.
pub fn run_syl_as(world: &mut SyllabusWorld, user: &str, args: &[&str]) {
    let db_path = world
        .db_path
        .as_ref()
        .expect("db_path not set — did you forget 'Given a syllabus database is initialized'?");

    let output = assert_cmd::Command::cargo_bin("syl")
        .expect("syl binary not found")
        .env("SYLLABUS_DB", db_path)
        .env("SYLLABUS_USER", user)
        .env_remove("SYLLABUS_LOG")
        .args(args)
        .output()
        .expect("failed to run syl");

    world.last_stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    world.last_stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    world.last_exit_code = output.status.code().unwrap_or(-1);
}

/// Run `syl` as the default instructor.
pub fn run_syl(world: &mut SyllabusWorld, args: &[&str]) {
    run_syl_as(world, DEFAULT_USER, args);
}

/// Run `syl --json ...` as `user`, assert success, and parse stdout.
pub fn run_json_as(world: &mut SyllabusWorld, user: &str, args: &[&str]) -> Value {
    let mut cmd_args: Vec<&str> = vec!["--json"];
    cmd_args.extend_from_slice(args);
    run_syl_as(world, user, &cmd_args);

    assert_eq!(
        world.last_exit_code, 0,
        "syl {} failed: {}",
        args.join(" "),
        world.last_stderr
    );
    serde_json::from_str(&world.last_stdout).unwrap_or_else(|e| {
        panic!(
            "syl {} output is not valid JSON: {e}\n{}",
            args.join(" "),
            world.last_stdout
        )
    })
}

/// Look up the ID stored under `alias`.
pub fn id_of(world: &SyllabusWorld, alias: &str) -> i64 {
    *world
        .ids
        .get(alias)
        .unwrap_or_else(|| panic!("no record with alias '{alias}'"))
}

/// Read the `id` field of a JSON object and store it under `alias`.
pub fn remember_id(world: &mut SyllabusWorld, alias: &str, json: &Value) -> i64 {
    let id = json["id"]
        .as_i64()
        .unwrap_or_else(|| panic!("JSON has no numeric 'id' field: {json}"));
    world.ids.insert(alias.to_string(), id);
    id
}

/// Split a comma-separated step argument into trimmed parts.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

/// Initialize a fresh syllabus database into the world's temp dir.
#[given("a syllabus database is initialized")]
async fn a_syllabus_database_is_initialized(world: &mut SyllabusWorld) {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let db_path = dir.path().join("syllabus.db");

    let output = assert_cmd::Command::cargo_bin("syl")
        .expect("syl binary not found")
        .env("SYLLABUS_DB", &db_path)
        .arg("init")
        .output()
        .expect("failed to run syl init");

    assert!(
        output.status.success(),
        "syl init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    world.db_path = Some(db_path);
    // Keep the TempDir alive for the lifetime of the scenario.
    world.db_dir = Some(dir);
}

#[given(expr = "a subject {string} with slug {string}")]
async fn a_subject_with_slug(world: &mut SyllabusWorld, title: String, slug: String) {
    run_json_as(world, DEFAULT_USER, &["subject", "add", &title, "--slug", &slug]);
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the command succeeds")]
async fn the_command_succeeds(world: &mut SyllabusWorld) {
    assert_eq!(
        world.last_exit_code, 0,
        "expected success but got exit {}: {}",
        world.last_exit_code, world.last_stderr
    );
}

#[then(expr = "the command fails with {string}")]
async fn the_command_fails_with(world: &mut SyllabusWorld, expected: String) {
    assert_ne!(
        world.last_exit_code, 0,
        "expected failure but command succeeded: {}",
        world.last_stdout
    );
    assert!(
        predicate::str::contains(expected.as_str()).eval(world.last_stderr.as_str()),
        "expected stderr to contain {expected:?}, got: {}",
        world.last_stderr
    );
}

#[then(expr = "the output contains {string}")]
async fn the_output_contains(world: &mut SyllabusWorld, expected: String) {
    assert!(
        predicate::str::contains(expected.as_str()).eval(world.last_stdout.as_str()),
        "expected stdout to contain {expected:?}, got:\n{}",
        world.last_stdout
    );
}
