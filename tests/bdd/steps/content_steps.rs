use cucumber::{given, then, when};
use serde_json::Value;

use super::common_steps::{DEFAULT_USER, id_of, remember_id, run_json_as, run_syl, run_syl_as};
use super::module_steps::alias_moves;
use crate::SyllabusWorld;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Add a content item through the CLI and remember both the content row and
/// the item behind it under `alias`.
fn add_content(
    world: &mut SyllabusWorld,
    kind: &str,
    title: &str,
    value: &str,
    module: &str,
    alias: &str,
) {
    let module_id = id_of(world, module).to_string();
    let json = run_json_as(
        world,
        DEFAULT_USER,
        &["content", "add", &module_id, kind, title, value],
    );
    remember_content(world, alias, &json);
}

/// Store the content id and the `(type, object id)` of a content detail.
pub fn remember_content(world: &mut SyllabusWorld, alias: &str, json: &Value) {
    remember_id(world, alias, json);
    let kind = json["content_type"]
        .as_str()
        .unwrap_or_else(|| panic!("content has no content_type: {json}"))
        .to_string();
    let object_id = json["object_id"]
        .as_i64()
        .unwrap_or_else(|| panic!("content has no object_id: {json}"));
    world.items.insert(alias.to_string(), (kind, object_id));
}

fn content_titles(world: &mut SyllabusWorld, module: &str) -> Vec<String> {
    let module_id = id_of(world, module).to_string();
    let json = run_json_as(world, DEFAULT_USER, &["content", "list", &module_id]);
    json.as_array()
        .unwrap_or_else(|| panic!("expected a JSON array, got: {json}"))
        .iter()
        .map(|c| c["item"]["title"].as_str().unwrap_or("<missing>").to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given(expr = "a {word} content {string} with value {string} in module {string} as {string}")]
async fn a_content_in_module(
    world: &mut SyllabusWorld,
    kind: String,
    title: String,
    value: String,
    module: String,
    alias: String,
) {
    add_content(world, &kind, &title, &value, &module, &alias);
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when(expr = "I add a {word} content {string} with value {string} to module {string} as {string}")]
async fn i_add_a_content(
    world: &mut SyllabusWorld,
    kind: String,
    title: String,
    value: String,
    module: String,
    alias: String,
) {
    add_content(world, &kind, &title, &value, &module, &alias);
}

#[when(expr = "I try to add a {word} content {string} with value {string} to module {string}")]
async fn i_try_to_add_a_content(
    world: &mut SyllabusWorld,
    kind: String,
    title: String,
    value: String,
    module: String,
) {
    let module_id = id_of(world, &module).to_string();
    run_syl(world, &["content", "add", &module_id, &kind, &title, &value]);
}

#[when(expr = "{string} shows content {string}")]
async fn user_shows_content(world: &mut SyllabusWorld, user: String, alias: String) {
    let id = id_of(world, &alias).to_string();
    run_syl_as(world, &user, &["content", "show", &id]);
}

#[when(expr = "I set the value of content {string} to {string}")]
async fn i_set_content_value(world: &mut SyllabusWorld, alias: String, value: String) {
    let id = id_of(world, &alias).to_string();
    run_syl(world, &["content", "update", &id, "--value", &value]);
}

#[when(expr = "I delete content {string}")]
async fn i_delete_content(world: &mut SyllabusWorld, alias: String) {
    let id = id_of(world, &alias).to_string();
    run_syl(world, &["content", "delete", &id]);
}

#[when(expr = "I reorder the contents of module {string} with {string}")]
async fn i_reorder_contents(world: &mut SyllabusWorld, module: String, moves: String) {
    let module_id = id_of(world, &module).to_string();
    let pairs = alias_moves(world, &moves);
    let mut args = vec!["content", "order", module_id.as_str()];
    args.extend(pairs.iter().map(String::as_str));
    run_syl(world, &args);
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then(expr = "the contents of module {string} are {string}")]
async fn the_contents_of_module_are(world: &mut SyllabusWorld, module: String, expected: String) {
    assert_eq!(content_titles(world, &module).join(", "), expected);
}

#[then(expr = "content {string} has order {int}")]
async fn content_has_order(world: &mut SyllabusWorld, alias: String, expected: i64) {
    let id = id_of(world, &alias).to_string();
    let json = run_json_as(world, DEFAULT_USER, &["content", "show", &id]);
    assert_eq!(json["order"].as_i64(), Some(expected), "{json}");
}

#[then(expr = "content {string} is a {word} with {word} {string}")]
async fn content_is_a_kind_with(
    world: &mut SyllabusWorld,
    alias: String,
    kind: String,
    field: String,
    expected: String,
) {
    let id = id_of(world, &alias).to_string();
    let json = run_json_as(world, DEFAULT_USER, &["content", "show", &id]);
    assert_eq!(json["content_type"].as_str(), Some(kind.as_str()), "{json}");
    assert_eq!(json["item"]["type"].as_str(), Some(kind.as_str()), "{json}");
    assert_eq!(json["item"][&field].as_str(), Some(expected.as_str()), "{json}");
}

#[then(expr = "the item behind content {string} is gone")]
async fn the_item_behind_content_is_gone(world: &mut SyllabusWorld, alias: String) {
    let (kind, object_id) = world
        .items
        .get(&alias)
        .cloned()
        .unwrap_or_else(|| panic!("no item recorded for content '{alias}'"));
    let kind = syllabus::models::ItemKind::from_str(&kind).expect("registered kind");
    let db_path = world.db_path.as_ref().expect("db_path not set");
    let db = syllabus::db::Database::open(db_path).expect("open database");
    let item = db.get_item(kind, object_id).expect("query item");
    assert!(item.is_none(), "item behind {alias} still exists: {item:?}");
}

#[then(expr = "the item behind content {string} still exists")]
async fn the_item_behind_content_still_exists(world: &mut SyllabusWorld, alias: String) {
    let (kind, object_id) = world
        .items
        .get(&alias)
        .cloned()
        .unwrap_or_else(|| panic!("no item recorded for content '{alias}'"));
    let kind = syllabus::models::ItemKind::from_str(&kind).expect("registered kind");
    let db_path = world.db_path.as_ref().expect("db_path not set");
    let db = syllabus::db::Database::open(db_path).expect("open database");
    let item = db.get_item(kind, object_id).expect("query item");
    assert!(item.is_some(), "item behind {alias} is missing");
}
