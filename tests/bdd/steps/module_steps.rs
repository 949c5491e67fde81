use cucumber::{given, then, when};
use serde_json::Value;

use super::common_steps::{
    DEFAULT_USER, id_of, remember_id, run_json_as, run_syl, run_syl_as, split_list,
};
use crate::SyllabusWorld;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Turn `alias=order, alias=order` into `id=order` command-line pairs.
pub fn alias_moves(world: &SyllabusWorld, moves: &str) -> Vec<String> {
    split_list(moves)
        .into_iter()
        .map(|pair| {
            let (alias, order) = pair
                .split_once('=')
                .unwrap_or_else(|| panic!("expected alias=order, got {pair:?}"));
            format!("{}={}", id_of(world, alias.trim()), order.trim())
        })
        .collect()
}

fn module_list(world: &mut SyllabusWorld, course_alias: &str) -> Vec<Value> {
    let id = id_of(world, course_alias).to_string();
    let json = run_json_as(world, DEFAULT_USER, &["module", "list", &id]);
    json.as_array()
        .unwrap_or_else(|| panic!("expected a JSON array, got: {json}"))
        .clone()
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given(expr = "a module {string} in course {string} as {string}")]
async fn a_module_in_course(
    world: &mut SyllabusWorld,
    title: String,
    course: String,
    alias: String,
) {
    let course_id = id_of(world, &course).to_string();
    let json = run_json_as(world, DEFAULT_USER, &["module", "add", &course_id, &title]);
    remember_id(world, &alias, &json);
}

#[given(expr = "modules {string} in course {string}")]
async fn modules_in_course(world: &mut SyllabusWorld, aliases: String, course: String) {
    let course_id = id_of(world, &course).to_string();
    for alias in split_list(&aliases) {
        let json = run_json_as(world, DEFAULT_USER, &["module", "add", &course_id, &alias]);
        remember_id(world, &alias, &json);
    }
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when(expr = "I add module {string} to course {string} as {string}")]
async fn i_add_module(world: &mut SyllabusWorld, title: String, course: String, alias: String) {
    let course_id = id_of(world, &course).to_string();
    let json = run_json_as(world, DEFAULT_USER, &["module", "add", &course_id, &title]);
    remember_id(world, &alias, &json);
}

#[when(expr = "I add module {string} to course {string} at order {int} as {string}")]
async fn i_add_module_at_order(
    world: &mut SyllabusWorld,
    title: String,
    course: String,
    order: i64,
    alias: String,
) {
    let course_id = id_of(world, &course).to_string();
    let order = order.to_string();
    let json = run_json_as(
        world,
        DEFAULT_USER,
        &["module", "add", &course_id, &title, "--order", &order],
    );
    remember_id(world, &alias, &json);
}

#[when(expr = "{string} adds module {string} to course {string}")]
async fn user_adds_module(world: &mut SyllabusWorld, user: String, title: String, course: String) {
    let course_id = id_of(world, &course).to_string();
    run_syl_as(world, &user, &["module", "add", &course_id, &title]);
}

#[when(expr = "I delete module {string}")]
async fn i_delete_module(world: &mut SyllabusWorld, alias: String) {
    let id = id_of(world, &alias).to_string();
    run_syl(world, &["module", "delete", &id]);
}

#[when(expr = "I reorder the modules of course {string} with {string}")]
async fn i_reorder_modules(world: &mut SyllabusWorld, course: String, moves: String) {
    let course_id = id_of(world, &course).to_string();
    let pairs = alias_moves(world, &moves);
    let mut args = vec!["module", "order", course_id.as_str()];
    args.extend(pairs.iter().map(String::as_str));
    run_syl(world, &args);
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then(expr = "the modules of course {string} are {string}")]
async fn the_modules_of_course_are(world: &mut SyllabusWorld, course: String, expected: String) {
    let titles: Vec<String> = module_list(world, &course)
        .iter()
        .map(|m| m["title"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(titles.join(", "), expected);
}

#[then(expr = "the module orders of course {string} are {string}")]
async fn the_module_orders_are(world: &mut SyllabusWorld, course: String, expected: String) {
    let orders: Vec<String> = module_list(world, &course)
        .iter()
        .map(|m| m["order"].as_i64().unwrap_or(-1).to_string())
        .collect();
    assert_eq!(orders.join(", "), expected);
}

#[then(expr = "module {string} has order {int}")]
async fn module_has_order(world: &mut SyllabusWorld, alias: String, expected: i64) {
    let id = id_of(world, &alias);
    let db_path = world.db_path.as_ref().expect("db_path not set");
    let db = syllabus::db::Database::open(db_path).expect("open database");
    let module = db
        .get_module(id)
        .expect("query module")
        .unwrap_or_else(|| panic!("module {alias} not found"));
    assert_eq!(module.order, expected, "module {alias}");
}
