use cucumber::{given, then, when};
use serde_json::Value;

use super::web_steps::{expand_aliases, http_send};
use crate::SyllabusWorld;

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Parse the last response body as JSON, panicking with a descriptive message
/// if it is not valid JSON.
fn parse_last_response(world: &SyllabusWorld) -> Value {
    let body = world
        .last_response_body
        .as_deref()
        .expect("no HTTP response body recorded");
    serde_json::from_str(body)
        .unwrap_or_else(|e| panic!("response body is not valid JSON: {e}\nbody: {body}"))
}

/// Expand aliases in `body` and parse it as JSON.
fn json_body(world: &SyllabusWorld, body: &str) -> Value {
    let body = expand_aliases(world, body);
    serde_json::from_str(&body)
        .unwrap_or_else(|e| panic!("step body is not valid JSON: {e}\n{body}"))
}

/// Walk a dotted path such as `modules.0.contents.1.item.title`.
fn lookup<'a>(json: &'a Value, path: &str) -> &'a Value {
    path.split('.').fold(json, |node, key| match key.parse::<usize>() {
        Ok(i) if node.is_array() => &node[i],
        _ => &node[key],
    })
}

fn list_field(json: &Value, field: &str) -> Vec<String> {
    json.as_array()
        .unwrap_or_else(|| panic!("expected a JSON array, got: {json}"))
        .iter()
        .map(|entry| match lookup(entry, field) {
            Value::String(s) => s.clone(),
            Value::Null => "<null>".to_string(),
            other => other.to_string(),
        })
        .collect()
}

async fn send_json(world: &mut SyllabusWorld, method: reqwest::Method, path: &str, body: &str) {
    let path = expand_aliases(world, path);
    let body = json_body(world, body);
    http_send(world, method, &path, Some(body)).await;
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when(expr = "I POST {string} with {string}")]
async fn i_post(world: &mut SyllabusWorld, path: String, body: String) {
    send_json(world, reqwest::Method::POST, &path, &body).await;
}

#[when(expr = "I PATCH {string} with {string}")]
async fn i_patch(world: &mut SyllabusWorld, path: String, body: String) {
    send_json(world, reqwest::Method::PATCH, &path, &body).await;
}

#[when(expr = "I PUT {string} with {string}")]
async fn i_put(world: &mut SyllabusWorld, path: String, body: String) {
    send_json(world, reqwest::Method::PUT, &path, &body).await;
}

/// POST `body` verbatim as `application/json`, even when it does not parse.
#[when(expr = "I POST {string} with raw body {string}")]
async fn i_post_raw(world: &mut SyllabusWorld, path: String, body: String) {
    let port = world.server_port.expect("server not started");
    let path = expand_aliases(world, &path);
    let url = format!("http://127.0.0.1:{port}{path}");
    let mut req = world
        .http_client
        .post(&url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body);
    if let Some(user) = &world.acting_user {
        req = req.header("X-User", user);
    }
    let resp = req
        .send()
        .await
        .unwrap_or_else(|e| panic!("POST {url} failed: {e}"));
    world.last_response_status = Some(resp.status().as_u16());
    world.last_response_content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    world.last_response_body = Some(resp.text().await.unwrap_or_default());
}

#[when(expr = "I DELETE {string}")]
async fn i_delete(world: &mut SyllabusWorld, path: String) {
    let path = expand_aliases(world, &path);
    http_send(world, reqwest::Method::DELETE, &path, None).await;
}

/// POST a JSON body that must succeed with 201, remembering the new ID.
async fn create_via_api(world: &mut SyllabusWorld, path: String, body: String, alias: String) {
    send_json(world, reqwest::Method::POST, &path, &body).await;
    let status = world.last_response_status.unwrap_or_default();
    assert_eq!(
        status,
        201,
        "expected 201 from POST {path} but got {status}: {}",
        world.last_response_body.as_deref().unwrap_or_default()
    );
    let json = parse_last_response(world);
    let id = json["id"]
        .as_i64()
        .unwrap_or_else(|| panic!("POST {path} response has no numeric 'id': {json}"));
    world.ids.insert(alias.clone(), id);
    if let (Some(kind), Some(object_id)) =
        (json["content_type"].as_str(), json["object_id"].as_i64())
    {
        world.items.insert(alias, (kind.to_string(), object_id));
    }
}

#[given(expr = "I POST {string} with {string} as {string}")]
async fn given_i_post_as(world: &mut SyllabusWorld, path: String, body: String, alias: String) {
    create_via_api(world, path, body, alias).await;
}

#[when(expr = "I POST {string} with {string} as {string}")]
async fn i_post_as(world: &mut SyllabusWorld, path: String, body: String, alias: String) {
    create_via_api(world, path, body, alias).await;
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

/// Compare a field of the JSON response to a string, number, or boolean
/// literal, after `<alias>` expansion.
#[then(expr = "the JSON field {string} is {string}")]
async fn the_json_field_is(world: &mut SyllabusWorld, path: String, expected: String) {
    let json = parse_last_response(world);
    let actual = lookup(&json, &path);
    let expected = expand_aliases(world, &expected);
    let matches = match actual {
        Value::String(s) => *s == expected,
        Value::Null => expected == "null",
        other => other.to_string() == expected,
    };
    assert!(matches, "expected {path} to be {expected:?}, got {actual} in {json}");
}

#[then(expr = "the JSON field {string} is absent")]
async fn the_json_field_is_absent(world: &mut SyllabusWorld, path: String) {
    let json = parse_last_response(world);
    let actual = lookup(&json, &path);
    assert!(actual.is_null(), "expected {path} to be absent, got {actual} in {json}");
}

#[then(expr = "the JSON list has {int} entries")]
async fn the_json_list_has_entries(world: &mut SyllabusWorld, expected: usize) {
    let json = parse_last_response(world);
    let len = json
        .as_array()
        .unwrap_or_else(|| panic!("expected a JSON array, got: {json}"))
        .len();
    assert_eq!(len, expected, "{json}");
}

/// Collect `field` from every entry of a JSON array response, e.g.
/// `the JSON list "title" is "Intro, Basics"`.
#[then(expr = "the JSON list {string} is {string}")]
async fn the_json_list_is(world: &mut SyllabusWorld, field: String, expected: String) {
    let json = parse_last_response(world);
    assert_eq!(list_field(&json, &field).join(", "), expected, "{json}");
}

#[then(expr = "the JSON error contains {string}")]
async fn the_json_error_contains(world: &mut SyllabusWorld, expected: String) {
    let json = parse_last_response(world);
    let msg = json["error"]
        .as_str()
        .unwrap_or_else(|| panic!("response has no 'error' field: {json}"));
    assert!(msg.contains(&expected), "expected error to contain {expected:?}, got {msg:?}");
}
