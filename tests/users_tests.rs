mod common;

use common::http::{delete, get, post, put};
use common::test_server::start_default;
use serde_json::json;

const ALICE: &str = r#"{"name":"Alice","age":30,"email":"alice@example.com"}"#;

#[test]
fn test_create_then_list_users() {
    let server = start_default();
    let addr = server.addr();

    let created = post(&addr, "/v1/users", ALICE);
    assert_eq!(created.status, 201);
    let user = created.json();
    assert_eq!(user["id"], "1");
    assert_eq!(user["name"], "Alice");
    assert_eq!(user["age"], json!(30));
    assert!(created.body.contains(r#""age":30"#), "{}", created.body);
    assert_eq!(user["email"], "alice@example.com");
    assert!(created
        .header("content-type")
        .is_some_and(|ct| ct.starts_with("application/json")));

    let second = post(&addr, "/v1/users", r#"{"name":"Bob","age":41,"email":"bob@example.com"}"#);
    assert_eq!(second.json()["id"], "2");

    let list = get(&addr, "/v1/users");
    assert_eq!(list.status, 200);
    let names: Vec<_> = list
        .json()
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Alice", "Bob"]);
}

#[test]
fn test_client_supplied_id_is_ignored() {
    let server = start_default();
    let addr = server.addr();

    let resp = post(
        &addr,
        "/v1/users",
        r#"{"id":"999","name":"Eve","age":22,"email":"eve@example.com"}"#,
    );
    assert_eq!(resp.status, 201);
    assert_eq!(resp.json()["id"], "1");
    assert_eq!(get(&addr, "/v1/users/999").status, 404);
}

#[test]
fn test_get_user_returns_summary() {
    let server = start_default();
    let addr = server.addr();
    post(&addr, "/v1/users", ALICE);

    let resp = get(&addr, "/v1/users/1");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json(), json!({ "id": "1", "name": "Alice" }));
}

#[test]
fn test_encoded_id_finds_same_user() {
    let server = start_default();
    let addr = server.addr();
    post(&addr, "/v1/users", ALICE);

    let plain = get(&addr, "/v1/users/1");
    let encoded = get(&addr, "/v1/users/%31");
    assert_eq!(encoded.status, 200);
    assert_eq!(encoded.json(), plain.json());
}

#[test]
fn test_update_user_is_idempotent() {
    let server = start_default();
    let addr = server.addr();
    post(&addr, "/v1/users", ALICE);

    let body = r#"{"name":"Alice Smith","age":31,"email":"alice@smith.example"}"#;
    let first = put(&addr, "/v1/users/1", body);
    assert_eq!(first.status, 200);
    let second = put(&addr, "/v1/users/1", body);
    assert_eq!(second.status, 200);
    assert_eq!(first.json(), second.json());
    assert_eq!(first.json()["id"], "1");

    let list = get(&addr, "/v1/users").json();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], "Alice Smith");
}

#[test]
fn test_delete_user_then_not_found() {
    let server = start_default();
    let addr = server.addr();
    post(&addr, "/v1/users", ALICE);

    let resp = delete(&addr, "/v1/users/1");
    assert_eq!(resp.status, 204);
    assert!(resp.body.is_empty());

    let again = delete(&addr, "/v1/users/1");
    assert_eq!(again.status, 404);
    assert_eq!(again.json()["message"], "User not found");
    assert!(server.state.users.is_empty());
}

#[test]
fn test_unknown_user_is_404() {
    let server = start_default();
    let addr = server.addr();

    let resp = get(&addr, "/v1/users/999");
    assert_eq!(resp.status, 404);
    assert_eq!(resp.json(), json!({ "message": "User not found" }));

    let update = put(&addr, "/v1/users/999", ALICE);
    assert_eq!(update.status, 404);
}

#[test]
fn test_missing_email_is_rejected() {
    let server = start_default();
    let addr = server.addr();

    let resp = post(&addr, "/v1/users", r#"{"name":"Alice","age":30}"#);
    assert_eq!(resp.status, 400);
    let body = resp.json();
    assert_eq!(body["message"], "Request validation failed");
    let errors = body["errors"].as_array().unwrap();
    assert!(errors.iter().any(|e| e["path"] == "/body/email"));
    assert!(server.state.users.is_empty());
}

#[test]
fn test_wrong_type_is_rejected() {
    let server = start_default();
    let addr = server.addr();

    let resp = post(
        &addr,
        "/v1/users",
        r#"{"name":"Alice","age":"thirty","email":"alice@example.com"}"#,
    );
    assert_eq!(resp.status, 400);
    let errors = resp.json()["errors"].as_array().unwrap().clone();
    assert!(errors.iter().any(|e| e["path"] == "/body/age"));
}

#[test]
fn test_invalid_json_body_is_rejected() {
    let server = start_default();
    let addr = server.addr();

    let resp = post(&addr, "/v1/users", "{not json");
    assert_eq!(resp.status, 400);
    let body = resp.json();
    assert_eq!(body["message"], "Request validation failed");
    assert_eq!(body["errors"][0]["path"], "/body");
}

#[test]
fn test_missing_body_is_rejected() {
    let server = start_default();
    let addr = server.addr();

    let resp = common::http::call(&addr, "POST", "/v1/users", None);
    assert_eq!(resp.status, 400);
    assert_eq!(resp.json()["errors"][0]["path"], "/body");
}
