mod common;

use common::http::{delete, get, post, put};
use common::test_server::start_default;
use serde_json::json;

const PEN: &str = r#"{
    "name": "Pen",
    "description": "Blue ink",
    "price": 1.5,
    "category": "stationery",
    "tags": ["office", "writing"],
    "inStock": true,
    "specifications": {"color": "blue", "tip": "0.7mm"},
    "ratings": [{"score": 4.5, "comment": "smooth"}]
}"#;

#[test]
fn test_create_product_keeps_every_field() {
    let server = start_default();
    let addr = server.addr();

    let resp = post(&addr, "/v1/products", PEN);
    assert_eq!(resp.status, 201);
    let product = resp.json();
    assert_eq!(product["id"], "1");
    assert_eq!(product["name"], "Pen");
    assert_eq!(product["description"], "Blue ink");
    assert_eq!(product["price"].as_f64(), Some(1.5));
    assert_eq!(product["tags"], json!(["office", "writing"]));
    assert_eq!(product["inStock"], true);
    assert_eq!(product["specifications"]["tip"], "0.7mm");
    assert_eq!(product["ratings"][0]["comment"], "smooth");

    let fetched = get(&addr, "/v1/products/1");
    assert_eq!(fetched.status, 200);
    assert_eq!(fetched.json(), product);
}

#[test]
fn test_optional_fields_are_omitted() {
    let server = start_default();
    let addr = server.addr();

    let resp = post(
        &addr,
        "/v1/products",
        r#"{"name":"Mug","price":8,"category":"kitchen"}"#,
    );
    assert_eq!(resp.status, 201);
    let product = resp.json();
    let keys: Vec<_> = product.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys.len(), 4, "unexpected keys {keys:?}");
    assert!(product.get("tags").is_none());
}

#[test]
fn test_trailing_slash_matches_collection() {
    let server = start_default();
    let addr = server.addr();
    post(&addr, "/v1/products/", PEN);

    let resp = get(&addr, "/v1/products/");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json().as_array().unwrap().len(), 1);
}

#[test]
fn test_update_and_delete_product() {
    let server = start_default();
    let addr = server.addr();
    post(&addr, "/v1/products", PEN);

    let resp = put(
        &addr,
        "/v1/products/1",
        r#"{"name":"Pen","price":2,"category":"stationery"}"#,
    );
    assert_eq!(resp.status, 200);
    let product = resp.json();
    assert_eq!(product["price"], json!(2));
    assert!(product.get("description").is_none());

    assert_eq!(delete(&addr, "/v1/products/1").status, 204);
    let gone = get(&addr, "/v1/products/1");
    assert_eq!(gone.status, 404);
    assert_eq!(gone.json(), json!({ "message": "Product not found" }));
}

#[test]
fn test_invalid_product_collects_every_violation() {
    let server = start_default();
    let addr = server.addr();

    let resp = post(
        &addr,
        "/v1/products",
        r#"{"name":"Pen","price":"cheap","specifications":{"weight":12}}"#,
    );
    assert_eq!(resp.status, 400);
    let errors = resp.json()["errors"].as_array().unwrap().clone();
    let paths: Vec<_> = errors.iter().map(|e| e["path"].as_str().unwrap()).collect();
    assert!(paths.contains(&"/body/category"), "{paths:?}");
    assert!(paths.contains(&"/body/price"), "{paths:?}");
    assert!(paths.contains(&"/body/specifications/weight"), "{paths:?}");
    assert!(server.state.products.is_empty());
}

#[test]
fn test_users_and_products_have_separate_ids() {
    let server = start_default();
    let addr = server.addr();

    post(&addr, "/v1/users", r#"{"name":"A","age":1,"email":"a@x"}"#);
    post(&addr, "/v1/users", r#"{"name":"B","age":2,"email":"b@x"}"#);
    let product = post(&addr, "/v1/products", PEN);
    assert_eq!(product.json()["id"], "1");
}
