use http::Method;
use oasmock::mock::MockEngine;
use oasmock::pipeline::Pipeline;
use oasmock::request::Request;
use serde_json::json;

mod common;
use common::{handle, mock_pipeline, PETSTORE};

fn post(p: &Pipeline, body: serde_json::Value) -> oasmock::Response {
    p.handle(&Request::new(Method::POST, "/pets").with_json(body))
}

#[test]
fn test_create_then_fetch() {
    let p = mock_pipeline(PETSTORE);
    let res = post(&p, json!({"name": "Fido", "type": "dog"}));
    assert_eq!(res.status, 201);
    assert_eq!(res.header("content-type"), Some("application/json"));
    assert_eq!(res.body["name"], json!("Fido"));

    let res = p.handle(&Request::get("/pets/fido"));
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({"name": "Fido", "type": "dog"}));
}

#[test]
fn test_collection_filtered_by_query() {
    let p = mock_pipeline(PETSTORE);
    post(&p, json!({"name": "Fido", "Age": 4}));
    post(&p, json!({"name": "Rex", "Age": 2}));

    let res = p.handle(&Request::get("/pets"));
    assert_eq!(res.body.as_array().map(Vec::len), Some(2));

    let res = p.handle(&Request::get("/pets?Age=4"));
    assert_eq!(res.body, json!([{"name": "Fido", "Age": 4}]));
}

#[test]
fn test_empty_collection_uses_declared_schema() {
    let res = mock_pipeline(PETSTORE).handle(&Request::get("/pets"));
    assert_eq!(res.status, 200);
    assert!(res.body.is_array());
}

#[test]
fn test_patch_merges_and_delete_removes() {
    let p = mock_pipeline(PETSTORE);
    post(&p, json!({"name": "Fido", "type": "dog"}));

    let res = p.handle(&Request::new(Method::PATCH, "/pets/Fido").with_json(json!({"type": "cat"})));
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({"name": "Fido", "type": "cat"}));

    let res = p.handle(&Request::new(Method::DELETE, "/pets/Fido"));
    assert_eq!(res.status, 200);
    assert_eq!(res.body["type"], json!("cat"));

    let res = p.handle(&Request::new(Method::DELETE, "/pets/Fido"));
    assert_eq!(res.status, 404);
    assert_eq!(res.body["error"], json!("Resource not found: /pets/Fido"));
}

#[test]
fn test_invalid_request_never_reaches_the_store() {
    let p = mock_pipeline(PETSTORE);
    let res = post(&p, json!({"type": "dog"}));
    assert_eq!(res.status, 400);
    let stored = p.mock().unwrap().store().get_collection("/pets").unwrap();
    assert!(stored.is_empty());
}

#[test]
fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let first = Pipeline::new(handle(PETSTORE))
        .with_mock(MockEngine::with_data_dir(Some(dir.path())).unwrap());
    assert_eq!(post(&first, json!({"name": "Fido"})).status, 201);
    drop(first);

    let second = Pipeline::new(handle(PETSTORE))
        .with_mock(MockEngine::with_data_dir(Some(dir.path())).unwrap());
    let res = second.handle(&Request::get("/pets/Fido"));
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({"name": "Fido"}));
}
