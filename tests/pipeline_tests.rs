use http::Method;
use oasmock::document::DocumentHandle;
use oasmock::params::UploadedFile;
use oasmock::pipeline::Pipeline;
use oasmock::request::Request;
use serde_json::{json, Map};
use std::sync::Arc;

mod common;
use common::{pipeline, PETSTORE};

const SWAGGER: &str = r#"
swagger: "2.0"
info: {title: Uploads, version: "1"}
basePath: /api
consumes: [application/json]
paths:
  /photos:
    get:
      parameters:
        - {name: Ids, in: query, type: array, items: {type: integer}, collectionFormat: pipes}
        - {name: Tags, in: query, type: array, items: {type: string}, collectionFormat: multi}
        - {name: session, in: header, type: string}
      responses:
        "200": {description: ok}
    post:
      consumes: [multipart/form-data]
      parameters:
        - {name: photo, in: formData, type: file, required: true}
        - {name: caption, in: formData, type: string}
        - {name: rating, in: formData, type: integer, default: 3}
      responses:
        "201": {description: created}
  /photos/{id}:
    get:
      parameters:
        - {name: id, in: path, required: true, type: integer}
        - {name: Content-Length, in: header, required: true, type: integer}
      responses:
        "200": {description: ok}
"#;

const COOKIES: &str = r#"
openapi: 3.0.0
info: {title: Prefs, version: "1"}
paths:
  /prefs:
    get:
      parameters:
        - {name: theme, in: cookie, schema: {type: string, enum: [light, dark]}}
        - {name: visits, in: cookie, schema: {type: integer}}
        - {name: limit, in: query, schema: {type: integer, default: "ten"}}
      responses:
        "200": {description: ok}
    put:
      requestBody:
        content:
          application/json:
            schema: {type: string}
      responses:
        "204": {description: saved}
"#;

const SEARCH: &str = r#"
openapi: 3.0.0
info: {title: Search, version: "1"}
paths:
  /search:
    get:
      parameters:
        - name: Address
          in: query
          schema:
            type: object
            properties:
              City: {type: string}
              ZipCode: {type: integer}
        - {name: limit, in: query, schema: {type: integer}}
      responses:
        "200": {description: ok}
  /filter:
    get:
      parameters:
        - {name: Filter, in: query, style: form, explode: true, schema: {type: object}}
        - {name: page, in: query, schema: {type: integer}}
      responses:
        "200": {description: ok}
  /notes:
    post:
      requestBody:
        content:
          text/plain:
            schema: {type: string}
          application/json:
            schema:
              type: object
              properties:
                age: {type: integer, minimum: 1}
      responses:
        "201": {description: created}
"#;

#[test]
fn test_swagger_collection_formats() {
    let parsed = pipeline(SWAGGER)
        .process(&Request::get("/api/photos?Ids=1|2|3&Tags=a&Tags=b"))
        .unwrap();
    assert_eq!(parsed.query["Ids"].to_json(), json!([1, 2, 3]));
    assert_eq!(parsed.query["Tags"].to_json(), json!(["a", "b"]));
}

#[test]
fn test_base_path_required() {
    let err = pipeline(SWAGGER).process(&Request::get("/photos")).unwrap_err();
    assert_eq!(err.status, 404);
}

#[test]
fn test_form_data_with_file() {
    let mut fields = Map::new();
    fields.insert("caption".to_string(), json!("Sunset"));
    let file = UploadedFile {
        field_name: "photo".to_string(),
        original_name: "sunset.jpg".to_string(),
        mime_type: "image/jpeg".to_string(),
        data: vec![0xff, 0xd8, 0xff],
    };
    let request = Request::new(Method::POST, "/api/photos").with_multipart(fields, vec![file]);
    let parsed = pipeline(SWAGGER).process(&request).unwrap();
    assert_eq!(parsed.form_data["caption"].as_str(), Some("Sunset"));
    assert_eq!(parsed.form_data["rating"].as_i64(), Some(3));
    match &parsed.form_data["photo"] {
        oasmock::ParamValue::File(f) => assert_eq!(f.original_name, "sunset.jpg"),
        other => panic!("expected a file, got {other:?}"),
    }
}

#[test]
fn test_form_data_missing_file() {
    let mut fields = Map::new();
    fields.insert("caption".to_string(), json!("Sunset"));
    let request = Request::new(Method::POST, "/api/photos").with_multipart(fields, Vec::new());
    let err = pipeline(SWAGGER).process(&request).unwrap_err();
    assert_eq!(err.status, 400);
    assert_eq!(err.message, "Missing required formData parameter \"photo\"");
}

#[test]
fn test_empty_content_length_is_411() {
    let p = pipeline(SWAGGER);
    let err = p
        .process(&Request::get("/api/photos/7").with_header("Content-Length", ""))
        .unwrap_err();
    assert_eq!(err.status, 411);

    let parsed = p
        .process(&Request::get("/api/photos/7").with_header("Content-Length", "0"))
        .unwrap();
    assert_eq!(parsed.path["id"].as_i64(), Some(7));
}

#[test]
fn test_cookies() {
    let parsed = pipeline(COOKIES)
        .process(&Request::get("/prefs?limit=5").with_header("Cookie", "theme=dark; visits=12"))
        .unwrap();
    assert_eq!(parsed.cookie["theme"].as_str(), Some("dark"));
    assert_eq!(parsed.cookie["visits"].as_i64(), Some(12));

    let err = pipeline(COOKIES)
        .process(&Request::get("/prefs?limit=5").with_header("Cookie", "theme=neon"))
        .unwrap_err();
    assert_eq!(err.status, 400);
}

#[test]
fn test_invalid_default_is_server_error() {
    let err = pipeline(COOKIES).process(&Request::get("/prefs")).unwrap_err();
    assert_eq!(err.status, 500);
    assert!(err.message.contains("\"limit\""));
}

#[test]
fn test_not_found_and_method_not_allowed() {
    let p = pipeline(PETSTORE);
    let res = p.handle(&Request::get("/owners"));
    assert_eq!(res.status, 404);

    let res = p.handle(&Request::new(Method::PUT, "/pets/Fido"));
    assert_eq!(res.status, 405);
    assert_eq!(res.header("allow"), Some("GET, DELETE, PATCH"));
    assert!(res.body["error"].as_str().unwrap().contains("is not allowed"));
}

#[test]
fn test_body_on_operation_without_body_is_413() {
    let res = pipeline(PETSTORE)
        .handle(&Request::new(Method::DELETE, "/pets/Fido").with_json(json!({"force": true})));
    assert_eq!(res.status, 413);
    assert_eq!(
        res.body["error"],
        json!("DELETE /pets/{PetName} does not allow body content")
    );
}

#[test]
fn test_unaccepted_content_type_is_415() {
    let res = pipeline(COOKIES)
        .handle(&Request::new(Method::PUT, "/prefs?limit=1").with_body("text/plain", "dark"));
    assert_eq!(res.status, 415);
    assert!(res.body["error"]
        .as_str()
        .unwrap()
        .ends_with("does not allow Content-Type \"text/plain\""));
}

#[test]
fn test_failed_document_is_500() {
    let handle = Arc::new(DocumentHandle::new(true));
    handle.fail("bad YAML");
    let res = Pipeline::new(handle).handle(&Request::get("/pets"));
    assert_eq!(res.status, 500);
    assert_eq!(
        res.body["error"],
        json!("Unable to load the API document (bad YAML)")
    );
}

#[test]
fn test_parsed_json_without_mock() {
    let res = pipeline(PETSTORE).handle(&Request::get("/pets?Age=2"));
    assert_eq!(res.status, 200);
    assert_eq!(res.body["query"]["Age"], json!(2));
}

#[test]
fn test_form_exploded_object_in_query() {
    let p = pipeline(SEARCH);
    let parsed = p
        .process(&Request::get("/search?City=Orlando&ZipCode=32801&limit=2"))
        .unwrap();
    assert_eq!(
        parsed.query["Address"].to_json(),
        json!({"City": "Orlando", "ZipCode": 32801})
    );
    assert_eq!(parsed.query["limit"].as_i64(), Some(2));

    let parsed = p.process(&Request::get("/search?limit=2")).unwrap();
    assert!(!parsed.query.contains_key("Address"));

    let parsed = p.process(&Request::get("/filter?page=1&kind=dog&size=big")).unwrap();
    assert_eq!(parsed.query["Filter"].to_json(), json!({"kind": "dog", "size": "big"}));
    assert_eq!(parsed.query["page"].as_i64(), Some(1));
}

#[test]
fn test_body_media_types_validate_separately() {
    let p = pipeline(SEARCH);
    let parsed = p
        .process(&Request::new(Method::POST, "/notes").with_body("text/plain", "hello"))
        .unwrap();
    assert_eq!(parsed.body.unwrap().to_json(), json!("hello"));

    let parsed = p
        .process(&Request::new(Method::POST, "/notes").with_json(json!({"age": "3"})))
        .unwrap();
    assert_eq!(parsed.body.unwrap().to_json(), json!({"age": 3}));

    let err = p
        .process(&Request::new(Method::POST, "/notes").with_json(json!({"age": "0"})))
        .unwrap_err();
    assert_eq!(err.status, 400);
}
