//! The canonical request scenarios, end to end through the pipeline.

use http::Method;
use oasmock::request::Request;
use serde_json::json;

mod common;
use common::{pipeline, PETSTORE};

#[test]
fn test_repeated_query_keys_become_an_array() {
    let parsed = pipeline(PETSTORE)
        .process(&Request::get("/pets?Age=4&Tags=big&Tags=brown"))
        .unwrap();
    assert_eq!(parsed.query["Age"].as_i64(), Some(4));
    assert_eq!(parsed.query["Tags"].to_json(), json!(["big", "brown"]));
}

#[test]
fn test_simple_header_object() {
    let parsed = pipeline(PETSTORE)
        .process(&Request::get("/pets").with_header("Address", "City,Orlando,State,FL,ZipCode,12345"))
        .unwrap();
    assert_eq!(
        parsed.header["Address"].to_json(),
        json!({"City": "Orlando", "State": "FL", "ZipCode": 12345})
    );
}

#[test]
fn test_empty_query_value_takes_default() {
    let parsed = pipeline(PETSTORE).process(&Request::get("/pets?Vet=")).unwrap();
    assert_eq!(parsed.query["Vet"].to_json(), json!({}));
}

#[test]
fn test_non_numeric_header_is_rejected() {
    let err = pipeline(PETSTORE)
        .process(&Request::get("/pets").with_header("Age", "big,brown"))
        .unwrap_err();
    assert_eq!(err.status, 400);
    assert!(err.message.contains("\"big,brown\" is not a valid numeric value"));
    assert!(err.message.starts_with("The \"Age\" header parameter is invalid"));
}

#[test]
fn test_path_parameter_extracted() {
    let parsed = pipeline(PETSTORE).process(&Request::get("/pets/Fido")).unwrap();
    assert_eq!(parsed.path["PetName"].as_str(), Some("Fido"));
    assert_eq!(parsed.route.operation_id.as_deref(), Some("getPet"));
}

#[test]
fn test_percent_encoded_path_parameter() {
    let parsed = pipeline(PETSTORE)
        .process(&Request::get("/pets/Mr%20Whiskers"))
        .unwrap();
    assert_eq!(parsed.path["PetName"].as_str(), Some("Mr Whiskers"));
}

#[test]
fn test_json_body_is_typed() {
    let parsed = pipeline(PETSTORE)
        .process(
            &Request::new(Method::POST, "/pets")
                .with_json(json!({"name": "Fido", "age": "4", "dob": "2020-05-01"})),
        )
        .unwrap();
    let body = parsed.body.unwrap();
    assert_eq!(body.get("age").and_then(|v| v.as_i64()), Some(4));
    assert_eq!(body.to_json()["dob"], json!("2020-05-01"));
}

#[test]
fn test_nested_body_error_names_the_property() {
    let err = pipeline(PETSTORE)
        .process(
            &Request::new(Method::POST, "/pets")
                .with_json(json!({"name": "Fido", "Address": {"Zip": "abc"}})),
        )
        .unwrap_err();
    assert_eq!(err.status, 400);
    assert!(err.message.contains("Error in body.Address.Zip."), "{}", err.message);
}

#[test]
fn test_required_body_missing() {
    let err = pipeline(PETSTORE)
        .process(&Request::new(Method::POST, "/pets"))
        .unwrap_err();
    assert_eq!(err.status, 400);
    assert!(err.message.starts_with("Missing required body parameter"));
}
