#![allow(dead_code)]

use oasmock::document::DocumentHandle;
use oasmock::mock::MockEngine;
use oasmock::pipeline::Pipeline;
use oasmock::spec::load_spec_str;
use std::sync::Arc;

pub mod temp_files {
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Writes `content` into a fresh temp directory; the directory lives as
    /// long as the returned guard.
    pub fn create_temp_spec(content: &str, ext: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("openapi.{ext}"));
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    pub fn create_temp_yaml(content: &str) -> (TempDir, PathBuf) {
        create_temp_spec(content, "yaml")
    }
}

pub fn handle(yaml: &str) -> Arc<DocumentHandle> {
    let spec = load_spec_str(yaml, "openapi.yaml").unwrap();
    Arc::new(DocumentHandle::from_spec(spec, true))
}

/// Parameter pipeline without a mock engine.
pub fn pipeline(yaml: &str) -> Pipeline {
    Pipeline::new(handle(yaml))
}

/// Parameter pipeline answering from an in-memory mock store.
pub fn mock_pipeline(yaml: &str) -> Pipeline {
    Pipeline::new(handle(yaml)).with_mock(MockEngine::in_memory())
}

pub const PETSTORE: &str = r#"
openapi: 3.0.0
info: {title: Petstore, version: "1.0"}
paths:
  /pets:
    get:
      operationId: findPets
      parameters:
        - {name: Age, in: query, schema: {type: integer}}
        - {name: Tags, in: query, schema: {type: array, items: {type: string}}}
        - {name: Vet, in: query, schema: {type: object, default: {}}}
        - name: Address
          in: header
          schema:
            type: object
            properties:
              City: {type: string}
              State: {type: string}
              ZipCode: {type: integer}
        - {name: Age, in: header, schema: {type: number}}
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: {type: array, items: {type: object}}
    post:
      operationId: addPet
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              required: [name]
              properties:
                name: {type: string}
                type: {type: string}
                age: {type: integer}
                dob: {type: string, format: date}
                Address:
                  type: object
                  properties:
                    Zip: {type: integer}
      responses:
        "201":
          description: created
          content:
            application/json:
              schema: {type: object}
  /pets/{PetName}:
    parameters:
      - {name: PetName, in: path, required: true, schema: {type: string}}
    get:
      operationId: getPet
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: {type: object}
    patch:
      operationId: updatePet
      requestBody:
        content:
          application/json:
            schema: {type: object}
      responses:
        "200": {description: ok}
    delete:
      operationId: deletePet
      responses:
        "200": {description: ok}
"#;
