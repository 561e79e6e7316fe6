//! Response デコレーターとDTOの統合テスト

use serde::Serialize;
use serde_json::{json, Value};

use reqwrap::error::Error;
use reqwrap::validation::{ValidationFailure, Violation};
use reqwrap::{ErrorResponse, ErrorType, Response, ResponseFactory, SuccessResponse};

#[derive(Serialize)]
struct Item {
    id: u32,
    name: String,
}

#[test]
fn test_json_response_keeps_original_untouched() {
    let base = Response::ok();
    let res = base.with_json_body(&json!({"ok": true})).unwrap();

    assert!(base.body().is_empty());
    assert!(!base.has_header("content-type"));
    assert_eq!(res.header_line("Content-Type"), "application/json");
    assert_eq!(serde_json::from_slice::<Value>(res.body()).unwrap(), json!({"ok": true}));
}

#[test]
fn test_xml_response() {
    let res = Response::ok()
        .with_xml_body(&Item { id: 1, name: "cat & dog".to_string() })
        .unwrap();
    assert_eq!(res.header_line("content-type"), "application/xml");
    let text = String::from_utf8(res.body().to_vec()).unwrap();
    assert_eq!(text, "<response><id>1</id><name>cat &amp; dog</name></response>");
}

#[test]
fn test_status_and_reason() {
    let res = Response::ok().with_status(418, "Short and stout").unwrap();
    assert_eq!(res.status(), 418);
    assert_eq!(res.reason_phrase(), "Short and stout");
    assert_eq!(Response::not_found().reason_phrase(), "Not Found");
    assert!(Response::ok().with_status(1000, "").is_err());
}

#[test]
fn test_factory_json_response_with_headers() {
    let body = SuccessResponse::new().with_detail("saved").with_value("id", 9);
    let res = ResponseFactory::new()
        .create_json_response(&body, 201, &[("Location", "/items/9")])
        .unwrap();

    assert_eq!(res.status(), 201);
    assert_eq!(res.header_line("location"), "/items/9");
    let json: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(json, json!({"message": "Success", "detail": "saved", "values": {"id": 9}}));
}

#[test]
fn test_error_response_from_validation_error() {
    let failure = ValidationFailure::single(Violation::new("email", "email", "email must be a valid email address"));
    let err = Error::Validation(failure);
    let res = Response::from_error(&err);

    assert_eq!(res.status(), 400);
    let json: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(json["type"], "validation_error");
    assert_eq!(json["values"]["email"], json!(["email must be a valid email address"]));
}

#[test]
fn test_error_response_from_not_found() {
    let err = Error::RouteNotFound { method: "GET".to_string(), path: "missing".to_string() };
    let res = Response::from_error(&err);
    assert_eq!(res.status(), 404);
    let json: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(json["type"], "resource_not_found_error");
    assert!(json.get("values").is_none());
}

#[test]
fn test_error_response_builder() {
    let dto = ErrorResponse::new("Forbidden", ErrorType::ResourceAccess).with_detail("admins only");
    assert_eq!(dto.status_code(), 403);
    let json = serde_json::to_value(&dto).unwrap();
    assert_eq!(json, json!({"type": "resource_access_error", "title": "Forbidden", "detail": "admins only"}));
}

#[test]
fn test_http_round_trip() {
    let res = Response::ok().with_header("X-Id", "1").unwrap().with_string_body("hi");
    let http_res = res.into_http();
    assert_eq!(http_res.status(), 200);
    assert_eq!(http_res.headers()["x-id"], "1");

    let back = Response::from_http(http_res);
    assert_eq!(&back.body()[..], b"hi");
}
