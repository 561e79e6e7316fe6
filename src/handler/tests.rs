use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::*;
use crate::common::{Method, ParameterBucket, Router};
use crate::error::Error;
use crate::request::{CliRequest, PathInput, Request};
use crate::response::Response;

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TestResponse {
    message: String,
    value: i32,
}

fn segments(path: &str) -> Vec<String> {
    path.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn test_get_handler(_req: &mut Request) -> Result<Response, Error> {
    Response::ok().with_json_body(&TestResponse {
        message: "Hello from GET".to_string(),
        value: 42,
    })
}

fn test_user_handler(req: &mut Request) -> Result<Response, Error> {
    let id = req.param("id").cloned().unwrap_or_default();
    Response::ok().with_json_body(&json!({ "id": id }))
}

async fn test_async_get_handler(_req: Request) -> Result<Response, Error> {
    Response::ok().with_json_body(&TestResponse {
        message: "Hello from async GET".to_string(),
        value: 100,
    })
}

fn sample_table() -> RouteTable {
    RouteTable::new()
        .route(get("/", test_get_handler).unwrap().with_name("home"))
        .route(get(r"/user/(?P<id>\d+)", test_user_handler).unwrap().with_name("user.show"))
        .route(post("/user", |_req: &mut Request| Ok(Response::new(http::StatusCode::CREATED))).unwrap())
        .route(async_get("/async", test_async_get_handler).unwrap())
}

#[test]
fn test_ensure_safe_pattern() {
    assert_eq!(ensure_safe_pattern("/user").unwrap(), "^/user$");
    assert_eq!(ensure_safe_pattern("^/user").unwrap(), "^/user$");
    assert_eq!(ensure_safe_pattern("^/user$").unwrap(), "^/user$");
    assert!(matches!(ensure_safe_pattern(""), Err(Error::ConfigurationError(_))));
}

#[test]
fn test_invalid_pattern_is_rejected_at_registration() {
    let result = get("/user/(", test_get_handler);
    assert!(matches!(result, Err(Error::ConfigurationError(_))));
}

#[test]
fn test_lookup_matches_method_and_path() {
    let table = sample_table();
    let mut params = ParameterBucket::new();

    let route = table.lookup(Method::GET, &[], &mut params).unwrap();
    assert_eq!(route.name(), Some("home"));

    assert!(table.lookup(Method::POST, &segments("user"), &mut params).is_some());
    assert!(table.lookup(Method::DELETE, &segments("user"), &mut params).is_none());
    assert!(table.lookup(Method::GET, &segments("user/abc"), &mut params).is_none());
    // アンカーが付くため部分一致しない
    assert!(table.lookup(Method::GET, &segments("user/1/extra"), &mut params).is_none());
}

#[test]
fn test_named_captures_are_written_last() {
    let table = sample_table();
    let mut params = ParameterBucket::new();
    params.insert("id", "from-query");
    params.insert("other", "kept");

    let route = table.lookup(Method::GET, &segments("user/42"), &mut params).unwrap();
    assert_eq!(route.name(), Some("user.show"));
    assert_eq!(params.get("id"), Some(&json!("42")));
    assert_eq!(params.get("other"), Some(&json!("kept")));
}

#[test]
fn test_deeper_routes_are_tried_first() {
    let table = RouteTable::new()
        .route(get("/docs/.*", test_get_handler).unwrap().with_name("catch-all"))
        .route(get("/docs/api/.*", test_get_handler).unwrap().with_name("api"));

    let mut params = ParameterBucket::new();
    let route = table.lookup(Method::GET, &segments("docs/api/v1"), &mut params).unwrap();
    assert_eq!(route.name(), Some("api"));
    let route = table.lookup(Method::GET, &segments("docs/guide"), &mut params).unwrap();
    assert_eq!(route.name(), Some("catch-all"));
    assert_eq!(table.len(), 2);
}

#[tokio::test]
async fn test_request_dispatches_through_table() {
    let router: Arc<dyn Router> = Arc::new(sample_table());
    let mut req = Request::new("GET", "/user/7").unwrap().with_router(router);

    let res = req.handle().await.unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body, json!({"id": "7"}));
    assert_eq!(req.route_name(), Some("user.show"));
}

#[tokio::test]
async fn test_async_handler_and_other_methods() {
    let router: Arc<dyn Router> = Arc::new(sample_table());

    let mut req = Request::new("GET", "/async").unwrap().with_router(Arc::clone(&router));
    let res = req.handle().await.unwrap();
    let body: TestResponse = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body.value, 100);

    let mut req = Request::new("POST", "/user").unwrap().with_router(router);
    assert_eq!(req.handle().await.unwrap().status(), 201);
}

#[tokio::test]
async fn test_unknown_path_is_route_not_found() {
    let router: Arc<dyn Router> = Arc::new(sample_table());
    let mut req = Request::new("GET", "/nothing/here").unwrap().with_router(router);
    let err = req.handle().await.unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.to_string(), "Route \"GET nothing/here\" was not found");
}

#[test]
fn test_cli_commands() {
    let table = RouteTable::new()
        .command(
            cli("/cache/clear", |req: &mut CliRequest| {
                req.add_notice("cleared");
                Ok(())
            })
            .unwrap()
            .with_name("cache.clear"),
        )
        .command(
            cli(r"/user/(?P<name>[a-z]+)", |req: &mut CliRequest| {
                let name = req.param("name").cloned().unwrap_or_default();
                req.add_notice(format!("hello {}", name.as_str().unwrap_or_default()));
                Ok(())
            })
            .unwrap(),
        );

    let mut req = CliRequest::new(PathInput::Target("Cache/Clear"), Vec::new(), &table).unwrap();
    assert_eq!(req.route_name(), Some("cache.clear"));
    req.handle().unwrap();
    assert_eq!(req.notices().len(), 1);

    let mut req = CliRequest::new(PathInput::Target("user/alice"), Vec::new(), &table).unwrap();
    req.handle().unwrap();
    assert_eq!(req.param("name"), Some(&json!("alice")));

    let mut req = CliRequest::new(PathInput::Target("missing"), Vec::new(), &table).unwrap();
    assert!(matches!(req.handle(), Err(Error::RouteNotFound { .. })));

    // HTTPルートはCLIから見えない
    let mut params = ParameterBucket::new();
    assert!(table.lookup(Method::GET, &segments("cache/clear"), &mut params).is_none());
}
