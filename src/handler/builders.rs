use std::future::Future;

use crate::common::Method;
use crate::error::Error;
use crate::request::{CliRequest, Request};
use crate::response::Response;

use super::core::{AsyncRouteHandler, CliRouteHandler, RouteHandler};

/// 任意メソッドのハンドラーを作成
pub fn route<F>(method: Method, path: &str, handler: F) -> Result<RouteHandler<F>, Error>
where
    F: Fn(&mut Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    RouteHandler::try_new(method, path, handler)
}

/// GETハンドラーを作成
pub fn get<F>(path: &str, handler: F) -> Result<RouteHandler<F>, Error>
where
    F: Fn(&mut Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    RouteHandler::try_new(Method::GET, path, handler)
}

/// POSTハンドラーを作成
pub fn post<F>(path: &str, handler: F) -> Result<RouteHandler<F>, Error>
where
    F: Fn(&mut Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    RouteHandler::try_new(Method::POST, path, handler)
}

/// PUTハンドラーを作成
pub fn put<F>(path: &str, handler: F) -> Result<RouteHandler<F>, Error>
where
    F: Fn(&mut Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    RouteHandler::try_new(Method::PUT, path, handler)
}

/// PATCHハンドラーを作成
pub fn patch<F>(path: &str, handler: F) -> Result<RouteHandler<F>, Error>
where
    F: Fn(&mut Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    RouteHandler::try_new(Method::PATCH, path, handler)
}

/// DELETEハンドラーを作成
pub fn delete<F>(path: &str, handler: F) -> Result<RouteHandler<F>, Error>
where
    F: Fn(&mut Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    RouteHandler::try_new(Method::DELETE, path, handler)
}

/// OPTIONSハンドラーを作成
pub fn options<F>(path: &str, handler: F) -> Result<RouteHandler<F>, Error>
where
    F: Fn(&mut Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    RouteHandler::try_new(Method::OPTIONS, path, handler)
}

/// 非同期GETハンドラーを作成
pub fn async_get<F, Fut>(path: &str, handler: F) -> Result<AsyncRouteHandler<F, Fut>, Error>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    AsyncRouteHandler::try_new(Method::GET, path, handler)
}

/// 非同期POSTハンドラーを作成
pub fn async_post<F, Fut>(path: &str, handler: F) -> Result<AsyncRouteHandler<F, Fut>, Error>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    AsyncRouteHandler::try_new(Method::POST, path, handler)
}

/// CLIコマンドを作成
pub fn cli<F>(path: &str, handler: F) -> Result<CliRouteHandler<F>, Error>
where
    F: Fn(&mut CliRequest) -> Result<(), Error> + Send + Sync + 'static,
{
    CliRouteHandler::try_new(path, handler)
}
