use std::future::Future;

use async_trait::async_trait;
use log::{debug, info};

use crate::common::{CliRoute, Method, Route};
use crate::error::Error;
use crate::request::{CliRequest, Request};
use crate::response::Response;

use super::pattern::RoutePattern;

fn log_registration(kind: &str, method: Method, pattern: &RoutePattern) {
    // 開発時はinfo、本番相当ではdebugに落とす
    if cfg!(debug_assertions) {
        info!("Registering {} for {} with pattern: {}", kind, method, pattern.as_str());
    } else {
        debug!("Registering {} for {} with pattern: {}", kind, method, pattern.as_str());
    }
}

/// ルートテーブルに登録できるHTTPルート
pub trait PatternRoute: Route {
    fn method(&self) -> Method;
    fn pattern(&self) -> &RoutePattern;
}

/// 同期ルートハンドラー
pub struct RouteHandler<F>
where
    F: Fn(&mut Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    method: Method,
    pattern: RoutePattern,
    name: Option<String>,
    handler_fn: F,
}

impl<F> RouteHandler<F>
where
    F: Fn(&mut Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    /// 新しいRouteHandlerを作成（パターンが不正なら `ConfigurationError`）
    pub fn try_new(method: Method, path_pattern: &str, handler_fn: F) -> Result<Self, Error> {
        let pattern = RoutePattern::new(path_pattern)?;
        log_registration("handler", method, &pattern);
        Ok(Self {
            method,
            pattern,
            name: None,
            handler_fn,
        })
    }

    /// ルート名を設定
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[async_trait]
impl<F> Route for RouteHandler<F>
where
    F: Fn(&mut Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn handle(&self, req: &mut Request) -> Result<Response, Error> {
        (self.handler_fn)(req)
    }
}

impl<F> PatternRoute for RouteHandler<F>
where
    F: Fn(&mut Request) -> Result<Response, Error> + Send + Sync + 'static,
{
    fn method(&self) -> Method {
        self.method
    }

    fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }
}

/// 非同期ルートハンドラー
///
/// ハンドラーには所有権付きのリクエスト（デコレーターの複製）を渡す。
pub struct AsyncRouteHandler<F, Fut>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    method: Method,
    pattern: RoutePattern,
    name: Option<String>,
    handler_fn: F,
}

impl<F, Fut> AsyncRouteHandler<F, Fut>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    pub fn try_new(method: Method, path_pattern: &str, handler_fn: F) -> Result<Self, Error> {
        let pattern = RoutePattern::new(path_pattern)?;
        log_registration("async handler", method, &pattern);
        Ok(Self {
            method,
            pattern,
            name: None,
            handler_fn,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[async_trait]
impl<F, Fut> Route for AsyncRouteHandler<F, Fut>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn handle(&self, req: &mut Request) -> Result<Response, Error> {
        (self.handler_fn)(req.clone()).await
    }
}

impl<F, Fut> PatternRoute for AsyncRouteHandler<F, Fut>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    fn method(&self) -> Method {
        self.method
    }

    fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }
}

/// CLIコマンドのハンドラー
pub struct CliRouteHandler<F>
where
    F: Fn(&mut CliRequest) -> Result<(), Error> + Send + Sync + 'static,
{
    pattern: RoutePattern,
    name: Option<String>,
    handler_fn: F,
}

impl<F> CliRouteHandler<F>
where
    F: Fn(&mut CliRequest) -> Result<(), Error> + Send + Sync + 'static,
{
    pub fn try_new(path_pattern: &str, handler_fn: F) -> Result<Self, Error> {
        let pattern = RoutePattern::new(path_pattern)?;
        log_registration("command", Method::CLI, &pattern);
        Ok(Self {
            pattern,
            name: None,
            handler_fn,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }
}

impl<F> CliRoute for CliRouteHandler<F>
where
    F: Fn(&mut CliRequest) -> Result<(), Error> + Send + Sync + 'static,
{
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn handle(&self, req: &mut CliRequest) -> Result<(), Error> {
        (self.handler_fn)(req)
    }
}
