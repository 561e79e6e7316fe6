//! コマンドライン実行用のリクエスト

use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::ser::{Serialize, Serializer};
use serde_json::Value;

use crate::common::{CliRoute, Method, ParameterBucket, Router};
use crate::error::Error;
use super::core::Notice;
use super::path::PathInput;

/// CLIリクエスト
///
/// パスは `/` 区切りの文字列またはセグメント配列で与える。ルートは生成時に解決する。
pub struct CliRequest {
    path: Vec<String>,
    args: Vec<String>,
    params: ParameterBucket,
    errors: Vec<String>,
    notices: Vec<Notice>,
    route: Option<Arc<dyn CliRoute>>,
}

impl CliRequest {
    /// パスと引数から作成する（パスが空なら `MissingCliPath`）
    pub fn new(path: PathInput<'_>, args: Vec<String>, router: &dyn Router) -> Result<Self, Error> {
        let path: Vec<String> = match path {
            PathInput::Target(target) => split_cli_path(target),
            PathInput::Segments(segments) => segments
                .iter()
                .flat_map(|s| split_cli_path(s))
                .collect(),
        };
        if path.is_empty() {
            return Err(Error::MissingCliPath);
        }

        let mut params = ParameterBucket::new();
        let route = router.lookup_cli(&path, &mut params);
        debug!(
            "CLI route lookup for {}: {}",
            path.join("/"),
            if route.is_some() { "found" } else { "not found" }
        );

        Ok(Self {
            path,
            args,
            params,
            errors: Vec::new(),
            notices: Vec::new(),
            route,
        })
    }

    /// `argv` から作成する（`argv[1]` がパス、`argv[2..]` が引数）
    pub fn from_args<I, S>(argv: I, router: &dyn Router) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::<String>::into).skip(1);
        let path = argv.next().unwrap_or_default();
        let args: Vec<String> = argv.collect();
        Self::new(PathInput::Target(&path), args, router)
    }

    pub fn request_type(&self) -> Method {
        Method::CLI
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn params(&self) -> &ParameterBucket {
        &self.params
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params.insert(name, value);
        self
    }

    pub fn add_error(&mut self, error: impl Into<String>) -> &mut Self {
        self.errors.push(error.into());
        self
    }

    pub fn add_notice(&mut self, notice: impl Into<Notice>) -> &mut Self {
        self.notices.push(notice.into());
        self
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn route(&self) -> Option<Arc<dyn CliRoute>> {
        self.route.clone()
    }

    pub fn route_name(&self) -> Option<&str> {
        self.route.as_ref().and_then(|r| r.name())
    }

    /// ルートへ処理を委譲する
    pub fn handle(&mut self) -> Result<(), Error> {
        let Some(route) = self.route.clone() else {
            return Err(Error::RouteNotFound {
                method: Method::CLI.to_string(),
                path: self.path.join("/"),
            });
        };
        route.handle(self)
    }
}

fn split_cli_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

impl Serialize for CliRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        struct View<'a> {
            #[serde(rename = "type")]
            kind: Method,
            path: &'a [String],
            args: &'a [String],
            params: &'a ParameterBucket,
            errors: &'a [String],
            notices: &'a [Notice],
            #[serde(rename = "routeName", skip_serializing_if = "Option::is_none")]
            route_name: Option<&'a str>,
        }

        View {
            kind: Method::CLI,
            path: &self.path,
            args: &self.args,
            params: &self.params,
            errors: &self.errors,
            notices: &self.notices,
            route_name: self.route_name(),
        }
        .serialize(serializer)
    }
}

impl fmt::Debug for CliRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliRequest")
            .field("path", &self.path)
            .field("args", &self.args)
            .field("params", &self.params)
            .field("route_name", &self.route_name())
            .finish()
    }
}
