use std::sync::Arc;

use log::debug;

use crate::common::{CliRoute, Method, ParameterBucket, Route, Router};

use super::core::{CliRouteHandler, PatternRoute};
use super::pattern::{segments_to_path, RoutePattern};
use crate::error::Error;
use crate::request::CliRequest;

struct HttpEntry {
    method: Method,
    pattern: RoutePattern,
    route: Arc<dyn Route>,
}

struct CliEntry {
    pattern: RoutePattern,
    route: Arc<dyn CliRoute>,
}

/// 正規表現でパスを照合するルーター
///
/// 名前付きキャプチャ（`(?P<id>\d+)`）はルートパラメータとして書き込まれる。
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<HttpEntry>,
    commands: Vec<CliEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTPルートを追加
    pub fn route<H>(mut self, handler: H) -> Self
    where
        H: PatternRoute + 'static,
    {
        let method = handler.method();
        let pattern = handler.pattern().clone();
        self.routes.push(HttpEntry {
            method,
            pattern,
            route: Arc::new(handler),
        });
        // ルートを追加するたびにパスの `/` の数で降順ソート（深いパスを優先）
        self.routes.sort_by(|a, b| b.pattern.depth().cmp(&a.pattern.depth()));
        self
    }

    /// CLIコマンドを追加
    pub fn command<F>(mut self, handler: CliRouteHandler<F>) -> Self
    where
        F: Fn(&mut CliRequest) -> Result<(), Error> + Send + Sync + 'static,
    {
        let pattern = handler.pattern().clone();
        self.commands.push(CliEntry {
            pattern,
            route: Arc::new(handler),
        });
        self.commands.sort_by(|a, b| b.pattern.depth().cmp(&a.pattern.depth()));
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len() + self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Router for RouteTable {
    fn lookup(&self, method: Method, path: &[String], params: &mut ParameterBucket) -> Option<Arc<dyn Route>> {
        let target = segments_to_path(path);
        for entry in self.routes.iter().filter(|e| e.method == method) {
            if let Some(captures) = entry.pattern.captures(&target) {
                debug!("Matched {} {} with pattern {}", method, target, entry.pattern.as_str());
                params.merge(&captures);
                return Some(Arc::clone(&entry.route));
            }
        }
        debug!("No route for {} {}", method, target);
        None
    }

    fn lookup_cli(&self, path: &[String], params: &mut ParameterBucket) -> Option<Arc<dyn CliRoute>> {
        let target = segments_to_path(path);
        for entry in &self.commands {
            if let Some(captures) = entry.pattern.captures(&target) {
                debug!("Matched command {} with pattern {}", target, entry.pattern.as_str());
                params.merge(&captures);
                return Some(Arc::clone(&entry.route));
            }
        }
        debug!("No command for {}", target);
        None
    }
}
