//! コアトレイト定義（Router、Route、CliRoute）

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Error;
use crate::request::{CliRequest, Request};
use crate::response::Response;
use super::http::Method;
use super::params::ParameterBucket;

/// ルーター（外部コラボレーター）
///
/// ルックアップ時にパスパラメータを `params` へ書き込んでよい。
#[cfg_attr(test, mockall::automock)]
pub trait Router: Send + Sync {
    /// HTTPリクエストのルートを検索
    fn lookup(&self, method: Method, path: &[String], params: &mut ParameterBucket) -> Option<Arc<dyn Route>>;

    /// CLIリクエストのルートを検索
    fn lookup_cli(&self, _path: &[String], _params: &mut ParameterBucket) -> Option<Arc<dyn CliRoute>> {
        None
    }
}

/// HTTPルート
#[async_trait]
pub trait Route: Send + Sync {
    /// ルート名（シリアライズ時の `routeName`）
    fn name(&self) -> Option<&str> {
        None
    }

    /// リクエストを処理
    async fn handle(&self, req: &mut Request) -> Result<Response, Error>;
}

/// CLIルート
pub trait CliRoute: Send + Sync {
    fn name(&self) -> Option<&str> {
        None
    }

    fn handle(&self, req: &mut CliRequest) -> Result<(), Error>;
}
