//! リクエストの生成

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Uri};
use log::{debug, warn};

use crate::common::{BodyStream, Config, Method, ParamBuckets, ParameterBucket, Router};
use crate::error::Error;
use super::body::{is_json_content_type, BodyIngestor};
use super::context::{version_from_str, ServerContext};
use super::core::{Request, RouteState};

/// `ServerContext`・`http::Request` から `Request` を組み立てるファクトリ
#[derive(Clone, Default)]
pub struct RequestFactory {
    config: Arc<Config>,
    router: Option<Arc<dyn Router>>,
}

impl RequestFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            router: None,
        }
    }

    /// 生成するリクエストに紐づけるルーターを設定
    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// コンテキストからリクエストを作成する
    ///
    /// 不正なヘッダーは警告を出して読み飛ばす。Content-Type が JSON の場合は
    /// ボディを取り込んでパース済みボディとし、それ以外は post バケットを使う。
    pub fn create(&self, ctx: ServerContext) -> Result<Request, Error> {
        let method_str = if ctx.method.trim().is_empty() { "GET" } else { ctx.method.trim() };
        let method = http::Method::from_bytes(method_str.as_bytes())
            .map_err(|e| Error::InvalidRequest(format!("Invalid method {:?}: {}", ctx.method, e)))?;

        let uri_str = if ctx.uri.is_empty() { "/" } else { ctx.uri.as_str() };
        let uri: Uri = uri_str
            .parse()
            .map_err(|e| Error::InvalidRequest(format!("Invalid URI {:?}: {}", ctx.uri, e)))?;

        let version = version_from_str(&ctx.protocol_version).unwrap_or(http::Version::HTTP_11);

        let mut headers = HeaderMap::new();
        for (name, value) in &ctx.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(n), Ok(v)) => {
                    headers.append(n, v);
                }
                _ => warn!("Skipping invalid header: {:?}", name),
            }
        }

        let mut buckets = ParamBuckets::new(ctx.query, ctx.post);
        let mut body = BodyStream::new(ctx.body);

        // 複数の Content-Type 値のうち、最初の JSON のものでボディを取り込む
        let content_type = headers
            .get_all(CONTENT_TYPE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|ct| is_json_content_type(ct))
            .map(str::to_string);
        let request_type = Method::parse_or_default(method.as_str());
        let decoded = match content_type {
            Some(content_type) => BodyIngestor::ingest_stream(&content_type, request_type, &mut body, &mut buckets)?,
            None => None,
        };

        let parsed_body = match decoded {
            Some(bucket) => Some(bucket.to_value()),
            None if !buckets.post.is_empty() => Some(buckets.post.to_value()),
            None => None,
        };

        debug!("Created request {} {}", method, uri);

        Ok(Request {
            method,
            uri,
            version,
            headers,
            body,
            request_target: None,
            server: ctx.server,
            cookies: ctx.cookies,
            buckets,
            parsed_body,
            attributes: Default::default(),
            config: Arc::clone(&self.config),
            router: self.router.clone(),
            params: ParameterBucket::new(),
            errors: Vec::new(),
            notices: Vec::new(),
            pass_errors: Vec::new(),
            pass_notices: Vec::new(),
            previous: None,
            path: OnceLock::new(),
            route: RouteState::Unresolved,
        })
    }

    /// `http::Request` からリクエストを作成する
    pub fn from_http(&self, req: http::Request<Bytes>) -> Result<Request, Error> {
        self.create(ServerContext::from_http(req))
    }

    /// ボディ用のストリームを作成する
    pub fn create_stream(&self, content: impl Into<Bytes>) -> BodyStream {
        BodyStream::new(content)
    }
}
